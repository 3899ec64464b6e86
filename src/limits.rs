//! Budgets that bound the tree builder's recursion and fan-out.

/// Tunable budgets enforced verbatim by [`crate::tree::TrackerTree::new`].
///
/// All fields must be at least `1`; [`Limits::new`] is the only fallible
/// constructor in this crate; every other irregularity the builder runs into
/// is recoverable and is reported through `tracing` instead (see the crate's
/// top-level docs).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Absolute node budget for one tree. Once reached, subsequent nodes become leaves.
    pub max_nodes_per_tree: usize,
    /// Max callees processed per node.
    pub max_children_per_node: usize,
    /// Max arguments processed per call edge.
    pub max_args_per_function: usize,
    /// Max depth for recursive sub-argument collection.
    pub max_nested_args_depth: usize,
    /// Max re-entrancy per `id` while growing the tree.
    pub max_recursion_depth: usize,
    /// Max recursion depth for variable-origin tracing and variable-index attachment.
    pub max_self_calling_depth: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LimitsError {
    #[error("`{field}` must be at least 1, got 0")]
    ZeroLimit { field: &'static str },
}

impl Limits {
    /// Build a set of limits, rejecting any budget of `0`.
    pub fn new(
        max_nodes_per_tree: usize,
        max_children_per_node: usize,
        max_args_per_function: usize,
        max_nested_args_depth: usize,
        max_recursion_depth: usize,
        max_self_calling_depth: usize,
    ) -> Result<Self, LimitsError> {
        macro_rules! check {
            ($value:expr, $name:literal) => {
                if $value == 0 {
                    return Err(LimitsError::ZeroLimit { field: $name });
                }
            };
        }
        check!(max_nodes_per_tree, "max_nodes_per_tree");
        check!(max_children_per_node, "max_children_per_node");
        check!(max_args_per_function, "max_args_per_function");
        check!(max_nested_args_depth, "max_nested_args_depth");
        check!(max_recursion_depth, "max_recursion_depth");
        check!(max_self_calling_depth, "max_self_calling_depth");
        Ok(Self {
            max_nodes_per_tree,
            max_children_per_node,
            max_args_per_function,
            max_nested_args_depth,
            max_recursion_depth,
            max_self_calling_depth,
        })
    }
}

impl Default for Limits {
    /// Generous defaults appropriate for analyzing a mid-sized service.
    fn default() -> Self {
        Self {
            max_nodes_per_tree: 50_000,
            max_children_per_node: 256,
            max_args_per_function: 64,
            max_nested_args_depth: 16,
            max_recursion_depth: 8,
            max_self_calling_depth: 8,
        }
    }
}
