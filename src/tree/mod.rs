//! The Tracker Tree: the artifact this crate exists to build. See [`builder`] for
//! the construction algorithm (C6); this module is the read-only shape of the
//! result plus the read-side API extractors walk.

mod builder;

use indexmap::IndexMap;
use rayon::prelude::*;

use crate::classify::ArgumentType;
use crate::index::MetadataIndex;
use crate::limits::Limits;
use crate::model::{Assignment, AssignmentKey, CallArgument, EdgeId, Function, InterfaceKey, ParamKey};

/// A stable, non-owning reference to a [`TrackerNode`] inside a [`TrackerTree`]'s arena.
pub type NodeId = la_arena::Idx<TrackerNode>;

/// One node of the Tracker Tree.
///
/// Owned by its parent (or, for roots, by the tree itself) through the arena;
/// `parent` is just another arena index, never an owning reference, so the
/// parent/child relationship can't form a real (memory-unsafe) cycle.
#[derive(Debug, Clone)]
pub struct TrackerNode {
    /// Stable identity: the callee's `GenericID` for call nodes, or a shape
    /// fingerprint for argument nodes.
    pub key: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// The call edge that produced this node, if any (absent for roots).
    pub edge: Option<EdgeId>,
    /// Set iff this node represents a call argument rather than a callee.
    pub argument: Option<CallArgument>,
    pub arg_type: Option<ArgumentType>,
    pub is_argument: bool,
    pub arg_index: i64,
    pub arg_context: String,
    /// Inherited-plus-local generic bindings, resolved eagerly at build time.
    pub type_param_map: IndexMap<String, String>,
    /// The local variable table of the function this node represents, i.e. the
    /// `assignment_map` of the call edge that defines it — not just the tree's root.
    pub root_assignment_map: IndexMap<String, Vec<Assignment>>,
}

impl TrackerNode {
    fn leaf(key: String, parent: Option<NodeId>) -> Self {
        Self {
            key,
            parent,
            children: Vec::new(),
            edge: None,
            argument: None,
            arg_type: None,
            is_argument: false,
            arg_index: -1,
            arg_context: String::new(),
            type_param_map: IndexMap::new(),
            root_assignment_map: IndexMap::new(),
        }
    }
}

/// The built, read-only Tracker Tree.
pub struct TrackerTree {
    arena: la_arena::Arena<TrackerNode>,
    roots: Vec<NodeId>,
    limits: Limits,
    node_map: IndexMap<String, NodeId>,
    variable_nodes: IndexMap<ParamKey, Vec<NodeId>>,
    assignment_nodes: IndexMap<AssignmentKey, Vec<NodeId>>,
    interface_resolutions: IndexMap<InterfaceKey, String>,
    source: MetadataIndex,
}

impl TrackerTree {
    /// Build the tree from `source`'s metadata, enforcing `limits` verbatim.
    ///
    /// This is the crate's one synchronous, CPU-bound entry point; there are no
    /// suspension points, and the budgets in `limits` guarantee it terminates.
    #[tracing::instrument(skip_all)]
    pub fn new(source: MetadataIndex, limits: Limits) -> Self {
        builder::build(source, limits)
    }

    /// All entry-point nodes, one per distinct `main`-rooted `BaseID`.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &TrackerNode {
        &self.arena[id]
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn interface_resolutions(&self) -> &IndexMap<InterfaceKey, String> {
        &self.interface_resolutions
    }

    /// Nodes produced for a call site whose result was recorded as an
    /// assignment, keyed by the assignment's resolved `AssignmentKey` — the
    /// non-owning index the post-link pass in `tree::builder` populates
    /// (build phase 4.a).
    pub fn assignment_nodes(&self) -> &IndexMap<AssignmentKey, Vec<NodeId>> {
        &self.assignment_nodes
    }

    pub fn metadata_index(&self) -> &MetadataIndex {
        &self.source
    }

    /// Look up the node registered for `key` (a `BaseID`), falling back to a
    /// depth-limited search of the tree (at most 50 frames deep, 20 children
    /// per frame, with a visited-set) if the direct index has nothing.
    pub fn find_by_key(&self, key: &str) -> Option<NodeId> {
        if let Some(id) = self.node_map.get(key) {
            return Some(*id);
        }
        const MAX_FRAMES: usize = 50;
        const MAX_CHILDREN: usize = 20;
        let mut visited = ahash::HashSet::default();
        let mut stack: Vec<(NodeId, usize)> = self.roots.iter().map(|r| (*r, 0)).collect();
        while let Some((id, depth)) = stack.pop() {
            if depth > MAX_FRAMES || !visited.insert(id) {
                continue;
            }
            let node = &self.arena[id];
            if node.key == key {
                return Some(id);
            }
            for child in node.children.iter().take(MAX_CHILDREN) {
                stack.push((*child, depth + 1));
            }
        }
        None
    }

    /// Pre-order traversal starting from every root. `visit` returning `false`
    /// aborts that branch (siblings and other roots are still visited).
    pub fn traverse(&self, mut visit: impl FnMut(&TrackerNode) -> bool) {
        for root in &self.roots {
            self.traverse_from(*root, &mut visit);
        }
    }

    fn traverse_from(&self, id: NodeId, visit: &mut impl FnMut(&TrackerNode) -> bool) {
        let node = &self.arena[id];
        if !visit(node) {
            return;
        }
        for child in &node.children {
            self.traverse_from(*child, visit);
        }
    }

    /// Parallel read-only traversal over independent root subtrees. Safe because
    /// the tree is immutable after [`TrackerTree::new`] returns.
    pub fn par_traverse(&self, visit: impl Fn(&TrackerNode) + Sync + Send) {
        self.roots.par_iter().for_each(|root| {
            let mut stack = vec![*root];
            while let Some(id) = stack.pop() {
                let node = &self.arena[id];
                visit(node);
                stack.extend(node.children.iter().copied());
            }
        });
    }

    /// Resolve `name` to its defining function, by walking every package's files.
    pub fn function_context(&self, name: &str) -> Option<(&Function, String, String)> {
        for (pkg_path, package) in self.source.packages() {
            for (file_path, file) in &package.files {
                if let Some(function) = file.functions.get(name) {
                    return Some((function, pkg_path.clone(), file_path.clone()));
                }
            }
        }
        None
    }

    /// Find the most recent node registered for `node`'s traced variable origin.
    pub fn trace_argument_origin(&self, node: NodeId) -> Option<NodeId> {
        let n = &self.arena[node];
        let arg = n.argument.as_ref()?;
        let origin = crate::trace::trace_variable_origin(
            &self.source,
            &arg.name,
            &n.arg_context,
            "",
            self.limits.max_self_calling_depth,
        );
        let key = ParamKey {
            name: origin.var,
            pkg: origin.pkg,
            container: origin.func,
        };
        self.variable_nodes.get(&key).and_then(|nodes| nodes.last().copied())
    }
}
