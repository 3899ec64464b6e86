//! C2 — pre-built inverted indices over a [`Metadata`]'s call graph.
//!
//! Every index is built in a single linear pass, iterating the call graph and
//! its nested maps in a fixed, sorted order so that the resulting tree is
//! reproducible across runs (see the crate's determinism property).

use ahash::HashSet;
use indexmap::IndexMap;

use crate::ids::base_id;
use crate::model::{
    Assignment, AssignmentKey, CallArgument, CallGraphEdge, EdgeId, InterfaceKey, Metadata,
    MetadataSource, Package, ParamKey,
};

/// Precomputed, read-only relations over a [`Metadata`] instance.
///
/// Built once via [`MetadataIndex::build`]; after that, every accessor is a
/// cheap `IndexMap` lookup, safe to call from parallel readers.
#[derive(Debug)]
pub struct MetadataIndex {
    metadata: Metadata,
    callers_of_base: IndexMap<String, Vec<EdgeId>>,
    callees_of_base: IndexMap<String, Vec<EdgeId>>,
    args_of_base: IndexMap<String, Vec<EdgeId>>,
    parent_functions: IndexMap<String, Vec<EdgeId>>,
    assignment_relationships: IndexMap<AssignmentKey, (EdgeId, Assignment)>,
    variable_relationships: IndexMap<ParamKey, (EdgeId, CallArgument)>,
    interface_resolutions: IndexMap<InterfaceKey, String>,
    call_graph_roots: Vec<EdgeId>,
}

impl MetadataIndex {
    #[tracing::instrument(skip_all, fields(edges = metadata.call_graph.len()))]
    pub fn build(metadata: Metadata) -> Self {
        let interner = &metadata.string_interner;

        let mut callers_of_base: IndexMap<String, Vec<EdgeId>> = IndexMap::new();
        let mut callees_of_base: IndexMap<String, Vec<EdgeId>> = IndexMap::new();
        let mut args_of_base: IndexMap<String, Vec<EdgeId>> = IndexMap::new();
        let mut parent_functions: IndexMap<String, Vec<EdgeId>> = IndexMap::new();
        let mut assignment_relationships: IndexMap<AssignmentKey, (EdgeId, Assignment)> =
            IndexMap::new();
        let mut variable_relationships: IndexMap<ParamKey, (EdgeId, CallArgument)> =
            IndexMap::new();

        for (i, edge) in metadata.call_graph.iter().enumerate() {
            let edge_id = EdgeId(i);
            let caller_base = base_id(interner, &edge.caller);
            let callee_base = base_id(interner, &edge.callee);

            callers_of_base.entry(caller_base.clone()).or_default().push(edge_id);
            callees_of_base.entry(callee_base.clone()).or_default().push(edge_id);

            for arg in &edge.args {
                if let Some(arg_edge_id) = arg.edge {
                    if let Some(arg_edge) = metadata.call_graph.get(arg_edge_id.0) {
                        let arg_callee_base = base_id(interner, &arg_edge.callee);
                        args_of_base.entry(arg_callee_base).or_default().push(edge_id);
                    }
                }
            }

            if let Some(parent_fn) = &edge.parent_function {
                let key = base_id(interner, parent_fn);
                parent_functions.entry(key).or_default().push(edge_id);
            }

            // Last assignment wins: a variable's most recent binding is the one
            // the tree links under, in the order the ingest layer recorded them.
            for (var, assignments) in &edge.assignment_map {
                if let Some(assignment) = assignments.last() {
                    let key = AssignmentKey {
                        name: var.clone(),
                        pkg: assignment.pkg.clone(),
                        type_name: assignment.concrete_type.clone(),
                        container: assignment.container.clone(),
                    };
                    assignment_relationships.insert(key, (edge_id, assignment.clone()));
                }
            }

            for (param, argument) in &edge.param_arg_map {
                let key = ParamKey {
                    name: param.clone(),
                    pkg: interner.lookup(edge.callee.pkg).to_string(),
                    container: callee_base.clone(),
                };
                variable_relationships.insert(key, (edge_id, argument.clone()));
            }
        }

        let mut callee_or_arg_bases: HashSet<&str> = HashSet::default();
        callee_or_arg_bases.extend(callees_of_base.keys().map(String::as_str));
        callee_or_arg_bases.extend(args_of_base.keys().map(String::as_str));

        let mut seen_root_bases: HashSet<String> = HashSet::default();
        let call_graph_roots = metadata
            .call_graph
            .iter()
            .enumerate()
            .filter_map(|(i, edge)| {
                let caller_base = base_id(interner, &edge.caller);
                if callee_or_arg_bases.contains(caller_base.as_str())
                    || !seen_root_bases.insert(caller_base)
                {
                    return None;
                }
                Some(EdgeId(i))
            })
            .collect();

        let interface_resolutions = metadata.interface_resolutions.clone();

        Self {
            metadata,
            callers_of_base,
            callees_of_base,
            args_of_base,
            parent_functions,
            assignment_relationships,
            variable_relationships,
            interface_resolutions,
            call_graph_roots,
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Register a freshly resolved interface binding into the metadata-global cache.
    ///
    /// Additive only: an existing entry is never removed or overwritten with a
    /// different concrete type (equal-value overwrites are a no-op).
    pub fn register_interface_resolution(&mut self, key: InterfaceKey, concrete: String) {
        match self.interface_resolutions.get(&key) {
            Some(existing) if existing != &concrete => {
                tracing::warn!(
                    interface = %key.interface_type,
                    existing = %existing,
                    attempted = %concrete,
                    "ignoring conflicting interface resolution"
                );
            }
            _ => {
                self.interface_resolutions.insert(key, concrete);
            }
        }
    }

    fn empty() -> &'static [EdgeId] {
        &[]
    }
}

impl MetadataSource for MetadataIndex {
    fn packages(&self) -> &IndexMap<String, Package> {
        &self.metadata.packages
    }

    fn call_graph(&self) -> &[CallGraphEdge] {
        &self.metadata.call_graph
    }

    fn string_interner(&self) -> &crate::handle::StringInterner {
        &self.metadata.string_interner
    }

    fn callers_of(&self, base_id: &str) -> &[EdgeId] {
        self.callers_of_base
            .get(base_id)
            .map(Vec::as_slice)
            .unwrap_or_else(Self::empty)
    }

    fn callees_of(&self, base_id: &str) -> &[EdgeId] {
        self.callees_of_base
            .get(base_id)
            .map(Vec::as_slice)
            .unwrap_or_else(Self::empty)
    }

    fn args_of(&self, base_id: &str) -> &[EdgeId] {
        self.args_of_base
            .get(base_id)
            .map(Vec::as_slice)
            .unwrap_or_else(Self::empty)
    }

    fn parent_functions_of(&self, qualified_id: &str) -> &[EdgeId] {
        self.parent_functions
            .get(qualified_id)
            .map(Vec::as_slice)
            .unwrap_or_else(Self::empty)
    }

    fn assignment_relationships(&self) -> &IndexMap<AssignmentKey, (EdgeId, Assignment)> {
        &self.assignment_relationships
    }

    fn variable_relationships(&self) -> &IndexMap<ParamKey, (EdgeId, CallArgument)> {
        &self.variable_relationships
    }

    fn interface_resolutions(&self) -> &IndexMap<InterfaceKey, String> {
        &self.interface_resolutions
    }

    fn call_graph_roots(&self) -> &[EdgeId] {
        &self.call_graph_roots
    }

    fn edge(&self, id: EdgeId) -> &CallGraphEdge {
        &self.metadata.call_graph[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::StringInterner;
    use crate::model::Call;

    fn edge(interner: &mut StringInterner, caller_pkg: &str, caller: &str, callee_pkg: &str, callee: &str) -> CallGraphEdge {
        CallGraphEdge {
            caller: Call {
                pkg: interner.intern(caller_pkg),
                name: interner.intern(caller),
                ..Default::default()
            },
            callee: Call {
                pkg: interner.intern(callee_pkg),
                name: interner.intern(callee),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn callers_and_callees_are_indexed() {
        let mut interner = StringInterner::new();
        let e = edge(&mut interner, "main", "main", "fmt", "Println");
        let metadata = Metadata {
            string_interner: interner,
            call_graph: vec![e],
            ..Default::default()
        };
        let index = MetadataIndex::build(metadata);
        assert_eq!(index.callers_of("main.main").len(), 1);
        assert_eq!(index.callees_of("fmt.Println").len(), 1);
        assert!(index.callees_of("nonexistent").is_empty());
    }

    #[test]
    fn roots_exclude_callees() {
        let mut interner = StringInterner::new();
        let main_to_a = edge(&mut interner, "main", "main", "main", "a");
        let a_to_b = edge(&mut interner, "main", "a", "main", "b");
        let metadata = Metadata {
            string_interner: interner,
            call_graph: vec![main_to_a, a_to_b],
            ..Default::default()
        };
        let index = MetadataIndex::build(metadata);
        let roots = index.call_graph_roots();
        assert_eq!(roots.len(), 1);
        let root_caller = index.edge(roots[0]).caller;
        assert_eq!(index.string_interner().lookup(root_caller.name), "main");
    }
}
