//! C6 — grows a [`TrackerTree`] from a [`MetadataIndex`] by recursively walking
//! the call graph from every `main`-rooted entry point, classifying arguments as
//! it goes and linking variable uses back to the assignments that produced them.

use ahash::HashSet;
use indexmap::IndexMap;

use crate::classify::{classify, ArgumentType};
use crate::handle::Handle;
use crate::ids::{base_id, generic_id};
use crate::index::MetadataIndex;
use crate::interfaces::InterfaceResolver;
use crate::limits::Limits;
use crate::model::{AssignmentKey, CallArgument, CallGraphEdge, EdgeId, MetadataSource, ParamKey};

use super::{NodeId, TrackerNode, TrackerTree};

/// How far past `max_nodes_per_tree` the builder tolerates before refusing to
/// allocate any further nodes at all, rather than truncating to bare leaves.
/// An empirical cushion, not a second budget an ingest layer is expected to tune.
const BUDGET_SLACK: usize = 10;

struct Builder {
    source: MetadataIndex,
    limits: Limits,
    arena: la_arena::Arena<TrackerNode>,
    node_map: IndexMap<String, NodeId>,
    variable_nodes: IndexMap<ParamKey, Vec<NodeId>>,
    assignment_nodes: IndexMap<AssignmentKey, Vec<NodeId>>,
    edge_to_node: IndexMap<EdgeId, NodeId>,
    resolver: InterfaceResolver,
    visited: IndexMap<String, usize>,
    node_count: usize,
    budget_warned: bool,
}

pub(super) fn build(source: MetadataIndex, limits: Limits) -> TrackerTree {
    let mut builder = Builder {
        source,
        limits,
        arena: la_arena::Arena::new(),
        node_map: IndexMap::new(),
        variable_nodes: IndexMap::new(),
        assignment_nodes: IndexMap::new(),
        edge_to_node: IndexMap::new(),
        resolver: InterfaceResolver::new(),
        visited: IndexMap::new(),
        node_count: 0,
        budget_warned: false,
    };

    let mut roots = Vec::new();
    let mut seen_root_bases: HashSet<String> = HashSet::default();
    for edge_id in builder.source.call_graph_roots().to_vec() {
        let edge = builder.source.edge(edge_id).clone();
        if builder.source.string_interner().lookup(edge.caller.name) != "main" {
            continue;
        }
        let root_base = base_id(builder.source.string_interner(), &edge.caller);
        if !seen_root_bases.insert(root_base.clone()) {
            continue;
        }
        if let Some(root_id) = builder.build_node(None, &root_base, None, IndexMap::new()) {
            roots.push(root_id);
        }
    }

    builder.link_assignment_nodes();
    builder.link_variable_nodes();
    builder.link_chain_parents();

    let interface_resolutions = builder.source.interface_resolutions().clone();

    TrackerTree {
        arena: builder.arena,
        roots,
        limits: builder.limits,
        node_map: builder.node_map,
        variable_nodes: builder.variable_nodes,
        assignment_nodes: builder.assignment_nodes,
        interface_resolutions,
        source: builder.source,
    }
}

impl Builder {
    /// Build (or return the cached) node for `id`, parented under `parent`.
    ///
    /// `parent_id` guards against an edge whose callee is its own caller; `type_param_map`
    /// carries the generic bindings in effect at this call site, merged eagerly into the
    /// node's key so that distinct instantiations never collide.
    fn build_node(
        &mut self,
        parent_id: Option<&str>,
        id: &str,
        parent: Option<NodeId>,
        type_param_map: IndexMap<String, String>,
    ) -> Option<NodeId> {
        if id.is_empty() || Some(id) == parent_id {
            return None;
        }

        let reentrancy = *self.visited.get(id).unwrap_or(&0);
        if reentrancy >= self.limits.max_recursion_depth {
            tracing::warn!(node_key = id, limit = self.limits.max_recursion_depth, "max_recursion_depth reached");
            return None;
        }
        self.visited.insert(id.to_string(), reentrancy + 1);

        if self.node_count >= self.limits.max_nodes_per_tree + BUDGET_SLACK {
            return None;
        }
        let over_budget = self.node_count >= self.limits.max_nodes_per_tree;
        if over_budget && !self.budget_warned {
            self.budget_warned = true;
            tracing::warn!(
                limit = self.limits.max_nodes_per_tree,
                "max_nodes_per_tree reached, remaining nodes truncated to leaves"
            );
        }

        let key = generic_id(id, &type_param_map);
        let mut node = TrackerNode::leaf(key, parent);
        node.type_param_map = type_param_map.clone();
        node.root_assignment_map = self
            .source
            .callers_of(id)
            .first()
            .map(|edge_id| self.source.edge(*edge_id).assignment_map.clone())
            .unwrap_or_default();

        let node_id = self.arena.alloc(node);
        self.node_count += 1;
        self.node_map.insert(id.to_string(), node_id);

        if over_budget {
            return Some(node_id);
        }

        self.grow_callees(id, node_id, &type_param_map);
        self.grow_arguments(id, node_id);
        self.grow_parent_fallback(id, node_id, &type_param_map);

        Some(node_id)
    }

    fn grow_callees(&mut self, id: &str, node_id: NodeId, caller_type_map: &IndexMap<String, String>) {
        let edge_ids: Vec<EdgeId> = self
            .source
            .callers_of(id)
            .iter()
            .copied()
            .take(self.limits.max_children_per_node)
            .collect();

        for edge_id in edge_ids {
            let edge = self.source.edge(edge_id).clone();
            let callee_base = base_id(self.source.string_interner(), &edge.callee);
            if callee_base.is_empty() || callee_base == id || edge.callee == edge.caller {
                continue;
            }
            if self.source.string_interner().lookup(edge.callee.name) == "nil" {
                continue;
            }
            if !self.source.args_of(&callee_base).is_empty() {
                continue;
            }
            if !generics_compatible(&edge.type_param_map, caller_type_map) {
                continue;
            }
            if let Some(child_id) = self.build_node(Some(id), &callee_base, Some(node_id), edge.type_param_map.clone()) {
                self.arena[child_id].edge = Some(edge_id);
                self.arena[node_id].children.push(child_id);
                self.edge_to_node.insert(edge_id, child_id);
            }

            self.link_receiver(id, node_id, &edge);
        }
    }

    /// Follows an embedded-interface method call to the concrete implementation
    /// that actually satisfies it, attaching the concrete call as an extra child
    /// alongside the raw interface-typed callee.
    fn link_receiver(&mut self, id: &str, node_id: NodeId, edge: &CallGraphEdge) {
        if edge.callee_var_name.is_empty() || edge.callee.recv_type == Handle::ABSENT {
            return;
        }

        let interner = self.source.string_interner();
        let interface_type = interner.lookup(edge.callee.recv_type).to_string();
        let pkg = interner.lookup(edge.callee.pkg).to_string();
        let method_name = interner.lookup(edge.callee.name).to_string();

        let struct_type = self.arena[node_id]
            .root_assignment_map
            .get(&edge.callee_var_name)
            .and_then(|history| history.last())
            .map(|assignment| assignment.concrete_type.clone())
            .unwrap_or_else(|| receiver_from_base_id(id));
        if struct_type.is_empty() {
            return;
        }

        let concrete = self
            .resolver
            .resolve(&interface_type, &struct_type, &pkg, self.source.interface_resolutions());
        if concrete == interface_type {
            return;
        }

        let concrete_base = format!("{pkg}.{concrete}.{method_name}");
        if let Some(child_id) = self.build_node(Some(id), &concrete_base, Some(node_id), IndexMap::new()) {
            self.arena[node_id].children.push(child_id);

            // Attach the resolved call under whatever variable/assignment node
            // the receiver itself traces back to, alongside its tree parent.
            let key = ParamKey {
                name: edge.callee_var_name.clone(),
                pkg: pkg.clone(),
                container: id.to_string(),
            };
            self.variable_nodes.entry(key).or_default().push(child_id);
            self.attach_assignment_reference(&edge.callee_var_name, &pkg, id, child_id);
        }
    }

    fn grow_arguments(&mut self, id: &str, node_id: NodeId) {
        let edge_ids: Vec<EdgeId> = self.source.callers_of(id).to_vec();
        for edge_id in edge_ids {
            let edge = self.source.edge(edge_id).clone();
            let args: Vec<CallArgument> = edge.args.iter().take(self.limits.max_args_per_function).cloned().collect();
            for (index, arg) in args.into_iter().enumerate() {
                self.build_argument_node(id, node_id, &edge, edge_id, &arg, index as i64, 0);
            }
        }
    }

    fn build_argument_node(
        &mut self,
        caller_id: &str,
        parent_id: NodeId,
        edge: &CallGraphEdge,
        edge_id: EdgeId,
        arg: &CallArgument,
        index: i64,
        depth: usize,
    ) {
        if depth > self.limits.max_nested_args_depth {
            tracing::warn!(node_key = caller_id, limit = self.limits.max_nested_args_depth, "max_nested_args_depth reached");
            return;
        }
        if self.node_count >= self.limits.max_nodes_per_tree + BUDGET_SLACK {
            return;
        }

        let arg_id = arg.id();
        if arg.kind.is_none() || arg_id.is_empty() {
            return;
        }
        let caller_base = base_id(self.source.string_interner(), &edge.caller);
        let callee_base = base_id(self.source.string_interner(), &edge.callee);
        if arg_id == caller_base || arg_id == callee_base {
            return;
        }

        let arg_type = classify(arg);
        let key = format!("{caller_id}#arg{index}:{}", arg.id());
        let mut node = TrackerNode::leaf(key, Some(parent_id));
        node.edge = Some(edge_id);
        node.argument = Some(arg.clone());
        node.arg_type = Some(arg_type);
        node.is_argument = true;
        node.arg_index = index;
        node.arg_context = caller_id.to_string();
        node.type_param_map = edge.type_param_map.clone();

        let node_id = self.arena.alloc(node);
        self.node_count += 1;
        self.arena[parent_id].children.push(node_id);

        match arg_type {
            ArgumentType::FunctionCall => {
                if let Some(arg_edge_id) = arg.edge {
                    let callee_base = base_id(self.source.string_interner(), &self.source.edge(arg_edge_id).callee);
                    if let Some(child) = self.build_node(Some(caller_id), &callee_base, Some(node_id), edge.type_param_map.clone()) {
                        self.arena[node_id].children.push(child);
                    }
                }
            }
            ArgumentType::Variable => {
                let pkg = self.source.string_interner().lookup(edge.caller.pkg).to_string();
                let key = ParamKey {
                    name: arg.name.clone(),
                    pkg: pkg.clone(),
                    container: caller_id.to_string(),
                };
                self.variable_nodes.entry(key).or_default().push(node_id);
                self.attach_assignment_reference(&arg.name, &pkg, caller_id, node_id);
            }
            ArgumentType::Selector => {
                // Nested-selector container type is taken from `arg.x.x.type`, i.e. the
                // base of the base, not the selector's own (often absent) type.
                if let Some(container_type) = arg.x.as_ref().and_then(|x| x.x.as_ref()).map(|xx| xx.type_name.clone()) {
                    if !container_type.is_empty() {
                        if let Some(argument) = self.arena[node_id].argument.as_mut() {
                            argument.receiver_type = Some(container_type);
                        }
                    }
                }
                // Attach under the base variable's own assignment/variable indices,
                // keyed by its traced origin, unless the leaf is itself a function
                // type (then it's resolved like a function-call selector instead).
                if !arg.type_name.starts_with("func(") && !arg.type_name.starts_with("func[") {
                    if let Some(base) = arg.x.as_ref().filter(|x| x.is_ident()) {
                        let pkg = self.source.string_interner().lookup(edge.caller.pkg).to_string();
                        let key = ParamKey {
                            name: base.name.clone(),
                            pkg: pkg.clone(),
                            container: caller_id.to_string(),
                        };
                        self.variable_nodes.entry(key).or_default().push(node_id);
                        self.attach_assignment_reference(&base.name, &pkg, caller_id, node_id);
                    }
                }
                self.build_nested_args(caller_id, node_id, edge, edge_id, arg, depth);
            }
            ArgumentType::Unary => {
                if let Some(inner) = arg.x.clone() {
                    self.build_argument_node(caller_id, node_id, edge, edge_id, &inner, 0, depth + 1);
                }
            }
            _ => self.build_nested_args(caller_id, node_id, edge, edge_id, arg, depth),
        }
    }

    /// Finds the `AssignmentKey` describing `name`'s last binding inside
    /// `container` (package `pkg`), ignoring `concrete_type` (which the
    /// argument's own shape doesn't carry), and attaches `node_id` under it.
    /// A no-op if `name` was never assigned there — not every variable
    /// argument references a local assignment; some reference parameters.
    fn attach_assignment_reference(&mut self, name: &str, pkg: &str, container: &str, node_id: NodeId) {
        let key = self
            .source
            .assignment_relationships()
            .keys()
            .find(|k| k.name == name && k.pkg == pkg && k.container == container)
            .cloned();
        if let Some(key) = key {
            self.assignment_nodes.entry(key).or_default().push(node_id);
        }
    }

    fn build_nested_args(
        &mut self,
        caller_id: &str,
        node_id: NodeId,
        edge: &CallGraphEdge,
        edge_id: EdgeId,
        arg: &CallArgument,
        depth: usize,
    ) {
        let nested: Vec<CallArgument> = arg.args.iter().take(self.limits.max_args_per_function).cloned().collect();
        for (i, child_arg) in nested.into_iter().enumerate() {
            self.build_argument_node(caller_id, node_id, edge, edge_id, &child_arg, i as i64, depth + 1);
        }
    }

    /// A function with no calls of its own is otherwise unreachable from inside
    /// its own subtree; fall back to the enclosing function metadata recorded it
    /// as nested within, so it still shows up somewhere in the tree.
    fn grow_parent_fallback(&mut self, id: &str, node_id: NodeId, caller_type_map: &IndexMap<String, String>) {
        if !self.source.callers_of(id).is_empty() {
            return;
        }
        let edge_ids: Vec<EdgeId> = self
            .source
            .parent_functions_of(id)
            .iter()
            .copied()
            .take(self.limits.max_children_per_node)
            .collect();

        for edge_id in edge_ids {
            let edge = self.source.edge(edge_id).clone();
            let parent_base = base_id(self.source.string_interner(), &edge.caller);
            if parent_base.is_empty() || parent_base == id {
                continue;
            }
            if let Some(child_id) = self.build_node(Some(id), &parent_base, Some(node_id), caller_type_map.clone()) {
                self.arena[node_id].children.push(child_id);
            }
        }
    }

    /// Attaches the node built for a call site whose result was recorded as an
    /// assignment (per [`MetadataSource::assignment_relationships`]) into
    /// `assignment_nodes`, keyed by the assignment's resolved `AssignmentKey`.
    /// This is build phase 4.a: a child matching an assignment's resolved key
    /// becomes reachable through that key without being moved in the tree —
    /// the node keeps its one owning parent, the call site that produced it.
    fn link_assignment_nodes(&mut self) {
        let relationships: Vec<(AssignmentKey, EdgeId)> = self
            .source
            .assignment_relationships()
            .iter()
            .map(|(key, (edge_id, _))| (key.clone(), *edge_id))
            .collect();

        for (key, edge_id) in relationships {
            if let Some(node_id) = self.edge_to_node.get(&edge_id).copied() {
                self.assignment_nodes.entry(key).or_default().push(node_id);
            }
        }
    }

    /// Registers every node built for a call site that binds a parameter (per
    /// [`MetadataSource::variable_relationships`]) into `variable_nodes`, capping
    /// how many call sites are kept per distinct key.
    fn link_variable_nodes(&mut self) {
        let relationships: Vec<(ParamKey, EdgeId)> = self
            .source
            .variable_relationships()
            .iter()
            .map(|(key, (edge_id, _))| (key.clone(), *edge_id))
            .collect();

        for (key, edge_id) in relationships {
            if let Some(node_id) = self.edge_to_node.get(&edge_id).copied() {
                self.variable_nodes.entry(key).or_default().push(node_id);
            }
        }

        let cap = self.limits.max_self_calling_depth;
        for nodes in self.variable_nodes.values_mut() {
            if nodes.len() > cap {
                let excess = nodes.len() - cap;
                nodes.drain(0..excess);
            }
        }
    }

    /// Re-parents a chained call (`a().b().c()`) so that each link in the chain
    /// becomes a child of the previous one instead of a sibling under the
    /// statement's outer caller. The child must be detached from its prior
    /// parent's child list first, or it would appear twice in the tree.
    fn link_chain_parents(&mut self) {
        let chains: Vec<(EdgeId, EdgeId)> = self
            .source
            .call_graph()
            .iter()
            .enumerate()
            .filter_map(|(i, edge)| edge.chain_parent.map(|parent| (EdgeId(i), parent)))
            .collect();

        for (child_edge, parent_edge) in chains {
            let (Some(child_node), Some(parent_node)) =
                (self.edge_to_node.get(&child_edge).copied(), self.edge_to_node.get(&parent_edge).copied())
            else {
                continue;
            };
            if child_node == parent_node {
                continue;
            }
            if let Some(old_parent) = self.arena[child_node].parent {
                self.arena[old_parent].children.retain(|&c| c != child_node);
            }
            self.arena[child_node].parent = Some(parent_node);
            self.arena[parent_node].children.push(child_node);
        }
    }
}

/// A callee's generic bindings are compatible with the caller's context iff every
/// parameter they share agrees on the concrete type bound to it.
fn generics_compatible(callee_map: &IndexMap<String, String>, caller_map: &IndexMap<String, String>) -> bool {
    callee_map.iter().all(|(param, concrete)| match caller_map.get(param) {
        Some(existing) => existing == concrete,
        None => true,
    })
}

/// Recovers the receiver struct from a method `BaseID` (`pkg.Recv.Method`), used
/// when a call site's variable table has no entry for the receiver variable.
fn receiver_from_base_id(id: &str) -> String {
    let parts: Vec<&str> = id.split('.').collect();
    if parts.len() == 3 {
        parts[1].to_string()
    } else {
        String::new()
    }
}
