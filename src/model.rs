//! The data model the tracker operates over: packages, functions, call edges,
//! assignments and the argument shapes that appear inside them.
//!
//! Everything here is assumed to already be populated by an ingest layer (the
//! `MetadataSource` trait is the seam); this crate never parses source code.

use indexmap::IndexMap;

use crate::handle::{Handle, StringInterner};

/// A stable handle into [`Metadata::call_graph`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// One endpoint of a call edge (either the caller or the callee side).
///
/// All fields are interned handles — see [`crate::ids`] for how `BaseID`/`GenericID`/`ID`
/// are derived from a `Call`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Call {
    pub name: Handle,
    pub pkg: Handle,
    pub recv_type: Handle,
    pub position: Handle,
    pub signature_str: Handle,
    pub scope: Handle,
}

impl Default for Call {
    fn default() -> Self {
        Self {
            name: Handle::ABSENT,
            pkg: Handle::ABSENT,
            recv_type: Handle::ABSENT,
            position: Handle::ABSENT,
            signature_str: Handle::ABSENT,
            scope: Handle::ABSENT,
        }
    }
}

/// The syntactic shape of a [`CallArgument`], as it appeared at the call site.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Call,
    Ident,
    Literal,
    Selector,
    Unary,
    Binary,
    Index,
    CompositeLit,
    TypeAssert,
    FuncLit,
    MapType,
    ArrayType,
    InterfaceType,
    Other,
}

/// A tagged tree describing the shape of one argument (or sub-argument) at a call site.
///
/// `name`/`type_name` carry the argument's own spelling (an identifier, a selector's
/// field name, a type string); they are plain strings rather than interned handles
/// because they describe shape, not call-site identity.
#[derive(Debug, Clone, Default)]
pub struct CallArgument {
    pub kind: Option<ArgumentKind>,
    pub name: String,
    pub type_name: String,
    /// The base expression, e.g. `x` in `x.f` or `x[i]`.
    pub x: Option<Box<CallArgument>>,
    /// The selector target, e.g. `f` in `x.f`.
    pub sel: Option<Box<CallArgument>>,
    /// The function being called, for `Call` arguments.
    pub func: Option<Box<CallArgument>>,
    /// Sub-arguments, e.g. the arguments of a nested call.
    pub args: Vec<CallArgument>,
    /// The resolved callee edge, if this argument is itself a call.
    pub edge: Option<EdgeId>,
    /// The receiver type of the value this argument evaluates to, used for chain linking.
    pub receiver_type: Option<String>,
    pub type_param_map: IndexMap<String, String>,
}

impl CallArgument {
    /// A deterministic fingerprint for this argument, built from its shape rather
    /// than its memory address.
    pub fn id(&self) -> String {
        let kind = self
            .kind
            .map(|k| format!("{k:?}"))
            .unwrap_or_else(|| "None".to_string());
        let mut out = format!("{kind}:{}", self.name);
        if let Some(x) = &self.x {
            out.push('<');
            out.push_str(&x.id());
            out.push('>');
        }
        if let Some(sel) = &self.sel {
            out.push('.');
            out.push_str(&sel.id());
        }
        if let Some(func) = &self.func {
            out.push('(');
            out.push_str(&func.id());
            out.push(')');
        }
        if !self.args.is_empty() {
            out.push('[');
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&a.id());
            }
            out.push(']');
        }
        out
    }

    /// `true` if this argument is a plain identifier naming `name`.
    pub fn is_ident(&self) -> bool {
        matches!(self.kind, Some(ArgumentKind::Ident))
    }
}

/// One binding of a variable to a value, in program order.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub variable_name: String,
    /// The function or type that lexically contains this assignment.
    pub container: String,
    pub pkg: String,
    pub concrete_type: String,
    pub lhs: CallArgument,
    pub value: CallArgument,
    pub callee_func: String,
    pub callee_pkg: String,
}

/// One edge of the call graph: a call site linking a caller to a callee.
#[derive(Debug, Clone, Default)]
pub struct CallGraphEdge {
    pub caller: Call,
    pub callee: Call,
    pub args: Vec<CallArgument>,
    pub param_arg_map: IndexMap<String, CallArgument>,
    pub assignment_map: IndexMap<String, Vec<Assignment>>,
    pub type_param_map: IndexMap<String, String>,
    pub callee_recv_var_name: String,
    pub callee_var_name: String,
    pub chain_parent: Option<EdgeId>,
    pub parent_function: Option<Call>,
    pub position: String,
}

#[derive(Debug, Clone, Default)]
pub struct Function {
    pub name: String,
    pub recv_type: Option<String>,
    pub position: String,
}

#[derive(Debug, Clone, Default)]
pub struct TypeDef {
    pub name: String,
    pub kind: String,
    /// Interfaces/structs embedded by this type, in declaration order.
    pub embeds: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Variable {
    pub name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub path: String,
    pub functions: IndexMap<String, Function>,
    pub types: IndexMap<String, TypeDef>,
    pub variables: IndexMap<String, Variable>,
}

#[derive(Debug, Clone, Default)]
pub struct Package {
    pub path: String,
    pub files: IndexMap<String, SourceFile>,
}

/// A resolved `(interface, embedding-struct, package)` → concrete-type registration,
/// supplied up front by the ingest layer (see [`crate::interfaces::InterfaceResolver::register`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceKey {
    pub interface_type: String,
    pub struct_type: String,
    pub pkg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamKey {
    pub name: String,
    pub pkg: String,
    pub container: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssignmentKey {
    pub name: String,
    pub pkg: String,
    pub type_name: String,
    pub container: String,
}

/// The whole pre-parsed program, as handed over by the ingest layer.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub string_interner: StringInterner,
    pub packages: IndexMap<String, Package>,
    pub call_graph: Vec<CallGraphEdge>,
    /// Interface resolutions the ingest layer already knows about (e.g. from
    /// static analysis of embedding structs), seeded into [`crate::interfaces::InterfaceResolver`].
    pub interface_resolutions: IndexMap<InterfaceKey, String>,
}

impl std::ops::Index<EdgeId> for Metadata {
    type Output = CallGraphEdge;

    fn index(&self, id: EdgeId) -> &Self::Output {
        &self.call_graph[id.0]
    }
}

/// The origin of a traced variable: where its value ultimately came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub var: String,
    pub pkg: String,
    pub arg: Option<CallArgument>,
    pub func: String,
}

/// The contract the metadata ingest layer must fulfil for the tracker to build a tree.
///
/// Implementations are expected to have already built the inverted indices described
/// by their respective methods — see [`crate::index::MetadataIndex`] for the reference
/// implementation used by this crate's own [`crate::tree::TrackerTree::new`].
pub trait MetadataSource {
    fn packages(&self) -> &IndexMap<String, Package>;
    fn call_graph(&self) -> &[CallGraphEdge];
    fn string_interner(&self) -> &StringInterner;
    fn callers_of(&self, base_id: &str) -> &[EdgeId];
    fn callees_of(&self, base_id: &str) -> &[EdgeId];
    fn args_of(&self, base_id: &str) -> &[EdgeId];
    fn parent_functions_of(&self, qualified_id: &str) -> &[EdgeId];
    fn assignment_relationships(&self) -> &IndexMap<AssignmentKey, (EdgeId, Assignment)>;
    fn variable_relationships(&self) -> &IndexMap<ParamKey, (EdgeId, CallArgument)>;
    fn interface_resolutions(&self) -> &IndexMap<InterfaceKey, String>;
    fn call_graph_roots(&self) -> &[EdgeId];
    fn edge(&self, id: EdgeId) -> &CallGraphEdge;

    /// Trace `name`, as used inside `func` (package `pkg`), back to its origin.
    ///
    /// A default forwarding to [`crate::trace::trace_variable_origin`] with a
    /// conservative fixed depth; callers that already have a [`crate::limits::Limits`]
    /// in hand should prefer calling that function directly with
    /// `limits.max_self_calling_depth` instead of this convenience default.
    fn trace_variable_origin(&self, name: &str, func: &str, pkg: &str) -> Origin
    where
        Self: Sized,
    {
        crate::trace::trace_variable_origin(self, name, func, pkg, 8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_id_is_deterministic() {
        let arg = CallArgument {
            kind: Some(ArgumentKind::Ident),
            name: "x".to_string(),
            ..Default::default()
        };
        assert_eq!(arg.id(), arg.clone().id());
    }

    #[test]
    fn nested_argument_id_includes_children() {
        let inner = CallArgument {
            kind: Some(ArgumentKind::Ident),
            name: "y".to_string(),
            ..Default::default()
        };
        let outer = CallArgument {
            kind: Some(ArgumentKind::Selector),
            name: "f".to_string(),
            x: Some(Box::new(inner)),
            ..Default::default()
        };
        assert!(outer.id().contains("y"));
    }
}
