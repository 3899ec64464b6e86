//! C4 — traces an identifier back through the assignment chain of its containing
//! function to the value's origin: a function-call result, a parameter (followed
//! into the caller's context), or — failing both — the identifier itself.

use ahash::HashSet;

use crate::classify::{classify, ArgumentType};
use crate::ids::base_id;
use crate::model::{MetadataSource, Origin};

/// Trace `name` as it's used inside `caller_func` (in package `caller_pkg`) back to
/// its origin. Cycles and runaway depth are bounded by `max_self_calling_depth`;
/// past that, or once a cycle is detected, the best partial result found so far is
/// returned rather than looping forever.
pub fn trace_variable_origin<S: MetadataSource>(
    source: &S,
    name: &str,
    caller_func: &str,
    caller_pkg: &str,
    max_self_calling_depth: usize,
) -> Origin {
    let mut visited = HashSet::default();
    trace_inner(source, name, caller_func, caller_pkg, max_self_calling_depth, 0, &mut visited)
}

fn trace_inner<S: MetadataSource>(
    source: &S,
    name: &str,
    caller_func: &str,
    caller_pkg: &str,
    max_depth: usize,
    depth: usize,
    visited: &mut HashSet<(String, String)>,
) -> Origin {
    let give_up = || Origin {
        var: name.to_string(),
        pkg: caller_pkg.to_string(),
        arg: None,
        func: caller_func.to_string(),
    };

    if depth >= max_depth {
        tracing::warn!(name, caller_func, max_depth, "max_self_calling_depth reached while tracing origin");
        return give_up();
    }
    if !visited.insert((name.to_string(), caller_func.to_string())) {
        tracing::warn!(name, caller_func, "cycle detected while tracing variable origin");
        return give_up();
    }

    if let Some(assignments) = source
        .callers_of(caller_func)
        .iter()
        .find_map(|edge_id| source.edge(*edge_id).assignment_map.get(name))
    {
        if let Some(last) = assignments.last() {
            return match classify(&last.value) {
                ArgumentType::FunctionCall => Origin {
                    var: name.to_string(),
                    pkg: caller_pkg.to_string(),
                    arg: Some(last.value.clone()),
                    func: caller_func.to_string(),
                },
                ArgumentType::Variable => {
                    trace_inner(source, &last.value.name, caller_func, caller_pkg, max_depth, depth + 1, visited)
                }
                _ => give_up(),
            };
        }
    }

    // `name` wasn't assigned inside this function; maybe it's a parameter. Follow
    // a call site of `caller_func` and re-enter the trace using the actual
    // argument bound to that parameter there.
    if let Some(edge_id) = source.callees_of(caller_func).first() {
        let call_site = source.edge(*edge_id);
        if let Some(bound_arg) = call_site.param_arg_map.get(name) {
            let new_func = base_id(source.string_interner(), &call_site.caller);
            let new_pkg = source.string_interner().lookup(call_site.caller.pkg).to_string();
            return match classify(bound_arg) {
                ArgumentType::FunctionCall => Origin {
                    var: name.to_string(),
                    pkg: new_pkg,
                    arg: Some(bound_arg.clone()),
                    func: new_func,
                },
                ArgumentType::Variable => {
                    let bound_name = bound_arg.name.clone();
                    trace_inner(source, &bound_name, &new_func, &new_pkg, max_depth, depth + 1, visited)
                }
                _ => Origin {
                    var: name.to_string(),
                    pkg: new_pkg,
                    arg: None,
                    func: new_func,
                },
            };
        }
    }

    give_up()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::StringInterner;
    use crate::index::MetadataIndex;
    use crate::model::{ArgumentKind, Call, CallArgument, CallGraphEdge, Metadata};
    use indexmap::IndexMap;

    fn ident(name: &str) -> CallArgument {
        CallArgument {
            kind: Some(ArgumentKind::Ident),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn call_arg() -> CallArgument {
        CallArgument {
            kind: Some(ArgumentKind::Call),
            name: "Sprintf".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn traces_to_function_call_result() {
        let mut interner = StringInterner::new();
        let main_pkg = interner.intern("main");
        let main_name = interner.intern("main");
        let fmt_pkg = interner.intern("fmt");
        let sprintf = interner.intern("Sprintf");

        let mut assignment_map = IndexMap::new();
        assignment_map.insert(
            "z".to_string(),
            vec![crate::model::Assignment {
                variable_name: "z".to_string(),
                container: "main.main".to_string(),
                pkg: "main".to_string(),
                concrete_type: "string".to_string(),
                lhs: ident("z"),
                value: call_arg(),
                callee_func: "Sprintf".to_string(),
                callee_pkg: "fmt".to_string(),
            }],
        );

        let edge = CallGraphEdge {
            caller: Call {
                pkg: main_pkg,
                name: main_name,
                ..Default::default()
            },
            callee: Call {
                pkg: fmt_pkg,
                name: sprintf,
                ..Default::default()
            },
            assignment_map,
            ..Default::default()
        };

        let metadata = Metadata {
            string_interner: interner,
            call_graph: vec![edge],
            ..Default::default()
        };
        let index = MetadataIndex::build(metadata);

        let origin = trace_variable_origin(&index, "z", "main.main", "main", 8);
        assert_eq!(origin.var, "z");
        assert!(origin.arg.is_some());
    }

    #[test]
    fn unassigned_name_returns_itself() {
        let metadata = Metadata::default();
        let index = MetadataIndex::build(metadata);
        let origin = trace_variable_origin(&index, "ghost", "main.main", "main", 8);
        assert_eq!(origin.var, "ghost");
        assert!(origin.arg.is_none());
    }
}
