//! Derives the three progressively more specific identifiers used throughout the
//! tracker: `BaseID` identifies a function/method definition, `GenericID` a specific
//! instantiation of it, and `ID` a single call site.

use indexmap::IndexMap;

use crate::handle::{Handle, StringInterner};
use crate::model::Call;

/// `pkg.(recv_type.)?name`, with no generics and no position — identifies the
/// function or method *definition* a call resolves to.
pub fn base_id(interner: &StringInterner, call: &Call) -> String {
    let pkg = interner.lookup(call.pkg);
    let name = interner.lookup(call.name);
    if call.recv_type != Handle::ABSENT {
        format!("{pkg}.{}.{name}", interner.lookup(call.recv_type))
    } else {
        format!("{pkg}.{name}")
    }
}

/// `BaseID` extended with an ordered `[T1=V1,...]` suffix describing the generic
/// parameters bound at this instantiation. Parameters are emitted in the order
/// they appear in `type_param_map`, which callers are responsible for populating
/// in parameter-declaration order (an `IndexMap` preserves insertion order).
pub fn generic_id(base: &str, type_param_map: &IndexMap<String, String>) -> String {
    if type_param_map.is_empty() {
        return base.to_string();
    }
    let bindings = type_param_map
        .iter()
        .map(|(param, concrete)| format!("{param}={concrete}"))
        .collect::<Vec<_>>()
        .join(",");
    format!("{base}[{bindings}]")
}

/// `GenericID` extended with the call site's position, when known. Identifies a
/// single, unique call site.
pub fn call_id(generic_id: &str, position: &str) -> String {
    if position.is_empty() {
        generic_id.to_string()
    } else {
        format!("{generic_id}@{position}")
    }
}

/// Convenience: `ID` computed directly from a `Call` and its instantiation.
pub fn full_id(interner: &StringInterner, call: &Call, type_param_map: &IndexMap<String, String>) -> String {
    let base = base_id(interner, call);
    let generic = generic_id(&base, type_param_map);
    call_id(&generic, interner.lookup(call.position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Call;

    #[test]
    fn base_id_without_receiver() {
        let mut interner = StringInterner::new();
        let pkg = interner.intern("fmt");
        let name = interner.intern("Sprintf");
        let call = Call {
            pkg,
            name,
            ..Default::default()
        };
        assert_eq!(base_id(&interner, &call), "fmt.Sprintf");
    }

    #[test]
    fn base_id_with_receiver() {
        let mut interner = StringInterner::new();
        let pkg = interner.intern("mypkg");
        let name = interner.intern("Get");
        let recv = interner.intern("Container");
        let call = Call {
            pkg,
            name,
            recv_type: recv,
            ..Default::default()
        };
        assert_eq!(base_id(&interner, &call), "mypkg.Container.Get");
    }

    #[test]
    fn generic_id_orders_by_insertion() {
        let mut map = IndexMap::new();
        map.insert("T".to_string(), "int".to_string());
        map.insert("U".to_string(), "string".to_string());
        assert_eq!(generic_id("pkg.Process", &map), "pkg.Process[T=int,U=string]");
    }

    #[test]
    fn two_instantiations_have_distinct_generic_ids() {
        let base = "pkg.NewContainer";
        let mut int_map = IndexMap::new();
        int_map.insert("T".to_string(), "int".to_string());
        let mut str_map = IndexMap::new();
        str_map.insert("T".to_string(), "string".to_string());
        assert_ne!(generic_id(base, &int_map), generic_id(base, &str_map));
    }
}
