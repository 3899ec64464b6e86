//! C3 — classifies call arguments by their syntactic shape. A pure, total function:
//! every [`CallArgument`] maps to exactly one [`ArgumentType`], with no failure path.

use crate::model::{ArgumentKind, CallArgument};

/// The classification assigned to a call argument from its syntactic shape.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    FunctionCall,
    Variable,
    Literal,
    Selector,
    Unary,
    Binary,
    Index,
    Composite,
    TypeAssert,
    Complex,
}

/// Classify `arg` by its shape. Idents whose resolved type spells out a function
/// type (`func(...)` or a generic `func[...]`) are treated as function calls rather
/// than plain variables, since invoking them has the same shape as a direct call.
pub fn classify(arg: &CallArgument) -> ArgumentType {
    use ArgumentKind::*;
    match arg.kind {
        Some(Call) | Some(FuncLit) => ArgumentType::FunctionCall,
        Some(Ident) => {
            if arg.type_name.starts_with("func(") || arg.type_name.starts_with("func[") {
                ArgumentType::FunctionCall
            } else {
                ArgumentType::Variable
            }
        }
        Some(Literal) => ArgumentType::Literal,
        Some(Selector) => ArgumentType::Selector,
        Some(Unary) => ArgumentType::Unary,
        Some(Binary) => ArgumentType::Binary,
        Some(Index) => ArgumentType::Index,
        Some(CompositeLit) => ArgumentType::Composite,
        Some(TypeAssert) => ArgumentType::TypeAssert,
        Some(MapType) | Some(ArrayType) | Some(InterfaceType) | Some(Other) | None => {
            ArgumentType::Complex
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CallArgument;

    fn arg(kind: ArgumentKind, type_name: &str) -> CallArgument {
        CallArgument {
            kind: Some(kind),
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn call_and_func_lit_are_function_calls() {
        assert_eq!(classify(&arg(ArgumentKind::Call, "")), ArgumentType::FunctionCall);
        assert_eq!(classify(&arg(ArgumentKind::FuncLit, "")), ArgumentType::FunctionCall);
    }

    #[test]
    fn ident_with_function_type_is_function_call() {
        assert_eq!(
            classify(&arg(ArgumentKind::Ident, "func(int) string")),
            ArgumentType::FunctionCall
        );
    }

    #[test]
    fn plain_ident_is_variable() {
        assert_eq!(classify(&arg(ArgumentKind::Ident, "int")), ArgumentType::Variable);
    }

    #[test]
    fn every_concretely_handled_kind_avoids_complex() {
        let handled = [
            ArgumentKind::Call,
            ArgumentKind::Ident,
            ArgumentKind::Literal,
            ArgumentKind::Selector,
            ArgumentKind::Unary,
            ArgumentKind::Binary,
            ArgumentKind::Index,
            ArgumentKind::CompositeLit,
            ArgumentKind::TypeAssert,
            ArgumentKind::FuncLit,
        ];
        for kind in handled {
            assert_ne!(classify(&arg(kind, "int")), ArgumentType::Complex);
        }
    }

    #[test]
    fn unknown_shapes_fall_back_to_complex() {
        assert_eq!(classify(&arg(ArgumentKind::MapType, "")), ArgumentType::Complex);
        assert_eq!(classify(&CallArgument::default()), ArgumentType::Complex);
    }
}
