//! The semantic validator (`spec.md` §4.5), the largest single component:
//! three passes over the parsed `Program` — structural indexing, parameter
//! and return-type resolution, then body/statement/call checking. Each
//! check failure stops the pass and reports one error (`spec.md` §5
//! "Fail-fast on the first error"); there is no accumulation or recovery.

mod pass_a;
mod pass_b;
mod pass_c;
mod types;

use thiserror::Error as ThisError;

use crate::common::Position;

#[derive(Debug, Clone, PartialEq, ThisError)]
pub enum Error {
    #[error("{1}: duplicate definition path '{0}'")]
    DuplicateFullPath(String, Position),

    #[error("{1}: struct-like definition '{0}' cannot declare a return type")]
    StructLikeCannotHaveReturn(String, Position),

    #[error("{1}: struct-like definition '{0}' cannot declare parameters")]
    StructLikeCannotHaveParameters(String, Position),

    #[error("{1}: struct-like definition '{0}' cannot declare a return statement")]
    StructLikeCannotHaveReturnStatement(String, Position),

    #[error("{1}: '{0}' is not a valid effect/capability name (expected lower_snake_case)")]
    InvalidEffectName(String, Position),

    #[error("{1}: capability '{0}' is not in the active effect set")]
    CapabilityNotInEffects(String, Position),

    #[error("{1}: '{0}' takes exactly one integer literal argument")]
    InvalidAlignArgument(String, Position),

    #[error("{1}: return type of '{0}' cannot be inferred; explicit annotation required")]
    ReturnTypeCycle(String, Position),

    #[error("{1}: parameter '{0}' must declare exactly one type")]
    ParameterMissingType(String, Position),

    #[error("{0}: a parameter default value must be a literal or pure expression")]
    ParameterDefaultNotPure(Position),

    #[error("{1}: duplicate parameter name '{0}'")]
    DuplicateParameterName(String, Position),

    #[error("{1}: binding '{0}' shadows a parameter")]
    BindingShadowsParameter(String, Position),

    #[error("{1}: duplicate binding name '{0}'")]
    DuplicateBindingName(String, Position),

    #[error("{1}: use of unbound name '{0}'")]
    UnboundName(String, Position),

    #[error("{0}: a Reference<T> binding's initializer must be location(x)")]
    ReferenceInitializerMustBeLocation(Position),

    #[error("{1}: Pointer<T> target type '{0}' must be a primitive")]
    PointerTargetNotPrimitive(String, Position),

    #[error("{0}: return value not allowed for void definition")]
    ReturnValueInVoidDefinition(Position),

    #[error("{0}: return argument does not match the definition's declared return kind")]
    ReturnArityMismatch(Position),

    #[error("{1}: not every control path of '{0}' returns")]
    MissingReturnOnAllPaths(String, Position),

    #[error("{1}: '{0}' is a control call and cannot appear in expression position")]
    ControlCallInExpressionContext(String, Position),

    #[error("{1}: invalid operand kinds for '{0}'")]
    InvalidOperandKinds(String, Position),

    #[error("{0}: negate does not accept an unsigned operand")]
    NegateUnsigned(Position),

    #[error("{0}: pointer arithmetic requires the pointer on the left with an integer offset")]
    PointerArithmeticShape(Position),

    #[error("{0}: assign requires a mutable binding or a dereference of a mutable pointer/reference as its target")]
    AssignTargetInvalid(Position),

    #[error("{1}: convert<{0}> requires a recognized primitive target type")]
    ConvertUnknownTarget(String, Position),

    #[error("{1}: collection literal arity mismatch for '{0}'")]
    CollectionArityMismatch(String, Position),

    #[error("{1}: '{0}' must be dispatched on an array/vector/map/string target with an integer index")]
    DispatchTargetInvalid(String, Position),

    #[error("{1}: '{0}' requires the corresponding io_out/io_err effect in the active set")]
    PrintMissingEffect(String, Position),

    #[error("{0}: print target is not printable")]
    PrintTargetNotPrintable(Position),

    #[error("{1}: unknown named argument '{0}'")]
    UnknownNamedArgument(String, Position),

    #[error("{1}: duplicate named argument '{0}'")]
    DuplicateNamedArgument(String, Position),

    #[error("{0}: a positional argument cannot follow a named argument")]
    PositionalAfterNamed(Position),

    #[error("{1}: builtin '{0}' does not accept named arguments")]
    BuiltinRejectsNamedArguments(String, Position),

    #[error("{0}: the entry definition's only parameter must be array<string> with no default")]
    EntryParameterInvalid(Position),

    #[error("{1}: call to undefined definition '{0}'")]
    UnknownCallTarget(String, Position),
}

impl Error {
    pub fn position(&self) -> Position {
        use Error::*;
        match self {
            DuplicateFullPath(_, p)
            | StructLikeCannotHaveReturn(_, p)
            | StructLikeCannotHaveParameters(_, p)
            | StructLikeCannotHaveReturnStatement(_, p)
            | InvalidEffectName(_, p)
            | CapabilityNotInEffects(_, p)
            | InvalidAlignArgument(_, p)
            | ReturnTypeCycle(_, p)
            | ParameterMissingType(_, p)
            | ParameterDefaultNotPure(p)
            | DuplicateParameterName(_, p)
            | BindingShadowsParameter(_, p)
            | DuplicateBindingName(_, p)
            | UnboundName(_, p)
            | ReferenceInitializerMustBeLocation(p)
            | PointerTargetNotPrimitive(_, p)
            | ReturnValueInVoidDefinition(p)
            | ReturnArityMismatch(p)
            | MissingReturnOnAllPaths(_, p)
            | ControlCallInExpressionContext(_, p)
            | InvalidOperandKinds(_, p)
            | NegateUnsigned(p)
            | PointerArithmeticShape(p)
            | AssignTargetInvalid(p)
            | ConvertUnknownTarget(_, p)
            | CollectionArityMismatch(_, p)
            | DispatchTargetInvalid(_, p)
            | PrintMissingEffect(_, p)
            | PrintTargetNotPrintable(p)
            | UnknownNamedArgument(_, p)
            | DuplicateNamedArgument(_, p)
            | PositionalAfterNamed(p)
            | BuiltinRejectsNamedArguments(_, p)
            | EntryParameterInvalid(p)
            | UnknownCallTarget(_, p) => *p,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ValidationOptions {
    /// Normalized entry path, e.g. `/main` (`spec.md` §6 `--entry`).
    pub entry_path: String,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            entry_path: "/main".to_string(),
        }
    }
}

/// Runs all three passes over `program`, stopping at the first failure.
pub fn validate(program: &crate::ast::Program, options: &ValidationOptions) -> Result<(), Error> {
    pass_a::run(program)?;
    let return_types = pass_b::resolve(program)?;
    pass_c::run(program, &return_types, options)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexing::lex_all;
    use crate::parsing::parse;

    fn validate_source(source: &str) -> Result<(), Error> {
        let tokens = lex_all(source).expect("lex");
        let program = parse(tokens).expect("parse");
        validate(&program, &ValidationOptions::default())
    }

    #[test]
    fn accepts_a_minimal_valid_program() {
        assert!(validate_source("[return<int>]\nmain() { return(1i32) }\n").is_ok());
    }

    #[test]
    fn rejects_duplicate_full_paths() {
        let err = validate_source("widget() { }\nwidget() { }\n").unwrap_err();
        assert!(matches!(err, Error::DuplicateFullPath(_, _)));
    }

    #[test]
    fn detects_forward_referenced_binding_initializer() {
        let source = "[return<int>]\nmain() { [Reference<i32>] r{location(x)} [i32] x{1i32} return(dereference(r)) }\n";
        let err = validate_source(source).unwrap_err();
        assert!(matches!(err, Error::UnboundName(_, _)));
    }
}
