//! Black-box end-to-end scenarios against the public `routec::compile`
//! entry point (`spec.md` §8 "End-to-end scenarios" and "Boundary
//! behaviors").

use routec::{textfilter::TextFilterOptions, CompileOptions};

fn default_filter_options() -> TextFilterOptions {
    TextFilterOptions {
        default_filters: routec::default_text_filters(),
        rules: Vec::new(),
    }
}

#[test]
fn scenario_1_minimal_accepted_program_has_one_return_of_kind_i32() {
    let program = routec::compile("[return<int>]\nmain() { return(1i32) }\n", &CompileOptions::default())
        .expect("accepted");
    let main = program.find_definition("/main").expect("/main exists");
    let returns: Vec<_> = main
        .statements
        .iter()
        .filter(|e| matches!(e, routec::ast::Expr::Call(c) if c.name == "return"))
        .collect();
    assert_eq!(returns.len(), 1);
    match returns[0] {
        routec::ast::Expr::Call(c) => match &c.args[0] {
            routec::ast::Expr::Literal { width, unsigned, .. } => {
                assert_eq!(*width, routec::ast::Width::W32);
                assert!(!unsigned);
            }
            other => panic!("expected an integer literal, got {:?}", other),
        },
        _ => unreachable!(),
    }
}

#[test]
fn scenario_2_operators_filter_rewrites_then_semantics_rejects_unbound_names() {
    let filtered = routec::textfilter::apply("main(){ return(a+b) }\n", &default_filter_options()).unwrap();
    assert!(filtered.contains("plus(a, b)"));

    let err = routec::compile("main(){ return(a+b) }\n", &CompileOptions::default()).unwrap_err();
    assert_eq!(err.category(), "semantic");
}

#[test]
fn scenario_3_collections_filter_flattens_map_literal_pairs() {
    let source = "map<i32, i32>[1i32=2i32, 3i32=4i32]";
    let filtered = routec::textfilter::apply(source, &default_filter_options()).unwrap();
    assert!(filtered.contains("map<i32, i32>(1i32, 2i32, 3i32, 4i32)"));
}

#[test]
fn scenario_4_duplicate_full_paths_rejected() {
    let err = routec::compile("widget() { }\nwidget() { }\n", &CompileOptions::default()).unwrap_err();
    assert!(err.to_string().contains("duplicate definition"));
}

#[test]
fn scenario_5_return_value_in_void_definition_rejected() {
    let err = routec::compile("[return<void>]\nmain() { return(1i32) }\n", &CompileOptions::default()).unwrap_err();
    assert!(err.to_string().contains("return value not allowed for void definition"));
}

#[test]
fn scenario_6_forward_referenced_binding_initializer_rejected() {
    let source = "[return<int>]\nmain() { [Reference<i32>] r{location(x)} [i32] x{1i32} return(dereference(r)) }\n";
    let err = routec::compile(source, &CompileOptions::default()).unwrap_err();
    assert_eq!(err.category(), "semantic");
}

#[test]
fn boundary_integer_literal_range() {
    let accepts = |literal: &str| {
        let source = format!("[return<int>]\nmain() {{ return({}) }}\n", literal);
        routec::compile(&source, &CompileOptions::default()).is_ok()
    };
    assert!(accepts("-2147483648i32"));
    assert!(!accepts("2147483648i32"));
    assert!(accepts("-0x80000000i32"));
    assert!(!accepts("0x80000000i32"));
}

#[test]
fn boundary_ascii_string_suffix_rejects_non_ascii_content() {
    let err = routec::compile("main() { print_line(\"h\\u00e9llo\"ascii) }\n", &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, routec::RoutecError::Lexical(_)));
}

#[test]
fn boundary_string_missing_suffix_rejected() {
    let err = routec::compile("main() { print_line(\"hi\") }\n", &CompileOptions::default()).unwrap_err();
    assert!(matches!(err, routec::RoutecError::Lexical(_)));
}

#[test]
fn boundary_if_with_only_a_then_is_rejected() {
    let source = "[return<int>]\nmain() { if(true, then{ return(1i32) }) }\n";
    assert!(routec::compile(source, &CompileOptions::default()).is_err());
}

#[test]
fn boundary_return_with_argument_in_void_definition_rejected() {
    let err = routec::compile("[return<void>]\nmain() { return(1i32) }\n", &CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        routec::RoutecError::Semantic(routec::semantics::Error::ReturnValueInVoidDefinition(_))
    ));
}

#[test]
fn boundary_empty_return_in_value_returning_definition_rejected() {
    let err = routec::compile("[return<int>]\nmain() { return() }\n", &CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        routec::RoutecError::Semantic(routec::semantics::Error::ReturnArityMismatch(_))
    ));
}

#[test]
fn boundary_mutual_recursion_without_explicit_return_type_is_rejected_as_a_cycle() {
    let source = "a() { return(b()) }\nb() { return(a()) }\n";
    let err = routec::compile(source, &CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        routec::RoutecError::Semantic(routec::semantics::Error::ReturnTypeCycle(_, _))
    ));
}

#[test]
fn a_well_formed_program_with_print_and_effects_is_accepted() {
    let source = "[return<void>, effects(io_out)]\nmain() { print_line(\"hi\"utf8) }\n";
    assert!(routec::compile(source, &CompileOptions::default()).is_ok());
}

#[test]
fn print_without_the_required_effect_is_rejected() {
    let source = "[return<void>]\nmain() { print_line(\"hi\"utf8) }\n";
    let err = routec::compile(source, &CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        routec::RoutecError::Semantic(routec::semantics::Error::PrintMissingEffect(_, _))
    ));
}

#[test]
fn clamp_lerp_min_max_are_recognized_as_numeric_builtins() {
    let source = "[return<i32>]\nmain() { return(clamp(5i32, 0i32, 10i32)) }\n";
    assert!(routec::compile(source, &CompileOptions::default()).is_ok());

    let source = "[return<f64>]\nmain() { return(lerp(0.0f64, 1.0f64, 0.5f64)) }\n";
    assert!(routec::compile(source, &CompileOptions::default()).is_ok());

    let source = "[return<i32>]\nmain() { return(max(1i32, 2i32, 3i32)) }\n";
    assert!(routec::compile(source, &CompileOptions::default()).is_ok());
}

#[test]
fn clamp_rejects_mixed_signed_and_unsigned_operands() {
    let source = "[return<i32>]\nmain() { return(clamp(5i32, 0u64, 10i32)) }\n";
    let err = routec::compile(source, &CompileOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        routec::RoutecError::Semantic(routec::semantics::Error::InvalidOperandKinds(_, _))
    ));
}
