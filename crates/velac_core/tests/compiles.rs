//! Fixture-driven checks that whole programs type-check (or fail to, for the
//! specific reason expected) end to end through the middle end.

use test_utils::{assert_checks, assert_fails, fixture_path};
use velac_core::diagnostics::SemanticError;

#[test]
fn hello_world_type_checks() {
    assert_checks(&fixture_path("hello.vl"));
}

#[test]
fn calling_a_function_across_statements_type_checks() {
    let program = assert_checks(&fixture_path("add.vl"));
    assert!(program.warnings.is_empty());
}

#[test]
fn struct_literal_field_access_type_checks() {
    assert_checks(&fixture_path("struct_literal.vl"));
}

#[test]
fn while_loop_with_compound_assignment_type_checks() {
    assert_checks(&fixture_path("loop_sum.vl"));
}

#[test]
fn reassigning_a_const_variable_is_rejected() {
    let errors = assert_fails(&fixture_path("const_reassign.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::ReassignConstVariable(_)]));
}

#[test]
fn printf_placeholder_count_must_match_argument_count() {
    let errors = assert_fails(&fixture_path("printf_arg_mismatch.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::PrintfArgCountError(_)]));
}

#[test]
fn referencing_an_undeclared_variable_is_rejected() {
    let errors = assert_fails(&fixture_path("undefined_variable.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::ReferencedUndefinedVariable(_)]));
}

#[test]
fn an_import_cycle_is_rejected() {
    let errors = assert_fails(&fixture_path("cycle_a.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::CircularDependency(_)]));
}

#[test]
fn calling_a_generic_function_substantiates_it_per_call_site() {
    assert_checks(&fixture_path("generic_function.vl"));
}

#[test]
fn generic_struct_literal_substantiates_field_types() {
    assert_checks(&fixture_path("generic_struct.vl"));
}

#[test]
fn struct_implementing_all_interface_methods_type_checks() {
    assert_checks(&fixture_path("interface_impl_ok.vl"));
}

#[test]
fn struct_missing_an_interface_method_is_rejected() {
    let errors = assert_fails(&fixture_path("interface_impl_fail.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::InterfaceMethodNotImplemented(_)]));
}

#[test]
fn enum_declaration_and_variable_of_enum_type_checks() {
    assert_checks(&fixture_path("enum_decl.vl"));
}

#[test]
fn pointer_cast_inside_unsafe_block_type_checks() {
    assert_checks(&fixture_path("unsafe_cast_ok.vl"));
}

#[test]
fn pointer_cast_outside_unsafe_block_is_rejected() {
    let errors = assert_fails(&fixture_path("unsafe_cast_fail.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::UnsafeOperationInSafeContext(_)]));
}

#[test]
fn returning_the_wrong_type_is_rejected() {
    let errors = assert_fails(&fixture_path("return_type_mismatch.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::OperatorWrongDataType(_)]));
}

#[test]
fn printf_argument_type_must_match_its_placeholder() {
    let errors = assert_fails(&fixture_path("printf_type_mismatch.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::PrintfTypeError(_)]));
}

#[test]
fn a_public_global_is_visible_to_an_importing_file() {
    assert_checks(&fixture_path("import_global_main.vl"));
}

#[test]
fn a_private_global_is_not_visible_to_an_importing_file() {
    let errors = assert_fails(&fixture_path("import_private_main.vl"));
    assert!(matches!(errors.as_slice(), [SemanticError::ReferencedUndefinedVariable(_)]));
}
