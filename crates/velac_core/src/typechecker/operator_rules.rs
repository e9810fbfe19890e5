//! Static operator rule tables (component C2).
//!
//! Each operator has a fixed table of `(lhs_kind, rhs_kind) -> result_kind`
//! tuples; typing a binary expression is a lookup into the table for its
//! operator, falling back to an operator-overload method (`op.plus`, `op.eq`, ...)
//! on the left-hand struct type when no tuple matches. The tables below are a
//! direct transcription of `original_source/src/analyzer/OpRuleManager.h`.

use crate::diagnostics::{CodeLoc, OperatorWrongDataTypeError, SemanticError, UnsafeOperationInSafeContextError};
use crate::typechecker::types::{Specifiers, SuperType, Type};

use SuperType::*;

/// One row of an operator's rule table: accepted left/right super-types and the
/// super-type produced. `None` for `rhs` marks a unary operator row.
struct Rule {
    lhs: SuperType,
    rhs: Option<SuperType>,
    result: SuperType,
}

const fn binop(lhs: SuperType, rhs: SuperType, result: SuperType) -> Rule {
    Rule { lhs, rhs: Some(rhs), result }
}

const fn unop(lhs: SuperType, result: SuperType) -> Rule {
    Rule { lhs, rhs: None, result }
}

/// Widening rank of a numeric super-type for mixed-kind arithmetic: the wider
/// operand's kind is the result kind (`int + long = long`, `double + int =
/// double`). Non-numeric kinds rank `0` and never win a promotion.
const fn numeric_rank(t: SuperType) -> u8 {
    match t {
        Byte => 1,
        Short => 2,
        Int => 3,
        Long => 4,
        Double => 5,
        _ => 0,
    }
}

const fn promote(a: SuperType, b: SuperType) -> SuperType {
    if numeric_rank(a) >= numeric_rank(b) {
        a
    } else {
        b
    }
}

/// Every ordered pair drawn from the numeric kinds, typed by [`promote`]. Used
/// as the base of `+`, `-` and `*`'s rule tables; `%` restricts the same
/// pattern to the integral subset.
macro_rules! numeric_cross {
    () => {
        binop(Double, Double, promote(Double, Double)),
        binop(Double, Int, promote(Double, Int)),
        binop(Double, Short, promote(Double, Short)),
        binop(Double, Long, promote(Double, Long)),
        binop(Double, Byte, promote(Double, Byte)),
        binop(Int, Double, promote(Int, Double)),
        binop(Int, Int, promote(Int, Int)),
        binop(Int, Short, promote(Int, Short)),
        binop(Int, Long, promote(Int, Long)),
        binop(Int, Byte, promote(Int, Byte)),
        binop(Short, Double, promote(Short, Double)),
        binop(Short, Int, promote(Short, Int)),
        binop(Short, Short, promote(Short, Short)),
        binop(Short, Long, promote(Short, Long)),
        binop(Short, Byte, promote(Short, Byte)),
        binop(Long, Double, promote(Long, Double)),
        binop(Long, Int, promote(Long, Int)),
        binop(Long, Short, promote(Long, Short)),
        binop(Long, Long, promote(Long, Long)),
        binop(Long, Byte, promote(Long, Byte)),
        binop(Byte, Double, promote(Byte, Double)),
        binop(Byte, Int, promote(Byte, Int)),
        binop(Byte, Short, promote(Byte, Short)),
        binop(Byte, Long, promote(Byte, Long)),
        binop(Byte, Byte, promote(Byte, Byte))
    };
}

macro_rules! integral_cross {
    () => {
        binop(Int, Int, promote(Int, Int)),
        binop(Int, Short, promote(Int, Short)),
        binop(Int, Long, promote(Int, Long)),
        binop(Int, Byte, promote(Int, Byte)),
        binop(Short, Int, promote(Short, Int)),
        binop(Short, Short, promote(Short, Short)),
        binop(Short, Long, promote(Short, Long)),
        binop(Short, Byte, promote(Short, Byte)),
        binop(Long, Int, promote(Long, Int)),
        binop(Long, Short, promote(Long, Short)),
        binop(Long, Long, promote(Long, Long)),
        binop(Long, Byte, promote(Long, Byte)),
        binop(Byte, Int, promote(Byte, Int)),
        binop(Byte, Short, promote(Byte, Short)),
        binop(Byte, Long, promote(Byte, Long)),
        binop(Byte, Byte, promote(Byte, Byte))
    };
}

const PLUS_RULES: &[Rule] = &[
    numeric_cross!(),
    binop(String, String, String),
    binop(String, Char, String),
    binop(Ptr, Int, Ptr),
    binop(Ptr, Long, Ptr),
];
const MINUS_RULES: &[Rule] = &[numeric_cross!(), binop(Ptr, Int, Ptr), binop(Ptr, Long, Ptr)];
const MUL_RULES: &[Rule] = &[numeric_cross!(), binop(String, Int, String), binop(Int, String, String)];
const DIV_RULES: &[Rule] = &[numeric_cross!()];
const REM_RULES: &[Rule] = &[integral_cross!()];

const SHIFT_LEFT_RULES: &[Rule] = &[binop(Int, Int, Int), binop(Short, Short, Short), binop(Long, Long, Long), binop(Byte, Byte, Byte)];
const SHIFT_RIGHT_RULES: &[Rule] = SHIFT_LEFT_RULES;

const BITWISE_AND_RULES: &[Rule] = &[binop(Int, Int, Int), binop(Short, Short, Short), binop(Long, Long, Long), binop(Byte, Byte, Byte), binop(Bool, Bool, Bool)];
const BITWISE_OR_RULES: &[Rule] = BITWISE_AND_RULES;
const BITWISE_XOR_RULES: &[Rule] = BITWISE_AND_RULES;

const LOGICAL_AND_RULES: &[Rule] = &[binop(Bool, Bool, Bool)];
const LOGICAL_OR_RULES: &[Rule] = &[binop(Bool, Bool, Bool)];

const EQUAL_RULES: &[Rule] = &[
    binop(Double, Double, Bool),
    binop(Int, Int, Bool),
    binop(Short, Short, Bool),
    binop(Long, Long, Bool),
    binop(Byte, Byte, Bool),
    binop(Char, Char, Bool),
    binop(String, String, Bool),
    binop(Bool, Bool, Bool),
    binop(Ptr, Ptr, Bool),
    binop(Enum, Enum, Bool),
    binop(Char, Int, Bool),
    binop(Int, Char, Bool),
];
const NOT_EQUAL_RULES: &[Rule] = EQUAL_RULES;

const LESS_RULES: &[Rule] = &[
    binop(Double, Double, Bool),
    binop(Int, Int, Bool),
    binop(Short, Short, Bool),
    binop(Long, Long, Bool),
    binop(Byte, Byte, Bool),
];
const GREATER_RULES: &[Rule] = LESS_RULES;
const LESS_EQUAL_RULES: &[Rule] = LESS_RULES;
const GREATER_EQUAL_RULES: &[Rule] = LESS_RULES;

const PREFIX_MINUS_RULES: &[Rule] = &[unop(Double, Double), unop(Int, Int), unop(Short, Short), unop(Long, Long)];
const PREFIX_PLUS_PLUS_RULES: &[Rule] = &[unop(Int, Int), unop(Short, Short), unop(Long, Long), unop(Byte, Byte)];
const PREFIX_MINUS_MINUS_RULES: &[Rule] = PREFIX_PLUS_PLUS_RULES;
const NOT_RULES: &[Rule] = &[unop(Bool, Bool)];
const BITWISE_NOT_RULES: &[Rule] = &[unop(Int, Int), unop(Short, Short), unop(Long, Long), unop(Byte, Byte)];
const POSTFIX_PLUS_PLUS_RULES: &[Rule] = PREFIX_PLUS_PLUS_RULES;
const POSTFIX_MINUS_MINUS_RULES: &[Rule] = PREFIX_PLUS_PLUS_RULES;

fn lookup_binary(table: &[Rule], lhs: &Type, rhs: &Type) -> Option<Type> {
    if lhs.is_wrapped() || rhs.is_wrapped() {
        return None;
    }
    table
        .iter()
        .find(|rule| rule.lhs == lhs.super_type && rule.rhs == Some(rhs.super_type))
        .map(|rule| Type::primitive(rule.result))
}

fn lookup_unary(table: &[Rule], operand: &Type) -> Option<Type> {
    if operand.is_wrapped() {
        return None;
    }
    table.iter().find(|rule| rule.lhs == operand.super_type && rule.rhs.is_none()).map(|rule| Type::primitive(rule.result))
}

fn wrong_type_error(loc: CodeLoc, op: &str, lhs: &Type, rhs: Option<&Type>) -> SemanticError {
    let detail = match rhs {
        Some(rhs) => format!("`{op}` is not defined for `{lhs}` and `{rhs}`"),
        None => format!("`{op}` is not defined for `{lhs}`"),
    };
    SemanticError::OperatorWrongDataType(OperatorWrongDataTypeError { loc, detail })
}

/// Typing rule for plain `=` assignment. Beyond the exact-match case, this
/// allows the extra coercions the data model calls out explicitly: anything may
/// be assigned to a `dyn`-typed slot, an array may decay into a pointer of the
/// same base, a pointer-to-struct may widen into a pointer-to-interface the
/// struct implements, a string literal may assign into a `char*`, and a value
/// may bind to a reference-to-that-type (or vice versa for reads).
pub fn type_assign(loc: CodeLoc, target: &Type, value: &Type, struct_implements: impl Fn(&str, &str) -> bool) -> Result<Type, SemanticError> {
    if target.is(Dyn) {
        return Ok(value.clone());
    }
    if target.matches(value, false, false, true) {
        return Ok(target.clone());
    }
    // array -> pointer decay of the same base type.
    if target.is_ptr() && value.is_array() {
        let t_base = target.get_contained_ty().unwrap();
        let v_base = value.get_contained_ty().unwrap();
        if t_base.matches(&v_base, true, true, true) {
            return Ok(target.clone());
        }
    }
    // pointer-to-interface <- pointer-to-struct, iff the struct implements it.
    if target.is_ptr() && value.is_ptr() {
        let t_base = target.get_contained_ty().unwrap();
        let v_base = value.get_contained_ty().unwrap();
        if t_base.is(Interface) && v_base.is(Struct) {
            let iface_name = t_base.subtype_name.clone().unwrap_or_default();
            let struct_name = v_base.subtype_name.clone().unwrap_or_default();
            if struct_implements(&struct_name, &iface_name) {
                return Ok(target.clone());
            }
        }
    }
    // char* <- string literal.
    if target.is_ptr() && target.get_contained_ty().map(|t| t.is(Char)).unwrap_or(false) && value.is(String) {
        return Ok(target.clone());
    }
    // value <-> reference-to-value.
    if target.is_ref() && target.remove_reference_wrapper().matches(value, false, false, true) {
        return Ok(target.clone());
    }
    if value.is_ref() && target.matches(&value.remove_reference_wrapper(), false, false, true) {
        return Ok(target.clone());
    }
    Err(wrong_type_error(loc, "=", target, Some(value)))
}

macro_rules! binary_rule_fn {
    ($fn_name:ident, $table:expr, $symbol:expr) => {
        pub fn $fn_name(loc: CodeLoc, lhs: &Type, rhs: &Type) -> Result<Type, SemanticError> {
            lookup_binary($table, lhs, rhs)
                .map(|ty| ty.with_specifiers(lhs.specifiers.merge(rhs.specifiers).erase_with_mask(Specifiers::CONST)))
                .ok_or_else(|| wrong_type_error(loc, $symbol, lhs, Some(rhs)))
        }
    };
}

macro_rules! unary_rule_fn {
    ($fn_name:ident, $table:expr, $symbol:expr) => {
        pub fn $fn_name(loc: CodeLoc, operand: &Type) -> Result<Type, SemanticError> {
            lookup_unary($table, operand).ok_or_else(|| wrong_type_error(loc, $symbol, operand, None))
        }
    };
}

binary_rule_fn!(type_plus, PLUS_RULES, "+");
binary_rule_fn!(type_minus, MINUS_RULES, "-");
binary_rule_fn!(type_mul, MUL_RULES, "*");
binary_rule_fn!(type_div, DIV_RULES, "/");
binary_rule_fn!(type_rem, REM_RULES, "%");
binary_rule_fn!(type_shl, SHIFT_LEFT_RULES, "<<");
binary_rule_fn!(type_shr, SHIFT_RIGHT_RULES, ">>");
binary_rule_fn!(type_bitwise_and, BITWISE_AND_RULES, "&");
binary_rule_fn!(type_bitwise_or, BITWISE_OR_RULES, "|");
binary_rule_fn!(type_bitwise_xor, BITWISE_XOR_RULES, "^");
binary_rule_fn!(type_logical_and, LOGICAL_AND_RULES, "&&");
binary_rule_fn!(type_logical_or, LOGICAL_OR_RULES, "||");
binary_rule_fn!(type_equal, EQUAL_RULES, "==");
binary_rule_fn!(type_not_equal, NOT_EQUAL_RULES, "!=");
binary_rule_fn!(type_less, LESS_RULES, "<");
binary_rule_fn!(type_greater, GREATER_RULES, ">");
binary_rule_fn!(type_less_equal, LESS_EQUAL_RULES, "<=");
binary_rule_fn!(type_greater_equal, GREATER_EQUAL_RULES, ">=");

unary_rule_fn!(type_prefix_minus, PREFIX_MINUS_RULES, "-");
unary_rule_fn!(type_prefix_plus_plus, PREFIX_PLUS_PLUS_RULES, "++");
unary_rule_fn!(type_prefix_minus_minus, PREFIX_MINUS_MINUS_RULES, "--");
unary_rule_fn!(type_not, NOT_RULES, "!");
unary_rule_fn!(type_bitwise_not, BITWISE_NOT_RULES, "~");
unary_rule_fn!(type_postfix_plus_plus, POSTFIX_PLUS_PLUS_RULES, "++");
unary_rule_fn!(type_postfix_minus_minus, POSTFIX_MINUS_MINUS_RULES, "--");

/// `op +=`, `op -=`, ... are typed as their plain binary counterpart, with the
/// additional requirement (checked by the caller, which has the assignment
/// target's lifecycle available) that the left-hand side already be initialized
/// and not const.
pub fn type_compound_assign(loc: CodeLoc, op: crate::ast::AssignOp, lhs: &Type, rhs: &Type) -> Result<Type, SemanticError> {
    use crate::ast::AssignOp::*;
    match op {
        Assign => unreachable!("plain assignment has its own entry point"),
        PlusEq => type_plus(loc, lhs, rhs),
        MinusEq => type_minus(loc, lhs, rhs),
        MulEq => type_mul(loc, lhs, rhs),
        DivEq => type_div(loc, lhs, rhs),
        RemEq => type_rem(loc, lhs, rhs),
        ShlEq => type_shl(loc, lhs, rhs),
        ShrEq => type_shr(loc, lhs, rhs),
        AndEq => type_bitwise_and(loc, lhs, rhs),
        OrEq => type_bitwise_or(loc, lhs, rhs),
        XorEq => type_bitwise_xor(loc, lhs, rhs),
    }
}

/// Typing rule for an explicit cast expression: `target(value)`. Numeric
/// primitives may cast freely between one another and to/from `bool`/`char`;
/// any pointer may cast to any other pointer, but only from inside an
/// `unsafe { }` block — `in_unsafe_scope` is the caller's answer to that.
pub fn type_cast(loc: CodeLoc, target: &Type, value: &Type, in_unsafe_scope: bool) -> Result<Type, SemanticError> {
    let both_castable = |t: &Type| t.is_one_of(SuperType::PRIMITIVES) && !t.is_wrapped();
    if both_castable(target) && both_castable(value) {
        return Ok(target.clone());
    }
    if target.is_ptr() && value.is_ptr() {
        if !in_unsafe_scope {
            return Err(SemanticError::UnsafeOperationInSafeContext(UnsafeOperationInSafeContextError {
                loc,
                detail: format!("casting `{value}` to `{target}` is only allowed inside an unsafe block"),
            }));
        }
        return Ok(target.clone());
    }
    Err(wrong_type_error(loc, "cast", target, Some(value)))
}

/// Whether assigning `value` to a slot currently typed `target` changes the
/// `heap` qualifier — only meaningful outside an `unsafe { }` block, where such
/// a change must be rejected.
pub fn changes_heap_qualifier(target: &Type, value: &Type) -> bool {
    target.specifiers.contains(Specifiers::HEAP) != value.specifiers.contains(Specifiers::HEAP)
}

/// The reserved operator-overload method name a struct may define to back
/// `op`, for the dispatch fallback the type checker uses once the primitive
/// rule tables reject a struct operand. `None` for operators the data model
/// never allows overloading (comparisons other than `==`/`!=`, logical and
/// bitwise operators).
pub fn binop_to_operator_name(op: crate::ast::BinOp) -> Option<&'static str> {
    use crate::ast::BinOp::*;
    match op {
        Plus => Some("op.plus"),
        Minus => Some("op.minus"),
        Mul => Some("op.mul"),
        Div => Some("op.div"),
        Rem => Some("op.rem"),
        Eq => Some("op.eq"),
        Neq => Some("op.neq"),
        Shl => Some("op.shl"),
        Shr => Some("op.shr"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CodeLoc, Position, Span};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn loc() -> CodeLoc {
        CodeLoc::new(Arc::new(PathBuf::from("t.vl")), Span::dummy())
    }

    #[test]
    fn plus_accepts_matching_numeric_pairs() {
        let int = Type::primitive(Int);
        assert_eq!(type_plus(loc(), &int, &int).unwrap(), Type::primitive(Int));
    }

    #[test]
    fn plus_rejects_mismatched_kinds() {
        let int = Type::primitive(Int);
        let string = Type::primitive(String);
        assert!(type_plus(loc(), &int, &string).is_err());
    }

    #[test]
    fn assign_allows_array_to_pointer_decay() {
        let target = Type::primitive(Int).to_pointer();
        let value = Type::primitive(Int).to_array(4);
        let result = type_assign(loc(), &target, &value, |_, _| false);
        assert!(result.is_ok());
    }

    #[test]
    fn assign_allows_interface_pointer_widening_when_implemented() {
        let target = Type::named(Interface, "Shape", vec![]).to_pointer();
        let value = Type::named(Struct, "Circle", vec![]).to_pointer();
        assert!(type_assign(loc(), &target, &value, |_, _| false).is_err());
        assert!(type_assign(loc(), &target, &value, |s, i| s == "Circle" && i == "Shape").is_ok());
    }

    #[test]
    fn dyn_target_accepts_anything() {
        let target = Type::dyn_type();
        let value = Type::primitive(Bool);
        assert_eq!(type_assign(loc(), &target, &value, |_, _| false).unwrap(), value);
    }

    #[test]
    fn cast_between_primitives_is_allowed() {
        assert!(type_cast(loc(), &Type::primitive(Double), &Type::primitive(Int), false).is_ok());
    }

    #[test]
    fn pointer_cast_requires_unsafe_scope() {
        let target = Type::primitive(Int).to_pointer();
        let value = Type::primitive(Byte).to_pointer();
        assert!(type_cast(loc(), &target, &value, false).is_err());
        assert!(type_cast(loc(), &target, &value, true).is_ok());
    }

    #[test]
    fn plus_promotes_to_the_wider_numeric_kind() {
        let int = Type::primitive(Int);
        let long = Type::primitive(Long);
        assert_eq!(type_plus(loc(), &int, &long).unwrap(), Type::primitive(Long));
        let double = Type::primitive(Double);
        assert_eq!(type_plus(loc(), &double, &int).unwrap(), Type::primitive(Double));
    }

    #[test]
    fn minus_promotes_using_the_wider_side_not_a_fixed_result() {
        let double = Type::primitive(Double);
        let int = Type::primitive(Int);
        assert_eq!(type_minus(loc(), &double, &double).unwrap(), Type::primitive(Double));
        assert_eq!(type_minus(loc(), &int, &double).unwrap(), Type::primitive(Double));
    }

    #[test]
    fn mul_allows_string_repetition_by_an_int() {
        let string = Type::primitive(String);
        let int = Type::primitive(Int);
        assert_eq!(type_mul(loc(), &string, &int).unwrap(), Type::primitive(String));
        assert_eq!(type_mul(loc(), &int, &string).unwrap(), Type::primitive(String));
    }

    #[test]
    fn equal_accepts_char_against_int() {
        let char_ty = Type::primitive(Char);
        let int = Type::primitive(Int);
        assert_eq!(type_equal(loc(), &char_ty, &int).unwrap(), Type::primitive(Bool));
    }
}
