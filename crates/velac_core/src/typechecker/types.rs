//! The closed type model (component C1 of the design).
//!
//! `Type` is a value type: a super-type tag, an ordered chain of wrapper layers
//! (pointer / reference / array), an optional subtype name (struct / interface /
//! enum / generic), an optional template argument list and a specifier bitset.
//! Two types are equal iff their chains, subtype names and template arguments
//! match componentwise; specifier comparison is controlled by a flag because
//! assignment sites may ignore constness differences (see [`Type::matches`]).

use std::fmt::{self, Display, Formatter};

use bitflags::bitflags;
use inkwell::context::Context as LlvmContext;
use inkwell::types::{BasicTypeEnum, StructType};

use crate::scope::Scope;

/// The closed set of super-types named by the data model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum SuperType {
    Double,
    Int,
    Short,
    Long,
    Byte,
    Char,
    String,
    Bool,
    /// Procedures never produce a value; `Void` stands in for their absent return type.
    /// Not named explicitly in the closed set but required to give procedures a return
    /// type at all (see DESIGN.md, "Void return type").
    Void,
    Ptr,
    Ref,
    Array,
    Struct,
    Interface,
    Enum,
    Function,
    Procedure,
    Import,
    Alias,
    Generic,
    /// Appears only before inference completes; must never reach codegen.
    Dyn,
    /// Soft-error sentinel; must never reach IR generation.
    Invalid,
}

impl SuperType {
    pub const PRIMITIVES: &'static [SuperType] = &[
        SuperType::Double,
        SuperType::Int,
        SuperType::Short,
        SuperType::Long,
        SuperType::Byte,
        SuperType::Char,
        SuperType::String,
        SuperType::Bool,
    ];

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            SuperType::Double | SuperType::Int | SuperType::Short | SuperType::Long | SuperType::Byte
        )
    }

    pub fn is_integral(self) -> bool {
        matches!(self, SuperType::Int | SuperType::Short | SuperType::Long | SuperType::Byte)
    }
}

bitflags! {
    /// Qualifier bits carried alongside a type. Mirrors the `specifier set` of the
    /// data model (`const, signed, unsigned, public, inline, heap, volatile`).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
    pub struct Specifiers: u8 {
        const CONST    = 0b0000_0001;
        const SIGNED   = 0b0000_0010;
        const UNSIGNED = 0b0000_0100;
        const PUBLIC   = 0b0000_1000;
        const INLINE   = 0b0001_0000;
        const HEAP     = 0b0010_0000;
        const VOLATILE = 0b0100_0000;
    }
}

impl Specifiers {
    /// Merge `other` into `self`, keeping bits already set on `self` and adding any
    /// new bits from `other`. Mirrors `Specifiers::merge` in `TypeMatcher.cpp`.
    pub fn merge(self, other: Specifiers) -> Specifiers {
        self | other
    }

    /// Remove every bit from `self` that is also present in `mask`. Mirrors
    /// `Specifiers::eraseWithMask` used while enriching a generic type mapping.
    pub fn erase_with_mask(self, mask: Specifiers) -> Specifiers {
        self & !mask
    }

    pub fn is_const(self) -> bool {
        self.contains(Specifiers::CONST)
    }
}

/// One layer of a type's wrapper chain. Array size `0` means "size unknown /
/// decayed to pointer on parameter".
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Wrapper {
    Ptr,
    Ref,
    Array(usize),
}

impl Wrapper {
    fn matches(&self, other: &Wrapper, ignore_array_size: bool) -> bool {
        match (self, other) {
            (Wrapper::Ptr, Wrapper::Ptr) | (Wrapper::Ref, Wrapper::Ref) => true,
            (Wrapper::Array(_), Wrapper::Array(_)) if ignore_array_size => true,
            (Wrapper::Array(a), Wrapper::Array(b)) => a == b,
            // A pointer and an array of the same base are interchangeable once array size is ignored.
            (Wrapper::Ptr, Wrapper::Array(_)) | (Wrapper::Array(_), Wrapper::Ptr) if ignore_array_size => true,
            _ => false,
        }
    }
}

/// A fully-substantiated or still-generic type value. Mutates via value-returning
/// operations (`to_pointer`, `to_array`, ...) rather than in place, matching
/// `original_source/src/analyzer/SymbolType.h`'s immutable-layer discipline.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Type {
    pub super_type: SuperType,
    /// Stack of wrapper layers; the last element is the outermost wrapper.
    pub chain: Vec<Wrapper>,
    pub subtype_name: Option<String>,
    pub template_types: Vec<Type>,
    pub specifiers: Specifiers,
}

impl Type {
    pub fn primitive(super_type: SuperType) -> Type {
        Type {
            super_type,
            chain: Vec::new(),
            subtype_name: None,
            template_types: Vec::new(),
            specifiers: Specifiers::empty(),
        }
    }

    pub fn dyn_type() -> Type {
        Type::primitive(SuperType::Dyn)
    }

    pub fn invalid() -> Type {
        Type::primitive(SuperType::Invalid)
    }

    pub fn generic(name: impl Into<String>) -> Type {
        Type {
            super_type: SuperType::Generic,
            chain: Vec::new(),
            subtype_name: Some(name.into()),
            template_types: Vec::new(),
            specifiers: Specifiers::empty(),
        }
    }

    pub fn named(super_type: SuperType, name: impl Into<String>, template_types: Vec<Type>) -> Type {
        Type {
            super_type,
            chain: Vec::new(),
            subtype_name: Some(name.into()),
            template_types,
            specifiers: Specifiers::empty(),
        }
    }

    pub fn with_specifiers(mut self, specifiers: Specifiers) -> Type {
        self.specifiers = specifiers;
        self
    }

    pub fn is(&self, super_type: SuperType) -> bool {
        self.super_type == super_type
    }

    pub fn is_one_of(&self, set: &[SuperType]) -> bool {
        set.contains(&self.super_type)
    }

    pub fn is_wrapped(&self) -> bool {
        !self.chain.is_empty()
    }

    pub fn to_pointer(mut self) -> Type {
        self.chain.push(Wrapper::Ptr);
        self
    }

    pub fn to_reference(mut self) -> Type {
        self.chain.push(Wrapper::Ref);
        self
    }

    pub fn to_array(mut self, size: usize) -> Type {
        self.chain.push(Wrapper::Array(size));
        self
    }

    /// Unwraps exactly one layer, preserving subtype/template data on the remaining base.
    pub fn get_contained_ty(&self) -> Option<Type> {
        if self.chain.is_empty() {
            return None;
        }
        let mut copy = self.clone();
        copy.chain.pop();
        Some(copy)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.chain.last(), Some(Wrapper::Ref))
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self.chain.last(), Some(Wrapper::Ptr))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.chain.last(), Some(Wrapper::Array(_)))
    }

    /// A reference type always wraps exactly one non-reference type.
    pub fn remove_reference_wrapper(&self) -> Type {
        if self.is_ref() {
            self.get_contained_ty().expect("ref always wraps a contained type")
        } else {
            self.clone()
        }
    }

    /// Fully unwrapped base type: drops the entire chain.
    pub fn get_base_type(&self) -> Type {
        let mut copy = self.clone();
        copy.chain.clear();
        copy
    }

    pub fn get_template_types(&self) -> &[Type] {
        &self.template_types
    }

    /// Replace the base (unwrapped) layer with `new_base`, re-applying this type's
    /// existing wrapper chain on top.
    pub fn replace_base_type(&self, new_base: &Type) -> Type {
        let mut result = new_base.clone();
        result.chain = self.chain.clone();
        result
    }

    pub fn is_const(&self) -> bool {
        self.specifiers.is_const()
    }

    pub fn has_any_generic_parts(&self) -> bool {
        if self.super_type == SuperType::Generic {
            return true;
        }
        self.template_types.iter().any(Type::has_any_generic_parts)
    }

    /// Structural equality, with controllable strictness.
    ///
    /// - `ignore_array_size`: array-of-X and pointer-to-X are compatible, and two
    ///   arrays of different (but nonzero) size are still considered a match.
    /// - `ignore_specifiers`: specifier bits are not compared at all.
    /// - `allow_constify`: a non-const type matches a const one (assignment may add
    ///   constness, but never remove it, when this flag is combined with a direction
    ///   check performed by the caller).
    pub fn matches(&self, other: &Type, ignore_array_size: bool, ignore_specifiers: bool, allow_constify: bool) -> bool {
        if self.super_type != other.super_type {
            return false;
        }
        if self.subtype_name != other.subtype_name {
            return false;
        }
        if self.chain.len() != other.chain.len() {
            return false;
        }
        for (a, b) in self.chain.iter().zip(other.chain.iter()) {
            if !a.matches(b, ignore_array_size) {
                return false;
            }
        }
        if self.template_types.len() != other.template_types.len() {
            return false;
        }
        for (a, b) in self.template_types.iter().zip(other.template_types.iter()) {
            if !a.matches(b, ignore_array_size, ignore_specifiers, allow_constify) {
                return false;
            }
        }
        if !ignore_specifiers {
            let mut lhs = self.specifiers;
            let rhs = other.specifiers;
            if allow_constify {
                lhs |= Specifiers::CONST & rhs;
            }
            if lhs != rhs {
                return false;
            }
        }
        true
    }

    pub fn get_name(&self, with_specifiers: bool) -> String {
        let mut out = String::new();
        if with_specifiers {
            if self.specifiers.is_const() {
                out.push_str("const ");
            }
            if self.specifiers.contains(Specifiers::PUBLIC) {
                out.push_str("public ");
            }
            if self.specifiers.contains(Specifiers::HEAP) {
                out.push_str("heap ");
            }
        }
        out.push_str(&self.base_name());
        for wrapper in &self.chain {
            match wrapper {
                Wrapper::Ptr => out.push('*'),
                Wrapper::Ref => out.push('&'),
                Wrapper::Array(0) => out.push_str("[]"),
                Wrapper::Array(n) => out.push_str(&format!("[{n}]")),
            }
        }
        out
    }

    fn base_name(&self) -> String {
        let name = match self.super_type {
            SuperType::Double => "double",
            SuperType::Int => "int",
            SuperType::Short => "short",
            SuperType::Long => "long",
            SuperType::Byte => "byte",
            SuperType::Char => "char",
            SuperType::String => "string",
            SuperType::Bool => "bool",
            SuperType::Void => "void",
            SuperType::Ptr => "ptr",
            SuperType::Ref => "ref",
            SuperType::Array => "array",
            SuperType::Struct => return self.subtype_name.clone().unwrap_or_default(),
            SuperType::Interface => return self.subtype_name.clone().unwrap_or_default(),
            SuperType::Enum => return self.subtype_name.clone().unwrap_or_default(),
            SuperType::Function => "function",
            SuperType::Procedure => "procedure",
            SuperType::Import => "import",
            SuperType::Alias => return self.subtype_name.clone().unwrap_or_default(),
            SuperType::Generic => return self.subtype_name.clone().unwrap_or_default(),
            SuperType::Dyn => "dyn",
            SuperType::Invalid => "<invalid>",
        };
        name.to_string()
    }

    /// Lowers the base (unwrapped) representation to an LLVM type, consulting
    /// `scope` to resolve struct/interface body layouts. Wrapper layers are applied
    /// by the caller (pointer types collapse to `ptr` under opaque-pointer LLVM).
    pub fn to_llvm_type<'ctx>(&self, ctx: &'ctx LlvmContext, scope: &Scope) -> BasicTypeEnum<'ctx> {
        if !self.chain.is_empty() {
            if self.is_array() {
                let Wrapper::Array(size) = self.chain.last().unwrap() else { unreachable!() };
                let elem = self.get_contained_ty().unwrap();
                return elem.to_llvm_type(ctx, scope).array_type((*size) as u32).into();
            }
            // Pointers and references both lower to LLVM's single opaque pointer type.
            return ctx.ptr_type(Default::default()).into();
        }
        match self.super_type {
            SuperType::Double => ctx.f64_type().into(),
            SuperType::Int | SuperType::Enum => ctx.i32_type().into(),
            SuperType::Short => ctx.i16_type().into(),
            SuperType::Long => ctx.i64_type().into(),
            SuperType::Byte => ctx.i8_type().into(),
            SuperType::Char => ctx.i8_type().into(),
            SuperType::Bool => ctx.bool_type().into(),
            SuperType::String => ctx.ptr_type(Default::default()).into(),
            SuperType::Struct | SuperType::Interface => self.lookup_struct_type(ctx, scope).into(),
            SuperType::Void => ctx.struct_type(&[], false).into(),
            _ => ctx.ptr_type(Default::default()).into(),
        }
    }

    fn lookup_struct_type<'ctx>(&self, ctx: &'ctx LlvmContext, scope: &Scope) -> StructType<'ctx> {
        let name = self.subtype_name.clone().unwrap_or_default();
        if let Some(existing) = ctx.get_struct_type(&name) {
            return existing;
        }
        let opaque = ctx.opaque_struct_type(&name);
        if let Some(body) = scope.lookup_struct_scope(&name) {
            let field_types: Vec<BasicTypeEnum> = body
                .ordered_field_types()
                .iter()
                .map(|ty| ty.to_llvm_type(ctx, scope))
                .collect();
            opaque.set_body(&field_types, false);
        }
        opaque
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.get_name(true))
    }
}

/// A generic type name plus the set of concrete types it may be substantiated with.
/// `dyn` as a condition means "any type satisfies this generic".
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GenericType {
    pub name: String,
    pub type_conditions: Vec<Type>,
}

impl GenericType {
    pub fn new(name: impl Into<String>, type_conditions: Vec<Type>) -> GenericType {
        GenericType {
            name: name.into(),
            type_conditions,
        }
    }

    pub fn unconstrained(name: impl Into<String>) -> GenericType {
        GenericType::new(name, vec![Type::dyn_type()])
    }

    /// True iff `candidate` satisfies at least one of this generic's type conditions.
    pub fn meets_conditions(&self, candidate: &Type) -> bool {
        self.type_conditions
            .iter()
            .any(|cond| cond.is(SuperType::Dyn) || cond == candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_plus_array_layers_roundtrip() {
        let t = Type::primitive(SuperType::Int).to_pointer().to_array(4);
        assert_eq!(t.get_name(false), "int*[4]");
        let unwrapped_once = t.get_contained_ty().unwrap();
        assert_eq!(unwrapped_once.get_name(false), "int*");
        assert_eq!(t.get_base_type().get_name(false), "int");
    }

    #[test]
    fn array_matches_pointer_when_size_ignored() {
        let arr = Type::primitive(SuperType::Int).to_array(0);
        let ptr = Type::primitive(SuperType::Int).to_pointer();
        assert!(arr.matches(&ptr, true, true, false));
        assert!(!arr.matches(&ptr, false, true, false));
    }

    #[test]
    fn const_assignment_matches_with_allow_constify() {
        let src = Type::primitive(SuperType::Int);
        let dst = Type::primitive(SuperType::Int).with_specifiers(Specifiers::CONST);
        assert!(!src.matches(&dst, false, false, false));
        assert!(src.matches(&dst, false, false, true));
    }

    #[test]
    fn generic_condition_with_dyn_accepts_anything() {
        let g = GenericType::unconstrained("T");
        assert!(g.meets_conditions(&Type::primitive(SuperType::String)));
    }

    #[test]
    fn generic_condition_restricted_to_listed_types() {
        let g = GenericType::new("Number", vec![Type::primitive(SuperType::Int), Type::primitive(SuperType::Long)]);
        assert!(g.meets_conditions(&Type::primitive(SuperType::Int)));
        assert!(!g.meets_conditions(&Type::primitive(SuperType::Bool)));
    }
}
