use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DeriveInput, Variant};

/// Generate a `PartialEq` impl that only compares enum discriminants, ignoring
/// payload fields such as source position or literal value. Useful for asserting
/// "a `Plus` token was produced here" in tests without matching the exact span.
pub fn impl_loose_eq_macro(ast: DeriveInput) -> TokenStream {
    let DeriveInput { ident, data, .. } = ast;

    let Data::Enum(DataEnum { variants, .. }) = data else {
        panic!("LooseEq can only be derived for enums");
    };

    let arms = variants.iter().map(|variant| {
        let Variant { ident: var_ident, fields, .. } = variant;
        match fields {
            syn::Fields::Unit => quote! {
                (#ident::#var_ident, #ident::#var_ident) => true,
            },
            syn::Fields::Named(_) => quote! {
                (#ident::#var_ident { .. }, #ident::#var_ident { .. }) => true,
            },
            syn::Fields::Unnamed(_) => quote! {
                (#ident::#var_ident(..), #ident::#var_ident(..)) => true,
            },
        }
    });

    let gen = quote! {
        impl PartialEq for #ident {
            fn eq(&self, other: &Self) -> bool {
                match (self, other) {
                    #(#arms)*
                    _ => false,
                }
            }
        }
    };

    gen.into()
}
