//! Derive macros that generate the regex-driven token table used by the Vela lexer.
//!
//! `#[derive(Token)]` on the token enum generates a `Terminal` companion enum (one
//! variant per `#[terminal("...")]`-annotated variant, stripped of payload) plus a
//! `Lexikon` pattern table that performs longest-match lookup over all terminal and
//! literal patterns. `#[derive(LooseEq)]` generates a discriminant-only `PartialEq`
//! impl, used to compare tokens while ignoring their source position.

mod loose_eq;
mod token;

use loose_eq::*;
use token::*;

use proc_macro::TokenStream;

#[proc_macro_derive(Token, attributes(terminal, literal))]
pub fn derive_token(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    impl_token_macro(ast)
}

#[proc_macro_derive(LooseEq, attributes(terminal))]
pub fn derive_loose_eq(input: TokenStream) -> TokenStream {
    let ast = syn::parse(input).unwrap();
    impl_loose_eq_macro(ast)
}
