//! Front end, type checker, generic substantiation engine and LLVM-backed IR
//! generator for the Vela compiler.
//!
//! This crate models the semantic middle of a whole-program, ahead-of-time
//! compilation pipeline: lexing and parsing a `.vl` source file into an
//! arena-indexed AST ([`ast`]), building a hierarchical symbol table
//! ([`scope`]) from it, two-phase type-checking against the closed type
//! model ([`typechecker`]) — including generic substantiation — and finally
//! lowering the checked manifestations to LLVM IR ([`codegen`]). The driver
//! crate wires these stages together per file through [`source::SourceFile`]
//! and the shared [`source::global::GlobalResourceManager`]; object emission
//! and linking live entirely outside this crate.

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod lexer;
pub mod manager;
pub mod parser;
pub mod scope;
pub mod source;
pub mod typechecker;
