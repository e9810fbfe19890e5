//! The context a type-checking pass carries alongside whatever AST node it is
//! currently visiting: which scope identifiers currently resolve against, and
//! the ambient manifestation index for the template/generic instantiation being
//! checked right now. Deliberately thin, mirroring the teacher's
//! `typechecker::context::Context` wrapper around its own scope type.

use crate::scope::Scope;

#[derive(Clone)]
pub struct Context {
    pub scope: Scope,
    pub man_idx: usize,
    /// Nesting depth of `while`/`do-while`/`for`/`foreach` loops enclosing the
    /// statement currently being checked; validates a `break N`/`continue N`'s
    /// `depth` field against how many loops actually enclose it.
    pub loop_depth: u32,
    /// Whether the statement currently being checked is lexically inside an
    /// `unsafe { }` block; gates pointer-to-pointer casts and heap-qualifier
    /// changes.
    pub in_unsafe: bool,
}

impl Context {
    pub fn new(scope: Scope, man_idx: usize) -> Context {
        Context {
            scope,
            man_idx,
            loop_depth: 0,
            in_unsafe: false,
        }
    }

    pub fn with_scope(&self, scope: Scope) -> Context {
        Context { scope, ..self.clone() }
    }

    pub fn enter_loop(&self, scope: Scope) -> Context {
        Context {
            scope,
            loop_depth: self.loop_depth + 1,
            ..self.clone()
        }
    }

    pub fn enter_unsafe(&self, scope: Scope) -> Context {
        Context {
            scope,
            in_unsafe: true,
            ..self.clone()
        }
    }
}

// Scope equality is by identity of the underlying node, which `Scope` itself
// does not expose; contexts are compared only by the caller holding the same
// handle, so no `PartialEq` is provided here (unlike the teacher's degenerate
// always-true impl, which exists only to satisfy a derive elsewhere).
