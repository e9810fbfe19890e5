//! Source locations and the diagnostic types every other component reports
//! through: [`SemanticError`] for type-checker/scope-builder failures,
//! [`ParseError`]/[`LexError`] for the front end, [`CompilerError`] for internal
//! invariant violations that indicate a bug in this crate rather than in the
//! program being compiled, and [`Warning`] for non-fatal observations collected
//! per scope and flushed by the driver.
//!
//! Every user-facing error kind gets its own small struct implementing
//! [`std::fmt::Display`] and [`std::error::Error`], matching the density the
//! teacher's `typechecker::error` module uses; an umbrella enum wraps them all
//! and dispatches `span()`/rendering.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;

/// A half-open (line, column) pair, 1-indexed, matching the lexer's bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Position {
        Position { line, column }
    }
}

/// A source range within a single file's token stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub source_line: String,
}

impl Span {
    pub fn new(start: Position, end: Position, source_line: impl Into<String>) -> Span {
        Span {
            start,
            end,
            source_line: source_line.into(),
        }
    }

    /// Used by unit tests that don't care about real positions.
    pub fn dummy() -> Span {
        Span::new(Position::new(0, 0), Position::new(0, 0), String::new())
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            source_line: self.source_line.clone(),
        }
    }

    /// Renders `message` underneath the offending source line, colorized the way
    /// the teacher's `Span::to_string` does.
    pub fn render(&self, message: &str) -> String {
        let caret_count = (self.end.column.max(self.start.column + 1)) - self.start.column;
        let pointer = format!("{}{}", " ".repeat(self.start.column.saturating_sub(1)), "^".repeat(caret_count.max(1)));
        format!(
            "{}\n{}\n{}\n{}",
            format!("at line {}, column {}", self.start.line, self.start.column).dimmed(),
            self.source_line,
            pointer.red().bold(),
            message.red()
        )
    }
}

/// A span plus the file it belongs to. Distinct from [`Span`] because scope and
/// symbol-table entries need to name their owning file even after the originating
/// token stream has been dropped (import-cycle diagnostics report across files).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CodeLoc {
    pub file: Arc<PathBuf>,
    pub span: Span,
}

impl CodeLoc {
    pub fn new(file: Arc<PathBuf>, span: Span) -> CodeLoc {
        CodeLoc { file, span }
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file.display(),
            self.span.start.line,
            self.span.start.column
        )
    }
}

macro_rules! error_kinds {
    ($enum_name:ident { $($variant:ident($struct_name:ident) => $msg:expr),* $(,)? }) => {
        $(
            #[derive(Clone, Debug, PartialEq)]
            pub struct $struct_name {
                pub loc: CodeLoc,
                pub detail: String,
            }

            impl fmt::Display for $struct_name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}: {}", $msg, self.detail)
                }
            }

            impl std::error::Error for $struct_name {}
        )*

        #[derive(Clone, Debug, PartialEq)]
        pub enum $enum_name {
            $($variant($struct_name),)*
        }

        impl $enum_name {
            pub fn loc(&self) -> &CodeLoc {
                match self {
                    $($enum_name::$variant(e) => &e.loc,)*
                }
            }

            pub fn render(&self) -> String {
                match self {
                    $($enum_name::$variant(e) => e.loc.span.render(&e.to_string()),)*
                }
            }
        }

        impl fmt::Display for $enum_name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($enum_name::$variant(e) => write!(f, "{e}"),)*
                }
            }
        }

        impl std::error::Error for $enum_name {}
    };
}

error_kinds!(SemanticError {
    VariableDeclaredTwice(VariableDeclaredTwiceError) => "variable already declared in this scope",
    FunctionDeclaredTwice(FunctionDeclaredTwiceError) => "function with this signature already declared",
    StructDeclaredTwice(StructDeclaredTwiceError) => "struct already declared in this scope",
    InterfaceDeclaredTwice(InterfaceDeclaredTwiceError) => "interface already declared in this scope",
    EnumDeclaredTwice(EnumDeclaredTwiceError) => "enum already declared in this scope",
    GenericTypeDeclaredTwice(GenericTypeDeclaredTwiceError) => "generic type parameter already declared",
    ReferencedUndefinedVariable(ReferencedUndefinedVariableError) => "referenced undefined variable",
    ReferencedUndefinedFunction(ReferencedUndefinedFunctionError) => "referenced undefined function",
    ReferencedUndefinedStruct(ReferencedUndefinedStructError) => "referenced undefined struct",
    ReferencedUndefinedType(ReferencedUndefinedTypeError) => "referenced undefined type",
    OperatorWrongDataType(OperatorWrongDataTypeError) => "operator applied to incompatible operand types",
    UnsafeOperationInSafeContext(UnsafeOperationInSafeContextError) => "unsafe operation outside an unsafe block",
    InterfaceMethodNotImplemented(InterfaceMethodNotImplementedError) => "struct does not implement all interface methods",
    CircularDependency(CircularDependencyError) => "circular import dependency",
    GlobalOfTypeDyn(GlobalOfTypeDynError) => "global variables cannot have dyn type",
    ArrayIndexNotIntOrLong(ArrayIndexNotIntOrLongError) => "array index must be int or long",
    PrintfArgCountError(PrintfArgCountErrorError) => "printf format placeholder count does not match argument count",
    PrintfTypeError(PrintfTypeErrorError) => "printf argument type does not match format placeholder",
    ReassignConstVariable(ReassignConstVariableError) => "cannot reassign a constant variable",
    FunctionAmbiguity(FunctionAmbiguityError) => "call is ambiguous between multiple equally-good overloads",
    StructAmbiguity(StructAmbiguityError) => "struct instantiation is ambiguous between multiple candidates",
    ReservedKeyword(ReservedKeywordError) => "identifier is a reserved keyword",
    StdNotFound(StdNotFoundError) => "standard library module could not be located",
    ReturnMissing(ReturnMissingError) => "function does not return on all control paths",
    ConditionMustBeBool(ConditionMustBeBoolError) => "condition expression must be of type bool",
    NumberOfFieldsMismatch(NumberOfFieldsMismatchError) => "struct literal field count does not match declaration",
    DuplicateMainFunction(DuplicateMainFunctionError) => "more than one main function declared",
    MissingMainFunction(MissingMainFunctionError) => "no main function declared",
    GenericTypeNotBound(GenericTypeNotBoundError) => "generic type parameter could not be inferred",
    InvalidBreakOrContinue(InvalidBreakOrContinueError) => "break or continue outside a loop",
});

error_kinds!(ParseError {
    UnexpectedToken(UnexpectedTokenError) => "unexpected token",
    UnexpectedEndOfFile(UnexpectedEndOfFileError) => "unexpected end of file",
    InvalidTemplateList(InvalidTemplateListError) => "malformed template argument list",
});

error_kinds!(LexError {
    UnknownToken(UnknownTokenError) => "no token rule matches this input",
    UnterminatedString(UnterminatedStringError) => "unterminated string literal",
});

/// Internal invariant violations: these should never be observable from a valid
/// program and indicate a bug in this crate rather than the program being
/// compiled (a manifestation looked up by a mangled name that was never
/// registered, a scope asked to resolve an `AstNodeId` from a different arena).
#[derive(Clone, Debug, PartialEq)]
pub enum CompilerError {
    ManifestationNotFound(String),
    ScopeNotFound(String),
    InvalidManifestationIndex { requested: usize, available: usize },
    RevisitLimitExceeded { file: PathBuf, iterations: u32 },
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerError::ManifestationNotFound(name) => {
                write!(f, "internal error: no manifestation registered for `{name}`")
            }
            CompilerError::ScopeNotFound(name) => {
                write!(f, "internal error: scope `{name}` not found")
            }
            CompilerError::InvalidManifestationIndex { requested, available } => write!(
                f,
                "internal error: manifestation index {requested} out of range (have {available})"
            ),
            CompilerError::RevisitLimitExceeded { file, iterations } => write!(
                f,
                "internal error: type checker did not converge on {} after {iterations} passes",
                file.display()
            ),
        }
    }
}

impl std::error::Error for CompilerError {}

/// Non-fatal observations surfaced at the end of a compile, grouped per scope and
/// flushed once front-to-back by the driver.
#[derive(Clone, Debug, PartialEq)]
pub enum Warning {
    UnusedFunction { name: String, loc: CodeLoc },
    UnusedStruct { name: String, loc: CodeLoc },
    UnusedVariable { name: String, loc: CodeLoc },
    VerifierDisabled,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnusedFunction { name, .. } => write!(f, "function `{name}` is never used"),
            Warning::UnusedStruct { name, .. } => write!(f, "struct `{name}` is never used"),
            Warning::UnusedVariable { name, .. } => write!(f, "variable `{name}` is never used"),
            Warning::VerifierDisabled => write!(f, "module verifier disabled; emitted IR was not validated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> CodeLoc {
        CodeLoc::new(Arc::new(PathBuf::from("main.vl")), Span::new(Position::new(3, 5), Position::new(3, 9), "let x = y + 1".into()))
    }

    #[test]
    fn semantic_error_renders_with_detail() {
        let err = SemanticError::ReferencedUndefinedVariable(ReferencedUndefinedVariableError {
            loc: loc(),
            detail: "y".into(),
        });
        assert_eq!(err.to_string(), "referenced undefined variable: y");
    }

    #[test]
    fn codeloc_displays_file_and_position() {
        let loc = loc();
        assert_eq!(loc.to_string(), "main.vl:3:5");
    }
}
