//! The token enum driving the regex-based longest-match table generated by
//! `#[derive(Token)]`. Precedence between two patterns matching the same prefix
//! (a keyword versus the identifier rule) is resolved by longest match, which is
//! why every keyword is listed as a `#[terminal]` rather than folded into the
//! identifier regex: a literal keyword match and an identifier match of the same
//! text tie in length, and `Lexikon::find_longest_match` keeps the first winner
//! it scans, so keyword variants are declared before `Ident` below.

use velac_lex_derive::{LooseEq, Token as DeriveToken};

use crate::diagnostics::Position;

#[derive(Clone, DeriveToken, LooseEq)]
pub enum Token {
    #[terminal("proc")]
    ProcKeyword { position: Position },
    #[terminal("func")]
    FuncKeyword { position: Position },
    #[terminal("method")]
    MethodKeyword { position: Position },
    #[terminal("struct")]
    StructKeyword { position: Position },
    #[terminal("interface")]
    InterfaceKeyword { position: Position },
    #[terminal("enum")]
    EnumKeyword { position: Position },
    #[terminal("type")]
    TypeKeyword { position: Position },
    #[terminal("import")]
    ImportKeyword { position: Position },
    #[terminal("as")]
    AsKeyword { position: Position },
    #[terminal("if")]
    IfKeyword { position: Position },
    #[terminal("else")]
    ElseKeyword { position: Position },
    #[terminal("while")]
    WhileKeyword { position: Position },
    #[terminal("do")]
    DoKeyword { position: Position },
    #[terminal("for")]
    ForKeyword { position: Position },
    #[terminal("foreach")]
    ForeachKeyword { position: Position },
    #[terminal("return")]
    ReturnKeyword { position: Position },
    #[terminal("break")]
    BreakKeyword { position: Position },
    #[terminal("continue")]
    ContinueKeyword { position: Position },
    #[terminal("assert")]
    AssertKeyword { position: Position },
    #[terminal("printf")]
    PrintfKeyword { position: Position },
    #[terminal("unsafe")]
    UnsafeKeyword { position: Position },
    #[terminal("sizeof")]
    SizeOfKeyword { position: Position },
    #[terminal("alignof")]
    AlignOfKeyword { position: Position },
    #[terminal("len")]
    LenKeyword { position: Position },
    #[terminal("new")]
    NewKeyword { position: Position },
    #[terminal("const")]
    ConstKeyword { position: Position },
    #[terminal("public")]
    PublicKeyword { position: Position },
    #[terminal("inline")]
    InlineKeyword { position: Position },
    #[terminal("heap")]
    HeapKeyword { position: Position },
    #[terminal("volatile")]
    VolatileKeyword { position: Position },
    #[terminal("dyn")]
    DynKeyword { position: Position },
    #[terminal("true")]
    TrueKeyword { position: Position },
    #[terminal("false")]
    FalseKeyword { position: Position },

    #[literal("[A-Za-z_][A-Za-z0-9_]*")]
    Ident { position: Position, value: String },
    #[literal("[0-9]+\\.[0-9]+")]
    DoubleLit { position: Position, value: String },
    #[literal("[0-9]+")]
    IntLit { position: Position, value: String },
    #[literal(r#""(\\.|[^"\\])*""#)]
    StringLit { position: Position, value: String },
    #[literal(r#"'(\\.|[^'\\])'"#)]
    CharLit { position: Position, value: String },

    #[terminal("(")]
    LParen { position: Position },
    #[terminal(")")]
    RParen { position: Position },
    #[terminal("{")]
    LBrace { position: Position },
    #[terminal("}")]
    RBrace { position: Position },
    #[terminal("[")]
    LBracket { position: Position },
    #[terminal("]")]
    RBracket { position: Position },
    #[terminal(";")]
    Semicolon { position: Position },
    #[terminal(",")]
    Comma { position: Position },
    #[terminal("::")]
    DoubleColon { position: Position },
    #[terminal(":")]
    Colon { position: Position },
    #[terminal(".")]
    Dot { position: Position },
    #[terminal("?")]
    Question { position: Position },

    #[terminal("==")]
    EqualEqual { position: Position },
    #[terminal("!=")]
    NotEqual { position: Position },
    #[terminal("<=")]
    LessEqual { position: Position },
    #[terminal(">=")]
    GreaterEqual { position: Position },
    #[terminal("<<")]
    ShiftLeft { position: Position },
    #[terminal(">>")]
    ShiftRight { position: Position },
    #[terminal("&&")]
    LogicalAnd { position: Position },
    #[terminal("||")]
    LogicalOr { position: Position },
    #[terminal("++")]
    PlusPlus { position: Position },
    #[terminal("--")]
    MinusMinus { position: Position },
    #[terminal("+=")]
    PlusEqual { position: Position },
    #[terminal("-=")]
    MinusEqual { position: Position },
    #[terminal("*=")]
    StarEqual { position: Position },
    #[terminal("/=")]
    SlashEqual { position: Position },

    #[terminal("<")]
    Less { position: Position },
    #[terminal(">")]
    Greater { position: Position },
    #[terminal("=")]
    Equal { position: Position },
    #[terminal("+")]
    Plus { position: Position },
    #[terminal("-")]
    Minus { position: Position },
    #[terminal("*")]
    Star { position: Position },
    #[terminal("/")]
    Slash { position: Position },
    #[terminal("%")]
    Percent { position: Position },
    #[terminal("!")]
    Bang { position: Position },
    #[terminal("&")]
    Amp { position: Position },
    #[terminal("|")]
    Pipe { position: Position },
    #[terminal("^")]
    Caret { position: Position },
    #[terminal("~")]
    Tilde { position: Position },
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Token::ProcKeyword { .. } => "ProcKeyword",
            Token::FuncKeyword { .. } => "FuncKeyword",
            Token::MethodKeyword { .. } => "MethodKeyword",
            Token::StructKeyword { .. } => "StructKeyword",
            Token::InterfaceKeyword { .. } => "InterfaceKeyword",
            Token::EnumKeyword { .. } => "EnumKeyword",
            Token::TypeKeyword { .. } => "TypeKeyword",
            Token::ImportKeyword { .. } => "ImportKeyword",
            Token::AsKeyword { .. } => "AsKeyword",
            Token::IfKeyword { .. } => "IfKeyword",
            Token::ElseKeyword { .. } => "ElseKeyword",
            Token::WhileKeyword { .. } => "WhileKeyword",
            Token::DoKeyword { .. } => "DoKeyword",
            Token::ForKeyword { .. } => "ForKeyword",
            Token::ForeachKeyword { .. } => "ForeachKeyword",
            Token::ReturnKeyword { .. } => "ReturnKeyword",
            Token::BreakKeyword { .. } => "BreakKeyword",
            Token::ContinueKeyword { .. } => "ContinueKeyword",
            Token::AssertKeyword { .. } => "AssertKeyword",
            Token::PrintfKeyword { .. } => "PrintfKeyword",
            Token::UnsafeKeyword { .. } => "UnsafeKeyword",
            Token::SizeOfKeyword { .. } => "SizeOfKeyword",
            Token::AlignOfKeyword { .. } => "AlignOfKeyword",
            Token::LenKeyword { .. } => "LenKeyword",
            Token::NewKeyword { .. } => "NewKeyword",
            Token::ConstKeyword { .. } => "ConstKeyword",
            Token::PublicKeyword { .. } => "PublicKeyword",
            Token::InlineKeyword { .. } => "InlineKeyword",
            Token::HeapKeyword { .. } => "HeapKeyword",
            Token::VolatileKeyword { .. } => "VolatileKeyword",
            Token::DynKeyword { .. } => "DynKeyword",
            Token::TrueKeyword { .. } => "TrueKeyword",
            Token::FalseKeyword { .. } => "FalseKeyword",
            Token::Ident { value, .. } => return f.debug_struct("Ident").field("value", value).finish(),
            Token::DoubleLit { value, .. } => return f.debug_struct("DoubleLit").field("value", value).finish(),
            Token::IntLit { value, .. } => return f.debug_struct("IntLit").field("value", value).finish(),
            Token::StringLit { value, .. } => return f.debug_struct("StringLit").field("value", value).finish(),
            Token::CharLit { value, .. } => return f.debug_struct("CharLit").field("value", value).finish(),
            Token::LParen { .. } => "LParen",
            Token::RParen { .. } => "RParen",
            Token::LBrace { .. } => "LBrace",
            Token::RBrace { .. } => "RBrace",
            Token::LBracket { .. } => "LBracket",
            Token::RBracket { .. } => "RBracket",
            Token::Semicolon { .. } => "Semicolon",
            Token::Comma { .. } => "Comma",
            Token::DoubleColon { .. } => "DoubleColon",
            Token::Colon { .. } => "Colon",
            Token::Dot { .. } => "Dot",
            Token::Question { .. } => "Question",
            Token::EqualEqual { .. } => "EqualEqual",
            Token::NotEqual { .. } => "NotEqual",
            Token::LessEqual { .. } => "LessEqual",
            Token::GreaterEqual { .. } => "GreaterEqual",
            Token::ShiftLeft { .. } => "ShiftLeft",
            Token::ShiftRight { .. } => "ShiftRight",
            Token::LogicalAnd { .. } => "LogicalAnd",
            Token::LogicalOr { .. } => "LogicalOr",
            Token::PlusPlus { .. } => "PlusPlus",
            Token::MinusMinus { .. } => "MinusMinus",
            Token::PlusEqual { .. } => "PlusEqual",
            Token::MinusEqual { .. } => "MinusEqual",
            Token::StarEqual { .. } => "StarEqual",
            Token::SlashEqual { .. } => "SlashEqual",
            Token::Less { .. } => "Less",
            Token::Greater { .. } => "Greater",
            Token::Equal { .. } => "Equal",
            Token::Plus { .. } => "Plus",
            Token::Minus { .. } => "Minus",
            Token::Star { .. } => "Star",
            Token::Slash { .. } => "Slash",
            Token::Percent { .. } => "Percent",
            Token::Bang { .. } => "Bang",
            Token::Amp { .. } => "Amp",
            Token::Pipe { .. } => "Pipe",
            Token::Caret { .. } => "Caret",
            Token::Tilde { .. } => "Tilde",
        };
        f.debug_struct(name).finish()
    }
}
