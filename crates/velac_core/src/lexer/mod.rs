//! Lexical analysis: turns source text into a flat [`Token`] stream. Built on
//! top of the regex-driven, longest-match `Lexikon` table the `velac_lex_derive`
//! proc macros generate from the `#[terminal]`/`#[literal]` attributes on
//! [`Token`] itself. The exact grammar this lexer/parser pair accepts is a
//! reduced, representative subset of the full language grammar, not a
//! byte-for-byte reproduction of one — only the lexical categories the type
//! checker needs to see (keywords, literals, punctuation, operators) matter
//! here, not exhaustive coverage of every valid program shape.

mod token;

pub use token::Token;

use std::path::Path;

use crate::diagnostics::{LexError, Position, UnknownTokenError};

/// Entry point: lexes `source` in full, returning every token found or the
/// first lexical error encountered. `file_path` is only used for error
/// reporting.
pub fn lex(source: &str, file_path: &Path) -> Result<Vec<Token>, LexError> {
    Lexer::new(source, file_path).run()
}

struct Lexer<'a> {
    input: &'a str,
    file_path: &'a Path,
    lexikon: token::Lexikon,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str, file_path: &'a Path) -> Lexer<'a> {
        Lexer {
            input,
            file_path,
            lexikon: token::Lexikon::new(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    fn eat_whitespace_and_comments(&mut self) {
        loop {
            let bytes = self.input.as_bytes();
            let mut advanced = false;
            while let Some(&c) = bytes.get(self.position) {
                if !(c as char).is_whitespace() {
                    break;
                }
                if c == b'\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
                self.position += 1;
                advanced = true;
            }
            if self.input[self.position..].starts_with("//") {
                while let Some(&c) = bytes.get(self.position) {
                    if c == b'\n' {
                        break;
                    }
                    self.position += 1;
                    self.column += 1;
                }
                advanced = true;
            }
            if !advanced {
                return;
            }
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.eat_whitespace_and_comments();
            if self.position >= self.input.len() {
                return Ok(tokens);
            }
            let position = Position::new(self.line, self.column);
            let (len, matched) = self.lexikon.find_longest_match(&self.input[self.position..], position);
            match matched {
                Some(token) => {
                    tokens.push(token);
                    self.position += len;
                    self.column += len;
                }
                None => {
                    let remainder: String = self.input[self.position..].chars().take(20).collect();
                    return Err(LexError::UnknownToken(UnknownTokenError {
                        loc: crate::diagnostics::CodeLoc::new(
                            std::sync::Arc::new(self.file_path.to_path_buf()),
                            crate::diagnostics::Span::new(position, position, remainder.clone()),
                        ),
                        detail: remainder,
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_str(src: &str) -> Vec<Token> {
        lex(src, Path::new("test.vl")).unwrap()
    }

    #[test]
    fn lexes_a_minimal_function() {
        let tokens = lex_str("proc main() { return 0; }");
        assert!(matches!(tokens[0], Token::ProcKeyword { .. }));
        assert!(matches!(tokens[1], Token::Ident { .. }));
        assert!(matches!(tokens[2], Token::LParen { .. }));
        assert!(matches!(tokens[3], Token::RParen { .. }));
        assert!(matches!(tokens[4], Token::LBrace { .. }));
        assert!(matches!(tokens[5], Token::ReturnKeyword { .. }));
        assert!(matches!(tokens[6], Token::IntLit { .. }));
        assert!(matches!(tokens[7], Token::Semicolon { .. }));
        assert!(matches!(tokens[8], Token::RBrace { .. }));
    }

    #[test]
    fn keyword_wins_over_identifier_rule() {
        let tokens = lex_str("struct");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0], Token::StructKeyword { .. }));
    }

    #[test]
    fn identifier_with_keyword_prefix_is_not_split() {
        let tokens = lex_str("structure");
        assert_eq!(tokens.len(), 1);
        match &tokens[0] {
            Token::Ident { value, .. } => assert_eq!(value, "structure"),
            other => panic!("expected Ident, got {other:?}"),
        }
    }

    #[test]
    fn multi_char_operators_are_not_split_into_singles() {
        let tokens = lex_str("a <= b");
        assert!(matches!(tokens[1], Token::LessEqual { .. }));
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lex_str("// a comment\nproc");
        assert_eq!(tokens.len(), 1);
        assert!(matches!(tokens[0], Token::ProcKeyword { .. }));
    }

    #[test]
    fn string_literal_captures_escape_sequences() {
        let tokens = lex_str(r#""a\"b""#);
        match &tokens[0] {
            Token::StringLit { value, .. } => assert_eq!(value, r#""a\"b""#),
            other => panic!("expected StringLit, got {other:?}"),
        }
    }

    #[test]
    fn unknown_character_reports_lex_error() {
        let result = lex("`", Path::new("test.vl"));
        assert!(result.is_err());
    }
}
