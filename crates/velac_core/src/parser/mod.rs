//! Hand-rolled recursive-descent parser turning a [`crate::lexer::Token`] stream
//! into the arena-resident AST [`crate::ast`] defines. Operator precedence
//! climbs through the usual C-family ladder (ternary, logical, bitwise,
//! equality, relational, shift, additive, multiplicative, unary, postfix,
//! primary). Explicit template-argument lists at a call site (`foo<int>(x)`)
//! share `<`/`>` with the relational operators, so a candidate argument list is
//! parsed speculatively and discarded if it doesn't resolve into `>` followed by
//! `(` — the standard way C++-family parsers break this ambiguity without a
//! symbol table available yet.

use std::path::Path;

use crate::ast::{
    Arena, AssignOp, AstNode, AstNodeId, BinOp, BlockNode, PostfixOp, UnOp,
};
use crate::diagnostics::{CodeLoc, ParseError, Position, Span, UnexpectedEndOfFileError, UnexpectedTokenError};
use crate::lexer::Token;

pub fn parse(tokens: &[Token], arena: &mut Arena, file_path: &Path) -> Result<AstNodeId, ParseError> {
    Parser::new(tokens, arena, file_path).parse_program()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    arena: &'a mut Arena,
    file_path: &'a Path,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], arena: &'a mut Arena, file_path: &'a Path) -> Parser<'a> {
        Parser { tokens, pos: 0, arena, file_path }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_position(&self) -> Position {
        self.current().map(token_position).unwrap_or_else(|| Position::new(0, 0))
    }

    fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.current_position(), String::new())
    }

    fn loc_from(&self, start: Position) -> CodeLoc {
        CodeLoc::new(std::sync::Arc::new(self.file_path.to_path_buf()), self.span_from(start))
    }

    fn check(&self, expected: &Token) -> bool {
        self.current().is_some_and(|t| t == expected)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<Token, ParseError> {
        if self.check(expected) {
            Ok(self.advance().expect("checked above"))
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        let start = self.current_position();
        match self.current() {
            Some(token) => ParseError::UnexpectedToken(UnexpectedTokenError {
                loc: self.loc_from(start),
                detail: format!("expected {what}, found {token:?}"),
            }),
            None => ParseError::UnexpectedEndOfFile(UnexpectedEndOfFileError {
                loc: self.loc_from(start),
                detail: format!("expected {what}"),
            }),
        }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.advance() {
            Some(Token::Ident { value, .. }) => Ok(value),
            Some(other) => Err(ParseError::UnexpectedToken(UnexpectedTokenError {
                loc: self.loc_from(self.current_position()),
                detail: format!("expected identifier, found {other:?}"),
            })),
            None => Err(ParseError::UnexpectedEndOfFile(UnexpectedEndOfFileError {
                loc: self.loc_from(self.current_position()),
                detail: "expected identifier".to_string(),
            })),
        }
    }

    // ---- top level -----------------------------------------------------

    fn parse_program(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let mut imports = Vec::new();
        while self.check(&Token::ImportKeyword { position: Position::new(0, 0) }) {
            imports.push(self.parse_import()?);
        }
        let mut decls = Vec::new();
        while self.current().is_some() {
            decls.push(self.parse_top_level_decl()?);
        }
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::Program(crate::ast::Program { meta, imports, decls })))
    }

    fn parse_import(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::ImportKeyword { position: Position::new(0, 0) }, "`import`")?;
        let path_token = self.advance();
        let path = match path_token {
            Some(Token::StringLit { value, .. }) => value.trim_matches('"').to_string(),
            Some(Token::Ident { value, .. }) => value,
            _ => return Err(self.unexpected("an import path")),
        };
        let alias = if self.eat(&Token::AsKeyword { position: Position::new(0, 0) }) {
            self.ident()?
        } else {
            path.rsplit('/').next().unwrap_or(&path).to_string()
        };
        self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::Import(crate::ast::ImportNode { meta, path, alias })))
    }

    fn parse_top_level_decl(&mut self) -> Result<AstNodeId, ParseError> {
        let is_public = self.eat(&Token::PublicKeyword { position: Position::new(0, 0) });
        if self.check(&Token::StructKeyword { position: Position::new(0, 0) }) {
            self.parse_struct_decl(is_public)
        } else if self.check(&Token::InterfaceKeyword { position: Position::new(0, 0) }) {
            self.parse_interface_decl(is_public)
        } else if self.check(&Token::EnumKeyword { position: Position::new(0, 0) }) {
            self.parse_enum_decl(is_public)
        } else if self.check(&Token::TypeKeyword { position: Position::new(0, 0) }) {
            self.parse_type_alias_decl(is_public)
        } else if self.check(&Token::MethodKeyword { position: Position::new(0, 0) }) {
            self.parse_method_decl(is_public)
        } else if self.check(&Token::ProcKeyword { position: Position::new(0, 0) }) || self.check(&Token::FuncKeyword { position: Position::new(0, 0) }) {
            self.parse_function_decl(is_public)
        } else {
            self.parse_global_var_decl(is_public)
        }
    }

    fn parse_template_params(&mut self) -> Result<Vec<String>, ParseError> {
        if !self.eat(&Token::Less { position: Position::new(0, 0) }) {
            return Ok(Vec::new());
        }
        let mut params = Vec::new();
        loop {
            params.push(self.ident()?);
            if !self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                break;
            }
        }
        self.expect(&Token::Greater { position: Position::new(0, 0) }, "`>`")?;
        Ok(params)
    }

    fn parse_struct_decl(&mut self, is_public: bool) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::StructKeyword { position: Position::new(0, 0) }, "`struct`")?;
        let name = self.ident()?;
        let template_params = self.parse_template_params()?;
        let mut implements = Vec::new();
        if self.eat(&Token::Colon { position: Position::new(0, 0) }) {
            loop {
                implements.push(self.ident()?);
                if !self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                    break;
                }
            }
        }
        self.expect(&Token::LBrace { position: Position::new(0, 0) }, "`{`")?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace { position: Position::new(0, 0) }) {
            fields.push(self.parse_field_decl()?);
        }
        self.expect(&Token::RBrace { position: Position::new(0, 0) }, "`}`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::StructDecl(crate::ast::StructDeclNode {
            meta,
            name,
            template_params,
            fields,
            implements,
            is_public,
        })))
    }

    fn parse_field_decl(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let name = self.ident()?;
        self.expect(&Token::Colon { position: Position::new(0, 0) }, "`:`")?;
        let type_name = self.parse_type_name()?;
        self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::FieldDecl(crate::ast::FieldDeclNode { meta, name, type_name })))
    }

    fn parse_interface_decl(&mut self, is_public: bool) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::InterfaceKeyword { position: Position::new(0, 0) }, "`interface`")?;
        let name = self.ident()?;
        self.expect(&Token::LBrace { position: Position::new(0, 0) }, "`{`")?;
        let mut methods = Vec::new();
        while !self.check(&Token::RBrace { position: Position::new(0, 0) }) {
            methods.push(self.parse_function_decl(false)?);
        }
        self.expect(&Token::RBrace { position: Position::new(0, 0) }, "`}`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::InterfaceDecl(crate::ast::InterfaceDeclNode { meta, name, methods, is_public })))
    }

    fn parse_enum_decl(&mut self, is_public: bool) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::EnumKeyword { position: Position::new(0, 0) }, "`enum`")?;
        let name = self.ident()?;
        self.expect(&Token::LBrace { position: Position::new(0, 0) }, "`{`")?;
        let mut variants = Vec::new();
        while !self.check(&Token::RBrace { position: Position::new(0, 0) }) {
            variants.push(self.ident()?);
            if !self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                break;
            }
        }
        self.expect(&Token::RBrace { position: Position::new(0, 0) }, "`}`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::EnumDecl(crate::ast::EnumDeclNode { meta, name, variants, is_public })))
    }

    fn parse_type_alias_decl(&mut self, is_public: bool) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::TypeKeyword { position: Position::new(0, 0) }, "`type`")?;
        let name = self.ident()?;
        self.expect(&Token::Equal { position: Position::new(0, 0) }, "`=`")?;
        let aliased = self.parse_type_name()?;
        self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::TypeAliasDecl(crate::ast::TypeAliasDeclNode { meta, name, aliased, is_public })))
    }

    fn parse_global_var_decl(&mut self, is_public: bool) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let is_const = self.eat(&Token::ConstKeyword { position: Position::new(0, 0) });
        let name = self.ident()?;
        let type_name = if self.eat(&Token::Colon { position: Position::new(0, 0) }) {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let initializer = if self.eat(&Token::Equal { position: Position::new(0, 0) }) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::GlobalVarDecl(crate::ast::GlobalVarDeclNode {
            meta,
            name,
            type_name,
            initializer,
            is_const,
            is_public,
        })))
    }

    fn parse_function_decl(&mut self, is_public: bool) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let is_procedure = self.eat(&Token::ProcKeyword { position: Position::new(0, 0) });
        if !is_procedure {
            self.expect(&Token::FuncKeyword { position: Position::new(0, 0) }, "`func` or `proc`")?;
        }
        let name = self.ident()?;
        let template_params = self.parse_template_params()?;
        let params = self.parse_param_list()?;
        let return_type = if self.eat(&Token::Colon { position: Position::new(0, 0) }) {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let body = if self.check(&Token::Semicolon { position: Position::new(0, 0) }) {
            self.advance();
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            self.arena.alloc(AstNode::Block(BlockNode { meta, stmts: Vec::new() }))
        } else {
            self.parse_block()?
        };
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::FunctionDecl(crate::ast::FunctionDeclNode {
            meta,
            name,
            is_procedure,
            template_params,
            params,
            return_type,
            body,
            is_public,
        })))
    }

    fn parse_method_decl(&mut self, is_public: bool) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::MethodKeyword { position: Position::new(0, 0) }, "`method`")?;
        let struct_name = self.ident()?;
        self.expect(&Token::Dot { position: Position::new(0, 0) }, "`.`")?;
        let name = self.ident()?;
        let template_params = self.parse_template_params()?;
        let params = self.parse_param_list()?;
        let return_type = if self.eat(&Token::Colon { position: Position::new(0, 0) }) {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::MethodDecl(crate::ast::MethodDeclNode {
            meta,
            struct_name,
            name,
            template_params,
            params,
            return_type,
            body,
            is_public,
        })))
    }

    fn parse_param_list(&mut self) -> Result<Vec<AstNodeId>, ParseError> {
        let start = self.current_position();
        self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
        let mut params = Vec::new();
        while !self.check(&Token::RParen { position: Position::new(0, 0) }) {
            let pstart = self.current_position();
            let name = self.ident()?;
            self.expect(&Token::Colon { position: Position::new(0, 0) }, "`:`")?;
            let type_name = self.parse_type_name()?;
            let has_default = self.eat(&Token::Equal { position: Position::new(0, 0) });
            if has_default {
                self.parse_expr()?;
            }
            let meta = crate::ast::NodeMeta::new(self.span_from(pstart));
            params.push(self.arena.alloc(AstNode::Param(crate::ast::ParamNode { meta, name, type_name, has_default })));
            if !self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                break;
            }
        }
        self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
        Ok(params)
    }

    fn parse_type_name(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let is_const = self.eat(&Token::ConstKeyword { position: Position::new(0, 0) });
        let is_ref = self.eat(&Token::Amp { position: Position::new(0, 0) });
        let base = if self.check(&Token::DynKeyword { position: Position::new(0, 0) }) {
            self.advance();
            "dyn".to_string()
        } else {
            self.ident()?
        };
        let template_args = if self.check(&Token::Less { position: Position::new(0, 0) }) {
            self.parse_template_arg_list()?.unwrap_or_default()
        } else {
            Vec::new()
        };
        let mut ptr_depth = 0u8;
        while self.eat(&Token::Star { position: Position::new(0, 0) }) {
            ptr_depth += 1;
        }
        let mut array_sizes = Vec::new();
        while self.eat(&Token::LBracket { position: Position::new(0, 0) }) {
            let size = match self.advance() {
                Some(Token::IntLit { value, .. }) => value.parse::<usize>().unwrap_or(0),
                _ => 0,
            };
            self.expect(&Token::RBracket { position: Position::new(0, 0) }, "`]`")?;
            array_sizes.push(size);
        }
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::TypeName(crate::ast::TypeNameNode {
            meta,
            base,
            template_args,
            ptr_depth,
            is_ref,
            array_sizes,
            is_const,
        })))
    }

    /// Parses `< T, U >` as a template-argument list. Always invoked only where
    /// a `<` cannot also mean "less than" (type-name position); call-site
    /// template arguments instead go through [`Self::try_parse_call_template_args`].
    fn parse_template_arg_list(&mut self) -> Result<Option<Vec<AstNodeId>>, ParseError> {
        let start = self.current_position();
        self.expect(&Token::Less { position: Position::new(0, 0) }, "`<`")?;
        let mut args = Vec::new();
        if !self.check(&Token::Greater { position: Position::new(0, 0) }) {
            loop {
                args.push(self.parse_type_name()?);
                if !self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                    break;
                }
            }
        }
        self.expect(&Token::Greater { position: Position::new(0, 0) }, "`>`")?;
        Ok(Some(args))
    }

    /// Speculatively parses `< TypeName, ... >` immediately followed by `(` as a
    /// call's explicit template-argument list; rewinds and returns `None` if that
    /// shape doesn't hold, so the caller falls back to treating `<` as a
    /// relational operator.
    fn try_parse_call_template_args(&mut self) -> Vec<AstNodeId> {
        if !self.check(&Token::Less { position: Position::new(0, 0) }) {
            return Vec::new();
        }
        let checkpoint = self.pos;
        match self.parse_template_arg_list() {
            Ok(Some(args)) if self.check(&Token::LParen { position: Position::new(0, 0) }) => args,
            _ => {
                self.pos = checkpoint;
                Vec::new()
            }
        }
    }

    // ---- statements ------------------------------------------------------

    fn parse_block(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::LBrace { position: Position::new(0, 0) }, "`{`")?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace { position: Position::new(0, 0) }) {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(&Token::RBrace { position: Position::new(0, 0) }, "`}`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::Block(BlockNode { meta, stmts })))
    }

    fn parse_stmt(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        if self.check(&Token::ConstKeyword { position: Position::new(0, 0) }) || self.is_var_decl_start() {
            return self.parse_var_decl_stmt();
        }
        if self.check(&Token::ReturnKeyword { position: Position::new(0, 0) }) {
            self.advance();
            let value = if self.check(&Token::Semicolon { position: Position::new(0, 0) }) { None } else { Some(self.parse_expr()?) };
            self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::ReturnStmt(crate::ast::ReturnStmtNode { meta, value })));
        }
        if self.check(&Token::BreakKeyword { position: Position::new(0, 0) }) {
            self.advance();
            self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::BreakStmt(crate::ast::BreakStmtNode { meta, depth: 1 })));
        }
        if self.check(&Token::ContinueKeyword { position: Position::new(0, 0) }) {
            self.advance();
            self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::ContinueStmt(crate::ast::ContinueStmtNode { meta, depth: 1 })));
        }
        if self.check(&Token::IfKeyword { position: Position::new(0, 0) }) {
            return self.parse_if_stmt();
        }
        if self.check(&Token::WhileKeyword { position: Position::new(0, 0) }) {
            self.advance();
            self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
            let condition = self.parse_expr()?;
            self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
            let body = self.parse_block()?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::WhileStmt(crate::ast::WhileStmtNode { meta, condition, body })));
        }
        if self.check(&Token::DoKeyword { position: Position::new(0, 0) }) {
            self.advance();
            let body = self.parse_block()?;
            self.expect(&Token::WhileKeyword { position: Position::new(0, 0) }, "`while`")?;
            self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
            let condition = self.parse_expr()?;
            self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
            self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::DoWhileStmt(crate::ast::DoWhileStmtNode { meta, condition, body })));
        }
        if self.check(&Token::ForeachKeyword { position: Position::new(0, 0) }) {
            return self.parse_foreach_stmt();
        }
        if self.check(&Token::ForKeyword { position: Position::new(0, 0) }) {
            return self.parse_for_stmt();
        }
        if self.check(&Token::AssertKeyword { position: Position::new(0, 0) }) {
            self.advance();
            self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
            let condition = self.parse_expr()?;
            self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
            self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::AssertStmt(crate::ast::AssertStmtNode { meta, condition })));
        }
        if self.check(&Token::PrintfKeyword { position: Position::new(0, 0) }) {
            self.advance();
            self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
            let format = match self.advance() {
                Some(Token::StringLit { value, .. }) => value,
                _ => return Err(self.unexpected("a format string")),
            };
            let mut args = Vec::new();
            while self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                args.push(self.parse_expr()?);
            }
            self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
            self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::PrintfStmt(crate::ast::PrintfStmtNode { meta, format, args })));
        }
        if self.check(&Token::UnsafeKeyword { position: Position::new(0, 0) }) {
            self.advance();
            let body = self.parse_block()?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::UnsafeBlockStmt(crate::ast::UnsafeBlockStmtNode { meta, body })));
        }

        // Fall back to an assignment or a bare expression statement.
        let expr = self.parse_expr()?;
        if let Some(op) = self.assign_op() {
            self.advance();
            let value = self.parse_expr()?;
            self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::AssignStmt(crate::ast::AssignStmtNode { meta, target: expr, op, value })));
        }
        self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::ExprStmt(crate::ast::ExprStmtNode { meta, expr })))
    }

    fn assign_op(&self) -> Option<AssignOp> {
        match self.current()? {
            Token::Equal { .. } => Some(AssignOp::Assign),
            Token::PlusEqual { .. } => Some(AssignOp::PlusEq),
            Token::MinusEqual { .. } => Some(AssignOp::MinusEq),
            Token::StarEqual { .. } => Some(AssignOp::MulEq),
            Token::SlashEqual { .. } => Some(AssignOp::DivEq),
            _ => None,
        }
    }

    /// A statement starting with `name : Type` (no keyword) is a local variable
    /// declaration; distinguishing it from a bare expression statement requires
    /// one token of lookahead past the identifier.
    fn is_var_decl_start(&self) -> bool {
        matches!(self.current(), Some(Token::Ident { .. })) && matches!(self.tokens.get(self.pos + 1), Some(Token::Colon { .. }))
    }

    fn parse_var_decl_stmt(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let is_const = self.eat(&Token::ConstKeyword { position: Position::new(0, 0) });
        let name = self.ident()?;
        let type_name = if self.eat(&Token::Colon { position: Position::new(0, 0) }) {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let initializer = if self.eat(&Token::Equal { position: Position::new(0, 0) }) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::VarDeclStmt(crate::ast::VarDeclStmtNode {
            meta,
            name,
            type_name,
            initializer,
            is_const,
        })))
    }

    fn parse_if_stmt(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::IfKeyword { position: Position::new(0, 0) }, "`if`")?;
        self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
        let condition = self.parse_expr()?;
        self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.eat(&Token::ElseKeyword { position: Position::new(0, 0) }) {
            if self.check(&Token::IfKeyword { position: Position::new(0, 0) }) {
                Some(self.parse_if_stmt()?)
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::IfStmt(crate::ast::IfStmtNode { meta, condition, then_branch, else_branch })))
    }

    fn parse_for_stmt(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::ForKeyword { position: Position::new(0, 0) }, "`for`")?;
        self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
        let init = if self.check(&Token::Semicolon { position: Position::new(0, 0) }) {
            None
        } else {
            Some(self.parse_var_decl_stmt_without_semicolon()?)
        };
        self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
        let condition = if self.check(&Token::Semicolon { position: Position::new(0, 0) }) { None } else { Some(self.parse_expr()?) };
        self.expect(&Token::Semicolon { position: Position::new(0, 0) }, "`;`")?;
        let step = if self.check(&Token::RParen { position: Position::new(0, 0) }) { None } else { Some(self.parse_expr()?) };
        self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
        let body = self.parse_block()?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::ForStmt(crate::ast::ForStmtNode { meta, init, condition, step, body })))
    }

    fn parse_var_decl_stmt_without_semicolon(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let is_const = self.eat(&Token::ConstKeyword { position: Position::new(0, 0) });
        let name = self.ident()?;
        let type_name = if self.eat(&Token::Colon { position: Position::new(0, 0) }) {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let initializer = if self.eat(&Token::Equal { position: Position::new(0, 0) }) { Some(self.parse_expr()?) } else { None };
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::VarDeclStmt(crate::ast::VarDeclStmtNode {
            meta,
            name,
            type_name,
            initializer,
            is_const,
        })))
    }

    fn parse_foreach_stmt(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        self.expect(&Token::ForeachKeyword { position: Position::new(0, 0) }, "`foreach`")?;
        self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
        let first = self.ident()?;
        let (index_name, item_name) = if self.eat(&Token::Comma { position: Position::new(0, 0) }) {
            (Some(first), self.ident()?)
        } else {
            (None, first)
        };
        self.expect(&Token::Colon { position: Position::new(0, 0) }, "`:`")?;
        let iterable = self.parse_expr()?;
        self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
        let body = self.parse_block()?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::ForeachStmt(crate::ast::ForeachStmtNode {
            meta,
            index_name,
            item_name,
            iterable,
            body,
        })))
    }

    // ---- expressions -------------------------------------------------

    fn parse_expr(&mut self) -> Result<AstNodeId, ParseError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let condition = self.parse_logical_or()?;
        if self.eat(&Token::Question { position: Position::new(0, 0) }) {
            let then_expr = self.parse_expr()?;
            self.expect(&Token::Colon { position: Position::new(0, 0) }, "`:`")?;
            let else_expr = self.parse_expr()?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::TernaryExpr(crate::ast::TernaryExprNode { meta, condition, then_expr, else_expr })));
        }
        Ok(condition)
    }

    fn binary_level(&mut self, ops: &[(Token, BinOp)], next: fn(&mut Self) -> Result<AstNodeId, ParseError>) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let mut lhs = next(self)?;
        loop {
            let Some((_, op)) = ops.iter().find(|(tok, _)| self.check(tok)) else { break };
            self.advance();
            let rhs = next(self)?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            lhs = self.arena.alloc(AstNode::BinaryExpr(crate::ast::BinaryExprNode { meta, op: *op, lhs, rhs }));
        }
        Ok(lhs)
    }

    fn parse_logical_or(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(&[(Token::LogicalOr { position: Position::new(0, 0) }, BinOp::LogicalOr)], Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(&[(Token::LogicalAnd { position: Position::new(0, 0) }, BinOp::LogicalAnd)], Self::parse_bitwise_or)
    }

    fn parse_bitwise_or(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(&[(Token::Pipe { position: Position::new(0, 0) }, BinOp::BitwiseOr)], Self::parse_bitwise_xor)
    }

    fn parse_bitwise_xor(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(&[(Token::Caret { position: Position::new(0, 0) }, BinOp::BitwiseXor)], Self::parse_bitwise_and)
    }

    fn parse_bitwise_and(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(&[(Token::Amp { position: Position::new(0, 0) }, BinOp::BitwiseAnd)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(
            &[
                (Token::EqualEqual { position: Position::new(0, 0) }, BinOp::Eq),
                (Token::NotEqual { position: Position::new(0, 0) }, BinOp::Neq),
            ],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(
            &[
                (Token::LessEqual { position: Position::new(0, 0) }, BinOp::Le),
                (Token::GreaterEqual { position: Position::new(0, 0) }, BinOp::Ge),
                (Token::Less { position: Position::new(0, 0) }, BinOp::Lt),
                (Token::Greater { position: Position::new(0, 0) }, BinOp::Gt),
            ],
            Self::parse_shift,
        )
    }

    fn parse_shift(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(
            &[
                (Token::ShiftLeft { position: Position::new(0, 0) }, BinOp::Shl),
                (Token::ShiftRight { position: Position::new(0, 0) }, BinOp::Shr),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(
            &[
                (Token::Plus { position: Position::new(0, 0) }, BinOp::Plus),
                (Token::Minus { position: Position::new(0, 0) }, BinOp::Minus),
            ],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> Result<AstNodeId, ParseError> {
        self.binary_level(
            &[
                (Token::Star { position: Position::new(0, 0) }, BinOp::Mul),
                (Token::Slash { position: Position::new(0, 0) }, BinOp::Div),
                (Token::Percent { position: Position::new(0, 0) }, BinOp::Rem),
            ],
            Self::parse_cast,
        )
    }

    /// `expr as Type` casts chain left-associatively, binding tighter than any
    /// binary operator but looser than unary/postfix — mirroring Rust's own `as`.
    fn parse_cast(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let mut expr = self.parse_unary()?;
        while self.eat(&Token::AsKeyword { position: Position::new(0, 0) }) {
            let target_type = self.parse_type_name()?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            expr = self.arena.alloc(AstNode::CastExpr(crate::ast::CastExprNode { meta, target_type, operand: expr }));
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let op = match self.current() {
            Some(Token::Bang { .. }) => Some(UnOp::Not),
            Some(Token::Minus { .. }) => Some(UnOp::Minus),
            Some(Token::Plus { .. }) => Some(UnOp::Plus),
            Some(Token::Tilde { .. }) => Some(UnOp::BitwiseNot),
            Some(Token::Star { .. }) => Some(UnOp::Deref),
            Some(Token::Amp { .. }) => Some(UnOp::AddrOf),
            Some(Token::PlusPlus { .. }) => Some(UnOp::PrefixIncr),
            Some(Token::MinusMinus { .. }) => Some(UnOp::PrefixDecr),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_unary()?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::UnaryExpr(crate::ast::UnaryExprNode { meta, op, operand })));
        }
        if self.check(&Token::SizeOfKeyword { position: Position::new(0, 0) }) {
            self.advance();
            self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
            let target = self.parse_expr()?;
            self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::SizeOfExpr(crate::ast::SizeOfExprNode { meta, target })));
        }
        if self.check(&Token::AlignOfKeyword { position: Position::new(0, 0) }) {
            self.advance();
            self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
            let target = self.parse_expr()?;
            self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::AlignOfExpr(crate::ast::AlignOfExprNode { meta, target })));
        }
        if self.check(&Token::LenKeyword { position: Position::new(0, 0) }) {
            self.advance();
            self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
            let target = self.parse_expr()?;
            self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::LenExpr(crate::ast::LenExprNode { meta, target })));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat(&Token::Dot { position: Position::new(0, 0) }) {
                let field = self.ident()?;
                if self.check(&Token::LParen { position: Position::new(0, 0) }) || self.check(&Token::Less { position: Position::new(0, 0) }) {
                    let template_args = self.try_parse_call_template_args();
                    let args = self.parse_call_args()?;
                    let meta = crate::ast::NodeMeta::new(self.span_from(start));
                    expr = self.arena.alloc(AstNode::MethodCallExpr(crate::ast::MethodCallExprNode {
                        meta,
                        receiver: expr,
                        method: field,
                        template_args,
                        args,
                    }));
                } else {
                    let meta = crate::ast::NodeMeta::new(self.span_from(start));
                    expr = self.arena.alloc(AstNode::FieldAccessExpr(crate::ast::FieldAccessExprNode { meta, receiver: expr, field }));
                }
                continue;
            }
            if self.eat(&Token::LBracket { position: Position::new(0, 0) }) {
                let index = self.parse_expr()?;
                self.expect(&Token::RBracket { position: Position::new(0, 0) }, "`]`")?;
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                expr = self.arena.alloc(AstNode::IndexExpr(crate::ast::IndexExprNode { meta, base: expr, index }));
                continue;
            }
            if self.eat(&Token::PlusPlus { position: Position::new(0, 0) }) {
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                expr = self.arena.alloc(AstNode::PostfixExpr(crate::ast::PostfixExprNode { meta, op: PostfixOp::Incr, operand: expr }));
                continue;
            }
            if self.eat(&Token::MinusMinus { position: Position::new(0, 0) }) {
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                expr = self.arena.alloc(AstNode::PostfixExpr(crate::ast::PostfixExprNode { meta, op: PostfixOp::Decr, operand: expr }));
                continue;
            }
            break;
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<AstNodeId>, ParseError> {
        let start = self.current_position();
        self.expect(&Token::LParen { position: Position::new(0, 0) }, "`(`")?;
        let mut args = Vec::new();
        while !self.check(&Token::RParen { position: Position::new(0, 0) }) {
            args.push(self.parse_expr()?);
            if !self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                break;
            }
        }
        self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<AstNodeId, ParseError> {
        let start = self.current_position();
        match self.advance() {
            Some(Token::IntLit { value, .. }) => {
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                Ok(self.arena.alloc(AstNode::IntLiteral(crate::ast::IntLiteralNode { meta, value: value.parse().unwrap_or(0) })))
            }
            Some(Token::DoubleLit { value, .. }) => {
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                Ok(self.arena.alloc(AstNode::DoubleLiteral(crate::ast::DoubleLiteralNode { meta, value: value.parse().unwrap_or(0.0) })))
            }
            Some(Token::TrueKeyword { .. }) => {
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                Ok(self.arena.alloc(AstNode::BoolLiteral(crate::ast::BoolLiteralNode { meta, value: true })))
            }
            Some(Token::FalseKeyword { .. }) => {
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                Ok(self.arena.alloc(AstNode::BoolLiteral(crate::ast::BoolLiteralNode { meta, value: false })))
            }
            Some(Token::CharLit { value, .. }) => {
                let ch = value.trim_matches('\'').chars().next().unwrap_or('\0');
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                Ok(self.arena.alloc(AstNode::CharLiteral(crate::ast::CharLiteralNode { meta, value: ch })))
            }
            Some(Token::StringLit { value, .. }) => {
                let unescaped = unescape::unescape(value.trim_matches('"')).unwrap_or(value);
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                Ok(self.arena.alloc(AstNode::StringLiteral(crate::ast::StringLiteralNode { meta, value: unescaped })))
            }
            Some(Token::LParen { .. }) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen { position: Position::new(0, 0) }, "`)`")?;
                Ok(inner)
            }
            Some(Token::LBracket { .. }) => {
                let mut items = Vec::new();
                while !self.check(&Token::RBracket { position: Position::new(0, 0) }) {
                    items.push(self.parse_expr()?);
                    if !self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                        break;
                    }
                }
                self.expect(&Token::RBracket { position: Position::new(0, 0) }, "`]`")?;
                let meta = crate::ast::NodeMeta::new(self.span_from(start));
                Ok(self.arena.alloc(AstNode::ArrayLiteralExpr(crate::ast::ArrayLiteralExprNode { meta, items })))
            }
            Some(Token::NewKeyword { .. }) => {
                let name = self.ident()?;
                if self.check(&Token::LBrace { position: Position::new(0, 0) }) {
                    self.parse_struct_literal_fields(name, start)
                } else {
                    self.parse_call_tail(name, Vec::new(), start)
                }
            }
            Some(Token::Ident { value, .. }) => {
                if self.check(&Token::LBrace { position: Position::new(0, 0) }) {
                    self.parse_struct_literal_fields(value, start)
                } else if self.check(&Token::LParen { position: Position::new(0, 0) }) || self.check(&Token::Less { position: Position::new(0, 0) }) {
                    let template_args = self.try_parse_call_template_args();
                    self.parse_call_tail(value, template_args, start)
                } else {
                    let meta = crate::ast::NodeMeta::new(self.span_from(start));
                    Ok(self.arena.alloc(AstNode::Ident(crate::ast::IdentExprNode { meta, name: value })))
                }
            }
            Some(Token::LessEqual { position: pos }) => {
                // `<=expr` never starts a primary; only reachable via malformed input.
                Err(ParseError::UnexpectedToken(UnexpectedTokenError {
                    loc: self.loc_from(pos),
                    detail: "unexpected `<=`".to_string(),
                }))
            }
            Some(other) => Err(ParseError::UnexpectedToken(UnexpectedTokenError {
                loc: self.loc_from(start),
                detail: format!("unexpected {other:?} in expression position"),
            })),
            None => Err(ParseError::UnexpectedEndOfFile(UnexpectedEndOfFileError {
                loc: self.loc_from(start),
                detail: "expected an expression".to_string(),
            })),
        }
    }

    fn parse_call_tail(&mut self, callee: String, template_args: Vec<AstNodeId>, start: Position) -> Result<AstNodeId, ParseError> {
        if !self.check(&Token::LParen { position: Position::new(0, 0) }) {
            let meta = crate::ast::NodeMeta::new(self.span_from(start));
            return Ok(self.arena.alloc(AstNode::Ident(crate::ast::IdentExprNode { meta, name: callee })));
        }
        let args = self.parse_call_args()?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::CallExpr(crate::ast::CallExprNode { meta, callee, template_args, args })))
    }

    fn parse_struct_literal_fields(&mut self, struct_name: String, start: Position) -> Result<AstNodeId, ParseError> {
        self.expect(&Token::LBrace { position: Position::new(0, 0) }, "`{`")?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace { position: Position::new(0, 0) }) {
            fields.push(self.parse_expr()?);
            if !self.eat(&Token::Comma { position: Position::new(0, 0) }) {
                break;
            }
        }
        self.expect(&Token::RBrace { position: Position::new(0, 0) }, "`}`")?;
        let meta = crate::ast::NodeMeta::new(self.span_from(start));
        Ok(self.arena.alloc(AstNode::StructLiteralExpr(crate::ast::StructLiteralExprNode { meta, struct_name, fields })))
    }
}

fn token_position(token: &Token) -> Position {
    match token {
        Token::ProcKeyword { position }
        | Token::FuncKeyword { position }
        | Token::MethodKeyword { position }
        | Token::StructKeyword { position }
        | Token::InterfaceKeyword { position }
        | Token::EnumKeyword { position }
        | Token::TypeKeyword { position }
        | Token::ImportKeyword { position }
        | Token::AsKeyword { position }
        | Token::IfKeyword { position }
        | Token::ElseKeyword { position }
        | Token::WhileKeyword { position }
        | Token::DoKeyword { position }
        | Token::ForKeyword { position }
        | Token::ForeachKeyword { position }
        | Token::ReturnKeyword { position }
        | Token::BreakKeyword { position }
        | Token::ContinueKeyword { position }
        | Token::AssertKeyword { position }
        | Token::PrintfKeyword { position }
        | Token::UnsafeKeyword { position }
        | Token::SizeOfKeyword { position }
        | Token::AlignOfKeyword { position }
        | Token::LenKeyword { position }
        | Token::NewKeyword { position }
        | Token::ConstKeyword { position }
        | Token::PublicKeyword { position }
        | Token::InlineKeyword { position }
        | Token::HeapKeyword { position }
        | Token::VolatileKeyword { position }
        | Token::DynKeyword { position }
        | Token::TrueKeyword { position }
        | Token::FalseKeyword { position }
        | Token::Ident { position, .. }
        | Token::DoubleLit { position, .. }
        | Token::IntLit { position, .. }
        | Token::StringLit { position, .. }
        | Token::CharLit { position, .. }
        | Token::LParen { position }
        | Token::RParen { position }
        | Token::LBrace { position }
        | Token::RBrace { position }
        | Token::LBracket { position }
        | Token::RBracket { position }
        | Token::Semicolon { position }
        | Token::Comma { position }
        | Token::DoubleColon { position }
        | Token::Colon { position }
        | Token::Dot { position }
        | Token::Question { position }
        | Token::EqualEqual { position }
        | Token::NotEqual { position }
        | Token::LessEqual { position }
        | Token::GreaterEqual { position }
        | Token::ShiftLeft { position }
        | Token::ShiftRight { position }
        | Token::LogicalAnd { position }
        | Token::LogicalOr { position }
        | Token::PlusPlus { position }
        | Token::MinusMinus { position }
        | Token::PlusEqual { position }
        | Token::MinusEqual { position }
        | Token::StarEqual { position }
        | Token::SlashEqual { position }
        | Token::Less { position }
        | Token::Greater { position }
        | Token::Equal { position }
        | Token::Plus { position }
        | Token::Minus { position }
        | Token::Star { position }
        | Token::Slash { position }
        | Token::Percent { position }
        | Token::Bang { position }
        | Token::Amp { position }
        | Token::Pipe { position }
        | Token::Caret { position }
        | Token::Tilde { position } => *position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Arena;

    fn parse_source(src: &str) -> (Arena, AstNodeId) {
        let tokens = crate::lexer::lex(src, Path::new("test.vl")).expect("lex");
        let mut arena = Arena::new();
        let root = parse(&tokens, &mut arena, Path::new("test.vl")).expect("parse");
        (arena, root)
    }

    #[test]
    fn parses_minimal_procedure() {
        let (arena, root) = parse_source("proc main() { return 0; }");
        let AstNode::Program(program) = arena.get(root) else { panic!("expected Program") };
        assert_eq!(program.decls.len(), 1);
        assert!(matches!(arena.get(program.decls[0]), AstNode::FunctionDecl(_)));
    }

    #[test]
    fn parses_struct_with_template_param_and_field() {
        let (arena, root) = parse_source("struct Box<T> { value: T; }");
        let AstNode::Program(program) = arena.get(root) else { panic!() };
        let AstNode::StructDecl(s) = arena.get(program.decls[0]) else { panic!() };
        assert_eq!(s.template_params, vec!["T".to_string()]);
        assert_eq!(s.fields.len(), 1);
    }

    #[test]
    fn parses_relational_expression_without_consuming_as_template_args() {
        let (arena, root) = parse_source("proc main() { x = a < b; }");
        let AstNode::Program(program) = arena.get(root) else { panic!() };
        let AstNode::FunctionDecl(f) = arena.get(program.decls[0]) else { panic!() };
        let AstNode::Block(block) = arena.get(f.body) else { panic!() };
        assert!(matches!(arena.get(block.stmts[0]), AstNode::AssignStmt(_)));
    }

    #[test]
    fn parses_call_with_explicit_template_args() {
        let (arena, root) = parse_source("proc main() { make<int>(1); }");
        let AstNode::Program(program) = arena.get(root) else { panic!() };
        let AstNode::FunctionDecl(f) = arena.get(program.decls[0]) else { panic!() };
        let AstNode::Block(block) = arena.get(f.body) else { panic!() };
        let AstNode::ExprStmt(stmt) = arena.get(block.stmts[0]) else { panic!() };
        let AstNode::CallExpr(call) = arena.get(stmt.expr) else { panic!("expected CallExpr") };
        assert_eq!(call.template_args.len(), 1);
    }

    #[test]
    fn parses_if_else_and_while() {
        let (arena, root) = parse_source("proc main() { if (1) { } else { } while (1) { } }");
        let AstNode::Program(program) = arena.get(root) else { panic!() };
        let AstNode::FunctionDecl(f) = arena.get(program.decls[0]) else { panic!() };
        let AstNode::Block(block) = arena.get(f.body) else { panic!() };
        assert_eq!(block.stmts.len(), 2);
        assert!(matches!(arena.get(block.stmts[0]), AstNode::IfStmt(_)));
        assert!(matches!(arena.get(block.stmts[1]), AstNode::WhileStmt(_)));
    }

    #[test]
    fn parse_error_reports_location_on_missing_semicolon() {
        let tokens = crate::lexer::lex("proc main() { return 0 }", Path::new("test.vl")).unwrap();
        let mut arena = Arena::new();
        assert!(parse(&tokens, &mut arena, Path::new("test.vl")).is_err());
    }
}
