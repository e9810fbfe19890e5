//! Double-dispatch visitor mechanism over [`super::AstNode`].
//!
//! Two trait flavors are provided: [`Visitor`] for passes that need to mutate
//! per-node bookkeeping (the type checker, the IR generator) and
//! [`ReadOnlyVisitor`] for passes that only ever read the tree (CST/AST
//! visualizers, warning collectors). Both default every method to a no-op/recurse
//! so a pass only overrides the node kinds it cares about.

use super::*;

/// A mutating tree walk. Implementors receive the owning [`Arena`] so they can
/// resolve child ids; the ambient manifestation index is carried by the visitor
/// itself, never by the node.
pub trait Visitor {
    fn man_idx(&self) -> usize;

    fn visit_program(&mut self, arena: &Arena, node: &Program) {
        for &id in &node.imports {
            self.visit(arena, id);
        }
        for &id in &node.decls {
            self.visit(arena, id);
        }
    }
    fn visit_function_decl(&mut self, arena: &Arena, node: &FunctionDeclNode) {
        self.visit(arena, node.body);
    }
    fn visit_method_decl(&mut self, arena: &Arena, node: &MethodDeclNode) {
        self.visit(arena, node.body);
    }
    fn visit_struct_decl(&mut self, _arena: &Arena, _node: &StructDeclNode) {}
    fn visit_interface_decl(&mut self, _arena: &Arena, _node: &InterfaceDeclNode) {}
    fn visit_enum_decl(&mut self, _arena: &Arena, _node: &EnumDeclNode) {}
    fn visit_type_alias_decl(&mut self, _arena: &Arena, _node: &TypeAliasDeclNode) {}
    fn visit_global_var_decl(&mut self, arena: &Arena, node: &GlobalVarDeclNode) {
        if let Some(init) = node.initializer {
            self.visit(arena, init);
        }
    }
    fn visit_block(&mut self, arena: &Arena, node: &BlockNode) {
        for &id in &node.stmts {
            self.visit(arena, id);
        }
    }
    fn visit_var_decl_stmt(&mut self, arena: &Arena, node: &VarDeclStmtNode) {
        if let Some(init) = node.initializer {
            self.visit(arena, init);
        }
    }
    fn visit_assign_stmt(&mut self, arena: &Arena, node: &AssignStmtNode) {
        self.visit(arena, node.target);
        self.visit(arena, node.value);
    }
    fn visit_return_stmt(&mut self, arena: &Arena, node: &ReturnStmtNode) {
        if let Some(v) = node.value {
            self.visit(arena, v);
        }
    }
    fn visit_break_stmt(&mut self, _arena: &Arena, _node: &BreakStmtNode) {}
    fn visit_continue_stmt(&mut self, _arena: &Arena, _node: &ContinueStmtNode) {}
    fn visit_if_stmt(&mut self, arena: &Arena, node: &IfStmtNode) {
        self.visit(arena, node.condition);
        self.visit(arena, node.then_branch);
        if let Some(e) = node.else_branch {
            self.visit(arena, e);
        }
    }
    fn visit_while_stmt(&mut self, arena: &Arena, node: &WhileStmtNode) {
        self.visit(arena, node.condition);
        self.visit(arena, node.body);
    }
    fn visit_do_while_stmt(&mut self, arena: &Arena, node: &DoWhileStmtNode) {
        self.visit(arena, node.body);
        self.visit(arena, node.condition);
    }
    fn visit_for_stmt(&mut self, arena: &Arena, node: &ForStmtNode) {
        if let Some(i) = node.init {
            self.visit(arena, i);
        }
        if let Some(c) = node.condition {
            self.visit(arena, c);
        }
        if let Some(s) = node.step {
            self.visit(arena, s);
        }
        self.visit(arena, node.body);
    }
    fn visit_foreach_stmt(&mut self, arena: &Arena, node: &ForeachStmtNode) {
        self.visit(arena, node.iterable);
        self.visit(arena, node.body);
    }
    fn visit_assert_stmt(&mut self, arena: &Arena, node: &AssertStmtNode) {
        self.visit(arena, node.condition);
    }
    fn visit_printf_stmt(&mut self, arena: &Arena, node: &PrintfStmtNode) {
        for &id in &node.args {
            self.visit(arena, id);
        }
    }
    fn visit_unsafe_block_stmt(&mut self, arena: &Arena, node: &UnsafeBlockStmtNode) {
        self.visit(arena, node.body);
    }
    fn visit_expr_stmt(&mut self, arena: &Arena, node: &ExprStmtNode) {
        self.visit(arena, node.expr);
    }
    fn visit_ident(&mut self, _arena: &Arena, _node: &IdentExprNode) {}
    fn visit_int_literal(&mut self, _arena: &Arena, _node: &IntLiteralNode) {}
    fn visit_double_literal(&mut self, _arena: &Arena, _node: &DoubleLiteralNode) {}
    fn visit_bool_literal(&mut self, _arena: &Arena, _node: &BoolLiteralNode) {}
    fn visit_char_literal(&mut self, _arena: &Arena, _node: &CharLiteralNode) {}
    fn visit_string_literal(&mut self, _arena: &Arena, _node: &StringLiteralNode) {}
    fn visit_binary_expr(&mut self, arena: &Arena, node: &BinaryExprNode) {
        self.visit(arena, node.lhs);
        self.visit(arena, node.rhs);
    }
    fn visit_unary_expr(&mut self, arena: &Arena, node: &UnaryExprNode) {
        self.visit(arena, node.operand);
    }
    fn visit_postfix_expr(&mut self, arena: &Arena, node: &PostfixExprNode) {
        self.visit(arena, node.operand);
    }
    fn visit_ternary_expr(&mut self, arena: &Arena, node: &TernaryExprNode) {
        self.visit(arena, node.condition);
        self.visit(arena, node.then_expr);
        self.visit(arena, node.else_expr);
    }
    fn visit_cast_expr(&mut self, arena: &Arena, node: &CastExprNode) {
        self.visit(arena, node.operand);
    }
    fn visit_call_expr(&mut self, arena: &Arena, node: &CallExprNode) {
        for &id in &node.args {
            self.visit(arena, id);
        }
    }
    fn visit_method_call_expr(&mut self, arena: &Arena, node: &MethodCallExprNode) {
        self.visit(arena, node.receiver);
        for &id in &node.args {
            self.visit(arena, id);
        }
    }
    fn visit_field_access_expr(&mut self, arena: &Arena, node: &FieldAccessExprNode) {
        self.visit(arena, node.receiver);
    }
    fn visit_index_expr(&mut self, arena: &Arena, node: &IndexExprNode) {
        self.visit(arena, node.base);
        self.visit(arena, node.index);
    }
    fn visit_struct_literal_expr(&mut self, arena: &Arena, node: &StructLiteralExprNode) {
        for &id in &node.fields {
            self.visit(arena, id);
        }
    }
    fn visit_array_literal_expr(&mut self, arena: &Arena, node: &ArrayLiteralExprNode) {
        for &id in &node.items {
            self.visit(arena, id);
        }
    }
    fn visit_size_of_expr(&mut self, _arena: &Arena, _node: &SizeOfExprNode) {}
    fn visit_align_of_expr(&mut self, _arena: &Arena, _node: &AlignOfExprNode) {}
    fn visit_len_expr(&mut self, arena: &Arena, node: &LenExprNode) {
        self.visit(arena, node.target);
    }

    /// Dispatches to the concrete `visit_*` method for whichever variant `id`
    /// names. This is the single point every recursive call above funnels
    /// through, so overriding one `visit_*` method changes every path that
    /// reaches that node kind.
    fn visit(&mut self, arena: &Arena, id: AstNodeId) {
        match arena.get(id) {
            AstNode::Program(n) => self.visit_program(arena, n),
            AstNode::Import(_) => {}
            AstNode::FunctionDecl(n) => self.visit_function_decl(arena, n),
            AstNode::MethodDecl(n) => self.visit_method_decl(arena, n),
            AstNode::Param(_) => {}
            AstNode::StructDecl(n) => self.visit_struct_decl(arena, n),
            AstNode::FieldDecl(_) => {}
            AstNode::InterfaceDecl(n) => self.visit_interface_decl(arena, n),
            AstNode::EnumDecl(n) => self.visit_enum_decl(arena, n),
            AstNode::TypeAliasDecl(n) => self.visit_type_alias_decl(arena, n),
            AstNode::GlobalVarDecl(n) => self.visit_global_var_decl(arena, n),
            AstNode::TypeName(_) => {}
            AstNode::Block(n) => self.visit_block(arena, n),
            AstNode::VarDeclStmt(n) => self.visit_var_decl_stmt(arena, n),
            AstNode::AssignStmt(n) => self.visit_assign_stmt(arena, n),
            AstNode::ReturnStmt(n) => self.visit_return_stmt(arena, n),
            AstNode::BreakStmt(n) => self.visit_break_stmt(arena, n),
            AstNode::ContinueStmt(n) => self.visit_continue_stmt(arena, n),
            AstNode::IfStmt(n) => self.visit_if_stmt(arena, n),
            AstNode::WhileStmt(n) => self.visit_while_stmt(arena, n),
            AstNode::DoWhileStmt(n) => self.visit_do_while_stmt(arena, n),
            AstNode::ForStmt(n) => self.visit_for_stmt(arena, n),
            AstNode::ForeachStmt(n) => self.visit_foreach_stmt(arena, n),
            AstNode::AssertStmt(n) => self.visit_assert_stmt(arena, n),
            AstNode::PrintfStmt(n) => self.visit_printf_stmt(arena, n),
            AstNode::UnsafeBlockStmt(n) => self.visit_unsafe_block_stmt(arena, n),
            AstNode::ExprStmt(n) => self.visit_expr_stmt(arena, n),
            AstNode::Ident(n) => self.visit_ident(arena, n),
            AstNode::IntLiteral(n) => self.visit_int_literal(arena, n),
            AstNode::DoubleLiteral(n) => self.visit_double_literal(arena, n),
            AstNode::BoolLiteral(n) => self.visit_bool_literal(arena, n),
            AstNode::CharLiteral(n) => self.visit_char_literal(arena, n),
            AstNode::StringLiteral(n) => self.visit_string_literal(arena, n),
            AstNode::BinaryExpr(n) => self.visit_binary_expr(arena, n),
            AstNode::UnaryExpr(n) => self.visit_unary_expr(arena, n),
            AstNode::PostfixExpr(n) => self.visit_postfix_expr(arena, n),
            AstNode::TernaryExpr(n) => self.visit_ternary_expr(arena, n),
            AstNode::CastExpr(n) => self.visit_cast_expr(arena, n),
            AstNode::CallExpr(n) => self.visit_call_expr(arena, n),
            AstNode::MethodCallExpr(n) => self.visit_method_call_expr(arena, n),
            AstNode::FieldAccessExpr(n) => self.visit_field_access_expr(arena, n),
            AstNode::IndexExpr(n) => self.visit_index_expr(arena, n),
            AstNode::StructLiteralExpr(n) => self.visit_struct_literal_expr(arena, n),
            AstNode::ArrayLiteralExpr(n) => self.visit_array_literal_expr(arena, n),
            AstNode::SizeOfExpr(n) => self.visit_size_of_expr(arena, n),
            AstNode::AlignOfExpr(n) => self.visit_align_of_expr(arena, n),
            AstNode::LenExpr(n) => self.visit_len_expr(arena, n),
        }
    }
}

/// A read-only variant used by visualizers and warning collectors, which never
/// need to carry a manifestation index because they don't consult resolved types.
pub trait ReadOnlyVisitor {
    fn visit(&mut self, arena: &Arena, id: AstNodeId) {
        walk_read_only(self, arena, id);
    }
}

fn walk_read_only<V: ReadOnlyVisitor + ?Sized>(visitor: &mut V, arena: &Arena, id: AstNodeId) {
    match arena.get(id) {
        AstNode::Program(n) => {
            for &c in n.imports.iter().chain(n.decls.iter()) {
                visitor.visit(arena, c);
            }
        }
        AstNode::FunctionDecl(n) => visitor.visit(arena, n.body),
        AstNode::MethodDecl(n) => visitor.visit(arena, n.body),
        AstNode::Block(n) => {
            for &c in &n.stmts {
                visitor.visit(arena, c);
            }
        }
        AstNode::ExprStmt(n) => visitor.visit(arena, n.expr),
        AstNode::IfStmt(n) => {
            visitor.visit(arena, n.condition);
            visitor.visit(arena, n.then_branch);
            if let Some(e) = n.else_branch {
                visitor.visit(arena, e);
            }
        }
        _ => {}
    }
}
