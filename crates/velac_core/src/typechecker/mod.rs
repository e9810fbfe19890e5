//! Two-phase type checker (component C6): a bottom-up `prepare` pass that
//! registers every struct/function/global signature into scope before any body
//! is examined, followed by a top-down `check` pass that types every statement
//! and expression, re-entering itself up to ten times so a generic call site
//! discovered late in one pass can still resolve a manifestation declared later
//! in the file. Structured after the teacher's `TypeChecker` driver
//! (`shallow_check` before `check`, a `validate` pass after), but working over
//! an arena-indexed AST instead of owned child nodes.

pub mod context;
pub mod generics;
pub mod operator_rules;
pub mod types;

use crate::ast::*;
use crate::diagnostics::{CodeLoc, CompilerError, SemanticError, Warning};
use crate::manager::{FunctionManager, FunctionManifestation, StructManager, StructManifestation};
use crate::scope::{EntryFlags, Scope, ScopeKind};

pub use context::Context;
pub use types::{GenericType, Specifiers, SuperType, Type};

/// How many times [`TypeChecker::check_program`] will re-run its top-down pass
/// before concluding the program does not converge (a mutual-generic-dependency
/// cycle that never stabilizes). Mirrors the teacher's hardcoded re-visit cap.
pub const MAX_REVISIT_ITERATIONS: u32 = 10;

pub struct TypeChecker<'a> {
    pub arena: &'a Arena,
    pub functions: &'a FunctionManager,
    pub structs: &'a StructManager,
    pub file_path: std::sync::Arc<std::path::PathBuf>,
    pending_generic_calls: u32,
    /// The file's global scope, stashed here during [`TypeChecker::check_program`]
    /// so generic struct-literal substantiation can mount a deep-copied body scope
    /// as a child of it without threading an extra parameter through every
    /// `check_expr` call.
    global: Option<Scope>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(arena: &'a Arena, functions: &'a FunctionManager, structs: &'a StructManager, file_path: std::sync::Arc<std::path::PathBuf>) -> Self {
        TypeChecker {
            arena,
            functions,
            structs,
            file_path,
            pending_generic_calls: 0,
            global: None,
        }
    }

    fn loc(&self, span: &crate::diagnostics::Span) -> CodeLoc {
        CodeLoc::new(self.file_path.clone(), span.clone())
    }

    fn type_name_node(&self, id: AstNodeId) -> &TypeNameNode {
        match self.arena.get(id) {
            AstNode::TypeName(n) => n,
            _ => panic!("expected a TypeName node"),
        }
    }

    /// Resolves a `TypeName` AST node to a concrete or generic [`Type`], looking
    /// up generics and struct/interface/enum names in `scope`.
    pub fn resolve_type_name(&self, scope: &Scope, id: AstNodeId) -> Result<Type, SemanticError> {
        let node = self.type_name_node(id);
        let mut ty = if scope.lookup_generic_type(&node.base).is_some() {
            Type::generic(node.base.clone())
        } else {
            match node.base.as_str() {
                "int" => Type::primitive(SuperType::Int),
                "short" => Type::primitive(SuperType::Short),
                "long" => Type::primitive(SuperType::Long),
                "byte" => Type::primitive(SuperType::Byte),
                "double" => Type::primitive(SuperType::Double),
                "char" => Type::primitive(SuperType::Char),
                "string" => Type::primitive(SuperType::String),
                "bool" => Type::primitive(SuperType::Bool),
                "void" => Type::primitive(SuperType::Void),
                "dyn" => Type::dyn_type(),
                other => {
                    let template_types = node
                        .template_args
                        .iter()
                        .map(|&a| self.resolve_type_name(scope, a))
                        .collect::<Result<Vec<_>, _>>()?;
                    if let Some(aliased) = scope.lookup_alias(other) {
                        aliased
                    } else if scope.get_child_scope(&format!("struct:{other}")).is_some() || scope.lookup_struct_scope(other).is_some() {
                        Type::named(SuperType::Struct, other, template_types)
                    } else if scope.get_child_scope(&format!("interface:{other}")).is_some() {
                        Type::named(SuperType::Interface, other, template_types)
                    } else if scope.get_child_scope(&format!("enum:{other}")).is_some() {
                        Type::named(SuperType::Enum, other, template_types)
                    } else {
                        return Err(SemanticError::ReferencedUndefinedType(crate::diagnostics::ReferencedUndefinedTypeError {
                            loc: self.loc(&node.meta.span),
                            detail: other.to_string(),
                        }));
                    }
                }
            }
        };
        for _ in 0..node.ptr_depth {
            ty = ty.to_pointer();
        }
        if node.is_ref {
            ty = ty.to_reference();
        }
        for &size in &node.array_sizes {
            ty = ty.to_array(size);
        }
        if node.is_const {
            ty = ty.with_specifiers(Specifiers::CONST);
        }
        Ok(ty)
    }

    /// Bottom-up signature-registration pass: every top-level struct, interface,
    /// enum and function/procedure declaration gets a scope and a symbol table
    /// entry before any body is checked, so mutually-recursive declarations (a
    /// struct whose method returns another struct declared later in the file)
    /// resolve regardless of declaration order.
    pub fn shallow_check_program(&self, global: &Scope, program: AstNodeId) -> Result<(), Vec<SemanticError>> {
        let mut errors = Vec::new();
        let AstNode::Program(prog) = self.arena.get(program) else {
            panic!("shallow_check_program expects a Program node")
        };
        // Interfaces, enums and aliases go first: a struct's `implements` list and
        // any declaration's type names may reference them before they're declared
        // in source order.
        for &decl in &prog.decls {
            match self.arena.get(decl) {
                AstNode::InterfaceDecl(_) => {
                    if let Err(e) = self.shallow_check_interface(global, decl) {
                        errors.push(e);
                    }
                }
                AstNode::EnumDecl(_) => {
                    if let Err(e) = self.shallow_check_enum(global, decl) {
                        errors.push(e);
                    }
                }
                AstNode::TypeAliasDecl(_) => {
                    if let Err(e) = self.shallow_check_alias(global, decl) {
                        errors.push(e);
                    }
                }
                _ => {}
            }
        }
        for &decl in &prog.decls {
            if let AstNode::StructDecl(_) = self.arena.get(decl) {
                if let Err(e) = self.shallow_check_struct(global, decl) {
                    errors.push(e);
                }
            }
        }
        for &decl in &prog.decls {
            match self.arena.get(decl) {
                AstNode::FunctionDecl(_) => {
                    if let Err(e) = self.shallow_check_function(global, decl) {
                        errors.push(e);
                    }
                }
                AstNode::MethodDecl(_) => {
                    if let Err(e) = self.shallow_check_method(global, decl) {
                        errors.push(e);
                    }
                }
                AstNode::GlobalVarDecl(n) => {
                    if let Err(e) = self.shallow_check_global(global, decl, n) {
                        errors.push(e);
                    }
                }
                _ => {}
            }
        }
        // Every method a struct's `implements` promises must actually be declared,
        // now that both structs and methods are interned.
        for &decl in &prog.decls {
            let AstNode::StructDecl(s) = self.arena.get(decl) else { continue };
            for iface in &s.implements {
                let Some(iface_scope) = global.get_child_scope(&format!("interface:{iface}")) else {
                    continue;
                };
                for method_name in iface_scope.entry_names() {
                    let qualified = format!("{}.{}", s.name, method_name);
                    if self.functions.candidates(&qualified).is_empty() {
                        errors.push(SemanticError::InterfaceMethodNotImplemented(crate::diagnostics::InterfaceMethodNotImplementedError {
                            loc: self.loc(&s.meta.span),
                            detail: format!("`{}` does not implement `{iface}.{method_name}`", s.name),
                        }));
                    }
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn shallow_check_interface(&self, global: &Scope, decl: AstNodeId) -> Result<(), SemanticError> {
        let AstNode::InterfaceDecl(i) = self.arena.get(decl) else { unreachable!() };
        let body = global.create_child_scope(format!("interface:{}", i.name), ScopeKind::Interface);
        for &method_id in &i.methods {
            let AstNode::FunctionDecl(m) = self.arena.get(method_id) else { unreachable!() };
            body.insert(m.name.clone(), Type::primitive(SuperType::Function), Some(method_id), EntryFlags::empty()).ok();
        }
        let iface_type = Type::named(SuperType::Interface, i.name.clone(), vec![]);
        global.insert(i.name.clone(), iface_type, Some(decl), EntryFlags::GLOBAL).map_err(|_| {
            SemanticError::InterfaceDeclaredTwice(crate::diagnostics::InterfaceDeclaredTwiceError {
                loc: self.loc(&i.meta.span),
                detail: i.name.clone(),
            })
        })?;
        Ok(())
    }

    fn shallow_check_enum(&self, global: &Scope, decl: AstNodeId) -> Result<(), SemanticError> {
        let AstNode::EnumDecl(e) = self.arena.get(decl) else { unreachable!() };
        let body = global.create_child_scope(format!("enum:{}", e.name), ScopeKind::Enum);
        let enum_type = Type::named(SuperType::Enum, e.name.clone(), vec![]);
        for variant in &e.variants {
            body.insert(variant.clone(), enum_type.clone(), Some(decl), EntryFlags::GLOBAL).map_err(|_| {
                SemanticError::EnumDeclaredTwice(crate::diagnostics::EnumDeclaredTwiceError {
                    loc: self.loc(&e.meta.span),
                    detail: variant.clone(),
                })
            })?;
        }
        global.insert(e.name.clone(), enum_type, Some(decl), EntryFlags::GLOBAL).map_err(|_| {
            SemanticError::EnumDeclaredTwice(crate::diagnostics::EnumDeclaredTwiceError {
                loc: self.loc(&e.meta.span),
                detail: e.name.clone(),
            })
        })?;
        Ok(())
    }

    fn shallow_check_alias(&self, global: &Scope, decl: AstNodeId) -> Result<(), SemanticError> {
        let AstNode::TypeAliasDecl(a) = self.arena.get(decl) else { unreachable!() };
        let target = self.resolve_type_name(global, a.aliased)?;
        global.insert_alias(a.name.clone(), target);
        Ok(())
    }

    fn shallow_check_struct(&self, global: &Scope, decl: AstNodeId) -> Result<(), SemanticError> {
        let AstNode::StructDecl(s) = self.arena.get(decl) else { unreachable!() };
        let body = global.create_child_scope(format!("struct:{}", s.name), ScopeKind::Struct);
        for generic_name in &s.template_params {
            body.insert_generic_type(GenericType::unconstrained(generic_name.clone()));
        }
        for &field_id in &s.fields {
            let AstNode::FieldDecl(field) = self.arena.get(field_id) else { unreachable!() };
            let ty = self.resolve_type_name(&body, field.type_name)?;
            body.insert(field.name.clone(), ty, Some(field_id), EntryFlags::empty())
                .map_err(|_| {
                    SemanticError::VariableDeclaredTwice(crate::diagnostics::VariableDeclaredTwiceError {
                        loc: self.loc(&field.meta.span),
                        detail: field.name.clone(),
                    })
                })?;
        }
        let struct_type = Type::named(
            SuperType::Struct,
            s.name.clone(),
            s.template_params.iter().map(|n| Type::generic(n.clone())).collect(),
        );
        global
            .insert(s.name.clone(), struct_type.clone(), Some(decl), EntryFlags::GLOBAL)
            .map_err(|_| {
                SemanticError::StructDeclaredTwice(crate::diagnostics::StructDeclaredTwiceError {
                    loc: self.loc(&s.meta.span),
                    detail: s.name.clone(),
                })
            })?;
        self.structs.get_or_insert(&s.name, |id| StructManifestation {
            id,
            mangled_name: s.name.clone(),
            unmangled_name: s.name.clone(),
            template_types: struct_type.template_types.clone(),
            field_types: body.ordered_field_types(),
            implements: s.implements.clone(),
            decl_node: decl,
            body_scope: body.clone(),
            is_public: s.is_public,
            used: std::cell::Cell::new(false),
        });
        Ok(())
    }

    fn shallow_check_function(&self, global: &Scope, decl: AstNodeId) -> Result<(), SemanticError> {
        let AstNode::FunctionDecl(f) = self.arena.get(decl) else { unreachable!() };
        let body = global.create_child_scope(format!("func:{}", f.name), ScopeKind::FuncProcBody);
        for generic_name in &f.template_params {
            body.insert_generic_type(GenericType::unconstrained(generic_name.clone()));
        }
        let mut param_types = Vec::new();
        for &param_id in &f.params {
            let AstNode::Param(p) = self.arena.get(param_id) else { unreachable!() };
            let ty = self.resolve_type_name(&body, p.type_name)?;
            param_types.push(ty.clone());
            body.insert(p.name.clone(), ty, Some(param_id), EntryFlags::PARAM).map_err(|_| {
                SemanticError::VariableDeclaredTwice(crate::diagnostics::VariableDeclaredTwiceError {
                    loc: self.loc(&f.meta.span),
                    detail: p.name.clone(),
                })
            })?;
        }
        let return_type = match f.return_type {
            Some(id) => self.resolve_type_name(&body, id)?,
            None => Type::primitive(SuperType::Void),
        };
        if !f.is_procedure {
            body.insert("result".to_string(), return_type.clone(), None, EntryFlags::empty()).ok();
        }
        let mangled = mangle_function(&f.name, &param_types);
        self.functions.get_or_insert(&mangled, &f.name, |id| FunctionManifestation {
            id,
            mangled_name: mangled.clone(),
            unmangled_name: f.name.clone(),
            is_procedure: f.is_procedure,
            this_type: None,
            param_types: param_types.clone(),
            return_type,
            decl_node: decl,
            body_scope: body.clone(),
            is_public: f.is_public,
            used: std::cell::Cell::new(false),
        });
        Ok(())
    }

    fn shallow_check_method(&self, global: &Scope, decl: AstNodeId) -> Result<(), SemanticError> {
        let AstNode::MethodDecl(m) = self.arena.get(decl) else { unreachable!() };
        let qualified = format!("{}.{}", m.struct_name, m.name);
        let body = global.create_child_scope(format!("method:{qualified}"), ScopeKind::FuncProcBody);
        for generic_name in &m.template_params {
            body.insert_generic_type(GenericType::unconstrained(generic_name.clone()));
        }
        let this_type = Type::named(SuperType::Struct, m.struct_name.clone(), vec![]).to_pointer();
        body.insert("this".to_string(), this_type.clone(), None, EntryFlags::PARAM).ok();
        let mut param_types = Vec::new();
        for &param_id in &m.params {
            let AstNode::Param(p) = self.arena.get(param_id) else { unreachable!() };
            let ty = self.resolve_type_name(&body, p.type_name)?;
            param_types.push(ty.clone());
            body.insert(p.name.clone(), ty, Some(param_id), EntryFlags::PARAM).map_err(|_| {
                SemanticError::VariableDeclaredTwice(crate::diagnostics::VariableDeclaredTwiceError {
                    loc: self.loc(&m.meta.span),
                    detail: p.name.clone(),
                })
            })?;
        }
        let return_type = match m.return_type {
            Some(id) => self.resolve_type_name(&body, id)?,
            None => Type::primitive(SuperType::Void),
        };
        body.insert("result".to_string(), return_type.clone(), None, EntryFlags::empty()).ok();
        let mangled = format!("{}.{}", m.struct_name, mangle_function(&m.name, &param_types));
        self.functions.get_or_insert(&mangled, &qualified, |id| FunctionManifestation {
            id,
            mangled_name: mangled.clone(),
            unmangled_name: qualified.clone(),
            is_procedure: false,
            this_type: Some(this_type),
            param_types,
            return_type,
            decl_node: decl,
            body_scope: body.clone(),
            is_public: m.is_public,
            used: std::cell::Cell::new(false),
        });
        Ok(())
    }

    fn shallow_check_global(&self, global: &Scope, decl: AstNodeId, node: &GlobalVarDeclNode) -> Result<(), SemanticError> {
        let ty = match node.type_name {
            Some(id) => self.resolve_type_name(global, id)?,
            None => Type::invalid(),
        };
        if ty.is(SuperType::Dyn) {
            return Err(SemanticError::GlobalOfTypeDyn(crate::diagnostics::GlobalOfTypeDynError {
                loc: self.loc(&node.meta.span),
                detail: node.name.clone(),
            }));
        }
        let ty = if node.is_const { ty.with_specifiers(Specifiers::CONST) } else { ty };
        let flags = if node.is_public { EntryFlags::GLOBAL | EntryFlags::PUBLIC } else { EntryFlags::GLOBAL };
        global.insert(node.name.clone(), ty, Some(decl), flags).map_err(|_| {
            SemanticError::VariableDeclaredTwice(crate::diagnostics::VariableDeclaredTwiceError {
                loc: self.loc(&node.meta.span),
                detail: node.name.clone(),
            })
        })?;
        Ok(())
    }

    /// Top-down check pass. Re-runs up to [`MAX_REVISIT_ITERATIONS`] times: each
    /// pass may discover a new generic-function manifestation that the previous
    /// pass's earlier statements need a type from, so the loop only stops once a
    /// full pass resolves no new manifestations.
    pub fn check_program(&mut self, global: &Scope, program: AstNodeId) -> Result<Vec<Warning>, Vec<SemanticError>> {
        self.global = Some(global.clone());
        let mut iterations = 0;
        loop {
            iterations += 1;
            self.pending_generic_calls = 0;
            let errors = self.check_program_once(global, program);
            if !errors.is_empty() {
                return Err(errors);
            }
            if self.pending_generic_calls == 0 {
                break;
            }
            if iterations >= MAX_REVISIT_ITERATIONS {
                return Err(vec![SemanticError::ReturnMissing(crate::diagnostics::ReturnMissingError {
                    loc: CodeLoc::new(self.file_path.clone(), crate::diagnostics::Span::dummy()),
                    detail: format!(
                        "{}",
                        CompilerError::RevisitLimitExceeded {
                            file: (*self.file_path).clone(),
                            iterations
                        }
                    ),
                })]);
            }
        }
        Ok(global.collect_warnings())
    }

    fn check_program_once(&mut self, global: &Scope, program: AstNodeId) -> Vec<SemanticError> {
        let mut errors = Vec::new();
        let AstNode::Program(prog) = self.arena.get(program) else { unreachable!() };
        for &decl in &prog.decls {
            match self.arena.get(decl) {
                AstNode::FunctionDecl(f) => {
                    let Some(body_scope) = global.get_child_scope(&format!("func:{}", f.name)) else {
                        continue;
                    };
                    let ctx = Context::new(body_scope, 0);
                    if let Err(e) = self.check_block(&ctx, f.body) {
                        errors.push(e);
                    }
                }
                AstNode::MethodDecl(m) => {
                    let qualified = format!("{}.{}", m.struct_name, m.name);
                    let Some(body_scope) = global.get_child_scope(&format!("method:{qualified}")) else {
                        continue;
                    };
                    let ctx = Context::new(body_scope, 0);
                    if let Err(e) = self.check_block(&ctx, m.body) {
                        errors.push(e);
                    }
                }
                _ => {}
            }
        }
        errors
    }

    fn check_block(&mut self, ctx: &Context, block: AstNodeId) -> Result<(), SemanticError> {
        let AstNode::Block(b) = self.arena.get(block) else { panic!("expected Block node") };
        for &stmt in &b.stmts {
            self.check_stmt(ctx, stmt)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, ctx: &Context, stmt: AstNodeId) -> Result<(), SemanticError> {
        match self.arena.get(stmt) {
            AstNode::VarDeclStmt(n) => {
                let declared = match n.type_name {
                    Some(id) => Some(self.resolve_type_name(&ctx.scope, id)?),
                    None => None,
                };
                let init_ty = match n.initializer {
                    Some(id) => Some(self.check_expr(ctx, id)?),
                    None => None,
                };
                let final_ty = match (declared, init_ty) {
                    (Some(d), Some(i)) => {
                        operator_rules::type_assign(self.loc(&n.meta.span), &d, &i, |s, iface| self.structs.implements(s, iface))?;
                        if operator_rules::changes_heap_qualifier(&d, &i) && !ctx.in_unsafe {
                            return Err(SemanticError::UnsafeOperationInSafeContext(crate::diagnostics::UnsafeOperationInSafeContextError {
                                loc: self.loc(&n.meta.span),
                                detail: format!("changing the `heap` qualifier from `{i}` to `{d}` is only allowed inside an unsafe block"),
                            }));
                        }
                        d
                    }
                    (Some(d), None) => d,
                    (None, Some(i)) => i,
                    (None, None) => Type::invalid(),
                };
                let final_ty = if n.is_const { final_ty.with_specifiers(Specifiers::CONST) } else { final_ty };
                ctx.scope.insert(n.name.clone(), final_ty, Some(stmt), EntryFlags::empty()).map_err(|_| {
                    SemanticError::VariableDeclaredTwice(crate::diagnostics::VariableDeclaredTwiceError {
                        loc: self.loc(&n.meta.span),
                        detail: n.name.clone(),
                    })
                })?;
                Ok(())
            }
            AstNode::AssignStmt(n) => {
                let target_ty = self.check_expr(ctx, n.target)?;
                let value_ty = self.check_expr(ctx, n.value)?;
                if let AstNode::Ident(ident) = self.arena.get(n.target) {
                    if let Some(entry) = ctx.scope.lookup(&ident.name) {
                        if entry.get_type().is_const() && entry.lifecycle() == crate::scope::Lifecycle::Initialized {
                            return Err(SemanticError::ReassignConstVariable(crate::diagnostics::ReassignConstVariableError {
                                loc: self.loc(&n.meta.span),
                                detail: ident.name.clone(),
                            }));
                        }
                        entry.set_lifecycle(crate::scope::Lifecycle::Initialized);
                    }
                }
                let loc = self.loc(&n.meta.span);
                if n.op == AssignOp::Assign {
                    operator_rules::type_assign(loc.clone(), &target_ty, &value_ty, |s, iface| self.structs.implements(s, iface))?;
                    if operator_rules::changes_heap_qualifier(&target_ty, &value_ty) && !ctx.in_unsafe {
                        return Err(SemanticError::UnsafeOperationInSafeContext(crate::diagnostics::UnsafeOperationInSafeContextError {
                            loc,
                            detail: format!("changing the `heap` qualifier from `{value_ty}` to `{target_ty}` is only allowed inside an unsafe block"),
                        }));
                    }
                } else {
                    operator_rules::type_compound_assign(loc, n.op, &target_ty, &value_ty)?;
                }
                Ok(())
            }
            AstNode::ReturnStmt(n) => {
                let result_entry = ctx.scope.lookup("result");
                match (n.value, result_entry) {
                    (Some(v), Some(entry)) => {
                        let value_ty = self.check_expr(ctx, v)?;
                        operator_rules::type_assign(self.loc(&n.meta.span), &entry.get_type(), &value_ty, |s, iface| self.structs.implements(s, iface))?;
                        entry.set_lifecycle(crate::scope::Lifecycle::Initialized);
                    }
                    (Some(v), None) => {
                        self.check_expr(ctx, v)?;
                    }
                    (None, Some(entry)) => {
                        if entry.lifecycle() != crate::scope::Lifecycle::Initialized {
                            return Err(SemanticError::ReturnMissing(crate::diagnostics::ReturnMissingError {
                                loc: self.loc(&n.meta.span),
                                detail: "omitted return value requires `result` to already be assigned".to_string(),
                            }));
                        }
                    }
                    (None, None) => {}
                }
                Ok(())
            }
            AstNode::IfStmt(n) => {
                let cond = self.check_expr(ctx, n.condition)?;
                if !cond.is(SuperType::Bool) {
                    return Err(SemanticError::ConditionMustBeBool(crate::diagnostics::ConditionMustBeBoolError {
                        loc: self.loc(&n.meta.span),
                        detail: cond.to_string(),
                    }));
                }
                let then_scope = ctx.scope.create_child_scope("if", ScopeKind::If);
                self.check_block(&ctx.with_scope(then_scope), n.then_branch)?;
                if let Some(else_branch) = n.else_branch {
                    let else_scope = ctx.scope.create_child_scope("else", ScopeKind::Else);
                    self.check_block(&ctx.with_scope(else_scope), else_branch)?;
                }
                Ok(())
            }
            AstNode::WhileStmt(n) => {
                let cond = self.check_expr(ctx, n.condition)?;
                if !cond.is(SuperType::Bool) {
                    return Err(SemanticError::ConditionMustBeBool(crate::diagnostics::ConditionMustBeBoolError {
                        loc: self.loc(&n.meta.span),
                        detail: cond.to_string(),
                    }));
                }
                let body_scope = ctx.scope.create_child_scope("while", ScopeKind::While);
                self.check_block(&ctx.enter_loop(body_scope), n.body)
            }
            AstNode::DoWhileStmt(n) => {
                let body_scope = ctx.scope.create_child_scope("do-while", ScopeKind::DoWhile);
                self.check_block(&ctx.enter_loop(body_scope), n.body)?;
                let cond = self.check_expr(ctx, n.condition)?;
                if !cond.is(SuperType::Bool) {
                    return Err(SemanticError::ConditionMustBeBool(crate::diagnostics::ConditionMustBeBoolError {
                        loc: self.loc(&n.meta.span),
                        detail: cond.to_string(),
                    }));
                }
                Ok(())
            }
            AstNode::ForStmt(n) => {
                let for_scope = ctx.scope.create_child_scope("for", ScopeKind::For);
                let for_ctx = ctx.with_scope(for_scope.clone());
                if let Some(init) = n.init {
                    self.check_stmt(&for_ctx, init)?;
                }
                if let Some(cond) = n.condition {
                    let cond_ty = self.check_expr(&for_ctx, cond)?;
                    if !cond_ty.is(SuperType::Bool) {
                        return Err(SemanticError::ConditionMustBeBool(crate::diagnostics::ConditionMustBeBoolError {
                            loc: self.loc(&n.meta.span),
                            detail: cond_ty.to_string(),
                        }));
                    }
                }
                if let Some(step) = n.step {
                    self.check_stmt(&for_ctx, step)?;
                }
                self.check_block(&ctx.enter_loop(for_scope), n.body)
            }
            AstNode::ForeachStmt(n) => {
                self.check_expr(ctx, n.iterable)?;
                let body_scope = ctx.scope.create_child_scope("foreach", ScopeKind::Foreach);
                self.check_block(&ctx.enter_loop(body_scope), n.body)
            }
            AstNode::AssertStmt(n) => {
                let cond = self.check_expr(ctx, n.condition)?;
                if !cond.is(SuperType::Bool) {
                    return Err(SemanticError::ConditionMustBeBool(crate::diagnostics::ConditionMustBeBoolError {
                        loc: self.loc(&n.meta.span),
                        detail: cond.to_string(),
                    }));
                }
                Ok(())
            }
            AstNode::PrintfStmt(n) => {
                let placeholders: Vec<char> = {
                    let mut out = Vec::new();
                    let mut chars = n.format.chars();
                    while let Some(c) = chars.next() {
                        if c == '%' {
                            if let Some(spec) = chars.next() {
                                out.push(spec);
                            }
                        }
                    }
                    out
                };
                if placeholders.len() != n.args.len() {
                    return Err(SemanticError::PrintfArgCountError(crate::diagnostics::PrintfArgCountErrorError {
                        loc: self.loc(&n.meta.span),
                        detail: format!("format has {} placeholders but {} arguments were given", placeholders.len(), n.args.len()),
                    }));
                }
                for (&arg, spec) in n.args.iter().zip(placeholders.iter()) {
                    let arg_ty = self.check_expr(ctx, arg)?;
                    let ok = match spec {
                        'd' => arg_ty.is_one_of(&[SuperType::Int, SuperType::Short, SuperType::Long, SuperType::Byte]),
                        'f' => arg_ty.is(SuperType::Double),
                        's' => arg_ty.is(SuperType::String),
                        'c' => arg_ty.is(SuperType::Char),
                        'b' => arg_ty.is(SuperType::Bool),
                        _ => true,
                    };
                    if !ok {
                        return Err(SemanticError::PrintfTypeError(crate::diagnostics::PrintfTypeErrorError {
                            loc: self.loc(&n.meta.span),
                            detail: format!("`%{spec}` does not accept an argument of type `{arg_ty}`"),
                        }));
                    }
                }
                Ok(())
            }
            AstNode::UnsafeBlockStmt(n) => {
                let unsafe_scope = ctx.scope.create_child_scope("unsafe", ScopeKind::Unsafe);
                self.check_block(&ctx.enter_unsafe(unsafe_scope), n.body)
            }
            AstNode::ExprStmt(n) => {
                self.check_expr(ctx, n.expr)?;
                Ok(())
            }
            AstNode::BreakStmt(n) => {
                if n.depth == 0 || n.depth > ctx.loop_depth {
                    return Err(SemanticError::InvalidBreakOrContinue(crate::diagnostics::InvalidBreakOrContinueError {
                        loc: self.loc(&n.meta.span),
                        detail: format!("`break {}` used with {} enclosing loop(s)", n.depth, ctx.loop_depth),
                    }));
                }
                Ok(())
            }
            AstNode::ContinueStmt(n) => {
                if n.depth == 0 || n.depth > ctx.loop_depth {
                    return Err(SemanticError::InvalidBreakOrContinue(crate::diagnostics::InvalidBreakOrContinueError {
                        loc: self.loc(&n.meta.span),
                        detail: format!("`continue {}` used with {} enclosing loop(s)", n.depth, ctx.loop_depth),
                    }));
                }
                Ok(())
            }
            other => panic!("check_stmt called on non-statement node: {other:?}"),
        }
    }

    fn check_expr(&mut self, ctx: &Context, expr: AstNodeId) -> Result<Type, SemanticError> {
        let ty = self.check_expr_inner(ctx, expr)?;
        self.arena.get(expr).meta().set_type(ctx.man_idx, ty.clone());
        Ok(ty)
    }

    fn check_expr_inner(&mut self, ctx: &Context, expr: AstNodeId) -> Result<Type, SemanticError> {
        match self.arena.get(expr) {
            AstNode::Ident(n) => {
                let entry = ctx.scope.lookup(&n.name).ok_or_else(|| {
                    SemanticError::ReferencedUndefinedVariable(crate::diagnostics::ReferencedUndefinedVariableError {
                        loc: self.loc(&n.meta.span),
                        detail: n.name.clone(),
                    })
                })?;
                entry.mark_used();
                Ok(entry.get_type())
            }
            AstNode::IntLiteral(_) => Ok(Type::primitive(SuperType::Int)),
            AstNode::DoubleLiteral(_) => Ok(Type::primitive(SuperType::Double)),
            AstNode::BoolLiteral(_) => Ok(Type::primitive(SuperType::Bool)),
            AstNode::CharLiteral(_) => Ok(Type::primitive(SuperType::Char)),
            AstNode::StringLiteral(_) => Ok(Type::primitive(SuperType::String)),
            AstNode::BinaryExpr(n) => {
                let lhs = self.check_expr(ctx, n.lhs)?;
                let rhs = self.check_expr(ctx, n.rhs)?;
                let loc = self.loc(&n.meta.span);
                use BinOp::*;
                let primitive_result = match n.op {
                    LogicalAnd => operator_rules::type_logical_and(loc.clone(), &lhs, &rhs),
                    LogicalOr => operator_rules::type_logical_or(loc.clone(), &lhs, &rhs),
                    BitwiseOr => operator_rules::type_bitwise_or(loc.clone(), &lhs, &rhs),
                    BitwiseXor => operator_rules::type_bitwise_xor(loc.clone(), &lhs, &rhs),
                    BitwiseAnd => operator_rules::type_bitwise_and(loc.clone(), &lhs, &rhs),
                    Eq => operator_rules::type_equal(loc.clone(), &lhs, &rhs),
                    Neq => operator_rules::type_not_equal(loc.clone(), &lhs, &rhs),
                    Lt => operator_rules::type_less(loc.clone(), &lhs, &rhs),
                    Gt => operator_rules::type_greater(loc.clone(), &lhs, &rhs),
                    Le => operator_rules::type_less_equal(loc.clone(), &lhs, &rhs),
                    Ge => operator_rules::type_greater_equal(loc.clone(), &lhs, &rhs),
                    Shl => operator_rules::type_shl(loc.clone(), &lhs, &rhs),
                    Shr => operator_rules::type_shr(loc.clone(), &lhs, &rhs),
                    Plus => operator_rules::type_plus(loc.clone(), &lhs, &rhs),
                    Minus => operator_rules::type_minus(loc.clone(), &lhs, &rhs),
                    Mul => operator_rules::type_mul(loc.clone(), &lhs, &rhs),
                    Div => operator_rules::type_div(loc.clone(), &lhs, &rhs),
                    Rem => operator_rules::type_rem(loc.clone(), &lhs, &rhs),
                };
                match primitive_result {
                    Ok(ty) => Ok(ty),
                    Err(e) => {
                        let struct_name = lhs.remove_reference_wrapper().subtype_name.clone();
                        let op_name = operator_rules::binop_to_operator_name(n.op);
                        match (struct_name, op_name) {
                            (Some(s), Some(op_name)) if lhs.is(SuperType::Struct) => {
                                let qualified = format!("{s}.{op_name}");
                                match self.functions.resolve_overload(&qualified, &[rhs]) {
                                    Ok(Some(m)) => {
                                        self.functions.mark_used(&m.mangled_name);
                                        Ok(m.return_type.clone())
                                    }
                                    _ => Err(e),
                                }
                            }
                            _ => Err(e),
                        }
                    }
                }
            }
            AstNode::UnaryExpr(n) => {
                let operand = self.check_expr(ctx, n.operand)?;
                let loc = self.loc(&n.meta.span);
                match n.op {
                    UnOp::Plus => Ok(operand),
                    UnOp::Minus => operator_rules::type_prefix_minus(loc, &operand),
                    UnOp::PrefixIncr => operator_rules::type_prefix_plus_plus(loc, &operand),
                    UnOp::PrefixDecr => operator_rules::type_prefix_minus_minus(loc, &operand),
                    UnOp::Not => operator_rules::type_not(loc, &operand),
                    UnOp::BitwiseNot => operator_rules::type_bitwise_not(loc, &operand),
                    UnOp::Deref => operand.get_contained_ty().ok_or_else(|| {
                        SemanticError::OperatorWrongDataType(crate::diagnostics::OperatorWrongDataTypeError {
                            loc: loc.clone(),
                            detail: format!("`{operand}` is not a pointer or reference and cannot be dereferenced"),
                        })
                    }),
                    UnOp::AddrOf => Ok(operand.to_pointer()),
                }
            }
            AstNode::PostfixExpr(n) => {
                let operand = self.check_expr(ctx, n.operand)?;
                let loc = self.loc(&n.meta.span);
                match n.op {
                    PostfixOp::Incr => operator_rules::type_postfix_plus_plus(loc, &operand),
                    PostfixOp::Decr => operator_rules::type_postfix_minus_minus(loc, &operand),
                }
            }
            AstNode::TernaryExpr(n) => {
                let cond = self.check_expr(ctx, n.condition)?;
                if !cond.is(SuperType::Bool) {
                    return Err(SemanticError::ConditionMustBeBool(crate::diagnostics::ConditionMustBeBoolError {
                        loc: self.loc(&n.meta.span),
                        detail: cond.to_string(),
                    }));
                }
                let then_ty = self.check_expr(ctx, n.then_expr)?;
                let else_ty = self.check_expr(ctx, n.else_expr)?;
                if !then_ty.matches(&else_ty, false, false, true) {
                    return Err(SemanticError::OperatorWrongDataType(crate::diagnostics::OperatorWrongDataTypeError {
                        loc: self.loc(&n.meta.span),
                        detail: format!("ternary branches have incompatible types `{then_ty}` and `{else_ty}`"),
                    }));
                }
                Ok(then_ty)
            }
            AstNode::CastExpr(n) => {
                let target = self.resolve_type_name(&ctx.scope, n.target_type)?;
                let value = self.check_expr(ctx, n.operand)?;
                operator_rules::type_cast(self.loc(&n.meta.span), &target, &value, ctx.in_unsafe)
            }
            AstNode::CallExpr(n) => {
                let mut arg_types = Vec::with_capacity(n.args.len());
                for &a in &n.args {
                    arg_types.push(self.check_expr(ctx, a)?);
                }
                match self.functions.resolve_overload(&n.callee, &arg_types) {
                    Ok(Some(m)) => {
                        self.functions.mark_used(&m.mangled_name);
                        Ok(m.return_type.clone())
                    }
                    Ok(None) => match self.try_substantiate_generic_overload(&n.callee, &arg_types)? {
                        Some(m) => {
                            self.functions.mark_used(&m.mangled_name);
                            Ok(m.return_type.clone())
                        }
                        None => Err(SemanticError::ReferencedUndefinedFunction(crate::diagnostics::ReferencedUndefinedFunctionError {
                            loc: self.loc(&n.meta.span),
                            detail: n.callee.clone(),
                        })),
                    },
                    Err(_) => Err(SemanticError::FunctionAmbiguity(crate::diagnostics::FunctionAmbiguityError {
                        loc: self.loc(&n.meta.span),
                        detail: n.callee.clone(),
                    })),
                }
            }
            AstNode::MethodCallExpr(n) => {
                let receiver_ty = self.check_expr(ctx, n.receiver)?;
                let mut arg_types = Vec::with_capacity(n.args.len());
                for &a in &n.args {
                    arg_types.push(self.check_expr(ctx, a)?);
                }
                let struct_name = receiver_ty.remove_reference_wrapper().subtype_name.clone().unwrap_or_default();
                let qualified = format!("{struct_name}.{}", n.method);
                match self.functions.resolve_overload(&qualified, &arg_types) {
                    Ok(Some(m)) => {
                        self.functions.mark_used(&m.mangled_name);
                        Ok(m.return_type.clone())
                    }
                    Ok(None) => match self.try_substantiate_generic_overload(&qualified, &arg_types)? {
                        Some(m) => {
                            self.functions.mark_used(&m.mangled_name);
                            Ok(m.return_type.clone())
                        }
                        None => Err(SemanticError::ReferencedUndefinedFunction(crate::diagnostics::ReferencedUndefinedFunctionError {
                            loc: self.loc(&n.meta.span),
                            detail: qualified,
                        })),
                    },
                    Err(_) => Err(SemanticError::FunctionAmbiguity(crate::diagnostics::FunctionAmbiguityError {
                        loc: self.loc(&n.meta.span),
                        detail: qualified,
                    })),
                }
            }
            AstNode::FieldAccessExpr(n) => {
                let receiver_ty = self.check_expr(ctx, n.receiver)?;
                let base = receiver_ty.remove_reference_wrapper();
                let struct_name = base.subtype_name.clone().unwrap_or_default();
                let Some(body) = ctx.scope.lookup_struct_scope(&struct_name) else {
                    return Err(SemanticError::ReferencedUndefinedStruct(crate::diagnostics::ReferencedUndefinedStructError {
                        loc: self.loc(&n.meta.span),
                        detail: struct_name,
                    }));
                };
                body.lookup_strict(&n.field).map(|e| e.get_type()).ok_or_else(|| {
                    SemanticError::ReferencedUndefinedVariable(crate::diagnostics::ReferencedUndefinedVariableError {
                        loc: self.loc(&n.meta.span),
                        detail: n.field.clone(),
                    })
                })
            }
            AstNode::IndexExpr(n) => {
                let base = self.check_expr(ctx, n.base)?;
                let index = self.check_expr(ctx, n.index)?;
                if !index.is_one_of(&[SuperType::Int, SuperType::Long]) {
                    return Err(SemanticError::ArrayIndexNotIntOrLong(crate::diagnostics::ArrayIndexNotIntOrLongError {
                        loc: self.loc(&n.meta.span),
                        detail: index.to_string(),
                    }));
                }
                base.get_contained_ty().ok_or_else(|| {
                    SemanticError::OperatorWrongDataType(crate::diagnostics::OperatorWrongDataTypeError {
                        loc: self.loc(&n.meta.span),
                        detail: format!("`{base}` is not indexable"),
                    })
                })
            }
            AstNode::StructLiteralExpr(n) => {
                let Some(body) = ctx.scope.lookup_struct_scope(&n.struct_name) else {
                    return Err(SemanticError::ReferencedUndefinedStruct(crate::diagnostics::ReferencedUndefinedStructError {
                        loc: self.loc(&n.meta.span),
                        detail: n.struct_name.clone(),
                    }));
                };
                if body.get_field_count() != n.fields.len() {
                    return Err(SemanticError::NumberOfFieldsMismatch(crate::diagnostics::NumberOfFieldsMismatchError {
                        loc: self.loc(&n.meta.span),
                        detail: format!("{} expects {} fields, got {}", n.struct_name, body.get_field_count(), n.fields.len()),
                    }));
                }
                let mut field_types = Vec::with_capacity(n.fields.len());
                for &f in &n.fields {
                    field_types.push(self.check_expr(ctx, f)?);
                }
                let Some(manifestation) = self.structs.get(&n.struct_name) else {
                    return Ok(Type::named(SuperType::Struct, n.struct_name.clone(), vec![]));
                };
                if !manifestation.template_types.iter().any(|t| t.has_any_generic_parts()) {
                    for (field_ty, declared_ty) in field_types.iter().zip(manifestation.field_types.iter()) {
                        if !declared_ty.matches(field_ty, false, false, true) {
                            return Err(SemanticError::OperatorWrongDataType(crate::diagnostics::OperatorWrongDataTypeError {
                                loc: self.loc(&n.meta.span),
                                detail: format!("field of type `{declared_ty}` cannot be initialized with `{field_ty}`"),
                            }));
                        }
                    }
                    return Ok(Type::named(SuperType::Struct, n.struct_name.clone(), vec![]));
                }

                let mut mapping = generics::TypeMapping::new();
                let lookup = |name: &str| body.lookup_generic_type(name);
                if !generics::match_requested_to_candidate_types(&field_types, &manifestation.field_types, &lookup, &mut mapping) {
                    return Err(SemanticError::OperatorWrongDataType(crate::diagnostics::OperatorWrongDataTypeError {
                        loc: self.loc(&n.meta.span),
                        detail: format!("field types do not match `{}`'s generic declaration", n.struct_name),
                    }));
                }
                let substituted_template_types = generics::substantiate_types_with_type_mapping(&manifestation.template_types, &mapping);
                let substituted_fields = generics::substantiate_types_with_type_mapping(&manifestation.field_types, &mapping);
                let mangled = format!(
                    "{}<{}>",
                    n.struct_name,
                    substituted_template_types.iter().map(|t| t.get_name(false)).collect::<Vec<_>>().join(",")
                );
                if self.structs.get(&mangled).is_none() {
                    if let Some(global) = self.global.clone() {
                        let new_body = global.copy_child_scope(&body, format!("struct:{mangled}"));
                        for (name, ty) in body.ordered_field_names().iter().zip(substituted_fields.iter()) {
                            if let Some(entry) = new_body.lookup_strict(name) {
                                entry.set_type(ty.clone());
                            }
                        }
                        self.structs.get_or_insert(&mangled, |id| StructManifestation {
                            id,
                            mangled_name: mangled.clone(),
                            unmangled_name: n.struct_name.clone(),
                            template_types: substituted_template_types.clone(),
                            field_types: substituted_fields,
                            implements: manifestation.implements.clone(),
                            decl_node: manifestation.decl_node,
                            body_scope: new_body,
                            is_public: manifestation.is_public,
                            used: std::cell::Cell::new(false),
                        });
                        self.pending_generic_calls += 1;
                    }
                }
                self.structs.mark_used(&mangled);
                Ok(Type::named(SuperType::Struct, n.struct_name.clone(), substituted_template_types))
            }
            AstNode::ArrayLiteralExpr(n) => {
                let mut elem_ty = None;
                for &item in &n.items {
                    let ty = self.check_expr(ctx, item)?;
                    elem_ty = Some(ty);
                }
                Ok(elem_ty.unwrap_or_else(Type::invalid).to_array(n.items.len()))
            }
            AstNode::SizeOfExpr(n) => {
                self.check_expr(ctx, n.target).ok();
                Ok(Type::primitive(SuperType::Long))
            }
            AstNode::AlignOfExpr(n) => {
                self.check_expr(ctx, n.target).ok();
                Ok(Type::primitive(SuperType::Long))
            }
            AstNode::LenExpr(n) => {
                let target = self.check_expr(ctx, n.target)?;
                if !target.is_array() && !target.is(SuperType::String) {
                    return Err(SemanticError::OperatorWrongDataType(crate::diagnostics::OperatorWrongDataTypeError {
                        loc: self.loc(&n.meta.span),
                        detail: format!("`len` expects an array or string, got `{target}`"),
                    }));
                }
                Ok(Type::primitive(SuperType::Long))
            }
            other => panic!("check_expr called on non-expression node: {other:?}"),
        }
    }

    /// Finds a generic overload of `unmangled_name` whose parameter list can be
    /// matched against `arg_types`, substantiates a concrete manifestation for it,
    /// type-checks its body immediately against the substituted types, and interns
    /// it so a second call site requesting the same concrete types reuses it.
    /// Returns `Ok(None)` when no generic candidate matches (the caller then
    /// reports an undefined-function error as usual).
    fn try_substantiate_generic_overload(&mut self, unmangled_name: &str, arg_types: &[Type]) -> Result<Option<std::rc::Rc<FunctionManifestation>>, SemanticError> {
        let Some(global) = self.global.clone() else { return Ok(None) };
        for candidate in self.functions.candidates(unmangled_name) {
            if candidate.param_types.len() != arg_types.len() {
                continue;
            }
            if !candidate.param_types.iter().any(|t| t.has_any_generic_parts()) {
                continue;
            }
            let mut mapping = generics::TypeMapping::new();
            let lookup = |name: &str| candidate.body_scope.lookup_generic_type(name);
            if !generics::match_requested_to_candidate_types(arg_types, &candidate.param_types, &lookup, &mut mapping) {
                continue;
            }
            let substituted_params = generics::substantiate_types_with_type_mapping(&candidate.param_types, &mapping);
            let substituted_return = generics::substantiate_type_with_type_mapping(&candidate.return_type, &mapping);
            let (decl_node_kind_is_method, param_ids, body_id) = match self.arena.get(candidate.decl_node) {
                AstNode::FunctionDecl(f) => (false, f.params.clone(), f.body),
                AstNode::MethodDecl(m) => (true, m.params.clone(), m.body),
                _ => continue,
            };
            let mangled = if decl_node_kind_is_method {
                let AstNode::MethodDecl(m) = self.arena.get(candidate.decl_node) else { unreachable!() };
                format!("{}.{}", m.struct_name, mangle_function(&m.name, &substituted_params))
            } else {
                mangle_function(unmangled_name, &substituted_params)
            };
            if let Some(existing) = self.functions.get(&mangled) {
                return Ok(Some(existing));
            }
            let param_names: Vec<String> = param_ids
                .iter()
                .map(|&p| match self.arena.get(p) {
                    AstNode::Param(p) => p.name.clone(),
                    _ => unreachable!(),
                })
                .collect();
            let new_body = global.copy_child_scope(&candidate.body_scope, format!("generic:{mangled}"));
            for (name, ty) in param_names.iter().zip(substituted_params.iter()) {
                if let Some(entry) = new_body.lookup_strict(name) {
                    entry.set_type(ty.clone());
                }
            }
            if let Some(entry) = new_body.lookup_strict("result") {
                entry.set_type(substituted_return.clone());
            }
            let this_type = candidate.this_type.as_ref().map(|t| generics::substantiate_type_with_type_mapping(t, &mapping));
            if let Some(this_ty) = &this_type {
                if let Some(entry) = new_body.lookup_strict("this") {
                    entry.set_type(this_ty.clone());
                }
            }
            self.pending_generic_calls += 1;
            let manifestation = self.functions.get_or_insert(&mangled, &candidate.unmangled_name, |id| FunctionManifestation {
                id,
                mangled_name: mangled.clone(),
                unmangled_name: candidate.unmangled_name.clone(),
                is_procedure: candidate.is_procedure,
                this_type,
                param_types: substituted_params,
                return_type: substituted_return,
                decl_node: candidate.decl_node,
                body_scope: new_body.clone(),
                is_public: candidate.is_public,
                used: std::cell::Cell::new(false),
            });
            let inner_ctx = Context::new(new_body, 0);
            self.check_block(&inner_ctx, body_id)?;
            return Ok(Some(manifestation));
        }
        Ok(None)
    }
}

fn mangle_function(name: &str, params: &[Type]) -> String {
    let mut mangled = name.to_string();
    mangled.push('(');
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            mangled.push(',');
        }
        mangled.push_str(&p.get_name(false));
    }
    mangled.push(')');
    mangled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Span;

    fn span() -> Span {
        Span::dummy()
    }

    fn file_path() -> std::sync::Arc<std::path::PathBuf> {
        std::sync::Arc::new(std::path::PathBuf::from("t.vl"))
    }

    #[test]
    fn checks_a_function_returning_a_literal() {
        let mut arena = Arena::new();
        let ret = arena.alloc(AstNode::IntLiteral(IntLiteralNode { meta: NodeMeta::new(span()), value: 1 }));
        let ret_stmt = arena.alloc(AstNode::ReturnStmt(ReturnStmtNode { meta: NodeMeta::new(span()), value: Some(ret) }));
        let body = arena.alloc(AstNode::Block(BlockNode { meta: NodeMeta::new(span()), stmts: vec![ret_stmt] }));
        let return_type_name = arena.alloc(AstNode::TypeName(TypeNameNode {
            meta: NodeMeta::new(span()),
            base: "int".into(),
            template_args: vec![],
            ptr_depth: 0,
            is_ref: false,
            array_sizes: vec![],
            is_const: false,
        }));
        let func = arena.alloc(AstNode::FunctionDecl(FunctionDeclNode {
            meta: NodeMeta::new(span()),
            name: "main".into(),
            is_procedure: false,
            template_params: vec![],
            params: vec![],
            return_type: Some(return_type_name),
            body,
            is_public: true,
        }));
        let program = arena.alloc(AstNode::Program(Program { meta: NodeMeta::new(span()), imports: vec![], decls: vec![func] }));

        let functions = FunctionManager::new();
        let structs = StructManager::new();
        let global = Scope::new_global();
        let checker = TypeChecker::new(&arena, &functions, &structs, file_path());
        checker.shallow_check_program(&global, program).unwrap();

        let mut checker = checker;
        let warnings = checker.check_program(&global, program).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn undeclared_variable_is_reported() {
        let mut arena = Arena::new();
        let ident = arena.alloc(AstNode::Ident(IdentExprNode { meta: NodeMeta::new(span()), name: "missing".into() }));
        let functions = FunctionManager::new();
        let global = Scope::new_global();
        let structs = StructManager::new();
        let mut checker = TypeChecker::new(&arena, &functions, &structs, file_path());
        let ctx = Context::new(global, 0);
        assert!(checker.check_expr(&ctx, ident).is_err());
    }
}
