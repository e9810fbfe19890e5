//! Hierarchical scope and symbol table (component C3).
//!
//! A [`Scope`] is a cheap handle (`Rc<RefCell<ScopeData>>`) onto a node in a tree
//! that mirrors lexical nesting: the global scope owns one child per function,
//! struct, interface and enum body, and every block-like statement pushes its own
//! child in turn. This follows the same interior-mutability idiom the front end's
//! `typechecker::scope::Scope` uses for its flat frame stack; the difference here
//! is that the tree shape itself (parent pointer, named children) has to survive
//! being shared across a deep-copy during generic struct substantiation, which a
//! flat stack has no use for.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::AstNodeId;
use crate::diagnostics::{CodeLoc, Warning};
use crate::typechecker::types::{GenericType, Type};

/// What a scope was opened for. Drives lookup rules (e.g. a `Struct` scope's
/// fields are visible to its own method scopes but not to sibling scopes) and
/// dead-code warnings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    FuncProcBody,
    Struct,
    Interface,
    Enum,
    If,
    Else,
    While,
    DoWhile,
    For,
    Foreach,
    Unsafe,
    Anonymous,
    Thread,
}

/// Lifecycle state of a [`SymbolTableEntry`]. Transitions only move forward:
/// `Declared -> Initialized -> Dead`. Attempting to go backwards is a bug in the
/// caller, not a recoverable condition, so [`SymbolTableEntry::set_lifecycle`]
/// panics on a regression instead of returning a `Result`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    Declared,
    Initialized,
    Dead,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct EntryFlags: u16 {
        const GLOBAL           = 0b0000_0001;
        const PARAM            = 0b0000_0010;
        const VOLATILE         = 0b0000_0100;
        const ANONYMOUS        = 0b0000_1000;
        const USED             = 0b0001_0000;
        const IMPLICIT_FIELD   = 0b0010_0000;
        const OMIT_DTOR_CALL   = 0b0100_0000;
        /// Declared `public`; visible from a file that imports this one. Checked
        /// only for entries reached through a mounted `import:` child scope —
        /// within its own declaring file, an entry is visible regardless.
        const PUBLIC           = 0b1000_0000;
    }
}

/// Opaque handle used by the IR generator to key its own `entry id -> llvm value`
/// map without this module needing to know anything about LLVM or carry a
/// lifetime parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u32);

pub struct SymbolTableEntry {
    pub name: String,
    ty: RefCell<Type>,
    pub decl_node: Option<AstNodeId>,
    pub ordinal: usize,
    lifecycle: Cell<Lifecycle>,
    pub flags: Cell<EntryFlags>,
    pub id: EntryId,
}

impl SymbolTableEntry {
    pub fn get_type(&self) -> Type {
        self.ty.borrow().clone()
    }

    pub fn set_type(&self, ty: Type) {
        *self.ty.borrow_mut() = ty;
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    /// Advances the lifecycle. Panics if `next` would move it backwards; callers
    /// (the type checker's assignment/declaration handling) are expected to know
    /// the current state before calling this.
    pub fn set_lifecycle(&self, next: Lifecycle) {
        assert!(
            next >= self.lifecycle.get(),
            "lifecycle regression on `{}`: {:?} -> {:?}",
            self.name,
            self.lifecycle.get(),
            next
        );
        self.lifecycle.set(next);
    }

    pub fn mark_used(&self) {
        let mut flags = self.flags.get();
        flags.insert(EntryFlags::USED);
        self.flags.set(flags);
    }

    pub fn is_used(&self) -> bool {
        self.flags.get().contains(EntryFlags::USED)
    }
}

impl fmt::Debug for SymbolTableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTableEntry")
            .field("name", &self.name)
            .field("ty", &self.ty.borrow())
            .field("lifecycle", &self.lifecycle.get())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeInsertError {
    pub name: String,
}

impl fmt::Display for ScopeInsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` is already declared in this scope", self.name)
    }
}
impl std::error::Error for ScopeInsertError {}

struct ScopeData {
    parent: Option<Scope>,
    children: Vec<(String, Scope)>,
    table: HashMap<String, Rc<SymbolTableEntry>>,
    anonymous: HashMap<CodeLoc, Rc<SymbolTableEntry>>,
    generic_types: HashMap<String, GenericType>,
    /// Type-alias name -> aliased concrete type, a namespace of its own so a
    /// `type Id = int;` declaration never collides with a variable named `Id`.
    aliases: HashMap<String, Type>,
    kind: ScopeKind,
    is_generic_scope: bool,
    is_dtor_scope: bool,
    is_imported: bool,
    next_ordinal: usize,
    warnings: Vec<Warning>,
    /// Shared by the whole tree rooted at the file's global scope so ids stay
    /// unique across every descendant, including deep-copies made for generic
    /// struct substantiation (which get their own counter seeded past the source
    /// tree's high-water mark, see [`Scope::copy_child_scope`]).
    next_entry_id: Rc<Cell<u32>>,
}

/// A handle onto a node in the scope tree. Clones are cheap and alias the same
/// underlying data, matching the teacher's `Rc<RefCell<Frame>>` sharing idiom.
#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
    pub fn new_global() -> Scope {
        Scope(Rc::new(RefCell::new(ScopeData {
            parent: None,
            children: Vec::new(),
            table: HashMap::new(),
            anonymous: HashMap::new(),
            generic_types: HashMap::new(),
            aliases: HashMap::new(),
            kind: ScopeKind::Global,
            is_generic_scope: false,
            is_dtor_scope: false,
            is_imported: false,
            next_ordinal: 0,
            warnings: Vec::new(),
            next_entry_id: Rc::new(Cell::new(0)),
        })))
    }

    fn next_id(&self) -> EntryId {
        let counter = self.0.borrow().next_entry_id.clone();
        let id = counter.get();
        counter.set(id + 1);
        EntryId(id)
    }

    pub fn kind(&self) -> ScopeKind {
        self.0.borrow().kind
    }

    pub fn parent(&self) -> Option<Scope> {
        self.0.borrow().parent.clone()
    }

    pub fn is_generic_scope(&self) -> bool {
        self.0.borrow().is_generic_scope
    }

    pub fn set_is_generic_scope(&self, value: bool) {
        self.0.borrow_mut().is_generic_scope = value;
    }

    pub fn is_dtor_scope(&self) -> bool {
        self.0.borrow().is_dtor_scope
    }

    pub fn set_is_dtor_scope(&self, value: bool) {
        self.0.borrow_mut().is_dtor_scope = value;
    }

    pub fn is_imported(&self) -> bool {
        self.0.borrow().is_imported
    }

    pub fn set_is_imported(&self, value: bool) {
        self.0.borrow_mut().is_imported = value;
    }

    /// Creates and links a new named child scope of `kind`.
    pub fn create_child_scope(&self, name: impl Into<String>, kind: ScopeKind) -> Scope {
        let name = name.into();
        let child = Scope(Rc::new(RefCell::new(ScopeData {
            parent: Some(self.clone()),
            children: Vec::new(),
            table: HashMap::new(),
            anonymous: HashMap::new(),
            generic_types: HashMap::new(),
            aliases: HashMap::new(),
            kind,
            is_generic_scope: false,
            is_dtor_scope: false,
            is_imported: false,
            next_ordinal: 0,
            warnings: Vec::new(),
            next_entry_id: self.0.borrow().next_entry_id.clone(),
        })));
        self.0.borrow_mut().children.push((name, child.clone()));
        child
    }

    pub fn get_child_scope(&self, name: &str) -> Option<Scope> {
        self.0
            .borrow()
            .children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.clone())
    }

    pub fn rename_child_scope(&self, old_name: &str, new_name: impl Into<String>) {
        let new_name = new_name.into();
        let mut data = self.0.borrow_mut();
        if let Some(entry) = data.children.iter_mut().find(|(n, _)| n == old_name) {
            entry.0 = new_name;
        }
    }

    /// Deep-copies `source` (and, recursively, all of its descendants) as a new
    /// child of `self` under `name`, reparenting every copy along the way. Used
    /// when substantiating a generic struct: the struct's declared body scope is
    /// copied once per concrete template-argument combination so each
    /// manifestation gets independently-typed fields.
    pub fn copy_child_scope(&self, source: &Scope, name: impl Into<String>) -> Scope {
        let name = name.into();
        let copy = self.deep_copy(source, self.clone());
        self.0.borrow_mut().children.push((name, copy.clone()));
        copy
    }

    fn deep_copy(&self, source: &Scope, new_parent: Scope) -> Scope {
        let src = source.0.borrow();
        let copy = Scope(Rc::new(RefCell::new(ScopeData {
            parent: Some(new_parent),
            children: Vec::new(),
            table: src
                .table
                .iter()
                .map(|(k, v)| {
                    (
                        k.clone(),
                        Rc::new(SymbolTableEntry {
                            name: v.name.clone(),
                            ty: RefCell::new(v.ty.borrow().clone()),
                            decl_node: v.decl_node,
                            ordinal: v.ordinal,
                            lifecycle: Cell::new(v.lifecycle.get()),
                            flags: Cell::new(v.flags.get()),
                            id: EntryId(self.next_id().0),
                        }),
                    )
                })
                .collect(),
            anonymous: HashMap::new(),
            generic_types: src.generic_types.clone(),
            aliases: src.aliases.clone(),
            kind: src.kind,
            is_generic_scope: src.is_generic_scope,
            is_dtor_scope: src.is_dtor_scope,
            is_imported: src.is_imported,
            next_ordinal: src.next_ordinal,
            warnings: Vec::new(),
            next_entry_id: self.0.borrow().next_entry_id.clone(),
        })));
        for (child_name, child) in &src.children {
            let child_copy = self.deep_copy(child, copy.clone());
            copy.0.borrow_mut().children.push((child_name.clone(), child_copy));
        }
        copy
    }

    /// Inserts a new named entry in this scope's own table. Fails if the name is
    /// already declared here (shadowing an *outer* scope's name is fine and is not
    /// checked by this method).
    pub fn insert(&self, name: impl Into<String>, ty: Type, decl_node: Option<AstNodeId>, flags: EntryFlags) -> Result<Rc<SymbolTableEntry>, ScopeInsertError> {
        let name = name.into();
        if self.0.borrow().table.contains_key(&name) {
            return Err(ScopeInsertError { name });
        }
        let id = self.next_id();
        let ordinal = {
            let mut data = self.0.borrow_mut();
            let ordinal = data.next_ordinal;
            data.next_ordinal += 1;
            ordinal
        };
        let entry = Rc::new(SymbolTableEntry {
            name: name.clone(),
            ty: RefCell::new(ty),
            decl_node,
            ordinal,
            lifecycle: Cell::new(Lifecycle::Declared),
            flags: Cell::new(flags),
            id,
        });
        self.0.borrow_mut().table.insert(name, entry.clone());
        Ok(entry)
    }

    pub fn insert_anonymous(&self, loc: CodeLoc, ty: Type) -> Rc<SymbolTableEntry> {
        let id = self.next_id();
        let ordinal = {
            let mut data = self.0.borrow_mut();
            let ordinal = data.next_ordinal;
            data.next_ordinal += 1;
            ordinal
        };
        let entry = Rc::new(SymbolTableEntry {
            name: format!("anon#{}", id.0),
            ty: RefCell::new(ty),
            decl_node: None,
            ordinal,
            lifecycle: Cell::new(Lifecycle::Declared),
            flags: Cell::new(EntryFlags::ANONYMOUS),
            id,
        });
        self.0.borrow_mut().anonymous.insert(loc, entry.clone());
        entry
    }

    /// Walks up through parent scopes until `name` is found. Once the walk
    /// reaches the file's global scope (no parent left), also checks each
    /// directly mounted `import:` child for a `public` entry of that name,
    /// so a name declared in an imported file resolves without that file's
    /// whole scope tree being flattened into this one. This is the normal
    /// identifier-resolution entry point.
    pub fn lookup(&self, name: &str) -> Option<Rc<SymbolTableEntry>> {
        if let Some(entry) = self.0.borrow().table.get(name) {
            return Some(entry.clone());
        }
        let parent = self.0.borrow().parent.clone();
        match parent {
            Some(parent) => parent.lookup(name),
            None => self.lookup_in_mounted_imports(name),
        }
    }

    /// Searches this scope's directly mounted `import:`-prefixed children for
    /// a `public` entry named `name`. Only ever meaningful on a file's global
    /// scope, where [`crate::source::SourceFile::run_import_collector`] mounts
    /// each dependency's global scope.
    fn lookup_in_mounted_imports(&self, name: &str) -> Option<Rc<SymbolTableEntry>> {
        let imports: Vec<Scope> = self
            .0
            .borrow()
            .children
            .iter()
            .filter(|(n, _)| n.starts_with("import:"))
            .map(|(_, s)| s.clone())
            .collect();
        for import in imports {
            if let Some(entry) = import.0.borrow().table.get(name) {
                if entry.flags.get().contains(EntryFlags::PUBLIC) {
                    return Some(entry.clone());
                }
            }
        }
        None
    }

    /// Looks up `name` only in this exact scope, without walking to parents.
    pub fn lookup_strict(&self, name: &str) -> Option<Rc<SymbolTableEntry>> {
        self.0.borrow().table.get(name).cloned()
    }

    pub fn lookup_anonymous(&self, loc: &CodeLoc) -> Option<Rc<SymbolTableEntry>> {
        self.0.borrow().anonymous.get(loc).cloned()
    }

    pub fn insert_generic_type(&self, generic: GenericType) {
        self.0.borrow_mut().generic_types.insert(generic.name.clone(), generic);
    }

    pub fn lookup_generic_type(&self, name: &str) -> Option<GenericType> {
        if let Some(g) = self.0.borrow().generic_types.get(name) {
            return Some(g.clone());
        }
        self.0.borrow().parent.as_ref()?.lookup_generic_type(name)
    }

    /// Registers `name` as an alias resolving to `target` in this scope's own
    /// alias namespace (distinct from `table`, so `type Id = int;` never
    /// collides with a variable called `Id`).
    pub fn insert_alias(&self, name: impl Into<String>, target: Type) {
        self.0.borrow_mut().aliases.insert(name.into(), target);
    }

    pub fn lookup_alias(&self, name: &str) -> Option<Type> {
        if let Some(t) = self.0.borrow().aliases.get(name) {
            return Some(t.clone());
        }
        let parent = self.0.borrow().parent.clone();
        match parent {
            Some(parent) => parent.lookup_alias(name),
            None => self.lookup_alias_in_mounted_imports(name),
        }
    }

    /// `type` declarations carry no `public`/private distinction in the
    /// grammar, unlike globals and functions, so every alias an imported file
    /// declares is visible once that file is mounted.
    fn lookup_alias_in_mounted_imports(&self, name: &str) -> Option<Type> {
        let imports: Vec<Scope> = self
            .0
            .borrow()
            .children
            .iter()
            .filter(|(n, _)| n.starts_with("import:"))
            .map(|(_, s)| s.clone())
            .collect();
        imports.iter().find_map(|import| import.0.borrow().aliases.get(name).cloned())
    }

    /// Names declared directly in this scope's table, for walking an interface
    /// body's method signatures or similar declaration-only scopes.
    pub fn entry_names(&self) -> Vec<String> {
        self.0.borrow().table.keys().cloned().collect()
    }

    /// Field names in declaration order, parallel to [`Scope::ordered_field_types`].
    pub fn ordered_field_names(&self) -> Vec<String> {
        let data = self.0.borrow();
        let mut fields: Vec<&Rc<SymbolTableEntry>> = data.table.values().collect();
        fields.sort_by_key(|e| e.ordinal);
        fields.iter().map(|e| e.name.clone()).collect()
    }

    /// Mounts an already-built scope as a named child of `self` without
    /// deep-copying it, so a module's declarations stay reachable by identity
    /// from an importing file's scope tree (unlike [`Scope::copy_child_scope`],
    /// which is for generic substantiation and intentionally forks the data).
    pub fn mount_child_scope(&self, existing: &Scope, name: impl Into<String>) {
        self.0.borrow_mut().children.push((name.into(), existing.clone()));
    }

    /// Finds the named child scope opened for a struct/interface declaration, for
    /// IR-generation field-layout lookups. Matches the naming convention used by
    /// `create_child_scope` for struct bodies: `struct:<Name>`.
    pub fn lookup_struct_scope(&self, struct_name: &str) -> Option<Scope> {
        self.get_child_scope(&format!("struct:{struct_name}"))
            .or_else(|| self.0.borrow().parent.as_ref()?.lookup_struct_scope(struct_name))
    }

    /// Field types in declaration order, for struct layout and constructor
    /// argument matching. Only meaningful on a scope whose kind is [`ScopeKind::Struct`].
    pub fn ordered_field_types(&self) -> Vec<Type> {
        let data = self.0.borrow();
        let mut fields: Vec<&Rc<SymbolTableEntry>> = data.table.values().collect();
        fields.sort_by_key(|e| e.ordinal);
        fields.iter().map(|e| e.get_type()).collect()
    }

    /// Position of `field_name` within declaration order, for GEP index
    /// computation during IR generation. Only meaningful on a
    /// [`ScopeKind::Struct`] scope.
    pub fn field_index(&self, field_name: &str) -> Option<u32> {
        let data = self.0.borrow();
        let mut fields: Vec<&Rc<SymbolTableEntry>> = data.table.values().collect();
        fields.sort_by_key(|e| e.ordinal);
        fields.iter().position(|e| e.name == field_name).map(|i| i as u32)
    }

    pub fn get_field_count(&self) -> usize {
        self.0.borrow().table.len()
    }

    /// Variables that go out of scope when this scope exits, in reverse
    /// declaration order (the order destructors must run in). Skips `this`,
    /// `result` and parameters, which are owned by the caller; a scope marked as
    /// a destructor scope additionally includes the enclosing struct's fields.
    pub fn get_vars_going_out_of_scope(&self) -> Vec<Rc<SymbolTableEntry>> {
        let data = self.0.borrow();
        let mut vars: Vec<Rc<SymbolTableEntry>> = data
            .table
            .values()
            .filter(|e| {
                e.name != "this"
                    && e.name != "result"
                    && !e.flags.get().contains(EntryFlags::PARAM)
                    && !e.flags.get().contains(EntryFlags::OMIT_DTOR_CALL)
            })
            .cloned()
            .collect();
        vars.sort_by_key(|e| e.ordinal);
        vars.reverse();
        vars
    }

    pub fn push_warning(&self, warning: Warning) {
        self.0.borrow_mut().warnings.push(warning);
    }

    /// Gathers this scope's own warnings plus every descendant's, depth first,
    /// for the driver to flush once at the end of a compile.
    pub fn collect_warnings(&self) -> Vec<Warning> {
        let data = self.0.borrow();
        let mut out = data.warnings.clone();
        for (_, child) in &data.children {
            out.extend(child.collect_warnings());
        }
        out
    }

    /// True if `asking_scope` sits in a source file that imported the file owning
    /// `self` (used to decide whether a `pub` vs. private declaration is visible).
    pub fn is_imported_by(&self, asking_scope: &Scope) -> bool {
        self.is_imported() && !Rc::ptr_eq(&self.0, &asking_scope.0)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Scope")
            .field("kind", &data.kind)
            .field("symbols", &data.table.len())
            .field("children", &data.children.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typechecker::types::SuperType;

    #[test]
    fn insert_rejects_duplicate_names_in_same_scope() {
        let scope = Scope::new_global();
        scope.insert("x", Type::primitive(SuperType::Int), None, EntryFlags::empty()).unwrap();
        let err = scope.insert("x", Type::primitive(SuperType::Bool), None, EntryFlags::empty());
        assert!(err.is_err());
    }

    #[test]
    fn lookup_walks_to_parent_scope() {
        let global = Scope::new_global();
        global.insert("g", Type::primitive(SuperType::Int), None, EntryFlags::GLOBAL).unwrap();
        let child = global.create_child_scope("func:main", ScopeKind::FuncProcBody);
        assert!(child.lookup("g").is_some());
        assert!(child.lookup_strict("g").is_none());
    }

    #[test]
    fn deep_copy_reparents_and_preserves_fields() {
        let global = Scope::new_global();
        let body = global.create_child_scope("struct:Box", ScopeKind::Struct);
        body.insert("value", Type::generic("T"), None, EntryFlags::empty()).unwrap();

        let substantiated = global.copy_child_scope(&body, "struct:Box<int>");
        assert_eq!(substantiated.lookup_strict("value").unwrap().get_type(), Type::generic("T"));
        substantiated.lookup_strict("value").unwrap().set_type(Type::primitive(SuperType::Int));
        // Original is untouched by mutating the copy.
        assert_eq!(body.lookup_strict("value").unwrap().get_type(), Type::generic("T"));
    }

    #[test]
    fn vars_going_out_of_scope_skip_this_and_params() {
        let global = Scope::new_global();
        let func = global.create_child_scope("func:f", ScopeKind::FuncProcBody);
        func.insert("this", Type::generic("Self"), None, EntryFlags::empty()).unwrap();
        func.insert("p", Type::primitive(SuperType::Int), None, EntryFlags::PARAM).unwrap();
        func.insert("local", Type::primitive(SuperType::Int), None, EntryFlags::empty()).unwrap();
        let out = func.get_vars_going_out_of_scope();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "local");
    }

    #[test]
    fn lookup_struct_scope_finds_body_by_convention_name() {
        let global = Scope::new_global();
        let body = global.create_child_scope("struct:Point", ScopeKind::Struct);
        body.insert("x", Type::primitive(SuperType::Int), None, EntryFlags::empty()).unwrap();
        body.insert("y", Type::primitive(SuperType::Int), None, EntryFlags::empty()).unwrap();
        let found = global.lookup_struct_scope("Point").unwrap();
        assert_eq!(found.ordered_field_types().len(), 2);
    }
}
