//! Per-file compilation pipeline (component C9).
//!
//! One [`SourceFile`] owns one translation unit's token stream, AST arena and
//! global scope, and drives it front-to-back through the stage methods below.
//! Grounded on `SourceFile.cpp`'s stage methods and `runFrontEnd`/`runMiddleEnd`
//! groupings, trimmed to the stages this crate actually models: lexing, parsing,
//! import collection, symbol-table building and the two-phase type-check are
//! in scope; CST/AST visualization, the borrow checker, the escape analyzer,
//! IR optimization, object emission and linking are not modeled here (IR
//! generation itself lives in [`crate::codegen`] and is invoked directly by the
//! driver after the middle end succeeds, not as a `SourceFile` stage, since this
//! crate does not carry a back end beyond reproducing LLVM IR shape).

pub mod cache;
pub mod global;

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::ast::{Arena, AstNode, AstNodeId};
use crate::diagnostics::{CircularDependencyError, CodeLoc, SemanticError, Span, Warning};
use crate::scope::Scope;
use crate::source::global::GlobalResourceManager;
use crate::typechecker::TypeChecker;

pub use cache::CacheManager;
pub use global::CompileOptions;

/// One entry in a file's exported-name registry: which entry a publicly visible
/// name ultimately resolves to, following renames through `as` import aliases.
/// `predecessor_name` is empty once the chain bottoms out at the real
/// declaration.
#[derive(Clone, Debug)]
pub struct NameRegistryEntry {
    pub owning_file: PathBuf,
    pub predecessor_name: String,
}

/// A single translation unit. Holds the lexed/parsed/checked state for one
/// `.vl` file; its `dependencies` map holds one entry per `import`, each
/// pointing at the (shared, since diamond imports are legal) [`SourceFile`] for
/// that path plus the AST node of the `import` statement that pulled it in, so
/// diagnostics about the import itself can point somewhere sensible.
pub struct SourceFile {
    pub name: String,
    pub file_path: PathBuf,
    pub is_std_file: bool,
    pub parent: Option<Weak<SourceFile>>,
    pub main_file: Cell<bool>,
    pub dependencies: RefCell<HashMap<String, (Rc<SourceFile>, AstNodeId)>>,
    pub arena: RefCell<Arena>,
    pub ast_root: Cell<Option<AstNodeId>>,
    pub global_scope: Scope,
    cache_key: RefCell<Option<String>>,
    restored_from_cache: Cell<bool>,
    pub name_registry: RefCell<HashMap<String, NameRegistryEntry>>,
    /// Per-stage wall-clock timings, recorded unconditionally and only surfaced
    /// when `--debug-output` is passed, mirroring the original's
    /// `printStatusMessage` timing lines after each `runXxx` stage.
    pub stage_times: RefCell<Vec<(&'static str, std::time::Duration)>>,
}

fn time_stage<T, E>(label: &'static str, times: &RefCell<Vec<(&'static str, std::time::Duration)>>, f: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
    let start = std::time::Instant::now();
    let result = f();
    times.borrow_mut().push((label, start.elapsed()));
    result
}

impl SourceFile {
    pub fn new(parent: Option<&Rc<SourceFile>>, name: String, file_path: PathBuf, is_std_file: bool) -> SourceFile {
        SourceFile {
            name,
            file_path,
            is_std_file,
            parent: parent.map(Rc::downgrade),
            main_file: Cell::new(true),
            dependencies: RefCell::new(HashMap::new()),
            arena: RefCell::new(Arena::new()),
            ast_root: Cell::new(None),
            global_scope: Scope::new_global(),
            cache_key: RefCell::new(None),
            restored_from_cache: Cell::new(false),
            name_registry: RefCell::new(HashMap::new()),
            stage_times: RefCell::new(Vec::new()),
        }
    }

    fn dummy_loc(&self) -> CodeLoc {
        CodeLoc::new(Arc::new(self.file_path.clone()), Span::dummy())
    }

    /// Reads the file from disk, computes its cache key, and checks the resource
    /// manager's cache for a hit. A hit sets `restored_from_cache`, which every
    /// later stage consults to skip its own work.
    pub fn run_lexer(&self, resources: &GlobalResourceManager) -> Result<String, std::io::Error> {
        let source_text = std::fs::read_to_string(&self.file_path)?;
        let key = cache::compute_cache_key(&source_text);
        if !resources.cli_options.ignore_cache {
            let hit = resources.cache_manager.lookup_source_file(&self.file_path.to_string_lossy(), &key);
            self.restored_from_cache.set(hit);
        }
        *self.cache_key.borrow_mut() = Some(key);
        Ok(source_text)
    }

    /// Lexes and parses `source_text` into this file's arena, stashing the root
    /// [`AstNodeId`] returned by the parser. Skipped entirely on a cache hit.
    pub fn run_parser(&self, source_text: &str) -> Result<(), crate::diagnostics::ParseError> {
        if self.restored_from_cache.get() {
            return Ok(());
        }
        let tokens = crate::lexer::lex(source_text, &self.file_path).map_err(|lex_err| {
            crate::diagnostics::ParseError::UnexpectedToken(crate::diagnostics::UnexpectedTokenError {
                loc: self.dummy_loc(),
                detail: lex_err.to_string(),
            })
        })?;
        let mut arena = self.arena.borrow_mut();
        let root = crate::parser::parse(&tokens, &mut arena, &self.file_path)?;
        self.ast_root.set(Some(root));
        Ok(())
    }

    /// Walks this file's `Program.imports` list and resolves each one to a
    /// (possibly already-interned) dependency [`SourceFile`], then runs that
    /// dependency's own front end before returning — dependencies must be fully
    /// parsed and name-collected before this file's symbol table can reference
    /// their exported names.
    pub fn run_import_collector(&self, self_rc: &Rc<SourceFile>, resources: &GlobalResourceManager) -> Result<(), SemanticError> {
        if self.restored_from_cache.get() {
            return Ok(());
        }
        let Some(root) = self.ast_root.get() else { return Ok(()) };
        let arena = self.arena.borrow();
        let AstNode::Program(program) = arena.get(root) else {
            return Ok(());
        };
        let import_ids = program.imports.clone();
        drop(arena);

        for import_id in import_ids {
            let (dep_name, dep_path_str) = {
                let arena = self.arena.borrow();
                let AstNode::Import(import_node) = arena.get(import_id) else { continue };
                (import_node.alias.clone(), import_node.path.clone())
            };
            let dep_path = self.resolve_import_path(&dep_path_str, &resources.cli_options);
            let is_std = dep_path_str.starts_with("std/");
            let dependency = resources.create_source_file(Some(self_rc), &dep_name, &dep_path, is_std);
            self.add_dependency(dependency.clone(), import_id, &dep_name)?;
            dependency.run_front_end(&dependency, resources).map_err(|errs| {
                errs.into_iter().next().unwrap_or_else(|| {
                    SemanticError::StdNotFound(crate::diagnostics::StdNotFoundError {
                        loc: self.dummy_loc(),
                        detail: dep_path_str.clone(),
                    })
                })
            })?;
            // Mounts the dependency's global scope so this file's `Scope::lookup`
            // can reach its `public` globals and aliases once the dependency's own
            // symbol table has been built (see `run_symbol_table_builder`).
            dependency.global_scope.set_is_imported(true);
            self.global_scope.mount_child_scope(&dependency.global_scope, format!("import:{dep_name}"));
        }
        Ok(())
    }

    /// Resolves an import's raw path against this file's directory, probing
    /// `_{os}` then `_{os}_{arch}` suffixed variants (when the resource
    /// manager was given a target) before falling back to the unsuffixed
    /// path — e.g. `import "socket";` on a `linux`/`x86_64` build first tries
    /// `socket_linux_x86_64.vl`, then `socket_linux.vl`, then `socket.vl`.
    fn resolve_import_path(&self, raw: &str, options: &CompileOptions) -> PathBuf {
        let base = self.file_path.parent().map(PathBuf::from).unwrap_or_default();
        if let Some(os) = &options.target_os {
            if let Some(arch) = &options.target_arch {
                let candidate = base.join(format!("{raw}_{os}_{arch}.vl"));
                if candidate.is_file() {
                    return candidate;
                }
            }
            let candidate = base.join(format!("{raw}_{os}.vl"));
            if candidate.is_file() {
                return candidate;
            }
        }
        base.join(format!("{raw}.vl"))
    }

    /// Registers `dependency` under `dependency_name`, rejecting the import if it
    /// would close a cycle back to a file already on this import chain.
    pub fn add_dependency(&self, dependency: Rc<SourceFile>, decl_node: AstNodeId, dependency_name: &str) -> Result<(), SemanticError> {
        if self.is_already_imported(&dependency.file_path) {
            return Err(SemanticError::CircularDependency(CircularDependencyError {
                loc: self.dummy_loc(),
                detail: format!("'{}' is already on the import chain", dependency.file_path.display()),
            }));
        }
        dependency.main_file.set(false);
        self.dependencies.borrow_mut().insert(dependency_name.to_string(), (dependency, decl_node));
        Ok(())
    }

    fn is_already_imported(&self, path_search: &std::path::Path) -> bool {
        if self.file_path == path_search {
            return true;
        }
        match &self.parent {
            Some(weak) => weak.upgrade().is_some_and(|parent| parent.is_already_imported(path_search)),
            None => false,
        }
    }

    /// Registers every top-level declaration in this file's global scope
    /// (structs first, so method/function signatures can reference struct
    /// types declared later in the file) without yet checking expression bodies.
    pub fn run_symbol_table_builder(&self, functions: &crate::manager::FunctionManager, structs: &crate::manager::StructManager) -> Result<(), Vec<SemanticError>> {
        if self.restored_from_cache.get() {
            return Ok(());
        }
        let Some(root) = self.ast_root.get() else { return Ok(()) };
        let arena = self.arena.borrow();
        let checker = TypeChecker::new(&arena, functions, structs, Arc::new(self.file_path.clone()));
        checker.shallow_check_program(&self.global_scope, root)
    }

    /// Bottom-up pass: type-checks every dependency before this file, so that by
    /// the time this file's generic call sites are visited, every manifestation
    /// they could request from an imported module already exists.
    pub fn run_type_checker_first(&self, functions: &crate::manager::FunctionManager, structs: &crate::manager::StructManager) -> Result<(), Vec<SemanticError>> {
        if self.restored_from_cache.get() {
            return Ok(());
        }
        for (_, (dependency, _)) in self.dependencies.borrow().iter() {
            dependency.run_type_checker_first(functions, structs)?;
        }
        self.run_symbol_table_builder(functions, structs)
    }

    /// Top-down pass: fully checks this file (looping until no new generic
    /// manifestation was requested) before recursing into dependencies, mirroring
    /// the order a human reading `import`s top-to-bottom would resolve names in.
    pub fn run_type_checker_second(&self, functions: &crate::manager::FunctionManager, structs: &crate::manager::StructManager) -> Result<Vec<Warning>, Vec<SemanticError>> {
        if self.restored_from_cache.get() {
            return Ok(Vec::new());
        }
        let Some(root) = self.ast_root.get() else { return Ok(Vec::new()) };
        let arena = self.arena.borrow();
        let mut checker = TypeChecker::new(&arena, functions, structs, Arc::new(self.file_path.clone()));
        let mut warnings = checker.check_program(&self.global_scope, root)?;
        drop(arena);

        for (_, (dependency, _)) in self.dependencies.borrow().iter() {
            warnings.extend(dependency.run_type_checker_second(functions, structs)?);
        }
        Ok(warnings)
    }

    /// Lexing, parsing, and import collection: the stages that must finish for
    /// this file before any dependent file's symbol table can be built.
    pub fn run_front_end(&self, self_rc: &Rc<SourceFile>, resources: &GlobalResourceManager) -> Result<(), Vec<SemanticError>> {
        let source_text = time_stage("lexer", &self.stage_times, || {
            self.run_lexer(resources).map_err(|io_err| {
                vec![SemanticError::StdNotFound(crate::diagnostics::StdNotFoundError {
                    loc: self.dummy_loc(),
                    detail: io_err.to_string(),
                })]
            })
        })?;
        time_stage("parser", &self.stage_times, || {
            self.run_parser(&source_text).map_err(|parse_err| {
                vec![SemanticError::ReferencedUndefinedType(crate::diagnostics::ReferencedUndefinedTypeError {
                    loc: self.dummy_loc(),
                    detail: parse_err.to_string(),
                })]
            })
        })?;
        time_stage("import_collector", &self.stage_times, || self.run_import_collector(self_rc, resources).map_err(|e| vec![e]))
    }

    /// Both type-checker passes.
    pub fn run_middle_end(&self, functions: &crate::manager::FunctionManager, structs: &crate::manager::StructManager) -> Result<Vec<Warning>, Vec<SemanticError>> {
        time_stage("symbol_table_and_shallow_check", &self.stage_times, || self.run_type_checker_first(functions, structs))?;
        time_stage("type_check", &self.stage_times, || self.run_type_checker_second(functions, structs))
    }

    /// Logs every recorded stage duration for this file (and, recursively, its
    /// dependencies) through `log::debug!`, gated by the driver on
    /// `--debug-output` rather than checked here.
    pub fn print_stage_times(&self) {
        for (label, elapsed) in self.stage_times.borrow().iter() {
            log::debug!("[{}] {label} took {:.3}ms", self.name, elapsed.as_secs_f64() * 1000.0);
        }
        for (_, (dependency, _)) in self.dependencies.borrow().iter() {
            dependency.print_stage_times();
        }
    }

    /// Writes this file's cache key back to the resource manager once every
    /// stage above has succeeded, so the next compilation of an unchanged file
    /// can skip straight past the front and middle ends.
    pub fn conclude_compilation(&self, resources: &GlobalResourceManager) {
        for (_, (dependency, _)) in self.dependencies.borrow().iter() {
            dependency.conclude_compilation(resources);
        }
        if !resources.cli_options.ignore_cache {
            if let Some(key) = self.cache_key.borrow().as_ref() {
                resources.cache_manager.cache_source_file(&self.file_path.to_string_lossy(), key);
            }
        }
    }

    /// Depth-first collection of every warning recorded against this file's
    /// scope tree (and, recursively, every non-std dependency's), logged through
    /// `log::warn!` the way the driver surfaces them to the user.
    pub fn collect_and_print_warnings(&self) -> Vec<Warning> {
        let mut warnings = Vec::new();
        for (_, (dependency, _)) in self.dependencies.borrow().iter() {
            if !dependency.is_std_file {
                warnings.extend(dependency.collect_and_print_warnings());
            }
        }
        warnings.extend(self.global_scope.collect_warnings());
        for warning in &warnings {
            log::warn!("{warning}");
        }
        warnings
    }

    /// Records (or overwrites) which scope a publicly exported name ultimately
    /// resolves to. A name collision with `keep_new_on_collision` unset removes
    /// the existing entry outright rather than keeping either candidate, so a
    /// later ambiguous lookup fails loudly instead of picking one arbitrarily.
    pub fn add_name_registry_entry(&self, name: &str, owning_file: PathBuf, predecessor_name: String, keep_new_on_collision: bool) {
        let mut registry = self.name_registry.borrow_mut();
        if keep_new_on_collision || !registry.contains_key(name) {
            registry.insert(name.to_string(), NameRegistryEntry { owning_file, predecessor_name });
        } else {
            registry.remove(name);
        }
    }

    pub fn get_name_registry_entry(&self, name: &str) -> Option<NameRegistryEntry> {
        let registry = self.name_registry.borrow();
        let mut entry = registry.get(name)?.clone();
        while !entry.predecessor_name.is_empty() {
            entry = registry.get(&entry.predecessor_name)?.clone();
        }
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> Rc<SourceFile> {
        Rc::new(SourceFile::new(None, path.to_string(), PathBuf::from(path), false))
    }

    #[test]
    fn add_dependency_rejects_self_import_cycle() {
        let root = file("main.vl");
        let again = Rc::new(SourceFile::new(Some(&root), "main".to_string(), PathBuf::from("main.vl"), false));
        let dummy_id = AstNodeId(0);
        assert!(root.add_dependency(again, dummy_id, "main").is_err());
    }

    #[test]
    fn add_dependency_accepts_distinct_path() {
        let root = file("main.vl");
        let dep = file("util.vl");
        let dummy_id = AstNodeId(0);
        assert!(root.add_dependency(dep, dummy_id, "util").is_ok());
        assert_eq!(root.dependencies.borrow().len(), 1);
    }

    #[test]
    fn name_registry_follows_predecessor_chain() {
        let root = file("main.vl");
        root.add_name_registry_entry("Original", PathBuf::from("main.vl"), String::new(), false);
        root.add_name_registry_entry("Aliased", PathBuf::from("main.vl"), "Original".to_string(), false);
        let resolved = root.get_name_registry_entry("Aliased").unwrap();
        assert_eq!(resolved.predecessor_name, "");
    }

    #[test]
    fn name_registry_collision_without_keep_new_removes_entry() {
        let root = file("main.vl");
        root.add_name_registry_entry("Foo", PathBuf::from("a.vl"), String::new(), false);
        root.add_name_registry_entry("Foo", PathBuf::from("b.vl"), String::new(), false);
        assert!(root.get_name_registry_entry("Foo").is_none());
    }

    #[test]
    fn resolve_import_path_falls_back_when_no_suffixed_variant_exists_on_disk() {
        let root = SourceFile::new(None, "main".to_string(), PathBuf::from("main.vl"), false);
        let options = CompileOptions { target_os: Some("linux".to_string()), ..CompileOptions::default() };
        assert_eq!(root.resolve_import_path("util", &options), PathBuf::from("util.vl"));
    }

    #[test]
    fn resolve_import_path_ignores_suffixes_without_a_target() {
        let root = SourceFile::new(None, "main".to_string(), PathBuf::from("main.vl"), false);
        assert_eq!(root.resolve_import_path("util", &CompileOptions::default()), PathBuf::from("util.vl"));
    }

    #[test]
    fn time_stage_records_a_duration_even_on_failure() {
        let times = RefCell::new(Vec::new());
        let result: Result<(), &str> = time_stage("stage", &times, || Err("boom"));
        assert_eq!(result, Err("boom"));
        assert_eq!(times.borrow().len(), 1);
        assert_eq!(times.borrow()[0].0, "stage");
    }
}
