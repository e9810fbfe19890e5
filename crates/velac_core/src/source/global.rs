//! The global resource manager (component C10): the single object instantiated
//! once per compiler invocation, owning every [`super::SourceFile`] plus the
//! resources that must be shared across all of them rather than duplicated per
//! file — the function/struct manifestation interners and the compilation cache.
//! Grounded on `GlobalResourceManager.h`: a resource root, not a pipeline stage
//! itself.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use crate::manager::{FunctionManager, StructManager};
use crate::source::cache::CacheManager;
use crate::source::SourceFile;

/// The subset of CLI flags the compilation pipeline itself consults. Parsing
/// `clap` arguments into this shape is the CLI crate's job; this struct only
/// carries the decisions that affect which pipeline stages run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub output_dir: PathBuf,
    pub ignore_cache: bool,
    pub dump_ast: bool,
    pub dump_symbol_tables: bool,
    pub dump_ir: bool,
    pub opt_level: u8,
    pub disable_verifier: bool,
    pub print_debug_output: bool,
    pub test_mode: bool,
    /// Target OS/arch used to probe `_{os}` / `_{os}_{arch}` import suffixes
    /// before falling back to the unsuffixed path. `None` skips probing
    /// entirely (the default, since most fixtures have no platform variant).
    pub target_os: Option<String>,
    pub target_arch: Option<String>,
}

impl Default for CompileOptions {
    fn default() -> CompileOptions {
        CompileOptions {
            output_dir: PathBuf::from("."),
            ignore_cache: false,
            dump_ast: false,
            dump_symbol_tables: false,
            dump_ir: false,
            opt_level: 0,
            disable_verifier: false,
            print_debug_output: false,
            test_mode: false,
            target_os: None,
            target_arch: None,
        }
    }
}

pub struct GlobalResourceManager {
    pub cli_options: CompileOptions,
    pub cache_manager: CacheManager,
    pub functions: FunctionManager,
    pub structs: StructManager,
    source_files: RefCell<HashMap<PathBuf, Rc<SourceFile>>>,
}

impl GlobalResourceManager {
    pub fn new(cli_options: CompileOptions) -> GlobalResourceManager {
        GlobalResourceManager {
            cli_options,
            cache_manager: CacheManager::new(),
            functions: FunctionManager::default(),
            structs: StructManager::default(),
            source_files: RefCell::new(HashMap::new()),
        }
    }

    /// Creates (or returns the already-created) [`SourceFile`] for `path`,
    /// recording it in the resource root's file table. `parent` is `None` only
    /// for the entry file passed on the command line.
    pub fn create_source_file(
        &self,
        parent: Option<&Rc<SourceFile>>,
        dependency_name: &str,
        path: &std::path::Path,
        is_std_file: bool,
    ) -> Rc<SourceFile> {
        if let Some(existing) = self.source_files.borrow().get(path) {
            return Rc::clone(existing);
        }
        let source_file = Rc::new(SourceFile::new(parent, dependency_name.to_string(), path.to_path_buf(), is_std_file));
        self.source_files.borrow_mut().insert(path.to_path_buf(), Rc::clone(&source_file));
        source_file
    }

    pub fn source_file_count(&self) -> usize {
        self.source_files.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_source_file_interns_by_path() {
        let grm = GlobalResourceManager::new(CompileOptions::default());
        let a = grm.create_source_file(None, "main", std::path::Path::new("main.vl"), false);
        let b = grm.create_source_file(None, "main", std::path::Path::new("main.vl"), false);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(grm.source_file_count(), 1);
    }
}
