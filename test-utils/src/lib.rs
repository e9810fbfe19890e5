//! Fixture-loading helpers shared by `velac_core`'s and `velac_cli`'s integration tests.
//!
//! The teacher's own `test-utils` crate shells out to a compiled binary and diffs its
//! process output; that end-to-end harness needs object emission and a linker, neither of
//! which this repository carries. These helpers instead drive the middle end directly
//! against a `fixtures/`-relative source file and hand back the checked program (or
//! diagnostics) for assertions.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use velac_core::diagnostics::{SemanticError, Warning};
use velac_core::source::global::{CompileOptions, GlobalResourceManager};
use velac_core::source::SourceFile;

/// Resolves a path relative to this crate's `fixtures/` directory.
pub fn fixture_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures").join(relative)
}

pub struct CheckedProgram {
    pub resources: GlobalResourceManager,
    pub main_file: Rc<SourceFile>,
    pub warnings: Vec<Warning>,
}

/// Runs the front end and both type-checker passes over `path`, the way `velac build`
/// would before handing off to IR generation.
pub fn check_file(path: &Path) -> Result<CheckedProgram, Vec<SemanticError>> {
    let resources = GlobalResourceManager::new(CompileOptions::default());
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("main").to_string();
    let main_file = resources.create_source_file(None, &name, path, false);
    main_file.run_front_end(&main_file, &resources)?;
    let warnings = main_file.run_middle_end(&resources.functions, &resources.structs)?;
    main_file.conclude_compilation(&resources);
    Ok(CheckedProgram { resources, main_file, warnings })
}

/// Convenience assertion for fixtures that are expected to type-check cleanly.
pub fn assert_checks(path: &Path) -> CheckedProgram {
    match check_file(path) {
        Ok(program) => program,
        Err(errors) => panic!("expected `{}` to type-check, got: {errors:?}", path.display()),
    }
}

/// Convenience assertion for fixtures that are expected to fail type checking.
pub fn assert_fails(path: &Path) -> Vec<SemanticError> {
    match check_file(path) {
        Ok(_) => panic!("expected `{}` to fail type checking, but it passed", path.display()),
        Err(errors) => errors,
    }
}
