//! Exercises the `build` driver directly against the shared fixture pack,
//! since shelling out to the `velac` binary would need the object emission
//! and linking this crate deliberately doesn't carry.

use std::path::PathBuf;

use test_utils::fixture_path;
use velac::cli;
use velac::commands;

fn args_for(fixture: &str) -> cli::BuildArgs {
    cli::BuildArgs {
        file: fixture_path(fixture),
        output: None,
        target_triple: None,
        target_arch: None,
        target_vendor: None,
        target_os: None,
        opt_level: cli::OptLevel::O0,
        debug_output: false,
        dump_cst: false,
        dump_ast: false,
        dump_symtab: false,
        dump_ir: true,
        jobs: 1,
        ignore_cache: true,
    }
}

#[test]
fn builds_hello_world_fixture() {
    let resources = commands::build::build(&args_for("hello.vl")).expect("hello.vl should build");
    assert!(resources.functions.all().iter().any(|f| f.mangled_name.starts_with("main")));
}

#[test]
fn rejects_fixture_with_a_const_reassignment() {
    let result = commands::build::build(&args_for("const_reassign.vl"));
    assert!(result.is_err());
}

#[test]
fn writes_textual_ir_to_the_requested_output_path() {
    let dir = std::env::temp_dir().join("velac_cli_build_args_test");
    std::fs::create_dir_all(&dir).unwrap();
    let output: PathBuf = dir.join("add.ll");
    let mut args = args_for("add.vl");
    args.output = Some(output.clone());
    commands::build::build(&args).expect("add.vl should build");
    let contents = std::fs::read_to_string(&output).unwrap();
    assert!(contents.contains("define"));
}
