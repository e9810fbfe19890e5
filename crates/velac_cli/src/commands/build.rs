//! The `build` and `run` subcommands: drives `velac_core`'s front end, middle
//! end and IR generator over one main file and its import graph.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use inkwell::context::Context as LlvmContext;
use log::{error, info};
use velac_core::codegen::CodeGenerator;
use velac_core::source::global::{CompileOptions, GlobalResourceManager};

use crate::cli::BuildArgs;

/// Runs the full pipeline for `args`, returning the populated resource
/// manager so `run` can inspect it further (e.g. to report why execution
/// isn't possible) without re-checking the program from scratch.
pub fn build(args: &BuildArgs) -> Result<GlobalResourceManager> {
    let file = fs::canonicalize(&args.file).with_context(|| format!("reading `{}`", args.file.display()))?;

    let output_dir = args
        .output
        .as_ref()
        .and_then(|path| path.parent())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let options = CompileOptions {
        output_dir,
        ignore_cache: args.ignore_cache,
        dump_ast: args.dump_ast,
        dump_symbol_tables: args.dump_symtab,
        dump_ir: args.dump_ir,
        opt_level: args.opt_level.as_u8(),
        disable_verifier: false,
        print_debug_output: args.debug_output,
        test_mode: false,
        target_os: args.target_os.clone(),
        target_arch: args.target_arch.clone(),
    };
    let resources = GlobalResourceManager::new(options);

    let name = file.file_stem().and_then(|s| s.to_str()).unwrap_or("main").to_string();
    let main_file = resources.create_source_file(None, &name, &file, false);

    info!("compiling `{}`", file.display());
    main_file.run_front_end(&main_file, &resources).map_err(|errors| {
        for err in &errors {
            error!("{err}");
        }
        anyhow::anyhow!("{} error(s) during front-end compilation", errors.len())
    })?;

    if resources.cli_options.dump_ast {
        println!("{:#?}", main_file.arena.borrow());
    }

    let warnings = main_file.run_middle_end(&resources.functions, &resources.structs).map_err(|errors| {
        for err in &errors {
            error!("{err}");
        }
        anyhow::anyhow!("{} error(s) during type checking", errors.len())
    })?;
    for warning in &warnings {
        log::warn!("{warning}");
    }
    main_file.collect_and_print_warnings();

    let llvm_ctx = LlvmContext::create();
    let mut codegen = CodeGenerator::new(&llvm_ctx, &name, main_file.global_scope.clone());
    codegen.generate_file(&main_file.arena.borrow(), &resources.structs, &resources.functions);

    if !resources.cli_options.disable_verifier {
        if let Err(message) = codegen.module.verify() {
            anyhow::bail!("generated module failed verification: {}", message.to_string());
        }
    }

    if resources.cli_options.dump_ir {
        println!("{}", codegen.module.print_to_string().to_string());
    }

    if let Some(output) = &args.output {
        fs::write(output, codegen.module.print_to_string().to_string())
            .with_context(|| format!("writing IR to `{}`", output.display()))?;
        info!("wrote textual LLVM IR to `{}` (object emission and linking are not part of this driver)", output.display());
    }

    main_file.conclude_compilation(&resources);
    if resources.cli_options.print_debug_output {
        main_file.print_stage_times();
    }
    Ok(resources)
}

/// `run` builds the program and explains why it stops short of executing
/// it: turning the emitted IR into a runnable binary needs the external
/// linker and a concrete target, neither of which this driver carries.
pub fn run(args: &BuildArgs) -> Result<()> {
    build(args)?;
    info!("built successfully; running the result requires an external linker this driver does not invoke");
    Ok(())
}
