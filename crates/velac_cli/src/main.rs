//! The compiler driver for Vela. Combines the front end, type checker and IR
//! generator of `velac_core` into a single command-line application.

use std::error::Error;
use std::process::ExitCode;

use log::error;
use velac::cli::{Cli, Commands};
use velac::commands;

fn main() -> ExitCode {
    let args = Cli::init();
    simple_logger::init_with_level(args.log_level()).unwrap();

    let result: Result<(), Box<dyn Error>> = match &args.command {
        Commands::Build(build_args) => commands::build::build(build_args).map(|_| ()).map_err(Into::into),
        Commands::Run(build_args) => commands::build::run(build_args).map_err(Into::into),
        Commands::Install => commands::setup::install(),
        Commands::Uninstall => commands::setup::uninstall(),
    };

    if let Err(err) = result {
        error!("{err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
