//! Everything needed to parse `velac`'s command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Top-level CLI configuration for `velac`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Repeat to raise the log level (`-v` = warn, `-vv` = info, `-vvv` = debug, `-vvvv` = trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn init() -> Self {
        Cli::parse()
    }

    pub fn log_level(&self) -> log::Level {
        match self.verbose {
            0 => log::Level::Error,
            1 => log::Level::Warn,
            2 => log::Level::Info,
            3 => log::Level::Debug,
            _ => log::Level::Trace,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Type-check and emit LLVM IR for a Vela source file.
    Build(BuildArgs),

    /// Build and immediately run the resulting program.
    Run(BuildArgs),

    /// Install the bundled standard library into the local Vela home directory.
    Install,

    /// Remove a previously installed standard library.
    Uninstall,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptLevel {
    #[default]
    O0,
    O1,
    O2,
    O3,
    Os,
    Oz,
}

impl OptLevel {
    /// Collapses the six-way optimization level flag down to the 0-3 scale
    /// `CompileOptions::opt_level` carries; `Os`/`Oz` (size-optimized) are
    /// represented as the closest speed tier since this crate never runs the
    /// LLVM pass pipeline that would distinguish them.
    pub fn as_u8(self) -> u8 {
        match self {
            OptLevel::O0 => 0,
            OptLevel::O1 => 1,
            OptLevel::O2 => 2,
            OptLevel::O3 | OptLevel::Os | OptLevel::Oz => 3,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Path to the Vela source file to compile.
    #[arg(index = 1)]
    pub file: PathBuf,

    /// Output path for the emitted artifact.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Target triple to compile for (accepted for CLI-surface parity; object
    /// emission and linking against a concrete target live outside this crate).
    #[arg(short = 't', long = "target-triple")]
    pub target_triple: Option<String>,

    #[arg(long = "target-arch")]
    pub target_arch: Option<String>,

    #[arg(long = "target-vendor")]
    pub target_vendor: Option<String>,

    #[arg(long = "target-os")]
    pub target_os: Option<String>,

    #[arg(value_enum, short = 'O', long, default_value_t = OptLevel::default())]
    pub opt_level: OptLevel,

    /// Print internal stage timings and extra diagnostic detail.
    #[arg(short = 'd', long = "debug-output")]
    pub debug_output: bool,

    #[arg(long = "dump-cst")]
    pub dump_cst: bool,

    #[arg(long = "dump-ast")]
    pub dump_ast: bool,

    #[arg(long = "dump-symtab")]
    pub dump_symtab: bool,

    #[arg(long = "dump-ir")]
    pub dump_ir: bool,

    /// Size of the bounded worker pool used to compile independent import subtrees.
    #[arg(short = 'j', long, default_value_t = 1)]
    pub jobs: usize,

    /// Skip the file-level compilation cache, forcing every file to be re-checked.
    #[arg(long)]
    pub ignore_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_level_collapses_size_tiers_to_three() {
        assert_eq!(OptLevel::O3.as_u8(), 3);
        assert_eq!(OptLevel::Os.as_u8(), 3);
        assert_eq!(OptLevel::Oz.as_u8(), 3);
        assert_eq!(OptLevel::O0.as_u8(), 0);
    }

    #[test]
    fn parses_build_subcommand_with_positional_file() {
        let cli = Cli::parse_from(["velac", "build", "main.vl", "-O2", "--dump-ir"]);
        match cli.command {
            Commands::Build(args) => {
                assert_eq!(args.file, PathBuf::from("main.vl"));
                assert_eq!(args.opt_level, OptLevel::O2);
                assert!(args.dump_ir);
            }
            other => panic!("expected Build, got {other:?}"),
        }
    }
}
