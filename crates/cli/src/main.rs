mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use varbuild_lib::consts::MANIFEST_FILE;

use crate::cmd::{BuildArgs, ScopeArg, cmd_build, cmd_check_architecture, cmd_clean, cmd_describe_environment};
use crate::output::{OutputFormat, print_error};

/// varbuild - build variant orchestration for multi-platform Fortran source trees
#[derive(Parser, Debug)]
#[command(name = "varbuild")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Path to the project manifest
  #[arg(long, global = true, default_value = MANIFEST_FILE)]
  manifest: PathBuf,

  /// Output format
  #[arg(short = 'o', long, global = true, value_enum, default_value = "text")]
  output: OutputFormat,

  /// Enable debug logging (overridden by RUST_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Compile and link one variant, or run the release recipe
  Build(BuildArgs),

  /// Remove object files or a variant's executables
  Clean {
    /// What to remove
    #[arg(long, value_enum)]
    scope: ScopeArg,
  },

  /// Check that every object file matches the target word width
  CheckArchitecture,

  /// Print the detected platform and toolchain
  DescribeEnvironment,
}

fn init_tracing(verbose: bool) {
  let default = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn run(cli: Cli) -> Result<()> {
  match cli.command {
    Commands::Build(args) => cmd_build(args, &cli.manifest, cli.output),
    Commands::Clean { scope } => cmd_clean(scope, &cli.manifest, cli.output),
    Commands::CheckArchitecture => cmd_check_architecture(&cli.manifest, cli.output),
    Commands::DescribeEnvironment => cmd_describe_environment(&cli.manifest, cli.output),
  }
}

fn main() -> ExitCode {
  let cli = Cli::parse();
  init_tracing(cli.verbose);

  match run(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      print_error(&format!("{:#}", e));
      ExitCode::FAILURE
    }
  }
}
