//! utsynth CLI - Command-line interface
//!
//! Commands:
//!   generate - Normal case plus model-enumerated boundary cases
//!   normal   - Normal case only, no completion service involved
//!   inspect  - Show what a recorded call turns into
//!   init     - Write a default utsynth.yaml
//!   schema   - Print JSON Schemas for the trace and config formats

mod cli;

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Trace-driven C# unit test synthesis
#[derive(Parser)]
#[command(name = "utsynth")]
#[command(about = "Turn a recorded C# call into a compilable unit test suite", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the full suite: normal case and boundary cases
    Generate(cli::GenerateArgs),

    /// Generate a suite holding only the normal-case test
    Normal(cli::GenerateArgs),

    /// Print the unit, mocks and unresolved calls of a recorded call
    Inspect(cli::TargetArgs),

    /// Write a default configuration file
    Init(cli::InitArgs),

    /// Print a JSON Schema
    Schema {
        #[arg(value_enum, default_value = "trace")]
        kind: cli::SchemaKind,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let result = match cli.command {
        Commands::Generate(args) => cli::cmd_generate(args).await,
        Commands::Normal(args) => cli::cmd_normal(args).await,
        Commands::Inspect(args) => cli::cmd_inspect(args),
        Commands::Init(args) => cli::cmd_init(args),
        Commands::Schema { kind } => cli::cmd_schema(kind),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
