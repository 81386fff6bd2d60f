use clap::Parser;
use crucible_cli::commands::{Cmd, Command};
use tracing_subscriber::EnvFilter;

/// Crucible CLI
///
/// Crucible verifies that deployed EVM bytecode was produced by a given Solidity source
/// and metadata, and records every region it had to reconcile as a replayable
/// transformation.
#[derive(Parser)]
#[command(name = "crucible")]
#[command(about = "Crucible: EVM bytecode verification")]
struct Cli {
    /// Log debug output of every matching step.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Crucible CLI with the provided arguments.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_ansi(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    cli.command.execute().await
}
