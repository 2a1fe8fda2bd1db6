//! fifo - Exercise a giztoy-fifo buffer with a simulated producer and consumer.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{SelftestCommand, SimulateCommand};

/// fifo - Drive a blocking FIFO between a bursty producer and a steady consumer.
///
/// Useful for tuning capacity, low-watermark and chunk size: the final report
/// shows how often each side ran short and how often it actually slept.
#[derive(Parser)]
#[command(name = "fifo")]
#[command(about = "Blocking FIFO simulator and store self-test")]
#[command(version)]
pub struct Cli {
    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream a byte pattern through the FIFO and report its counters
    Simulate(SimulateCommand),
    /// Initialize a store and run its self-test
    Selftest(SelftestCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Simulate(cmd) => cmd.run(&cli),
        Commands::Selftest(cmd) => cmd.run(&cli),
    }
}
