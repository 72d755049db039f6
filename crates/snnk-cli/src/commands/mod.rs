//! CLI command implementations for snnk

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::CliResult;

pub mod simulate;
pub mod status;

/// snnk - command-line driver for the time-sliced spike delivery kernel
#[derive(Parser, Debug)]
#[command(
    name = "snnk",
    version,
    about = "Drive the snnk scheduling kernel from the command line",
    long_about = "snnk runs a small demo network through the snnk-kernel event-delivery \
                  loop and reports the resulting spike counts and clock state. It exists to \
                  exercise the kernel end-to-end, not to replace a real node/connection library."
)]
pub struct SnnkCli {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (defaults to the platform config directory).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a demo simulation and report spike counts.
    Simulate(simulate::SimulateCommand),

    /// Print the kernel's default status dictionary.
    Status(status::StatusCommand),
}

impl SnnkCli {
    /// Execute the selected subcommand.
    pub fn execute(self) -> CliResult<()> {
        match self.command {
            Commands::Simulate(cmd) => cmd.execute(self.config),
            Commands::Status(cmd) => cmd.execute(self.config),
        }
    }
}
