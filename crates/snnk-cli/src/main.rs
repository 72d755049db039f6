//! # snnk CLI
//!
//! Command-line driver for the snnk time-sliced event-delivery and
//! scheduling kernel. Exercises the kernel end-to-end against a small demo
//! network; the neuron model and connection table here are CLI glue, not
//! part of the kernel itself.

use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod demo;
mod error;

use commands::SnnkCli;

fn main() {
    let cli = SnnkCli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if let Err(err) = cli.execute() {
        error!("command failed: {}", err);
        std::process::exit(err.exit_code());
    }
}
