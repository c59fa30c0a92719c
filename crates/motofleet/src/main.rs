// SPDX-FileCopyrightText: 2026 Motofleet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Motofleet - WhatsApp fleet-operations bot for motorcycle couriers.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod cleanup;
mod doctor;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use motofleet_config::{ConfigError, MotofleetConfig};

/// Motofleet - WhatsApp fleet-operations bot for motorcycle couriers.
#[derive(Parser, Debug)]
#[command(name = "motofleet", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook server and the bot loop.
    Serve,
    /// Delete expired conversations once and exit.
    Cleanup,
    /// Check configuration, storage and WhatsApp connectivity.
    Doctor,
}

fn load_config(path: Option<&std::path::Path>) -> Result<MotofleetConfig, Vec<ConfigError>> {
    match path {
        Some(path) => motofleet_config::load_and_validate_path(path),
        None => motofleet_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            motofleet_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Cleanup) => cleanup::run_cleanup(&config).await,
        Some(Commands::Doctor) => doctor::run_doctor(&config).await,
        None => {
            println!("motofleet: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
