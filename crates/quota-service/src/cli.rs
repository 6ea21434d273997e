//! Command-line entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `quota-service` command-line interface.
#[derive(Parser)]
#[command(name = "quota-service")]
#[command(about = "Network-accessible token-bucket quota service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Load configuration and start the gRPC server. There is no reload
    /// endpoint; restart the process to pick up configuration changes.
    Serve {
        /// Path to the TOML (or JSON) configuration file.
        #[arg(short, long, default_value = "/etc/quota-service/config.toml")]
        config: PathBuf,
    },
}
