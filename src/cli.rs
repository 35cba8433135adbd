//! Command-line interface for the Cathedral server.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cathedral - real-time board game server
#[derive(Parser, Debug)]
#[command(name = "cathedral")]
#[command(about = "Cathedral board game server with live session streams", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP game server
    Serve {
        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the piece catalog
    Pieces,
}
