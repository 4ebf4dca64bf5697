//! Command-line interface for bolillero.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bolillero - shared 90-ball bingo over HTTP
#[derive(Parser, Debug)]
#[command(name = "bolillero")]
#[command(about = "90-ball bingo: host a game, watch tickets, claim wins", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the game server (the host role drives it via admin endpoints)
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for ticket files (overrides config)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Watch tickets as a participant: poll draws, announce, claim wins
    Watch {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Game server URL (overrides config)
        #[arg(long)]
        server_url: Option<String>,

        /// Ticket ids to watch
        #[arg(required = true)]
        tickets: Vec<String>,

        /// Poll interval in seconds (overrides config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Generate tickets on the server
    Generate {
        /// Game server URL
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server_url: String,

        /// Owner name for the tickets
        #[arg(short, long)]
        owner: String,

        /// How many tickets to create
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Join code shown by the host
        #[arg(long)]
        code: String,
    },

    /// Draw the next number (host convenience; requires the admin key)
    Draw {
        /// Game server URL
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server_url: String,
    },

    /// Reset to a new game instance (requires the admin key)
    Reset {
        /// Game server URL
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server_url: String,
    },
}
