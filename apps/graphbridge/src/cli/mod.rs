//! # graphbridge CLI Module
//!
//! ## Available Commands
//!
//! - `run` - Execute operation descriptors against an in-memory graph
//! - `check-config` - Resolve every serializer entry of a configuration file

mod commands;

use clap::{Parser, Subcommand};
use graphbridge_core::BridgeError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// graphbridge - run graph operations and receive generic values
#[derive(Parser, Debug)]
#[command(name = "graphbridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Echo each operation descriptor before its result
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute operation descriptors in order against one session
    Run {
        /// JSON file holding one operation or an array of operations
        #[arg(short, long)]
        file: PathBuf,

        /// JSON file holding the caller identity
        #[arg(short, long)]
        user: Option<PathBuf>,

        /// TOML file with serializer registrations
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop at the first decode or engine failure instead of printing null
        #[arg(long)]
        strict: bool,
    },

    /// Check that every configured serializer entry resolves
    CheckConfig {
        /// TOML file with serializer registrations
        #[arg(short, long)]
        config: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), BridgeError> {
    let output = OutputMode {
        json: cli.json_mode,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Run {
            file,
            user,
            config,
            strict,
        } => cmd_run(&file, user.as_deref(), config.as_deref(), strict, output),
        Commands::CheckConfig { config } => cmd_check_config(&config, output),
    }
}
