//! # graphbridge
//!
//! The command-line binary for the graphbridge marshalling core.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │           apps/graphbridge (THE BINARY)      │
//! │                                              │
//! │   ┌──────────────┐      ┌─────────────────┐  │
//! │   │  CLI (clap)  │ ───▶ │  MemoryGraph    │  │
//! │   └──────┬───────┘      └────────┬────────┘  │
//! │          ▼                       ▼           │
//! │   ┌──────────────────────────────────────┐   │
//! │   │   graphbridge-core (THE LOGIC)       │   │
//! │   └──────────────────────────────────────┘   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! graphbridge run -f ops.json -u user.json -c bridge.toml
//! graphbridge --json-mode check-config -c bridge.toml
//! ```

use clap::Parser;
use graphbridge::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // GRAPHBRIDGE_LOG_FORMAT=json enables machine-parseable logs. Logs go to
    // stderr so stdout carries only results.
    let log_format =
        std::env::var("GRAPHBRIDGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "graphbridge=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        "graphbridge v{}  (typed graph values in, generic values out)\n",
        env!("CARGO_PKG_VERSION")
    );
}
