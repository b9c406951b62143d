//! Command line interface for the governance engine.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "loopgate", version, about = "Loop governance and trust-gated execution control")]
pub struct Cli {
    /// Output machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    /// Load configuration from a specific file instead of the
    /// .loopgate/ hierarchy
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the governance HTTP server
    Serve(commands::serve::ServeArgs),
    /// Show trust standing and history for an agent
    Trust(commands::trust::TrustArgs),
    /// List recorded escalations
    Escalations(commands::escalations::EscalationsArgs),
    /// Show the active threshold table
    Thresholds(commands::thresholds::ThresholdsArgs),
    /// Override an active freeze on a loop
    Override(commands::override_freeze::OverrideArgs),
}

/// Print an error in the requested format and exit non-zero.
pub fn handle_error(err: anyhow::Error, json_mode: bool) {
    if json_mode {
        let body = serde_json::json!({ "error": err.to_string() });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}
