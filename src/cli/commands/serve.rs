//! `serve` command: run the governance HTTP server.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::infrastructure::http;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind host (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let governor = super::build_governor(&config).await?;

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);

    info!(log_dir = %config.storage.log_dir, "starting governance server");
    http::serve(governor, &host, port).await
}
