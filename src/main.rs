//! Loopgate CLI entry point.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use loopgate::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::execute(args, cli.config).await,
        Commands::Trust(args) => commands::trust::execute(args, cli.config, cli.json).await,
        Commands::Escalations(args) => commands::escalations::execute(args, cli.config, cli.json).await,
        Commands::Thresholds(args) => commands::thresholds::execute(args, cli.config, cli.json).await,
        Commands::Override(args) => commands::override_freeze::execute(args, cli.config, cli.json).await,
    };

    if let Err(err) = result {
        loopgate::cli::handle_error(err, cli.json);
    }
}
