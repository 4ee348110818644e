use std::path::Path;

use clap::Parser;
use koyomi_app::cli::{Cli, Command};
use koyomi_app::{agenda, commands, notes};
use koyomi_core::config::load_config;
use koyomi_core::constants::DEFAULT_LOG_LEVEL;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    let config = load_config(cli.config.as_deref())?;

    tracing::debug!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping {DEFAULT_LOG_LEVEL}");
    }

    match cli.command {
        Command::Agenda(args) => agenda::run(&config, &args).await?,
        Command::Feeds => commands::list_feeds(&config.feeds, &mut std::io::stdout().lock())?,
        Command::Overrides => {
            let local = notes::scan_notes(Path::new(&config.notes.folder))?;
            commands::list_overrides(&local.overrides, &mut std::io::stdout().lock())?;
        }
    }

    Ok(())
}
