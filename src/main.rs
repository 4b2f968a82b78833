// ABOUTME: Command-line entry point turning a CloudLab manifest.xml into SSH aliases and node lists
// ABOUTME: Sets up logging, loads optional configuration and runs the transformation once

mod app;
mod config;
mod manifest;
mod output;
mod ssh;

use anyhow::Result;
use config::Config;
use tracing::Level;

fn init_logging() {
    let level = if std::env::var("CLOUDLAB_HOSTS_DEBUG").is_ok() {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let config = Config::load()?;
    let records = app::run(&config)?;
    tracing::debug!("Processed {} node record(s)", records.len());

    Ok(())
}
