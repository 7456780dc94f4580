//! Global tracing subscriber setup for the binary

use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webminer_common::config::LoggingConfig;

/// Filter from `RUST_LOG`, falling back to `level` for this workspace's crates
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("webminer={level},webminer_analysis={level},webminer_common={level}"))
    })
}

/// Install the global subscriber (stderr, or the configured file without ANSI colours)
pub fn init(config: &LoggingConfig, level_override: Option<&str>) -> std::io::Result<()> {
    let level = level_override.unwrap_or(&config.level);
    let filter = env_filter(level);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
    Ok(())
}
