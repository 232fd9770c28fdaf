use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global subscriber.
///
/// The terminal is owned by the visualizer while it runs, so logs go to `log_file` when given.
/// Without a file, stderr logging is enabled only when `RUST_LOG` is set.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy()
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    let console_layer = (log_file.is_none() && std::env::var_os("RUST_LOG").is_some()).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter())
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("install tracing subscriber")?;

    if let Some(path) = log_file {
        tracing::info!(path = %path.display(), "logging initialized");
    }
    Ok(())
}
