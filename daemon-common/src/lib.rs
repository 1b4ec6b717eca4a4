use clap::ValueEnum;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Verbosity accepted on the command line and in config files.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Build the filter used by [`init_tracing`].
///
/// `RUST_LOG` wins when it is set and parses; otherwise `fallback` applies to
/// every target.
pub fn env_filter(fallback: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from(fallback).into()))
}

/// Install the global `tracing` subscriber.
///
/// Returns an error if a subscriber has already been installed, which lets
/// tests call it repeatedly.
pub fn init_tracing(fallback: LogLevel) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(fallback))
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Spawn the process as a background daemon when `enable` is true.
///
/// This uses the [`daemonize`](https://docs.rs/daemonize) crate. Call it
/// before the async runtime starts; foreground runs pass `false`.
/// The daemon keeps the caller's working directory, so relative paths
/// in the configuration resolve the same way in both modes.
pub fn maybe_daemonize(enable: bool) -> anyhow::Result<()> {
    if enable {
        daemonizer()?.start().map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

fn daemonizer() -> anyhow::Result<daemonize::Daemonize<()>> {
    let cwd = daemon_dir()?;
    Ok(daemonize::Daemonize::new().working_directory(cwd))
}

// daemonize chdirs to `/` unless told otherwise
fn daemon_dir() -> std::io::Result<std::path::PathBuf> {
    std::env::current_dir()
}
