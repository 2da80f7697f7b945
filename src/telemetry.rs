use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

const DEFAULT_FILTER: &str = "wavebar=info";

/// Filter from `RUST_LOG`, falling back to info for this crate
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize logging
///
/// Logs go to stdout when telemetry is disabled and are appended to
/// `log_path` otherwise.
///
/// # Errors
/// Returns error if the log file or its directory cannot be created, or a
/// global subscriber is already installed
pub fn init(enabled: bool, log_path: &str) -> Result<()> {
    if !enabled {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;
        return Ok(());
    }

    let expanded_path = log_file_path(log_path)?;

    if let Some(parent) = expanded_path.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&expanded_path)
        .context("failed to open log file")?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(file)
        .with_target(false)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    tracing::info!("telemetry initialized: {}", expanded_path.display());

    Ok(())
}

fn log_file_path(path: &str) -> Result<PathBuf> {
    Config::expand_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_log_file_path_with_tilde() {
        let home = env::var("HOME").expect("HOME not set");
        let result = log_file_path("~/logs/wavebar.log").unwrap();
        assert_eq!(result, PathBuf::from(home).join("logs/wavebar.log"));
    }

    #[test]
    fn test_log_file_path_without_tilde() {
        let result = log_file_path("/var/log/wavebar.log").unwrap();
        assert_eq!(result, PathBuf::from("/var/log/wavebar.log"));
    }

    #[test]
    fn test_default_filter_parses() {
        let filter = EnvFilter::new(DEFAULT_FILTER);
        assert!(filter.to_string().contains("wavebar"));
    }

    #[test]
    #[ignore = "Installs the process-wide tracing subscriber"]
    fn test_init_with_telemetry_enabled() {
        let dir = env::temp_dir().join(format!("wavebar-telemetry-{}", std::process::id()));
        let path = dir.join("nested/wavebar.log");
        init(true, path.to_str().unwrap()).unwrap();
        assert!(path.exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
