//! Logging setup on top of `tracing-subscriber`.
//!
//! Console output always goes to stderr so it does not interleave with the
//! summary table. An optional log file receives the same events without ANSI
//! colours.

use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Crates that are too chatty at debug level.
const NOISY: &[(&str, &str)] = &[
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("reqwest", "warn"),
    ("h2", "warn"),
];

/// Builds the filter from the base level plus the noisy-crate caps.
/// A non-empty `RUST_LOG` replaces all of it.
fn build_env_filter(verbose: bool, rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
    if let Some(custom) = rust_log.filter(|s| !s.trim().is_empty()) {
        return EnvFilter::try_new(custom)
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG '{}': {}", custom, e));
    }

    let level = if verbose { "debug" } else { "info" };
    let mut directives = vec![level.to_string()];
    for (target, lvl) in NOISY {
        directives.push(format!("{target}={lvl}"));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Installs the global subscriber.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = || build_env_filter(verbose, rust_log.as_deref());

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_filter(filter()?);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(file)
                    .with_target(true)
                    .with_filter(filter()?),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))?;

    tracing::debug!(verbose, log_file = ?log_file, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_is_info_with_caps() {
        let filter = build_env_filter(false, None).unwrap().to_string();
        assert!(filter.contains("info"));
        assert!(filter.contains("hyper=warn"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn verbose_raises_to_debug() {
        let filter = build_env_filter(true, None).unwrap().to_string();
        assert!(filter.contains("debug"));
    }

    #[test]
    fn rust_log_overrides() {
        let filter = build_env_filter(false, Some("rtl_runner=trace"))
            .unwrap()
            .to_string();
        assert!(filter.contains("rtl_runner=trace"));
        assert!(!filter.contains("hyper=warn"));
    }

    #[test]
    fn blank_rust_log_is_ignored() {
        let filter = build_env_filter(true, Some("  ")).unwrap().to_string();
        assert!(filter.contains("debug"));
    }
}
