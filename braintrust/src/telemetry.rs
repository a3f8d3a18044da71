//! Tracing setup for applications using this crate.

use crate::error::{ClientError, ClientResult};
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info,braintrust=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

fn resolve_env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG`.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> ClientResult<()> {
    init_tracing_with_filter(format, DEFAULT_FILTER)
}

/// Like [`init_tracing`], with a custom fallback filter.
pub fn init_tracing_with_filter(format: LogFormat, fallback: &str) -> ClientResult<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(resolve_env_filter(fallback));
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| {
        ClientError::configuration(format!("failed to install tracing subscriber: {e}"))
    })
}
