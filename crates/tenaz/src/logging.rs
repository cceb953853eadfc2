//! Tracing subscriber setup.
//!
//! The library only emits `tracing` events. Binaries and test harnesses that
//! want to see them call [`init_logging`] once. `RUST_LOG` wins over the
//! filter passed in.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::result::{TenazError, TenazResult};

/// Output format for [`init_logging`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Install the global fmt subscriber.
///
/// `filter` uses `EnvFilter` directive syntax, e.g. `"tenaz=debug"`.
/// Fails if a global subscriber is already installed.
pub fn init_logging(filter: &str, format: LogFormat) -> TenazResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .map_err(|e| TenazError::config(format!("invalid log filter {filter:?}: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    let installed = match format {
        LogFormat::Pretty => builder.with_target(true).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| TenazError::config(format!("logging already initialised: {e}")))
}
