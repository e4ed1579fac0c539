//! Structured logging for Tessera services.
//!
//! Logging is configured from a section of a [`ConfigStore`], so the same
//! file that drives the service also picks its log level and output format:
//!
//! ```yaml
//! log:
//!   level: info,tessera_config=debug
//!   format: json
//!   service_name: billing
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tessera_config::ConfigStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = ConfigStore::from_file("conf/app.yaml")?;
//! let config = tessera_telemetry::init_from_store(&store, "log")?;
//!
//! tracing::info!(service = %config.service_name, "Service starting");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, init_logging, LogConfig};

use tessera_config::{ConfigStore, FromSection};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Read a [`LogConfig`] from `section` of `store` and install it.
///
/// Returns the configuration that was applied.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` if `section.format` is set to
/// something other than `json` or `pretty`, and `TelemetryError::LoggingInit`
/// if the level is invalid or logging was already initialized.
pub fn init_from_store(store: &ConfigStore, section: &str) -> TelemetryResult<LogConfig> {
    let format_key = format!("{section}.format");
    if store.is_set(&format_key) {
        let format = store.get_string(&format_key);
        if logging::parse_format(&format).is_none() {
            return Err(TelemetryError::InvalidConfig(format!(
                "{format_key} must be \"json\" or \"pretty\", got \"{format}\""
            )));
        }
    }

    let config = LogConfig::from_section(store, section);
    init_logging(&config)?;
    Ok(config)
}
