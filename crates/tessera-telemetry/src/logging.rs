//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and either
//! a JSON or a pretty formatting layer.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_telemetry::logging::{init_logging, LogConfig};
//!
//! let config = LogConfig::development();
//! init_logging(&config)?;
//!
//! tracing::info!(path = "conf/app.yaml", "Configuration loaded");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tessera_config::{ConfigStore, FromSection};
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_SERVICE_NAME: &str = "tessera";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directives, e.g. `"info"` or `"info,tessera_config=debug"`.
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to include span events (new, close).
    pub span_events: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include thread IDs.
    pub thread_ids: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Service name reported when logging starts.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            ..Self::default()
        }
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Reads the keys under `section`, starting from [`LogConfig::default`].
///
/// | Key              | Type                   |
/// |------------------|------------------------|
/// | `enabled`        | bool                   |
/// | `level`          | filter directives      |
/// | `format`         | `"json"` or `"pretty"` |
/// | `span_events`    | bool                   |
/// | `file_line_info` | bool                   |
/// | `thread_ids`     | bool                   |
/// | `include_target` | bool                   |
/// | `service_name`   | string                 |
///
/// Keys that are not set keep their default. An unrecognised `format` is
/// ignored here; [`crate::init_from_store`] rejects it.
impl FromSection for LogConfig {
    fn from_section(store: &ConfigStore, section: &str) -> Self {
        let mut config = Self::default();
        let key = |field: &str| format!("{section}.{field}");

        let flags: [(&str, &mut bool); 5] = [
            ("enabled", &mut config.enabled),
            ("span_events", &mut config.span_events),
            ("file_line_info", &mut config.file_line_info),
            ("thread_ids", &mut config.thread_ids),
            ("include_target", &mut config.include_target),
        ];
        for (field, slot) in flags {
            let name = key(field);
            if store.is_set(&name) {
                *slot = store.get_bool(&name);
            }
        }

        if store.is_set(&key("level")) {
            config.level = store.get_string(&key("level"));
        }
        if let Some(json) = parse_format(&store.get_string(&key("format"))) {
            config.json_format = json;
        }
        if store.is_set(&key("service_name")) {
            config.service_name = store.get_string(&key("service_name"));
        }

        config
    }
}

/// `Some(true)` for `json`, `Some(false)` for `pretty`, ignoring case.
pub(crate) fn parse_format(format: &str) -> Option<bool> {
    match format.to_ascii_lowercase().as_str() {
        "json" => Some(true),
        "pretty" => Some(false),
        _ => None,
    }
}

/// Initializes the logging subsystem.
///
/// A disabled configuration is a no-op.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the level is not a valid filter
/// or a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_span_events(span_events)
        .with_file(config.file_line_info)
        .with_line_number(config.file_line_info)
        .with_thread_ids(config.thread_ids)
        .with_target(config.include_target);

    let layer = if config.json_format {
        fmt_layer.json().with_filter(filter).boxed()
    } else {
        fmt_layer.pretty().with_filter(filter).boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    info!(
        service = %config.service_name,
        level = %config.level,
        json = config.json_format,
        "Logging initialized"
    );
    Ok(())
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the directives are invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tessera_config::ConfigFormat;

    fn store(toml: &str) -> ConfigStore {
        let store = ConfigStore::new();
        store.load_str(toml, ConfigFormat::Toml).unwrap();
        store
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert!(config.enabled);
        assert!(config.json_format);
        assert_eq!(config.level, "info");
        assert_eq!(config.service_name, "tessera");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.span_events);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_production_config() {
        let config = LogConfig::production();
        assert!(config.json_format);
        assert!(!config.span_events);
        assert!(!config.file_line_info);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_from_section_overrides_set_keys() {
        let store = store(
            r#"
            [log]
            level = "warn,tessera_config=debug"
            format = "Pretty"
            include_target = false
            service_name = "billing"
            "#,
        );

        let config = LogConfig::from_section(&store, "log");
        assert_eq!(config.level, "warn,tessera_config=debug");
        assert!(!config.json_format);
        assert!(!config.include_target);
        assert_eq!(config.service_name, "billing");
        assert!(config.enabled);
        assert!(!config.span_events);
    }

    #[test]
    fn test_from_section_bool_casts() {
        let store = store("[log]\nthread_ids = \"1\"\nspan_events = \"t\"\n");
        let config = LogConfig::from_section(&store, "log");
        assert!(config.thread_ids);
        assert!(config.span_events);
    }

    #[test]
    fn test_from_missing_section_is_default() {
        let config = LogConfig::from_section(&ConfigStore::new(), "log");
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_from_section_unknown_format_keeps_default() {
        let store = store("[log]\nformat = \"xml\"\n");
        assert!(LogConfig::from_section(&store, "log").json_format);
    }

    #[test]
    fn test_from_section_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.yaml");
        fs::write(&path, "logging:\n  level: error\n  format: json\n").unwrap();

        let store = ConfigStore::from_file(&path).unwrap();
        let config = LogConfig::from_section(&store, "logging");
        assert_eq!(config.level, "error");
        assert!(config.json_format);
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("json"), Some(true));
        assert_eq!(parse_format("PRETTY"), Some(false));
        assert_eq!(parse_format(""), None);
    }

    #[test]
    fn test_create_env_filter_valid() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("info,tessera_config=debug").is_ok());
    }

    #[test]
    fn test_create_env_filter_invalid() {
        let result = create_env_filter("tessera_config=notalevel");
        assert!(matches!(result, Err(TelemetryError::LoggingInit(_))));
    }

    #[test]
    fn test_disabled_logging() {
        let config = LogConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_logging(&config).is_ok());
    }
}
