//! Typed configuration access for Tessera services.
//!
//! This crate loads a single structured configuration file and exposes it
//! through typed getters:
//! - JSON, TOML, YAML and INI files, located by base name
//! - Case-insensitive dotted keys (`server.port`)
//! - Lenient conversions with zero-value fallbacks
//! - Human-readable byte sizes (`"10MB"`) and durations (`"1m30s"`)
//! - Live reload with change subscriptions
//! - A MySQL connection descriptor derived from a section
//!
//! # Overview
//!
//! The central type is [`ConfigStore`]. It layers explicit overrides over the
//! loaded file over registered defaults, and every getter reads through those
//! layers in that order. A missing or unconvertible value yields the zero
//! value of the requested type rather than an error.
//!
//! # Example
//!
//! ```no_run
//! use tessera_config::{ConfigStore, FromSection, MySqlConfig};
//!
//! # async fn example() -> Result<(), tessera_config::ConfigError> {
//! let store = ConfigStore::from_file("conf/app.yaml")?;
//!
//! let max_body = store.get_size_in_bytes("server.max_body");
//! let mysql = MySqlConfig::from_section(&store, "database");
//! println!("body limit {max_body}, dsn {}", mysql.format_dsn());
//!
//! let observed = store.downgrade();
//! store.on_change(move |event| {
//!     if let Some(store) = observed.upgrade() {
//!         println!("reloaded after {:?}, port {}", event.kind, store.get_int("server.port"));
//!     }
//!     Ok(())
//! });
//! let _watch = store.watch()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```yaml
//! server:
//!   port: 8080
//!   max_body: 10MB
//!   read_timeout: 30s
//!
//! database:
//!   host: 127.0.0.1:3306
//!   user: app
//!   password: secret
//!   dbname: orders
//! ```

#![warn(missing_docs)]

mod cast;
mod database;
mod duration;
mod error;
mod format;
mod loader;
mod size;
mod store;
mod subscription;
mod value;
mod watcher;

pub use database::{FromSection, MySqlConfig, TimeLocation};
pub use duration::parse_duration;
pub use error::ConfigError;
pub use format::ConfigFormat;
pub use loader::{locate, read_file};
pub use size::{parse_size, INVALID_SIZE};
pub use store::{ConfigStore, WeakConfigStore};
pub use subscription::{CallbackError, CallbackFailure, ConfigWatch, ReloadReport, SubscriptionId};
pub use value::{Table, Value};
pub use watcher::{
    FileChangeEvent, FileChangeKind, FileWatcher, FileWatcherBuilder, FileWatcherConfig,
};
