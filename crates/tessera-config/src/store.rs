//! The configuration store and its typed getters.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::loader::{locate, read_file};
use crate::subscription::Subscribers;
use crate::value::key_path;
use crate::{cast, parse_size, ConfigError, ConfigFormat, Value};

/// A hierarchical key-value configuration store.
///
/// The store holds three layers. Lookups consult them in order and the
/// first layer holding a key wins:
/// 1. Overrides set with [`ConfigStore::set`]
/// 2. The loaded configuration file
/// 3. Defaults set with [`ConfigStore::set_default`]
///
/// Keys are case-insensitive and use `.` to reach into nested tables, so
/// `"Database.Host"` and `"database.host"` name the same value.
///
/// `ConfigStore` is a cheap handle: clones share the same state. Construct
/// one explicitly and pass it to whatever needs configuration.
///
/// # Example
///
/// ```
/// use tessera_config::{ConfigFormat, ConfigStore};
/// use std::time::Duration;
///
/// let store = ConfigStore::new();
/// store.set_default("server.timeout", "30s");
/// store
///     .load_str("[server]\nport = 8080\nmax_body = \"10MB\"\n", ConfigFormat::Toml)
///     .unwrap();
///
/// assert_eq!(store.get_int64("server.port"), 8080);
/// assert_eq!(store.get_duration("server.timeout"), Duration::from_secs(30));
/// assert_eq!(store.get_size_in_bytes("server.max_body"), 10 * 1024 * 1024);
/// ```
#[derive(Clone)]
pub struct ConfigStore {
    state: Arc<RwLock<StoreState>>,
    pub(crate) subscribers: Arc<RwLock<Subscribers>>,
}

/// A non-owning handle to a [`ConfigStore`], from [`ConfigStore::downgrade`].
///
/// Change callbacks that need to read the store should capture this rather
/// than a clone; the store owns its callbacks, so a clone inside one would
/// keep the store alive forever.
#[derive(Clone, Debug)]
pub struct WeakConfigStore {
    state: Weak<RwLock<StoreState>>,
    subscribers: Weak<RwLock<Subscribers>>,
}

impl WeakConfigStore {
    /// The store, if any strong handle to it is still alive.
    pub fn upgrade(&self) -> Option<ConfigStore> {
        Some(ConfigStore {
            state: self.state.upgrade()?,
            subscribers: self.subscribers.upgrade()?,
        })
    }
}

struct StoreState {
    defaults: Value,
    file: Value,
    overrides: Value,
    source: Option<PathBuf>,
    format: Option<ConfigFormat>,
}

impl StoreState {
    fn layers(&self) -> [&Value; 3] {
        [&self.overrides, &self.file, &self.defaults]
    }

    // An explicit null does not hold the key; lower layers are consulted.
    fn find(&self, path: &[String]) -> Option<&Value> {
        self.layers()
            .into_iter()
            .find_map(|layer| layer.lookup(path).filter(|value| !value.is_null()))
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ConfigStore")
            .field("source", &state.source)
            .field("format", &state.format)
            .finish_non_exhaustive()
    }
}

impl ConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                defaults: Value::empty_table(),
                file: Value::empty_table(),
                overrides: Value::empty_table(),
                source: None,
                format: None,
            })),
            subscribers: Arc::new(RwLock::new(Subscribers::default())),
        }
    }

    /// Create a store and load `path` into it.
    ///
    /// # Errors
    ///
    /// See [`ConfigStore::load`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let store = Self::new();
        store.load(path)?;
        Ok(store)
    }

    /// Load a configuration file, replacing the file layer.
    ///
    /// The file is located with [`locate`], so a missing `app.yaml` falls
    /// back to `app.json`, `app.toml` and the other supported extensions.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - No candidate file exists
    /// - The file cannot be read
    /// - The file contains invalid JSON/TOML/YAML/INI
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let (resolved, format) = locate(path)?;
        let value = read_file(&resolved, format)?;

        info!("Loaded configuration from {} ({})", resolved.display(), format);

        let mut state = self.state.write();
        state.file = value;
        state.source = Some(resolved);
        state.format = Some(format);
        Ok(())
    }

    /// Load configuration from a string, replacing the file layer.
    ///
    /// No source path is recorded, so [`ConfigStore::reload`] and
    /// [`ConfigStore::watch`] are unavailable until a file is loaded.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails.
    pub fn load_str(&self, content: &str, format: ConfigFormat) -> Result<(), ConfigError> {
        let value = format.parse(content)?;

        let mut state = self.state.write();
        state.file = value;
        state.source = None;
        state.format = Some(format);
        Ok(())
    }

    /// Re-read the file that was last loaded.
    ///
    /// On failure the previously loaded values stay in place.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotLoaded` if no file was loaded, or the read
    /// or parse error of the file.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let (path, format) = {
            let state = self.state.read();
            match (&state.source, state.format) {
                (Some(path), Some(format)) => (path.clone(), format),
                _ => return Err(ConfigError::NotLoaded),
            }
        };

        let value = read_file(&path, format)?;
        self.state.write().file = value;

        info!("Reloaded configuration from {}", path.display());
        Ok(())
    }

    /// Create a handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakConfigStore {
        WeakConfigStore {
            state: Arc::downgrade(&self.state),
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Path of the loaded configuration file, if any.
    pub fn source(&self) -> Option<PathBuf> {
        self.state.read().source.clone()
    }

    /// Format of the loaded configuration, if any.
    pub fn format(&self) -> Option<ConfigFormat> {
        self.state.read().format
    }

    /// Set a default value, used when neither an override nor the file
    /// holds the key.
    pub fn set_default(&self, key: &str, value: impl Into<Value>) {
        self.state
            .write()
            .defaults
            .insert_path(&key_path(key), value.into());
    }

    /// Set an override value. Overrides take precedence over the file.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.state
            .write()
            .overrides
            .insert_path(&key_path(key), value.into());
    }

    /// Get the raw value for `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().find(&key_path(key)).cloned()
    }

    /// Whether any layer, defaults included, holds a non-null value for `key`.
    pub fn is_set(&self, key: &str) -> bool {
        self.state.read().find(&key_path(key)).is_some()
    }

    /// All leaf keys across every layer, dotted, sorted and de-duplicated.
    pub fn all_keys(&self) -> Vec<String> {
        let state = self.state.read();
        let mut keys = Vec::new();
        for layer in state.layers() {
            layer.collect_leaf_keys("", &mut keys);
        }
        keys.sort();
        keys.dedup();
        keys
    }

    /// Deserialize the value at `key` into `T`.
    ///
    /// A missing key deserializes from null, which suits `Option` fields
    /// and `#[serde(default)]` structs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the value does not match `T`.
    pub fn unmarshal_key<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let json = self
            .state
            .read()
            .find(&key_path(key))
            .map_or(serde_json::Value::Null, Value::to_json);
        serde_json::from_value(json).map_err(|e| ConfigError::invalid_value(key, e.to_string()))
    }

    fn cast_key<T>(&self, key: &str, cast: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        self.state.read().find(&key_path(key)).and_then(cast)
    }

    // Typed getters. A missing key or an unconvertible value yields the
    // type's zero value.

    /// Get a value as a string.
    pub fn get_string(&self, key: &str) -> String {
        self.cast_key(key, cast::to_string).unwrap_or_default()
    }

    /// Get a value as a bool.
    pub fn get_bool(&self, key: &str) -> bool {
        self.cast_key(key, cast::to_bool).unwrap_or_default()
    }

    /// Get a value as a platform-sized integer.
    pub fn get_int(&self, key: &str) -> isize {
        self.cast_key(key, |v| cast::to_i64(v).and_then(|i| isize::try_from(i).ok()))
            .unwrap_or_default()
    }

    /// Get a value as an `i32`; out-of-range values yield 0.
    pub fn get_int32(&self, key: &str) -> i32 {
        self.cast_key(key, |v| cast::to_i64(v).and_then(|i| i32::try_from(i).ok()))
            .unwrap_or_default()
    }

    /// Get a value as an `i64`.
    pub fn get_int64(&self, key: &str) -> i64 {
        self.cast_key(key, cast::to_i64).unwrap_or_default()
    }

    /// Get a value as a `u32`; negative or out-of-range values yield 0.
    pub fn get_uint32(&self, key: &str) -> u32 {
        self.cast_key(key, |v| cast::to_i64(v).and_then(|i| u32::try_from(i).ok()))
            .unwrap_or_default()
    }

    /// Get a value as a `u64`; negative values yield 0.
    pub fn get_uint64(&self, key: &str) -> u64 {
        self.cast_key(key, |v| cast::to_i64(v).and_then(|i| u64::try_from(i).ok()))
            .unwrap_or_default()
    }

    /// Get a value as an `f64`.
    pub fn get_float64(&self, key: &str) -> f64 {
        self.cast_key(key, cast::to_f64).unwrap_or_default()
    }

    /// Get a value as a duration.
    ///
    /// Strings such as `"1h30m"` or `"250ms"` are parsed with their unit.
    /// Bare numbers, and strings without a unit, count nanoseconds.
    pub fn get_duration(&self, key: &str) -> Duration {
        self.cast_key(key, cast::to_duration).unwrap_or_default()
    }

    /// Get a value as a UTC timestamp.
    ///
    /// Returns `None` when the key is missing or the value is not a
    /// recognised time. Integers are read as Unix seconds.
    pub fn get_time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.cast_key(key, cast::to_time)
    }

    /// Get an array of integers. Any unconvertible element yields an empty vector.
    pub fn get_int_slice(&self, key: &str) -> Vec<i64> {
        self.cast_key(key, cast::to_int_slice).unwrap_or_default()
    }

    /// Get an array of strings; a plain string is split on whitespace.
    pub fn get_string_slice(&self, key: &str) -> Vec<String> {
        self.cast_key(key, cast::to_string_slice).unwrap_or_default()
    }

    /// Get a table as a map of strings.
    pub fn get_string_map_string(&self, key: &str) -> HashMap<String, String> {
        self.cast_key(key, cast::to_string_map).unwrap_or_default()
    }

    /// Get a table as a map of string lists; scalar entries become one-element lists.
    pub fn get_string_map_string_slice(&self, key: &str) -> HashMap<String, Vec<String>> {
        self.cast_key(key, cast::to_string_slice_map)
            .unwrap_or_default()
    }

    /// Get a human-readable size such as `"10MB"` as a byte count.
    ///
    /// Returns [`INVALID_SIZE`](crate::INVALID_SIZE) when the key is missing
    /// or the value is not a size.
    pub fn get_size_in_bytes(&self, key: &str) -> i64 {
        parse_size(&self.get_string(key))
    }
}
