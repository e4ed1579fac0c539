//! Locating and reading configuration files.
//!
//! A configuration path names a directory and a base name. The exact file
//! is used when it exists with a supported extension; otherwise every
//! supported extension is tried next to it, in [`ConfigFormat::SEARCH_ORDER`].
//! Loading `conf/app.yaml` therefore also finds `conf/app.json` or
//! `conf/app.toml` when `app.yaml` itself is absent.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{ConfigError, ConfigFormat, Value};

/// Resolve `path` to an existing configuration file and its format.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` carrying `dir/stem` when no candidate
/// exists, or `ConfigError::InvalidConfig` when `path` has no file name.
///
/// # Example
///
/// ```no_run
/// use tessera_config::{locate, ConfigFormat};
///
/// # fn main() -> Result<(), tessera_config::ConfigError> {
/// let (path, format) = locate("conf/app.yaml")?;
/// println!("using {} ({})", path.display(), format);
/// # Ok(())
/// # }
/// ```
pub fn locate<P: AsRef<Path>>(path: P) -> Result<(PathBuf, ConfigFormat), ConfigError> {
    let path = path.as_ref();

    let stem = path.file_stem().ok_or_else(|| {
        ConfigError::invalid_config(format!("not a file path: {}", path.display()))
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let requested = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ConfigFormat::from_extension);
    if let Some(format) = requested {
        if path.is_file() {
            return Ok((path.to_path_buf(), format));
        }
    }

    for (ext, format) in ConfigFormat::SEARCH_ORDER {
        let mut name = OsString::from(stem);
        name.push(".");
        name.push(ext);
        let candidate = dir.join(name);

        if candidate.is_file() {
            return Ok((candidate, format));
        }
        debug!("Configuration candidate not found: {}", candidate.display());
    }

    Err(ConfigError::file_not_found(dir.join(stem)))
}

/// Read and decode a configuration file in the given format.
///
/// # Errors
///
/// Returns `ConfigError::ReadError` if the file cannot be read, or the
/// format's parse error if the content is invalid.
pub fn read_file<P: AsRef<Path>>(path: P, format: ConfigFormat) -> Result<Value, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
    format.parse(&content)
}
