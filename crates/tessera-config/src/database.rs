//! Database connection settings derived from a configuration section.
//!
//! Configuration files name database settings loosely: `host` or `addr`,
//! `user` or `username`, and so on. [`MySqlConfig::from_section`] accepts
//! every alias and produces a descriptor with fixed connection defaults.
//!
//! # Example
//!
//! ```
//! use tessera_config::{ConfigFormat, ConfigStore, FromSection, MySqlConfig};
//!
//! # fn main() -> Result<(), tessera_config::ConfigError> {
//! let store = ConfigStore::new();
//! store.load_str(
//!     "[db]\nhost = \"127.0.0.1:3306\"\nuser = \"app\"\ndbname = \"orders\"\n",
//!     ConfigFormat::Toml,
//! )?;
//!
//! let mysql = MySqlConfig::from_section(&store, "db");
//! assert_eq!(mysql.format_dsn(), "app@tcp(127.0.0.1:3306)/orders?loc=Local&parseTime=true");
//! # Ok(())
//! # }
//! ```

use std::fmt;

use crate::ConfigStore;

/// Types that can be built from a named section of a [`ConfigStore`].
pub trait FromSection: Sized {
    /// Build the value from the keys under `section`.
    ///
    /// Missing keys keep their defaults, so this never fails.
    fn from_section(store: &ConfigStore, section: &str) -> Self;
}

/// Time zone used to interpret `DATETIME` and `TIMESTAMP` columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeLocation {
    /// Coordinated Universal Time.
    #[default]
    Utc,
    /// The local time zone of the process.
    Local,
}

impl TimeLocation {
    /// Name of the location as used in connection strings.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TimeLocation::Utc => "UTC",
            TimeLocation::Local => "Local",
        }
    }
}

impl fmt::Display for TimeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MySQL connection descriptor.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MySqlConfig {
    /// User name.
    pub user: String,
    /// Password.
    pub passwd: String,
    /// Network type, e.g. `tcp` or `unix`.
    pub net: String,
    /// Network address, `host:port` for TCP.
    pub addr: String,
    /// Database name.
    pub db_name: String,
    /// Location for time values.
    pub loc: TimeLocation,
    /// Parse `DATE` and `DATETIME` columns into time values.
    pub parse_time: bool,
}

const SECTION_FIELDS: [&str; 9] = [
    "host", "addr", "user", "username", "password", "passwd", "db", "dbname", "database",
];

impl FromSection for MySqlConfig {
    /// Later aliases win: with both `host` and `addr` set, `addr` is used.
    fn from_section(store: &ConfigStore, section: &str) -> Self {
        let mut cfg = MySqlConfig::default();

        for field in SECTION_FIELDS {
            let key = format!("{section}.{field}");
            if !store.is_set(&key) {
                continue;
            }
            let value = store.get_string(&key);
            match field {
                "host" | "addr" => cfg.addr = value,
                "user" | "username" => cfg.user = value,
                "password" | "passwd" => cfg.passwd = value,
                _ => cfg.db_name = value,
            }
        }

        cfg.loc = TimeLocation::Local;
        cfg.net = "tcp".to_string();
        cfg.parse_time = true;
        cfg
    }
}

impl MySqlConfig {
    /// Format the descriptor as a driver DSN:
    /// `[user[:passwd]@][net[(addr)]]/dbname[?params]`.
    #[must_use]
    pub fn format_dsn(&self) -> String {
        let mut dsn = String::new();

        if !self.user.is_empty() || !self.passwd.is_empty() {
            dsn.push_str(&self.user);
            if !self.passwd.is_empty() {
                dsn.push(':');
                dsn.push_str(&self.passwd);
            }
            dsn.push('@');
        }

        if !self.net.is_empty() {
            dsn.push_str(&self.net);
            if !self.addr.is_empty() {
                dsn.push('(');
                dsn.push_str(&self.addr);
                dsn.push(')');
            }
        }

        dsn.push('/');
        dsn.push_str(&self.db_name);

        let mut params = Vec::new();
        if self.loc != TimeLocation::Utc {
            params.push(format!("loc={}", self.loc.name()));
        }
        if self.parse_time {
            params.push("parseTime=true".to_string());
        }
        if !params.is_empty() {
            dsn.push('?');
            dsn.push_str(&params.join("&"));
        }

        dsn
    }
}

impl fmt::Debug for MySqlConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let passwd = if self.passwd.is_empty() { "" } else { "***" };
        f.debug_struct("MySqlConfig")
            .field("user", &self.user)
            .field("passwd", &passwd)
            .field("net", &self.net)
            .field("addr", &self.addr)
            .field("db_name", &self.db_name)
            .field("loc", &self.loc)
            .field("parse_time", &self.parse_time)
            .finish()
    }
}
