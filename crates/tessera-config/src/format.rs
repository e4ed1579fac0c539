//! Supported configuration file formats.

use std::fmt;

use crate::value::Table;
use crate::{ConfigError, Value};

/// A configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFormat {
    /// JSON (`.json`).
    Json,
    /// TOML (`.toml`).
    Toml,
    /// YAML (`.yaml`, `.yml`).
    Yaml,
    /// INI (`.ini`).
    Ini,
}

impl ConfigFormat {
    /// File extensions in the order they are searched for, with their format.
    pub const SEARCH_ORDER: [(&'static str, ConfigFormat); 5] = [
        ("json", ConfigFormat::Json),
        ("toml", ConfigFormat::Toml),
        ("yaml", ConfigFormat::Yaml),
        ("yml", ConfigFormat::Yaml),
        ("ini", ConfigFormat::Ini),
    ];

    /// Look up a format by file extension, ignoring case.
    ///
    /// # Example
    ///
    /// ```
    /// use tessera_config::ConfigFormat;
    ///
    /// assert_eq!(ConfigFormat::from_extension("YML"), Some(ConfigFormat::Yaml));
    /// assert_eq!(ConfigFormat::from_extension("conf"), None);
    /// ```
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::SEARCH_ORDER
            .iter()
            .find(|(candidate, _)| *candidate == ext)
            .map(|(_, format)| *format)
    }

    /// Parse a format name such as `"toml"`; same names as the extensions.
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        Self::from_extension(name).ok_or_else(|| ConfigError::unsupported_format(name))
    }

    /// Canonical lowercase name of the format.
    pub fn name(self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Ini => "ini",
        }
    }

    /// Decode `content` into a value tree.
    ///
    /// The document root must be a table. An empty YAML document decodes to
    /// an empty table.
    pub fn parse(self, content: &str) -> Result<Value, ConfigError> {
        let value = match self {
            ConfigFormat::Json => Value::from(serde_json::from_str::<serde_json::Value>(content)?),
            ConfigFormat::Toml => Value::from(toml::Value::Table(toml::from_str::<toml::Table>(
                content,
            )?)),
            ConfigFormat::Yaml => Value::from(serde_yaml::from_str::<serde_yaml::Value>(content)?),
            ConfigFormat::Ini => parse_ini(content)?,
        };

        match value {
            Value::Table(_) => Ok(value),
            Value::Null => Ok(Value::empty_table()),
            other => Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} document root must be a table, found {}",
                    self.name(),
                    other.type_name()
                ),
            }),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Properties outside any section sit at the root; every value is a string.
fn parse_ini(content: &str) -> Result<Value, ConfigError> {
    let ini = ini::Ini::load_from_str(content)?;
    let mut root = Table::new();

    for (section, properties) in &ini {
        let entries = properties
            .iter()
            .map(|(k, v)| (k.to_lowercase(), Value::from(v)));

        match section {
            None => root.extend(entries),
            Some(name) => {
                let slot = root
                    .entry(name.to_lowercase())
                    .or_insert_with(Value::empty_table);
                if let Value::Table(table) = slot {
                    table.extend(entries);
                } else {
                    *slot = Value::Table(entries.collect());
                }
            }
        }
    }

    Ok(Value::Table(root))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("yaml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("ini"), Some(ConfigFormat::Ini));
        assert_eq!(ConfigFormat::from_extension("xml"), None);
    }

    #[test]
    fn test_from_name_unsupported() {
        let err = ConfigFormat::from_name("hcl").unwrap_err();
        assert!(err.to_string().contains("hcl"));
    }

    #[test]
    fn test_parse_json() {
        let value = ConfigFormat::Json
            .parse(r#"{"App": {"Name": "demo", "port": 80}}"#)
            .unwrap();
        assert_eq!(
            value.lookup(&["app", "name"]).and_then(Value::as_str),
            Some("demo")
        );
    }

    #[test]
    fn test_parse_toml() {
        let value = ConfigFormat::Toml
            .parse("[app]\nname = \"demo\"\nport = 80\n")
            .unwrap();
        assert_eq!(value.lookup(&["app", "port"]), Some(&Value::Integer(80)));
    }

    #[test]
    fn test_parse_yaml() {
        let value = ConfigFormat::Yaml
            .parse("app:\n  name: demo\n  tags: [a, b]\n")
            .unwrap();
        assert_eq!(
            value.lookup(&["app", "tags"]),
            Some(&Value::from(vec!["a", "b"]))
        );
    }

    #[test]
    fn test_parse_empty_yaml_is_empty_table() {
        let value = ConfigFormat::Yaml.parse("").unwrap();
        assert_eq!(value, Value::empty_table());
    }

    #[test]
    fn test_parse_ini() {
        let value = ConfigFormat::Ini
            .parse("debug = true\n\n[Database]\nHost = db.local\nport = 3306\n")
            .unwrap();
        assert_eq!(value.lookup(&["debug"]).and_then(Value::as_str), Some("true"));
        assert_eq!(
            value.lookup(&["database", "host"]).and_then(Value::as_str),
            Some("db.local")
        );
        assert_eq!(
            value.lookup(&["database", "port"]).and_then(Value::as_str),
            Some("3306")
        );
    }

    #[test]
    fn test_parse_rejects_non_table_root() {
        let err = ConfigFormat::Json.parse("[1, 2, 3]").unwrap_err();
        match err {
            ConfigError::InvalidConfig { message } => assert!(message.contains("array")),
            other => panic!("Expected InvalidConfig error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_errors_by_format() {
        assert!(matches!(
            ConfigFormat::Json.parse("{"),
            Err(ConfigError::JsonError(_))
        ));
        assert!(matches!(
            ConfigFormat::Toml.parse("= nope"),
            Err(ConfigError::TomlError(_))
        ));
        assert!(matches!(
            ConfigFormat::Yaml.parse("a: [unclosed"),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(ConfigFormat::Yaml.to_string(), "yaml");
    }
}
