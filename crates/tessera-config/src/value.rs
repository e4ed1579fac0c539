//! Configuration value tree.
//!
//! Every format is decoded into a [`Value`]. Table keys are stored in
//! lowercase so that key lookups are case-insensitive regardless of how the
//! file spelled them.

use std::collections::{BTreeMap, HashMap};

/// A table of configuration values keyed by lowercase name.
pub type Table = BTreeMap<String, Value>;

/// A configuration value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null, or an empty document.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Ordered list of values.
    Array(Vec<Value>),
    /// Nested table.
    Table(Table),
}

impl Value {
    /// Create an empty table.
    pub fn empty_table() -> Self {
        Value::Table(Table::new())
    }

    /// Get the value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an array, if it is one.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the value as a table, if it is one.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    /// Whether the value is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
        }
    }

    /// Walk nested tables along `path`.
    ///
    /// Path segments must already be lowercase. An empty path returns `self`.
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        path.iter().try_fold(self, |current, segment| match current {
            Value::Table(table) => table.get(segment.as_ref()),
            _ => None,
        })
    }

    /// Insert `value` at `path`, creating intermediate tables.
    ///
    /// Any non-table value found along the way is replaced by a table.
    pub(crate) fn insert_path<S: AsRef<str>>(&mut self, path: &[S], value: Value) {
        let Some((first, rest)) = path.split_first() else {
            *self = value;
            return;
        };

        if !matches!(self, Value::Table(_)) {
            *self = Value::empty_table();
        }
        if let Value::Table(table) = self {
            table
                .entry(first.as_ref().to_string())
                .or_default()
                .insert_path(rest, value);
        }
    }

    /// Append the dotted keys of all leaves below this value to `out`.
    pub(crate) fn collect_leaf_keys(&self, prefix: &str, out: &mut Vec<String>) {
        match self {
            Value::Table(table) => {
                for (key, value) in table {
                    let full = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{prefix}.{key}")
                    };
                    value.collect_leaf_keys(&full, out);
                }
            }
            _ if !prefix.is_empty() => out.push(prefix.to_string()),
            _ => {}
        }
    }

    /// Convert to a JSON value, used to drive serde deserialization.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Table(table) => serde_json::Value::Object(
                table
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

/// Split a dotted key into lowercase path segments.
pub(crate) fn key_path(key: &str) -> Vec<String> {
    key.to_lowercase().split('.').map(str::to_string).collect()
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        i64::try_from(i).map_or(Value::Float(i as f64), Value::Integer)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<BTreeMap<String, T>> for Value {
    fn from(map: BTreeMap<String, T>) -> Self {
        Value::Table(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.into()))
                .collect(),
        )
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(map: HashMap<String, T>) -> Self {
        Value::Table(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Table(
                obj.into_iter()
                    .map(|(k, v)| (k.to_lowercase(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<toml::Value> for Value {
    fn from(toml: toml::Value) -> Self {
        match toml {
            toml::Value::Boolean(b) => Value::Bool(b),
            toml::Value::Integer(i) => Value::Integer(i),
            toml::Value::Float(f) => Value::Float(f),
            toml::Value::String(s) => Value::String(s),
            toml::Value::Datetime(dt) => Value::String(dt.to_string()),
            toml::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            toml::Value::Table(table) => Value::Table(
                table
                    .into_iter()
                    .map(|(k, v)| (k.to_lowercase(), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(yaml: serde_yaml::Value) -> Self {
        match yaml {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::String(n.to_string())
                }
            }
            serde_yaml::Value::String(s) => Value::String(s),
            serde_yaml::Value::Sequence(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_yaml::Value::Mapping(map) => Value::Table(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(k), Value::from(v)))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    let key = match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    };
    key.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_nested() {
        let value = Value::from(serde_json::json!({
            "Database": { "Host": "localhost", "port": 3306 }
        }));

        assert_eq!(
            value.lookup(&["database", "host"]),
            Some(&Value::String("localhost".to_string()))
        );
        assert_eq!(value.lookup(&["database", "port"]), Some(&Value::Integer(3306)));
        assert!(value.lookup(&["database", "missing"]).is_none());
        assert!(value.lookup(&["database", "host", "deeper"]).is_none());
    }

    #[test]
    fn test_lookup_empty_path_returns_self() {
        let value = Value::Integer(1);
        let empty: [&str; 0] = [];
        assert_eq!(value.lookup(&empty), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_insert_path_creates_tables() {
        let mut root = Value::empty_table();
        root.insert_path(&["a", "b", "c"], Value::from(1));
        assert_eq!(root.lookup(&["a", "b", "c"]), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_insert_path_replaces_scalars() {
        let mut root = Value::empty_table();
        root.insert_path(&["a"], Value::from("scalar"));
        root.insert_path(&["a", "b"], Value::from(true));
        assert_eq!(root.lookup(&["a", "b"]), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_collect_leaf_keys() {
        let value = Value::from(serde_json::json!({
            "server": { "host": "h", "ports": [1, 2] },
            "debug": true
        }));
        let mut keys = Vec::new();
        value.collect_leaf_keys("", &mut keys);
        keys.sort();
        assert_eq!(keys, vec!["debug", "server.host", "server.ports"]);
    }

    #[test]
    fn test_toml_conversion_lowercases_keys() {
        let toml: toml::Value = toml::from_str("[Server]\nHTTP_Addr = \"0.0.0.0:80\"\n").unwrap();
        let value = Value::from(toml);
        assert_eq!(
            value.lookup(&["server", "http_addr"]).and_then(Value::as_str),
            Some("0.0.0.0:80")
        );
    }

    #[test]
    fn test_toml_datetime_becomes_string() {
        let toml: toml::Value = toml::from_str("when = 1979-05-27T07:32:00Z\n").unwrap();
        let value = Value::from(toml);
        assert_eq!(
            value.lookup(&["when"]).and_then(Value::as_str),
            Some("1979-05-27T07:32:00Z")
        );
    }

    #[test]
    fn test_yaml_non_string_keys() {
        let yaml: serde_yaml::Value = serde_yaml::from_str("1: one\ntrue: yes\n").unwrap();
        let value = Value::from(yaml);
        assert_eq!(value.lookup(&["1"]).and_then(Value::as_str), Some("one"));
        assert!(value.lookup(&["true"]).is_some());
    }

    #[test]
    fn test_to_json_roundtrips_structure() {
        let json = serde_json::json!({ "a": [1, 2.5, "x", null, false] });
        assert_eq!(Value::from(json.clone()).to_json(), json);
    }

    #[test]
    fn test_from_map_lowercases_keys() {
        let mut map = HashMap::new();
        map.insert("Key".to_string(), "v");
        let value = Value::from(map);
        assert_eq!(value.lookup(&["key"]).and_then(Value::as_str), Some("v"));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::empty_table().type_name(), "table");
        assert_eq!(Value::from(vec![1, 2]).type_name(), "array");
    }
}
