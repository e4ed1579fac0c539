//! Lenient conversions from [`Value`] to Rust types.
//!
//! Every conversion returns `None` when the value cannot be represented in
//! the target type; the store's typed getters turn that into a zero value.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::duration::parse_duration;
use crate::Value;

const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S %:z",
    "%Y-%m-%d %H:%M:%S%:z",
];

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d %b %Y"];

const DURATION_UNIT_CHARS: &[char] = &['n', 's', 'u', 'µ', 'μ', 'm', 'h'];

pub(crate) fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Table(_) => None,
    }
}

pub(crate) fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Integer(i) => Some(*i != 0),
        Value::Float(f) => Some(*f != 0.0),
        Value::String(s) => parse_bool(s),
        Value::Null => Some(false),
        Value::Array(_) | Value::Table(_) => None,
    }
}

pub(crate) fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Float(f) => float_to_i64(*f),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => parse_int(trim_zero_decimal(s)),
        Value::Null => Some(0),
        Value::Array(_) | Value::Table(_) => None,
    }
}

pub(crate) fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.parse().ok(),
        Value::Null => Some(0.0),
        Value::Array(_) | Value::Table(_) => None,
    }
}

/// Numbers are nanosecond counts; strings with a unit go through
/// [`parse_duration`], bare numeric strings are nanoseconds too.
pub(crate) fn to_duration(value: &Value) -> Option<Duration> {
    match value {
        Value::Integer(i) => u64::try_from(*i).ok().map(Duration::from_nanos),
        Value::Float(f) => float_to_i64(*f)
            .and_then(|n| u64::try_from(n).ok())
            .map(Duration::from_nanos),
        Value::String(s) if s.contains(DURATION_UNIT_CHARS) => parse_duration(s),
        Value::String(s) => parse_duration(&format!("{s}ns")),
        Value::Null => Some(Duration::ZERO),
        Value::Bool(_) | Value::Array(_) | Value::Table(_) => None,
    }
}

/// Strings are matched against the supported layouts; integers are Unix
/// seconds. Times without an offset are taken as UTC.
pub(crate) fn to_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_time(s),
        Value::Integer(secs) => Utc.timestamp_opt(*secs, 0).single(),
        _ => None,
    }
}

pub(crate) fn to_string_slice(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| to_string(item).unwrap_or_default())
                .collect(),
        ),
        Value::String(s) => Some(s.split_whitespace().map(str::to_string).collect()),
        _ => None,
    }
}

pub(crate) fn to_int_slice(value: &Value) -> Option<Vec<i64>> {
    match value {
        Value::Array(items) => items.iter().map(to_i64).collect(),
        _ => None,
    }
}

pub(crate) fn to_string_map(value: &Value) -> Option<HashMap<String, String>> {
    match value {
        Value::Table(table) => Some(
            table
                .iter()
                .map(|(k, v)| (k.clone(), to_string(v).unwrap_or_default()))
                .collect(),
        ),
        Value::String(s) => serde_json::from_str(s).ok(),
        _ => None,
    }
}

pub(crate) fn to_string_slice_map(value: &Value) -> Option<HashMap<String, Vec<String>>> {
    match value {
        Value::Table(table) => Some(
            table
                .iter()
                .map(|(k, v)| {
                    let items = match v {
                        Value::Array(_) => to_string_slice(v).unwrap_or_default(),
                        other => vec![to_string(other).unwrap_or_default()],
                    };
                    (k.clone(), items)
                })
                .collect(),
        ),
        Value::String(s) => serde_json::from_str(s).ok(),
        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63
    let truncated = f.trunc();
    (truncated.is_finite() && (-LIMIT..LIMIT).contains(&truncated)).then_some(truncated as i64)
}

/// Drop a fractional part made only of zeros, so `"12.00"` reads as `"12"`.
fn trim_zero_decimal(s: &str) -> &str {
    match s.split_once('.') {
        Some((whole, fraction)) if !fraction.is_empty() && fraction.bytes().all(|b| b == b'0') => {
            whole
        }
        _ => s,
    }
}

/// Parse a signed integer the way integer literals are written: `0x`, `0o`
/// and `0b` prefixes, a bare leading `0` for octal, and `_` between digits.
fn parse_int(s: &str) -> Option<i64> {
    let (negative, unsigned) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let lower = unsigned.to_ascii_lowercase();
    let (radix, digits, prefixed) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest, true)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest, true)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest, true)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..], true)
    } else {
        (10, lower.as_str(), false)
    };

    if !underscores_ok(digits, prefixed) {
        return None;
    }
    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i128::from(u64::from_str_radix(&digits, radix).ok()?);
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

/// Each `_` must sit between two digits, or between a base prefix and a digit.
fn underscores_ok(digits: &str, prefixed: bool) -> bool {
    let mut previous_is_digit = prefixed;
    let mut pending_underscore = false;
    for c in digits.chars() {
        if c == '_' {
            if !previous_is_digit {
                return false;
            }
            previous_is_digit = false;
            pending_underscore = true;
        } else {
            previous_is_digit = true;
            pending_underscore = false;
        }
    }
    !pending_underscore
}

fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = ZONED_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
