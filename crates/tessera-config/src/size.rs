//! Human-readable byte sizes.
//!
//! Sizes such as `"10M"`, `"500KB"` or `"4096"` are converted to an exact
//! byte count. Only binary (1024-based) multipliers exist; there is no
//! decimal unit family.
//!
//! # Example
//!
//! ```
//! use tessera_config::{parse_size, INVALID_SIZE};
//!
//! assert_eq!(parse_size("10K"), 10 * 1024);
//! assert_eq!(parse_size("1mb"), 1024 * 1024);
//! assert_eq!(parse_size("ten"), INVALID_SIZE);
//! ```

/// Sentinel returned by [`parse_size`] when the input cannot be interpreted.
pub const INVALID_SIZE: i64 = -1;

/// Unit symbols in matching order. The empty symbol always matches.
const UNITS: [(&str, i64); 5] = [
    ("K", 1 << 10),
    ("M", 1 << 20),
    ("G", 1 << 30),
    ("B", 1),
    ("", 1),
];

/// Parse a human-readable size string into a byte count.
///
/// The input is upper-cased and one trailing `B` is dropped, so `"10MB"`,
/// `"10mb"` and `"10M"` are equivalent. The remaining text must be a base-10
/// integer followed by an optional `K`, `M` or `G`.
///
/// Surrounding whitespace is not trimmed. A negative number is accepted and
/// yields a negative count. Callers that need a non-negative size must check
/// for it themselves.
///
/// Returns [`INVALID_SIZE`] when the numeric part does not parse or the
/// result overflows `i64`. This function never panics.
pub fn parse_size(s: &str) -> i64 {
    let upper = s.to_uppercase();
    let trimmed = upper.strip_suffix('B').unwrap_or(&upper);

    UNITS
        .iter()
        .find_map(|(symbol, multiplier)| {
            trimmed
                .strip_suffix(*symbol)
                .map(|number| (number, *multiplier))
        })
        .and_then(|(number, multiplier)| number.parse::<i64>().ok()?.checked_mul(multiplier))
        .unwrap_or(INVALID_SIZE)
}
