//! Human-readable sale numbers.
//!
//! The counter value comes from the database; this module only renders and
//! parses it. Numbers wider than eight digits are rendered in full.

use crate::SALE_NUMBER_WIDTH;

/// Renders counter value `n` as a zero-padded sale number.
///
/// ```rust
/// use atelier_core::sale_number::format_sale_number;
///
/// assert_eq!(format_sale_number(1), "00000001");
/// assert_eq!(format_sale_number(42), "00000042");
/// ```
pub fn format_sale_number(n: i64) -> String {
    format!("{:0width$}", n, width = SALE_NUMBER_WIDTH)
}

/// Parses a sale number, with or without padding. Returns `None` for
/// anything that is not a positive integer.
pub fn parse_sale_number(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok().filter(|n| *n > 0)
}

/// Normalizes user input ("42", "0042") to the stored form ("00000042").
pub fn normalize_sale_number(s: &str) -> Option<String> {
    parse_sale_number(s).map(format_sale_number)
}
