//! Expiry date normalization to the NSE `DD-Mon-YYYY` form.
//!
//! Accepted inputs:
//!
//! | Form          | Example        |
//! |---------------|----------------|
//! | `DDMMMYY`     | `03FEB26`      |
//! | `DD-Mon-YYYY` | `03-feb-2026`  |
//! | `YYYY-MM-DD`  | `2026-02-03`   |
//! | `DD-Mon-YY`   | `03-Feb-26`    |
//!
//! Anything else is passed through unchanged.

use chrono::NaiveDate;

const NSE_FORMAT: &str = "%d-%b-%Y";

/// Byte-level shape check: `d` digit, `a` ASCII letter, anything else literal.
fn has_shape(s: &str, shape: &str) -> bool {
    s.len() == shape.len()
        && s.bytes().zip(shape.bytes()).all(|(c, p)| match p {
            b'd' => c.is_ascii_digit(),
            b'a' => c.is_ascii_alphabetic(),
            lit => c == lit,
        })
}

/// Parse any accepted expiry form into a date.
pub fn parse_expiry(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();

    if has_shape(s, "ddaaadd") {
        let expanded = format!("{}-{}-20{}", &s[0..2], &s[2..5], &s[5..7]);
        return NaiveDate::parse_from_str(&expanded, NSE_FORMAT).ok();
    }
    if has_shape(s, "dd-aaa-dddd") {
        return NaiveDate::parse_from_str(s, NSE_FORMAT).ok();
    }
    if has_shape(s, "dddd-dd-dd") {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d").ok();
    }
    if has_shape(s, "dd-aaa-dd") {
        return NaiveDate::parse_from_str(s, "%d-%b-%y").ok();
    }
    None
}

/// Render `raw` as `DD-Mon-YYYY`, or return it unchanged if it does not parse.
pub fn normalize_expiry(raw: &str) -> String {
    match parse_expiry(raw) {
        Some(date) => date.format(NSE_FORMAT).to_string(),
        None => {
            tracing::warn!(expiry = raw, "unrecognized expiry format, using as-is");
            raw.to_owned()
        }
    }
}
