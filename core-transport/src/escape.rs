//! ASCII escaping for JSON carried in HTTP headers.
//!
//! Header values must be ASCII, so every non-ASCII code point of the
//! serialized JSON is replaced by a `\uXXXX` escape (a surrogate pair above
//! U+FFFF). The result is still valid JSON for the same value.

use serde::Serialize;
use std::fmt::Write;

/// Escape every non-ASCII character of `json`, leaving ASCII untouched.
///
/// ```
/// assert_eq!(core_transport::escape::ascii_escape("café"), "caf\\u00e9");
/// ```
pub fn ascii_escape(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            escaped.push(c);
            continue;
        }
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units) {
            // Writing to a String cannot fail
            let _ = write!(escaped, "\\u{:04x}", unit);
        }
    }
    escaped
}

/// Serialize `value` as JSON suitable for a header value.
pub fn header_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string(value).map(|json| ascii_escape(&json))
}
