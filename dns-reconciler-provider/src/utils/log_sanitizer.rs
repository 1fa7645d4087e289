//! Log sanitization utilities
//!
//! Keeps long record values (DKIM keys, SPF chains, chunked TXT payloads)
//! from flooding debug and error logs.

/// Maximum number of bytes to include in truncated log output.
const TRUNCATE_LIMIT: usize = 256;

/// Maximum number of values listed by [`preview_values`].
const PREVIEW_VALUES: usize = 4;

/// MSRV-compatible replacement for `str::floor_char_boundary` (stable since 1.91.0).
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while i > 0 && !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Truncate a string for safe logging.
///
/// Returns the original string if it's within the limit, otherwise the first
/// `TRUNCATE_LIMIT` bytes with a suffix giving the total length.
pub fn truncate_for_log(s: &str) -> String {
    if s.len() <= TRUNCATE_LIMIT {
        s.to_string()
    } else {
        format!(
            "{}... [truncated, total {} bytes]",
            &s[..floor_char_boundary(s, TRUNCATE_LIMIT)],
            s.len()
        )
    }
}

/// Render a list of record values for a log line.
///
/// Lists at most `PREVIEW_VALUES` values and truncates the result.
pub fn preview_values<'a>(values: impl IntoIterator<Item = &'a str>) -> String {
    let mut shown = Vec::new();
    let mut total = 0usize;
    for value in values {
        if shown.len() < PREVIEW_VALUES {
            shown.push(value);
        }
        total += 1;
    }

    let out = if total > shown.len() {
        format!("[{}, ... {} more]", shown.join(", "), total - shown.len())
    } else {
        format!("[{}]", shown.join(", "))
    };
    truncate_for_log(&out)
}
