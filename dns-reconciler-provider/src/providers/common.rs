//! Name helpers shared by providers and the reconciler.

// ============ Domain names ============

/// Strip the trailing dot from a name.
pub fn normalize_domain_name(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

/// Make sure a name ends with exactly one dot.
pub fn ensure_trailing_dot(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.'))
}

/// Convert a fully qualified name to a name relative to the zone.
///
/// - `"www.example.com."` + `"example.com."` -> `"www"`
/// - `"example.com."` + `"example.com."` -> `""` (apex)
///
/// Names outside the zone are returned without their trailing dot.
pub fn full_name_to_relative(full_name: &str, zone_name: &str) -> String {
    let full = normalize_domain_name(full_name);
    let zone = normalize_domain_name(zone_name);

    if full == zone {
        String::new()
    } else if let Some(subdomain) = full.strip_suffix(&format!(".{zone}")) {
        subdomain.to_string()
    } else {
        full
    }
}

/// Convert a relative name to a fully qualified one with a trailing dot.
///
/// - `"www"` + `"example.com."` -> `"www.example.com."`
/// - `""` or `"@"` + `"example.com."` -> `"example.com."`
pub fn relative_to_full_name(relative_name: &str, zone_name: &str) -> String {
    let zone = normalize_domain_name(zone_name);

    if relative_name == "@" || relative_name.is_empty() {
        format!("{zone}.")
    } else {
        format!("{relative_name}.{zone}.")
    }
}

// ============ Provider encodings ============

/// Decode `\ddd` octal escapes the provider uses for special characters in names.
///
/// `"\052.example.com."` -> `"*.example.com."`. Sequences that are not three
/// octal digits are left untouched.
pub fn octal_replace(name: &str) -> String {
    let bytes = name.as_bytes();
    let mut out = String::with_capacity(name.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\'
            && i + 3 < bytes.len()
            && bytes[i + 1..i + 4].iter().all(u8::is_ascii_digit)
            && let Ok(code) = u32::from_str_radix(&name[i + 1..i + 4], 8)
            && let Some(ch) = char::from_u32(code)
        {
            out.push(ch);
            i += 4;
            continue;
        }
        let ch_len = name[i..].chars().next().map_or(1, char::len_utf8);
        out.push_str(&name[i..i + ch_len]);
        i += ch_len;
    }

    out
}

/// Short form of a hosted zone id: `/hostedzone/Z42` -> `Z42`.
pub fn short_zone_id(zone_id: &str) -> &str {
    zone_id.rsplit('/').next().unwrap_or(zone_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain_name() {
        assert_eq!(normalize_domain_name("example.com."), "example.com");
        assert_eq!(normalize_domain_name("example.com"), "example.com");
    }

    #[test]
    fn test_ensure_trailing_dot() {
        assert_eq!(ensure_trailing_dot("example.com"), "example.com.");
        assert_eq!(ensure_trailing_dot("example.com."), "example.com.");
    }

    #[test]
    fn test_full_name_to_relative() {
        assert_eq!(
            full_name_to_relative("www.unit.tests.", "unit.tests."),
            "www"
        );
        assert_eq!(full_name_to_relative("unit.tests.", "unit.tests."), "");
        assert_eq!(
            full_name_to_relative("a.b.unit.tests", "unit.tests."),
            "a.b"
        );
        assert_eq!(
            full_name_to_relative("other.example.", "unit.tests."),
            "other.example"
        );
    }

    #[test]
    fn test_relative_to_full_name() {
        assert_eq!(relative_to_full_name("www", "unit.tests."), "www.unit.tests.");
        assert_eq!(relative_to_full_name("", "unit.tests."), "unit.tests.");
        assert_eq!(relative_to_full_name("@", "unit.tests"), "unit.tests.");
    }

    #[test]
    fn test_octal_replace() {
        assert_eq!(octal_replace("\\052.unit.tests."), "*.unit.tests.");
        assert_eq!(octal_replace("a\\100b"), "a@b");
        assert_eq!(octal_replace("plain.unit.tests."), "plain.unit.tests.");
        assert_eq!(octal_replace("trailing\\05"), "trailing\\05");
        assert_eq!(octal_replace("\\x52"), "\\x52");
    }

    #[test]
    fn test_short_zone_id() {
        assert_eq!(short_zone_id("/hostedzone/Z42"), "Z42");
        assert_eq!(short_zone_id("Z42"), "Z42");
    }
}
