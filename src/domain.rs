//! Search domain validation.

use crate::error::{ResolvConfError, Result};

/// Longest label allowed by RFC 1035.
const MAX_LABEL_LEN: usize = 63;

/// Longest domain name in presentation form, without the trailing dot.
const MAX_NAME_LEN: usize = 253;

/// Validates a search domain and returns its normalized form.
///
/// Normalization drops a single trailing dot and lowercases ASCII letters.
/// Labels may contain ASCII letters, digits, `-` and `_`.
///
/// # Errors
///
/// Returns [`ResolvConfError::InvalidDomain`] for empty, root-only,
/// oversized or otherwise malformed names.
pub fn normalize_search_domain(input: &str) -> Result<String> {
    let name = input.strip_suffix('.').unwrap_or(input);
    if name.is_empty() {
        return Err(ResolvConfError::domain(input, "empty or root domain"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ResolvConfError::domain(input, "name too long"));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(ResolvConfError::domain(input, "empty label"));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(ResolvConfError::domain(input, "label too long"));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(ResolvConfError::domain(input, "invalid character"));
        }
    }

    Ok(name.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_trailing_dot() {
        assert_eq!(normalize_search_domain("Example.COM.").unwrap(), "example.com");
        assert_eq!(normalize_search_domain("lan").unwrap(), "lan");
        assert_eq!(normalize_search_domain("_srv.corp-1.example").unwrap(), "_srv.corp-1.example");
    }

    #[test]
    fn rejects_malformed() {
        let long_label = "a".repeat(64);
        let long_name = ["abcdefghij"; 24].join(".");
        for bad in [
            "",
            ".",
            "a..b",
            ".lead",
            "trail..",
            "sp ace",
            "#comment",
            "bücher.de",
            long_label.as_str(),
            long_name.as_str(),
        ] {
            assert!(normalize_search_domain(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn accepts_limits() {
        let label = "a".repeat(63);
        assert!(normalize_search_domain(&label).is_ok());
        let name = format!("{label}.{label}.{label}.{}", "b".repeat(61));
        assert_eq!(name.len(), 253);
        assert!(normalize_search_domain(&name).is_ok());
    }
}
