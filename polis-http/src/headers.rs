//! Header value helpers shared by the HTTP policies.

use chrono::{DateTime, NaiveDateTime, Utc};
use http::HeaderMap;
use http::header::VARY;
use sha2::{Digest, Sha256};

/// IMF-fixdate layout, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const IMF_FIXDATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Obsolete RFC 850 layout, e.g. `Sunday, 06-Nov-94 08:49:37 GMT`.
const RFC_850: &str = "%A, %d-%b-%y %H:%M:%S GMT";
/// ANSI C `asctime()` layout, e.g. `Sun Nov  6 08:49:37 1994`.
const ASCTIME: &str = "%a %b %e %H:%M:%S %Y";

/// Formats a timestamp as an HTTP-date.
pub fn http_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format(IMF_FIXDATE).to_string()
}

/// Parses an HTTP-date in any of the three formats HTTP/1.1 recipients must
/// accept.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc2822(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    [RFC_850, ASCTIME]
        .into_iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

/// Splits a comma-separated header list into trimmed, non-empty items.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Unions header-name lists, dropping case-insensitive duplicates and keeping
/// the first spelling and position of every name.
pub fn merge_lists<'a>(lists: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut merged: Vec<&str> = Vec::new();
    for name in lists.into_iter().flat_map(split_list) {
        if !merged.iter().any(|seen| seen.eq_ignore_ascii_case(name)) {
            merged.push(name);
        }
    }
    merged
}

/// Merges `additional` into every `Vary` value already present in `headers`.
///
/// Returns the `", "`-joined union.
pub fn merge_vary(headers: &HeaderMap, additional: &str) -> String {
    let existing = headers
        .get_all(VARY)
        .iter()
        .filter_map(|value| value.to_str().ok());
    merge_lists(existing.chain([additional])).join(", ")
}

/// Computes a strong entity tag over the given parts.
///
/// Parts are joined with `:` and hashed with SHA-256; the result is quoted.
pub fn entity_tag<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for (index, part) in parts.into_iter().enumerate() {
        if index > 0 {
            hasher.update(b":");
        }
        hasher.update(part.as_bytes());
    }
    format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Returns `true` when an `If-None-Match` value selects `etag`.
///
/// The value may be the tag itself or a comma-separated list of tags; `*`
/// matches any tag. Weak tags (`W/"…"`) compare by their opaque part.
pub fn if_none_match(header: &str, etag: &str) -> bool {
    let header = header.trim();
    if header == etag {
        return true;
    }
    let etag = strip_weak(etag);
    split_list(header).any(|candidate| candidate == "*" || strip_weak(candidate) == etag)
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::HeaderValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_imf_fixdate() {
        let timestamp = Utc.timestamp_opt(784_111_777, 0).unwrap();
        assert_eq!(http_date(timestamp), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn parses_all_http_date_formats() {
        let expected = Utc.timestamp_opt(784_111_777, 0).unwrap();
        for value in [
            "Sun, 06 Nov 1994 08:49:37 GMT",
            "Sunday, 06-Nov-94 08:49:37 GMT",
            "Sun Nov  6 08:49:37 1994",
        ] {
            assert_eq!(parse_http_date(value), Some(expected), "{value}");
        }
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn vary_merge_is_case_insensitive_and_order_preserving() {
        let mut headers = HeaderMap::new();
        headers.append(VARY, HeaderValue::from_static("Accept-Encoding, cookie"));
        headers.append(VARY, HeaderValue::from_static("Accept"));

        let merged = merge_vary(&headers, "Cookie, X-Forwarded-Protocol, ,accept");

        assert_eq!(merged, "Accept-Encoding, cookie, Accept, X-Forwarded-Protocol");
    }

    #[test]
    fn vary_merge_without_existing_header() {
        assert_eq!(merge_vary(&HeaderMap::new(), "X-EyeColour"), "X-EyeColour");
        assert_eq!(merge_vary(&HeaderMap::new(), ""), "");
    }

    #[test]
    fn entity_tag_is_quoted_sha256() {
        let tag = entity_tag(["5000", "session=1", "https"]);
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert_eq!(tag.len(), 64 + 2);
        assert_eq!(tag, entity_tag(["5000", "session=1", "https"]));
        assert_ne!(tag, entity_tag(["5000", "session=2", "https"]));
    }

    #[test]
    fn if_none_match_lists_and_wildcards() {
        let tag = "\"abc\"";
        assert!(if_none_match("\"abc\"", tag));
        assert!(if_none_match("\"xyz\", \"abc\"", tag));
        assert!(if_none_match("W/\"abc\"", tag));
        assert!(if_none_match("*", tag));
        assert!(!if_none_match("\"abcd\"", tag));
    }
}
