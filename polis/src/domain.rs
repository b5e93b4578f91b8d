//! Host names that bypass policy application.
//!
//! Every entry is either a regular expression delimited by slashes
//! (`/^preview-[0-9]+\.example\.com$/`, optionally followed by the `i` flag)
//! or a plain host name that may start with a single `*` wildcard
//! (`*.staging.example.com`). Plain names match case-insensitively and
//! against the whole host. Regular expressions match anywhere in the host
//! unless they anchor themselves.
//!
//! Ports are stripped before matching, so `www.example.com:8080` is checked
//! as `www.example.com`.
//!
//! ```
//! use polis::DomainFilter;
//!
//! let filter = DomainFilter::new(["*.staging.example.com", "/^preview-\\d+\\./i"]).unwrap();
//!
//! assert!(filter.is_ignored("www.staging.example.com"));
//! assert!(filter.is_ignored("PREVIEW-12.example.com:8443"));
//! assert!(!filter.is_ignored("www.example.com"));
//! ```

use std::fmt;

use regex::{Regex, RegexBuilder};

use crate::error::PatternError;

/// A single compiled ignore-domain pattern.
#[derive(Clone)]
pub struct IgnorePattern {
    source: String,
    regex: Regex,
}

impl IgnorePattern {
    /// Compiles a pattern.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }

        let regex = match delimited(trimmed) {
            Some((body, flags)) => compile_delimited(trimmed, body, flags)?,
            None => compile_glob(trimmed)?,
        };

        Ok(Self {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// The pattern as it was written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` when `host` (port already stripped) matches.
    pub fn matches(&self, host: &str) -> bool {
        self.regex.is_match(host)
    }
}

impl fmt::Debug for IgnorePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IgnorePattern").field(&self.source).finish()
    }
}

/// Splits `/body/flags` into its parts.
fn delimited(pattern: &str) -> Option<(&str, &str)> {
    let rest = pattern.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    Some((&rest[..end], &rest[end + 1..]))
}

fn compile_delimited(pattern: &str, body: &str, flags: &str) -> Result<Regex, PatternError> {
    let mut builder = RegexBuilder::new(body);
    for flag in flags.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            flag => {
                return Err(PatternError::UnsupportedFlag {
                    pattern: pattern.to_owned(),
                    flag,
                });
            }
        }
    }
    builder.build().map_err(|source| PatternError::Regex {
        pattern: pattern.to_owned(),
        source,
    })
}

fn compile_glob(pattern: &str) -> Result<Regex, PatternError> {
    let (wildcard, literal) = match pattern.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    if literal.contains('*') {
        return Err(PatternError::MisplacedWildcard(pattern.to_owned()));
    }

    let prefix = if wildcard { ".*" } else { "" };
    let expression = format!("^{prefix}{}$", regex::escape(literal));
    RegexBuilder::new(&expression)
        .case_insensitive(true)
        .build()
        .map_err(|source| PatternError::Regex {
            pattern: pattern.to_owned(),
            source,
        })
}

/// Strips an optional `:port` suffix, keeping bracketed IPv6 literals intact.
pub fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &host[..end + 2],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// Ordered list of ignore-domain patterns.
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    patterns: Vec<IgnorePattern>,
}

impl DomainFilter {
    /// Compiles every pattern, failing on the first malformed one.
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| IgnorePattern::parse(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// A filter that ignores nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends an already compiled pattern.
    pub fn push(&mut self, pattern: IgnorePattern) {
        self.patterns.push(pattern);
    }

    /// Compiled patterns in declaration order.
    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    /// Returns `true` when no pattern is configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns `true` when `host` matches any pattern.
    pub fn is_ignored(&self, host: &str) -> bool {
        let host = strip_port(host);
        self.patterns.iter().any(|pattern| pattern.matches(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_is_anchored_and_case_insensitive() {
        let filter = DomainFilter::new(["*.staging.example.com"]).unwrap();
        assert!(filter.is_ignored("A.Staging.Example.com"));
        assert!(!filter.is_ignored("staging.example.com"));
        assert!(!filter.is_ignored("a.staging.example.com.evil.org"));
    }

    #[test]
    fn plain_host_requires_exact_match() {
        let filter = DomainFilter::new(["dev.example.com"]).unwrap();
        assert!(filter.is_ignored("dev.example.com:8080"));
        assert!(!filter.is_ignored("www.dev.example.com"));
        assert!(!filter.is_ignored("devXexample.com"), "dots are literal");
    }

    #[test]
    fn regex_flags() {
        let sensitive = IgnorePattern::parse("/^preview\\./").unwrap();
        assert!(!sensitive.matches("PREVIEW.example.com"));

        let insensitive = IgnorePattern::parse("/^preview\\./i").unwrap();
        assert!(insensitive.matches("PREVIEW.example.com"));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        assert!(matches!(IgnorePattern::parse("  "), Err(PatternError::Empty)));
        assert!(matches!(
            IgnorePattern::parse("www.*.example.com"),
            Err(PatternError::MisplacedWildcard(_))
        ));
        assert!(matches!(
            IgnorePattern::parse("**.example.com"),
            Err(PatternError::MisplacedWildcard(_))
        ));
        assert!(matches!(
            IgnorePattern::parse("/example/x"),
            Err(PatternError::UnsupportedFlag { flag: 'x', .. })
        ));
        assert!(matches!(
            IgnorePattern::parse("/(unclosed/"),
            Err(PatternError::Regex { .. })
        ));
    }

    #[test]
    fn ports_are_stripped() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
    }

    #[test]
    fn empty_filter_ignores_nothing() {
        assert!(!DomainFilter::empty().is_ignored("example.com"));
    }
}
