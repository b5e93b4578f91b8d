use thiserror::Error;

/// Errors raised while building the ignore-domain filter.
///
/// Patterns are compiled once at startup, so a malformed pattern surfaces as
/// a boot failure rather than at request time.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The pattern string is empty.
    #[error("ignore-domain pattern is empty")]
    Empty,
    /// A glob pattern contains a wildcard anywhere but at its very beginning,
    /// or contains more than one.
    #[error("ignore-domain pattern `{0}` may only contain a single leading `*`")]
    MisplacedWildcard(String),
    /// A `/…/` pattern uses a flag other than `i`.
    #[error("ignore-domain pattern `{pattern}` uses unsupported flag `{flag}`")]
    UnsupportedFlag {
        /// The offending pattern.
        pattern: String,
        /// The unsupported flag character.
        flag: char,
    },
    /// The regular expression does not compile.
    #[error("ignore-domain pattern `{pattern}` is not a valid regular expression")]
    Regex {
        /// The offending pattern.
        pattern: String,
        /// Underlying compiler error.
        #[source]
        source: regex::Error,
    },
}
