use polis_core::CacheAgeProvider;

/// Editor-controlled max-age, stored in minutes as free text.
///
/// Pages embed it and hand it out from
/// [`Originator::as_cache_age_provider`](polis_core::Originator::as_cache_age_provider):
///
/// - empty text keeps the policy's configured max-age
/// - a number of minutes is converted to seconds (`27` becomes `1620`)
/// - `0` explicitly disables caching for the page
/// - anything else keeps the configured max-age
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMaxAge {
    minutes: String,
}

impl PageMaxAge {
    /// Wraps the editor-supplied field.
    pub fn new(minutes: impl Into<String>) -> Self {
        Self {
            minutes: minutes.into(),
        }
    }

    /// The field as entered.
    pub fn as_str(&self) -> &str {
        &self.minutes
    }

    /// Max-age in seconds, `None` when the field does not override anything.
    pub fn seconds(&self) -> Option<u64> {
        let minutes = self.minutes.trim();
        if minutes.is_empty() {
            return None;
        }
        let minutes: f64 = minutes.parse().ok()?;
        if !minutes.is_finite() {
            return None;
        }
        // negative values disable caching, fractions are truncated
        Some((minutes * 60.0).max(0.0) as u64)
    }
}

impl CacheAgeProvider for PageMaxAge {
    fn cache_age(&self, _current: u64) -> Option<u64> {
        self.seconds()
    }
}
