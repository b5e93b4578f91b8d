//! Cache header policy.
//!
//! [`CachingPolicy`] is meant to be the authoritative cache policy of a
//! response. It always rewrites `Cache-Control`, merges `Vary` and, when the
//! response may be cached, emits an empty `Pragma` to suppress no-cache
//! pragmas injected earlier in the pipeline. `Last-Modified`, `ETag` and
//! `Expires` are only filled in when nothing set them before.
//!
//! The configured values can be overridden per controller through the
//! originator capabilities:
//!
//! - [`CacheAgeProvider`](polis_core::CacheAgeProvider) replaces the max-age
//! - [`VaryProvider`](polis_core::VaryProvider) replaces the configured vary list
//! - [`ModificationProvider`](polis_core::ModificationProvider) replaces the
//!   request's modification feed
//!
//! # Conditional requests
//!
//! `GET` and `HEAD` requests whose `If-None-Match` selects the response ETag
//! are answered with `304 Not Modified` and an empty body. In legacy mode an
//! `If-Modified-Since` at or after the modification timestamp is accepted too,
//! provided `If-None-Match` is absent or matches.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use http::header::{
    CACHE_CONTROL, ETAG, EXPIRES, HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
    PRAGMA, VARY,
};
use http::{HeaderValue, Method, StatusCode};
use polis_core::{
    Originator, Policy, PolicyError, PolicyRequest, PolicyResponse, PolicyResponseExt,
};
use tracing::debug;

use crate::cache_control::CacheControl;
use crate::headers::{
    entity_tag, http_date, if_none_match, merge_lists, merge_vary, parse_http_date,
};

/// Vary list used when none is configured.
pub const DEFAULT_VARY: &str = "Cookie, X-Forwarded-Protocol";

const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Emits `Cache-Control`, `Vary`, `Pragma`, `Last-Modified`, `ETag` and
/// `Expires`, and answers matching conditional requests with `304`.
///
/// ```
/// use polis_http::CachingPolicy;
///
/// let policy = CachingPolicy::new()
///     .cache_age(300)
///     .vary("Cookie, X-Forwarded-Protocol, Accept");
/// ```
#[derive(Debug, Clone)]
pub struct CachingPolicy {
    cache_age: u64,
    vary: String,
    disable_cache_age_in_dev: bool,
    cache_ajax_requests: bool,
    legacy_if_modified_since: bool,
    no_store: bool,
}

impl Default for CachingPolicy {
    fn default() -> Self {
        Self {
            cache_age: 0,
            vary: DEFAULT_VARY.to_owned(),
            disable_cache_age_in_dev: true,
            cache_ajax_requests: true,
            legacy_if_modified_since: true,
            no_store: false,
        }
    }
}

impl CachingPolicy {
    /// Creates a policy that disables caching and varies on [`DEFAULT_VARY`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Max-age in seconds, used unless the originator overrides it.
    pub fn cache_age(mut self, seconds: u64) -> Self {
        self.cache_age = seconds;
        self
    }

    /// Comma-separated request header names, used unless the originator
    /// overrides them.
    pub fn vary(mut self, vary: impl Into<String>) -> Self {
        self.vary = vary.into();
        self
    }

    /// Forces the max-age to zero in [`Dev`](polis_core::Environment::Dev)
    /// environments. Enabled by default.
    pub fn disable_cache_age_in_dev(mut self, disable: bool) -> Self {
        self.disable_cache_age_in_dev = disable;
        self
    }

    /// When disabled, requests sent with `X-Requested-With: XMLHttpRequest`
    /// are never cached. Enabled by default.
    pub fn cache_ajax_requests(mut self, cache: bool) -> Self {
        self.cache_ajax_requests = cache;
        self
    }

    /// Accepts `If-Modified-Since` as a `304` trigger. Enabled by default.
    pub fn legacy_if_modified_since(mut self, enabled: bool) -> Self {
        self.legacy_if_modified_since = enabled;
        self
    }

    /// Emits `no-store` and skips ETag generation. Disabled by default.
    pub fn no_store(mut self, no_store: bool) -> Self {
        self.no_store = no_store;
        self
    }

    fn resolve_cache_age(&self, originator: &dyn Originator, request: &PolicyRequest) -> u64 {
        let mut cache_age = originator
            .as_cache_age_provider()
            .and_then(|provider| provider.cache_age(self.cache_age))
            .unwrap_or(self.cache_age);

        if self.disable_cache_age_in_dev && request.environment().is_dev() {
            cache_age = 0;
        }

        if !self.cache_ajax_requests
            && request
                .header(X_REQUESTED_WITH)
                .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
        {
            cache_age = 0;
        }

        cache_age
    }

    fn resolve_vary(&self, originator: &dyn Originator) -> String {
        originator
            .as_vary_provider()
            .and_then(|provider| provider.vary(&self.vary))
            .unwrap_or_else(|| self.vary.clone())
    }

    fn resolve_timestamp(
        &self,
        originator: &dyn Originator,
        request: &PolicyRequest,
    ) -> Option<DateTime<Utc>> {
        match originator.as_modification_provider() {
            Some(provider) => provider.modification_timestamp(),
            None => request.modification().latest(),
        }
    }

    fn is_not_modified(
        &self,
        request: &PolicyRequest,
        etag: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> bool {
        if !matches!(*request.method(), Method::GET | Method::HEAD) {
            return false;
        }

        let etag_matches = request
            .header(IF_NONE_MATCH)
            .map(|value| if_none_match(value, etag));
        if etag_matches == Some(true) {
            return true;
        }

        if !self.legacy_if_modified_since || etag_matches == Some(false) {
            return false;
        }
        match (
            timestamp,
            request.header(IF_MODIFIED_SINCE).and_then(parse_http_date),
        ) {
            (Some(timestamp), Some(since)) => since.timestamp() >= timestamp.timestamp(),
            _ => false,
        }
    }
}

fn header_value(name: &HeaderName, value: &str) -> Result<HeaderValue, PolicyError> {
    HeaderValue::from_str(value)
        .map_err(|err| PolicyError::InvalidHeaderValue(name.as_str().to_owned(), err))
}

impl Policy for CachingPolicy {
    fn apply_to_response(
        &self,
        originator: &dyn Originator,
        request: &PolicyRequest,
        response: &mut dyn PolicyResponse,
    ) -> Result<(), PolicyError> {
        let cache_age = self.resolve_cache_age(originator, request);
        let control = CacheControl::for_age(cache_age, self.no_store);
        response.set_header(CACHE_CONTROL, control.to_header_value());

        let vary = merge_vary(response.headers(), &self.resolve_vary(originator));
        if !vary.is_empty() {
            response.set_header(VARY, header_value(&VARY, &vary)?);
        }
        if control.is_cacheable() {
            response.set_header(PRAGMA, HeaderValue::from_static(""));
        }

        let timestamp = self.resolve_timestamp(originator, request);
        if let Some(timestamp) = timestamp
            && control.is_cacheable()
        {
            let value = header_value(&LAST_MODIFIED, &http_date(timestamp))?;
            response.set_header_if_absent(LAST_MODIFIED, value);
        }

        let mut not_modified = false;
        if !control.is_no_store() {
            let stamp = timestamp
                .map(|timestamp| timestamp.timestamp().to_string())
                .unwrap_or_default();
            let varied: Vec<&str> = merge_lists([vary.as_str()])
                .into_iter()
                .map(|name| request.header(name).unwrap_or_default())
                .collect();
            let computed = entity_tag(
                std::iter::once(stamp.as_str())
                    .chain(varied)
                    .chain([request.scheme()]),
            );
            response.set_header_if_absent(ETAG, header_value(&ETAG, &computed)?);
            let etag = response.header(ETAG).unwrap_or(&computed).to_owned();

            not_modified = response.status().is_success()
                && self.is_not_modified(request, &etag, timestamp);
            if not_modified {
                response.set_status(StatusCode::NOT_MODIFIED);
                response.set_body(Bytes::new());
                polis::metrics::record_not_modified();
            }
            debug!(cache_age, etag = %etag, not_modified, "caching headers applied");
        } else {
            debug!(cache_age, not_modified, "no-store caching headers applied");
        }

        let expires = i64::try_from(control.max_age())
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|max_age| request.now().checked_add_signed(max_age));
        if let Some(expires) = expires {
            response.set_header_if_absent(EXPIRES, header_value(&EXPIRES, &http_date(expires))?);
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "CachingPolicy"
    }
}
