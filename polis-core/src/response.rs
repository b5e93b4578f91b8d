//! Mutable response contract policies write to.
//!
//! [`PolicyResponse`] is object safe so that a single `dyn Policy` can operate
//! on responses of any body type. Protocol crates implement it for their
//! response wrappers (see `polis_http::PolicedResponse`).

use bytes::Bytes;
use http::StatusCode;
use http::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue};

/// A response under construction that policies may mutate.
pub trait PolicyResponse {
    /// All response headers.
    fn headers(&self) -> &HeaderMap;

    /// Mutable access to the response headers.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Current status code.
    fn status(&self) -> StatusCode;

    /// Replaces the status code.
    fn set_status(&mut self, status: StatusCode);

    /// Replaces the body. An empty `Bytes` clears it.
    fn set_body(&mut self, body: Bytes);
}

/// Convenience accessors available on every [`PolicyResponse`], including
/// `dyn PolicyResponse`.
pub trait PolicyResponseExt: PolicyResponse {
    /// Returns the first value of the named header as a string.
    fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// Returns `true` when the header is present, whatever its value.
    fn has_header<K: AsHeaderName>(&self, name: K) -> bool {
        self.headers().contains_key(name)
    }

    /// Sets a header, replacing every previous value.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers_mut().insert(name, value);
    }

    /// Sets a header only if the response does not carry it yet.
    ///
    /// Returns `true` when the value was written.
    fn set_header_if_absent(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.headers().contains_key(&name) {
            return false;
        }
        self.headers_mut().insert(name, value);
        true
    }

    /// Removes every value of the header.
    fn remove_header<K: AsHeaderName>(&mut self, name: K) {
        self.headers_mut().remove(name);
    }
}

impl<R: PolicyResponse + ?Sized> PolicyResponseExt for R {}

/// Headers, status and body captured without any transport attached.
///
/// Useful for unit-testing policies and for hosts that assemble the final
/// response themselves.
#[derive(Debug, Clone, Default)]
pub struct DetachedResponse {
    /// Response headers.
    pub headers: HeaderMap,
    /// Status code.
    pub status: StatusCode,
    /// Body content, `None` until a policy replaces it.
    pub body: Option<Bytes>,
}

impl DetachedResponse {
    /// Creates an empty `200 OK` response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `200 OK` response with the given body.
    pub fn with_body(body: impl Into<Bytes>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }
}

impl PolicyResponse for DetachedResponse {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn set_body(&mut self, body: Bytes) {
        self.body = Some(body);
    }
}
