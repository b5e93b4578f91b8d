//! Read-only request view handed to policies.
//!
//! [`PolicyRequest`] snapshots the parts of the inbound request that policies
//! may consult (method, URI, headers) together with the ambient values a policy
//! needs at the end of the pipeline:
//!
//! - [`Environment`] - the deployment mode, supplied by the host application
//! - `now` - the moment policies are applied, used for `Expires`
//! - [`ModificationTracker`] - timestamps of data read while handling the request

use chrono::{DateTime, Utc};
use http::header::{AsHeaderName, FORWARDED, HOST};
use http::{HeaderMap, Method, Request, Uri, request::Parts};
use serde::{Deserialize, Serialize};

use crate::modification::ModificationTracker;

/// Deployment mode of the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Environment {
    /// Development sites: templates change often, caching gets in the way.
    Dev,
    /// Test or staging deployments.
    Test,
    /// Production.
    #[default]
    Live,
}

impl Environment {
    /// Returns `true` for [`Environment::Dev`].
    pub fn is_dev(&self) -> bool {
        matches!(self, Environment::Dev)
    }
}

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_PROTOCOL: &str = "x-forwarded-protocol";

fn first_token(value: &str) -> Option<&str> {
    value
        .split(',')
        .next()
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// `proto` parameter of the first `Forwarded` element (RFC 7239).
fn forwarded_proto(value: &str) -> Option<&str> {
    value.split(',').next()?.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("proto") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then_some(value)
    })
}

/// Snapshot of the inbound request, as seen by policies.
#[derive(Debug)]
pub struct PolicyRequest {
    head: Parts,
    environment: Environment,
    now: DateTime<Utc>,
    modification: ModificationTracker,
}

impl PolicyRequest {
    /// Creates a view from request parts, applied now, in a live environment.
    pub fn from_parts(head: Parts) -> Self {
        Self {
            head,
            environment: Environment::default(),
            now: Utc::now(),
            modification: ModificationTracker::new(),
        }
    }

    /// Creates a view from a bodiless request.
    pub fn from_request(request: Request<()>) -> Self {
        let (head, ()) = request.into_parts();
        Self::from_parts(head)
    }

    /// Copies method, URI, version and headers out of `parts`.
    ///
    /// Extensions are not copied; the pipeline hands the modification tracker
    /// over explicitly with [`with_modification`](Self::with_modification).
    pub fn snapshot(parts: &Parts) -> Self {
        let mut request = Request::new(());
        *request.method_mut() = parts.method.clone();
        *request.uri_mut() = parts.uri.clone();
        *request.version_mut() = parts.version;
        *request.headers_mut() = parts.headers.clone();
        Self::from_request(request)
    }

    /// Sets the deployment mode.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Sets the moment policies are applied.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Moves the application moment, e.g. once the handler produced its
    /// response.
    pub fn set_now(&mut self, now: DateTime<Utc>) {
        self.now = now;
    }

    /// Uses `tracker` as the request's modification feed.
    pub fn with_modification(mut self, tracker: ModificationTracker) -> Self {
        self.modification = tracker;
        self
    }

    /// Returns the first value of the named header as a string.
    ///
    /// Values that are not visible ASCII are treated as absent.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.head
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    /// Request URI.
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    /// Host the request was addressed to: the `Host` header, falling back to
    /// the URI authority.
    ///
    /// Requests that did not arrive over HTTP (background jobs, command line
    /// runs) have no host.
    pub fn host(&self) -> Option<&str> {
        self.header(HOST)
            .filter(|host| !host.is_empty())
            .or_else(|| self.head.uri.host())
    }

    /// Request scheme, `http` unless something says otherwise.
    ///
    /// Servers see origin-form URIs (`/page`), so behind a proxy the scheme
    /// comes from headers. Resolved in order: URI scheme, `Forwarded: proto=`,
    /// `X-Forwarded-Proto`, `X-Forwarded-Protocol`. Only the first (closest
    /// to the client) hop is read.
    pub fn scheme(&self) -> &str {
        self.head
            .uri
            .scheme_str()
            .or_else(|| self.header(FORWARDED).and_then(forwarded_proto))
            .or_else(|| self.header(X_FORWARDED_PROTO).and_then(first_token))
            .or_else(|| self.header(X_FORWARDED_PROTOCOL).and_then(first_token))
            .unwrap_or("http")
    }

    /// Deployment mode.
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// The moment policies are applied.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Modification timestamps collected while handling the request.
    pub fn modification(&self) -> &ModificationTracker {
        &self.modification
    }
}
