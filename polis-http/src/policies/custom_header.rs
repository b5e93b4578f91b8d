use http::header::{HeaderName, HeaderValue};
use polis_core::{Originator, Policy, PolicyError, PolicyRequest, PolicyResponse};

/// Sets a fixed list of headers.
///
/// A non-empty value overwrites the header; an empty value removes it. This
/// makes it possible to strip headers set by earlier policies or by the
/// handler:
///
/// ```
/// use polis_http::CustomHeaderPolicy;
///
/// let policy = CustomHeaderPolicy::new()
///     .try_header("Cache-Control", "public, max-age=600, no-transform")?
///     .try_header("Custom-Header", "Hello")?
///     .try_header("Vary", "")?;
/// # Ok::<(), polis_core::PolicyError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CustomHeaderPolicy {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl CustomHeaderPolicy {
    /// Creates a policy without headers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header, replacing a previous entry with the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Parses and adds a header.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, PolicyError> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| PolicyError::InvalidHeaderName(name.to_owned(), err))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|err| PolicyError::InvalidHeaderValue(name.to_owned(), err))?;
        Ok(self.header(header_name, header_value))
    }

    /// Replaces all headers.
    pub fn set_headers<I>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (HeaderName, HeaderValue)>,
    {
        self.headers.clear();
        for (name, value) in headers {
            self.insert(name, value);
        }
    }

    /// Configured headers in declaration order.
    pub fn headers(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.headers.iter().map(|(name, value)| (name, value))
    }

    fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        match self.headers.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.headers.push((name, value)),
        }
    }
}

impl Policy for CustomHeaderPolicy {
    fn apply_to_response(
        &self,
        _originator: &dyn Originator,
        _request: &PolicyRequest,
        response: &mut dyn PolicyResponse,
    ) -> Result<(), PolicyError> {
        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            if value.is_empty() {
                headers.remove(name);
            } else {
                headers.insert(name.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "CustomHeaderPolicy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;
    use http::header::{CACHE_CONTROL, VARY};
    use polis_core::{DetachedResponse, PolicyResponseExt};
    use pretty_assertions::assert_eq;

    fn request() -> PolicyRequest {
        PolicyRequest::from_request(Request::new(()))
    }

    #[test]
    fn sets_overwrites_and_removes_headers() {
        let policy = CustomHeaderPolicy::new()
            .try_header("Cache-Control", "public, max-age=600, no-transform")
            .unwrap()
            .try_header("Custom-Header", "Hello")
            .unwrap()
            .try_header("Vary", "")
            .unwrap();

        let mut response = DetachedResponse::new();
        response.set_header(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        response.set_header(VARY, HeaderValue::from_static("Cookie"));

        policy
            .apply_to_response(&(), &request(), &mut response)
            .unwrap();

        assert_eq!(
            response.header(CACHE_CONTROL),
            Some("public, max-age=600, no-transform")
        );
        assert_eq!(response.header("custom-header"), Some("Hello"));
        assert!(!response.has_header(VARY));
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let policy = CustomHeaderPolicy::new()
            .try_header("X-Frame-Options", "DENY")
            .unwrap();
        let mut response = DetachedResponse::new();

        policy.apply_to_response(&(), &request(), &mut response).unwrap();
        let once = response.headers.clone();
        policy.apply_to_response(&(), &request(), &mut response).unwrap();

        assert_eq!(response.headers, once);
        assert_eq!(response.headers.get_all("x-frame-options").iter().count(), 1);
    }

    #[test]
    fn invalid_headers_fail_at_construction() {
        assert!(matches!(
            CustomHeaderPolicy::new().try_header("Bad Header", "x"),
            Err(PolicyError::InvalidHeaderName(..))
        ));
        assert!(matches!(
            CustomHeaderPolicy::new().try_header("X-Ok", "line\nbreak"),
            Err(PolicyError::InvalidHeaderValue(..))
        ));
    }

    #[test]
    fn set_headers_replaces_previous_list() {
        let mut policy = CustomHeaderPolicy::new()
            .try_header("X-Old", "1")
            .unwrap();
        policy.set_headers([(
            HeaderName::from_static("x-new"),
            HeaderValue::from_static("2"),
        )]);

        let names: Vec<_> = policy.headers().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["x-new"]);
    }
}
