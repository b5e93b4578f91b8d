use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, Response, StatusCode, response::Parts};
use http_body::Body as HttpBody;
use polis_core::PolicyResponse;

use crate::body::PolicyBody;

/// An HTTP response exposed to policies.
///
/// Wraps the handler's response so that policies can rewrite headers and
/// status, and replace the body without knowing its concrete type.
#[derive(Debug)]
pub struct PolicedResponse<ResBody>
where
    ResBody: HttpBody,
{
    /// Status, headers and extensions.
    pub parts: Parts,
    /// The handler's body, or a policy replacement.
    pub body: PolicyBody<ResBody>,
}

impl<ResBody> PolicedResponse<ResBody>
where
    ResBody: HttpBody,
{
    /// Wraps a handler response.
    pub fn from_response(response: Response<ResBody>) -> Self {
        let (parts, body) = response.into_parts();
        PolicedResponse {
            parts,
            body: PolicyBody::Passthrough(body),
        }
    }

    /// Rebuilds the response once policies are done.
    pub fn into_response(self) -> Response<PolicyBody<ResBody>> {
        Response::from_parts(self.parts, self.body)
    }
}

impl<ResBody> PolicyResponse for PolicedResponse<ResBody>
where
    ResBody: HttpBody,
{
    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    fn status(&self) -> StatusCode {
        self.parts.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.parts.status = status;
    }

    fn set_body(&mut self, body: Bytes) {
        // the handler's length no longer describes the body
        self.parts.headers.remove(CONTENT_LENGTH);
        self.body = PolicyBody::replaced(body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use polis_core::PolicyResponseExt;

    #[tokio::test]
    async fn replacing_body_drops_content_length() {
        let response = Response::builder()
            .header(CONTENT_LENGTH, "12")
            .header("x-handler", "kept")
            .body(Full::new(Bytes::from_static(b"Hello world!")))
            .unwrap();
        let mut policed = PolicedResponse::from_response(response);

        policed.set_status(StatusCode::NOT_MODIFIED);
        policed.set_body(Bytes::new());

        let response = policed.into_response();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(response.headers().get(CONTENT_LENGTH).is_none());
        assert_eq!(response.headers()["x-handler"], "kept");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[test]
    fn header_helpers_operate_on_parts() {
        let mut policed =
            PolicedResponse::from_response(Response::new(Full::new(Bytes::from_static(b"ok"))));
        policed.set_header(http::header::VARY, http::HeaderValue::from_static("Cookie"));
        assert_eq!(policed.header(http::header::VARY), Some("Cookie"));
        assert!(!policed.body.is_replaced());
    }
}
