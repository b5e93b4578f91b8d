//! Response body that policies can replace.
//!
//! Policies never read the body produced by the handler. The only body
//! mutation they perform is replacing it wholesale, e.g. clearing it when a
//! conditional request is answered with `304 Not Modified`. [`PolicyBody`]
//! therefore either streams the original body untouched or yields the
//! replacement bytes once.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project::pin_project;

/// A body wrapper that is either the handler's body or a policy replacement.
///
/// # Variants
///
/// - [`Passthrough`](PolicyBody::Passthrough): the handler's body, streamed as is
/// - [`Replaced`](PolicyBody::Replaced): bytes set by a policy; `None` once
///   yielded or when the body was cleared
#[pin_project(project = PolicyBodyProj)]
#[derive(Debug)]
pub enum PolicyBody<B> {
    /// The body produced by the handler.
    Passthrough(#[pin] B),

    /// A body set by a policy.
    ///
    /// The `Option` is used to yield the data once, then return `None` on
    /// subsequent polls.
    Replaced(Option<Bytes>),
}

impl<B> PolicyBody<B> {
    /// An empty body.
    pub fn empty() -> Self {
        PolicyBody::Replaced(None)
    }

    /// A body holding `bytes`; empty bytes produce an empty body.
    pub fn replaced(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            PolicyBody::Replaced(None)
        } else {
            PolicyBody::Replaced(Some(bytes))
        }
    }

    /// Returns `true` when a policy replaced the handler's body.
    pub fn is_replaced(&self) -> bool {
        matches!(self, PolicyBody::Replaced(_))
    }

    /// Returns the handler's body, if it was not replaced.
    pub fn into_inner(self) -> Option<B> {
        match self {
            PolicyBody::Passthrough(body) => Some(body),
            PolicyBody::Replaced(_) => None,
        }
    }
}

impl<B> HttpBody for PolicyBody<B>
where
    B: HttpBody,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            PolicyBodyProj::Passthrough(body) => match body.poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                    Poll::Ready(Some(Ok(frame)))
                }
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
            PolicyBodyProj::Replaced(data) => match data.take() {
                Some(bytes) => Poll::Ready(Some(Ok(Frame::data(bytes)))),
                None => Poll::Ready(None),
            },
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            PolicyBody::Passthrough(body) => body.size_hint(),
            PolicyBody::Replaced(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            PolicyBody::Replaced(None) => SizeHint::with_exact(0),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            PolicyBody::Passthrough(body) => body.is_end_stream(),
            PolicyBody::Replaced(data) => data.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};

    #[tokio::test]
    async fn passthrough_streams_inner_body() {
        let body = PolicyBody::Passthrough(Full::new(Bytes::from_static(b"Hello world!")));
        assert_eq!(body.size_hint().exact(), Some(12));

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"Hello world!"));
    }

    #[tokio::test]
    async fn cleared_body_is_empty() {
        let body: PolicyBody<Full<Bytes>> = PolicyBody::replaced(Bytes::new());
        assert!(body.is_end_stream());

        let collected = body.collect().await.unwrap().to_bytes();
        assert!(collected.is_empty());
    }
}
