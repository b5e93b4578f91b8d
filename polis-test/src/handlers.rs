use axum::extract::Request;
use chrono::{TimeZone, Utc};
use polis_http::PolicyContextExt;

/// Seconds since the epoch at which the records read by [`article`] were
/// last modified, in read order.
pub(crate) const ARTICLE_TOUCHES: [i64; 3] = [120, 60, 180];

#[axum::debug_handler]
pub(crate) async fn hello() -> &'static str {
    "Hello world!"
}

/// Reads three records and reports their modification times.
#[axum::debug_handler]
pub(crate) async fn article(request: Request) -> &'static str {
    for seconds in ARTICLE_TOUCHES {
        if let Some(timestamp) = Utc.timestamp_opt(seconds, 0).single() {
            request.touch(timestamp);
        }
    }
    "Article"
}
