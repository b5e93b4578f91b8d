use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use http::header::{
    CACHE_CONTROL, ETAG, EXPIRES, HOST, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, PRAGMA,
    VARY,
};
use http::{Request, StatusCode, response::Parts};
use http_body_util::BodyExt;
use polis::{Dispatcher, init_controller};
use polis_core::{DetachedResponse, Environment, PolicyRequest};
use polis_http::headers::http_date;
use polis_test::app::{app, router};
use polis_test::controllers::{
    CachingPolicyController, CallbackCachingPolicyController, OWNER_HEADER, TRACE_HEADER,
};
use polis_tower::PolicyLayer;
use pretty_assertions::assert_eq;
use tower::ServiceExt;

fn get(uri: &str) -> http::request::Builder {
    Request::builder().uri(uri).header(HOST, "www.example.com")
}

async fn send_to(app: Router, request: Request<Body>) -> (Parts, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let body = body.collect().await.unwrap().to_bytes();
    (parts, body)
}

async fn send(request: Request<Body>) -> (Parts, Bytes) {
    send_to(app(), request).await
}

#[tokio::test]
async fn controller_without_policies_leaves_headers_untouched() {
    for uri in ["/unrelated", "/plain"] {
        let (parts, body) = send(get(uri).body(Body::empty()).unwrap()).await;

        assert_eq!(parts.status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"Hello world!"));
        for header in [CACHE_CONTROL, VARY, ETAG, LAST_MODIFIED, EXPIRES, PRAGMA] {
            assert!(
                !parts.headers.contains_key(&header),
                "{uri} unexpectedly carries {header}"
            );
        }
    }
}

#[tokio::test]
async fn descendant_policy_declared_first_wins() {
    let (parts, _) = send(get("/ordering").body(Body::empty()).unwrap()).await;

    assert_eq!(parts.headers[TRACE_HEADER], "c, b, a");
    assert_eq!(parts.headers[OWNER_HEADER], "a");
}

#[tokio::test]
async fn caching_policy_sets_configured_headers() {
    let (parts, body) = send(get("/caching").body(Body::empty()).unwrap()).await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body, Bytes::from_static(b"Hello world!"));
    assert_eq!(
        parts.headers[CACHE_CONTROL],
        "max-age=999, must-revalidate, no-transform"
    );
    assert_eq!(parts.headers[VARY], "X-EyeColour");
    assert_eq!(parts.headers[PRAGMA], "");
    assert!(parts.headers.contains_key(ETAG));
    assert!(parts.headers.contains_key(EXPIRES));
    assert!(
        !parts.headers.contains_key(LAST_MODIFIED),
        "nothing was touched"
    );
}

#[tokio::test]
async fn originator_overrides_caching_inputs() {
    let (parts, _) = send(get("/callback").body(Body::empty()).unwrap()).await;

    assert_eq!(
        parts.headers[CACHE_CONTROL],
        "max-age=1001, must-revalidate, no-transform"
    );
    assert_eq!(parts.headers[VARY], "X-HeightWeight");
    assert_eq!(
        parts.headers[LAST_MODIFIED].to_str().unwrap(),
        http_date(CallbackCachingPolicyController::modified())
    );
    assert_eq!(parts.headers[LAST_MODIFIED], "Thu, 01 Jan 1970 01:23:20 GMT");
}

#[tokio::test]
async fn matching_entity_tag_yields_not_modified() {
    let (first, _) = send(get("/caching").body(Body::empty()).unwrap()).await;
    let etag = first.headers[ETAG].clone();

    let (parts, body) = send(
        get("/caching")
            .header(IF_NONE_MATCH, etag.clone())
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(parts.status, StatusCode::NOT_MODIFIED);
    assert!(body.is_empty());
    assert_eq!(parts.headers[ETAG], etag);
}

#[tokio::test]
async fn stale_entity_tag_keeps_response() {
    let (parts, body) = send(
        get("/caching")
            .header(IF_NONE_MATCH, "\"stale\"")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(parts.status, StatusCode::OK);
    assert_eq!(body, Bytes::from_static(b"Hello world!"));
}

#[tokio::test]
async fn last_modified_reflects_latest_touch() {
    let (parts, body) = send(get("/article").body(Body::empty()).unwrap()).await;

    assert_eq!(body, Bytes::from_static(b"Article"));
    assert_eq!(parts.headers[LAST_MODIFIED], "Thu, 01 Jan 1970 00:03:00 GMT");
}

#[tokio::test]
async fn if_modified_since_yields_not_modified() {
    let (parts, body) = send(
        get("/article")
            .header(IF_MODIFIED_SINCE, "Thu, 01 Jan 1970 00:03:00 GMT")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(parts.status, StatusCode::NOT_MODIFIED);
    assert!(body.is_empty());

    let (parts, _) = send(
        get("/article")
            .header(IF_MODIFIED_SINCE, "Thu, 01 Jan 1970 00:02:00 GMT")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(parts.status, StatusCode::OK);
}

#[tokio::test]
async fn page_max_age_overrides_configured_age() {
    let (parts, _) = send(get("/page").body(Body::empty()).unwrap()).await;
    assert_eq!(
        parts.headers[CACHE_CONTROL],
        "max-age=1620, must-revalidate, no-transform"
    );

    let (parts, _) = send(get("/page/default").body(Body::empty()).unwrap()).await;
    assert_eq!(
        parts.headers[CACHE_CONTROL],
        "max-age=999, must-revalidate, no-transform"
    );
}

#[tokio::test]
async fn failing_policy_becomes_server_error() {
    let (parts, body) = send(get("/failing").body(Body::empty()).unwrap()).await;

    assert_eq!(parts.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, Bytes::from_static(b"policy `FailingPolicy` failed"));
    assert!(!parts.headers.contains_key(VARY));
}

#[tokio::test]
async fn ignored_domain_skips_policies() {
    let layer = PolicyLayer::builder()
        .ignore_domains(["*.internal.example.com"])
        .unwrap()
        .build();

    let request = Request::builder()
        .uri("/caching")
        .header(HOST, "cms.internal.example.com:8080")
        .body(Body::empty())
        .unwrap();
    let (parts, _) = send_to(router(layer.clone()), request).await;
    assert!(!parts.headers.contains_key(CACHE_CONTROL));

    let (parts, _) = send_to(router(layer), get("/caching").body(Body::empty()).unwrap()).await;
    assert!(parts.headers.contains_key(CACHE_CONTROL));
}

#[tokio::test]
async fn dev_environment_disables_cache_age() {
    let layer = PolicyLayer::builder()
        .environment(Environment::Dev)
        .build();

    let (parts, _) = send_to(router(layer), get("/caching").body(Body::empty()).unwrap()).await;

    assert_eq!(
        parts.headers[CACHE_CONTROL],
        "no-cache, max-age=0, must-revalidate, no-transform"
    );
    assert!(!parts.headers.contains_key(PRAGMA));
}

#[test]
fn applying_twice_yields_identical_headers() {
    let now = Utc.timestamp_opt(1_000_000, 0).unwrap();
    let controller = Arc::new(CallbackCachingPolicyController::default());
    let request = || {
        PolicyRequest::from_request(
            Request::get("http://www.example.com/")
                .header("x-heightweight", "tall")
                .body(())
                .unwrap(),
        )
        .with_now(now)
    };

    let once = Dispatcher::new();
    init_controller(&controller, &once).unwrap();
    let mut expected = DetachedResponse::new();
    once.apply_all(&request(), &mut expected).unwrap();

    let twice = Dispatcher::new();
    init_controller(&controller, &twice).unwrap();
    init_controller(&controller, &twice).unwrap();
    let mut actual = DetachedResponse::new();
    twice.apply_all(&request(), &mut actual).unwrap();

    assert!(twice.is_applied());
    assert_eq!(actual.headers, expected.headers);
    assert_eq!(actual.headers.get_all(VARY).iter().count(), 1);
    assert_eq!(actual.headers.get_all(CACHE_CONTROL).iter().count(), 1);
}

#[test]
fn plain_caching_controller_registers_one_policy() {
    let dispatcher = Dispatcher::new();
    init_controller(&Arc::new(CachingPolicyController::default()), &dispatcher).unwrap();
    assert_eq!(dispatcher.len(), 1);
}
