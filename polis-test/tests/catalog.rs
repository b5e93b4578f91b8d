use std::convert::Infallible;

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::routing::get;
use http::header::{CACHE_CONTROL, HOST, VARY};
use http::{Request, StatusCode};
use polis_configuration::{Catalog, Config};
use polis_tower::{ControllerLayer, PolicyLayer, ServiceError};
use pretty_assertions::assert_eq;
use tower::{ServiceBuilder, ServiceExt};

const SITE: &str = r#"
ignore_domains:
  - "*.staging.example.com"
policies:
  general:
    type: Caching
    cache_age: 15m
    vary: "Cookie, Accept-Language"
  headers:
    type: CustomHeader
    headers:
      X-Frame-Options: DENY
  off:
    type: Noop
controllers:
  Page:
    policies: [general, headers]
  HomePage:
    extends: Page
    overrides: { headers: off }
"#;

async fn policy_error(err: ServiceError<Infallible>) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn site(catalog: &Catalog) -> Router {
    let layer = PolicyLayer::builder()
        .domain_filter(catalog.domain_filter().clone())
        .environment(catalog.environment())
        .build();
    let controller = |name: &str| {
        ControllerLayer::new(catalog.controller(name).expect("declared controller"))
    };

    Router::new()
        .route("/", get(|| async { "Home" }).layer(controller("HomePage")))
        .route("/about", get(|| async { "About" }).layer(controller("Page")))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(policy_error))
                .layer(layer),
        )
}

async fn send(host: &str, uri: &str) -> http::response::Parts {
    let catalog = Config::from_yaml(SITE)
        .and_then(Config::into_catalog)
        .expect("valid configuration");
    let request = Request::get(uri)
        .header(HOST, host)
        .body(Body::empty())
        .unwrap();
    let response = site(&catalog).oneshot(request).await.unwrap();
    response.into_parts().0
}

#[tokio::test]
async fn configured_controller_applies_declared_policies() {
    let parts = send("www.example.com", "/about").await;

    assert_eq!(
        parts.headers[CACHE_CONTROL],
        "max-age=900, must-revalidate, no-transform"
    );
    assert_eq!(parts.headers[VARY], "Cookie, Accept-Language");
    assert_eq!(parts.headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn configured_override_cancels_inherited_policy() {
    let parts = send("www.example.com", "/").await;

    assert_eq!(
        parts.headers[CACHE_CONTROL],
        "max-age=900, must-revalidate, no-transform"
    );
    assert!(!parts.headers.contains_key("x-frame-options"));
}

#[tokio::test]
async fn configured_ignore_domains_reach_the_layer() {
    let parts = send("cms.staging.example.com", "/about").await;

    assert_eq!(parts.status, StatusCode::OK);
    assert!(!parts.headers.contains_key(CACHE_CONTROL));
    assert!(!parts.headers.contains_key("x-frame-options"));
}
