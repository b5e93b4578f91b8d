//! Axum application wiring the fixture controllers behind [`PolicyLayer`].
//!
//! | Route | Controller |
//! |-------|------------|
//! | `/caching` | [`CachingPolicyController`] |
//! | `/callback` | [`CallbackCachingPolicyController`] |
//! | `/unrelated` | [`UnrelatedController`] |
//! | `/ordering` | [`DescendantController`] |
//! | `/article` | [`CachingPolicyController`], touching 120s, 60s, 180s |
//! | `/page` | [`PageController`] with a 27 minute max-age |
//! | `/page/default` | [`PageController`] with an empty max-age |
//! | `/failing` | [`FailingController`] |
//! | `/plain` | none |

use std::convert::Infallible;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::routing::get;
use http::StatusCode;
use polis_http::PageMaxAge;
use polis_tower::{ControllerLayer, PolicyLayer, ServiceError};
use tower::ServiceBuilder;
use tracing::warn;

use crate::controllers::{
    CachingPolicyController, CallbackCachingPolicyController, DescendantController,
    FailingController, PageController, UnrelatedController,
};
use crate::handlers::{article, hello};

async fn handle_policy_error(err: ServiceError<Infallible>) -> (StatusCode, String) {
    warn!(error = %err, "policy stage failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// The fixture application with a default [`PolicyLayer`].
pub fn app() -> Router {
    router(PolicyLayer::new())
}

/// The fixture application behind `layer`.
pub fn router(layer: PolicyLayer) -> Router {
    Router::new()
        .route(
            "/caching",
            get(hello).layer(ControllerLayer::new(CachingPolicyController::default())),
        )
        .route(
            "/callback",
            get(hello).layer(ControllerLayer::new(
                CallbackCachingPolicyController::default(),
            )),
        )
        .route(
            "/unrelated",
            get(hello).layer(ControllerLayer::new(UnrelatedController)),
        )
        .route(
            "/ordering",
            get(hello).layer(ControllerLayer::new(DescendantController::default())),
        )
        .route(
            "/article",
            get(article).layer(ControllerLayer::new(CachingPolicyController::default())),
        )
        .route(
            "/page",
            get(hello).layer(ControllerLayer::new(PageController::new(PageMaxAge::new(
                "27",
            )))),
        )
        .route(
            "/page/default",
            get(hello).layer(ControllerLayer::new(PageController::new(
                PageMaxAge::default(),
            ))),
        )
        .route(
            "/failing",
            get(hello).layer(ControllerLayer::new(FailingController::default())),
        )
        .route("/plain", get(hello))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_policy_error))
                .layer(layer),
        )
}
