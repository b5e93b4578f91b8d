//! Axum Integration Example
//!
//! Serves a small CMS whose response policies are declared in YAML.
//!
//! Features shown:
//! - Policies and controllers loaded from configuration
//! - Inheritance with an override cancelling a parent policy
//! - A hand-written controller with an editor-controlled max-age
//! - Last-Modified derived from the records a handler reads
//! - Ignored preview domains
//!
//! Run:
//!   cargo run -p polis-demos --example axum
//!
//! Try it:
//!   curl -v http://localhost:3000/                       # HomePage, no X-Frame-Options
//!   curl -v http://localhost:3000/articles/1             # max-age from the article, Last-Modified
//!   curl -v -H 'If-None-Match: <etag>' http://localhost:3000/articles/1   # 304
//!   curl -v -H 'Host: preview-1.example.com' http://localhost:3000/      # untouched
//!   curl -v http://localhost:3000/health                 # no policies

use std::convert::Infallible;

use axum::{
    Router,
    error_handling::HandleErrorLayer,
    extract::{Path, Request},
    routing::get,
};
use chrono::{DateTime, TimeZone, Utc};
use http::StatusCode;
use polis::{Controller, PolicyApplicator};
use polis_configuration::Config;
use polis_core::{CacheAgeProvider, Originator};
use polis_http::{PageMaxAge, PolicyContextExt};
use polis_tower::{ControllerLayer, PolicyLayer, ServiceError};
use tower::ServiceBuilder;

const CONFIG: &str = r#"
environment: Live
ignore_domains:
  - "/^preview-[0-9]+\\./i"
policies:
  general:
    type: Caching
    cache_age: 15m
    vary: "Cookie, X-Forwarded-Protocol, Accept-Language"
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

// Mock Data

struct Article {
    title: &'static str,
    max_age_minutes: &'static str,
    updated_at: i64,
}

fn find_article(id: u32) -> Option<Article> {
    match id {
        1 => Some(Article {
            title: "Welcome",
            max_age_minutes: "27",
            updated_at: 1_700_000_000,
        }),
        2 => Some(Article {
            title: "Changelog",
            max_age_minutes: "",
            updated_at: 1_700_003_600,
        }),
        _ => None,
    }
}

// Controllers

/// Article pages reuse the `Page` declarations and let editors shorten the
/// max-age.
struct ArticleController {
    applicators: Vec<PolicyApplicator>,
    max_age: PageMaxAge,
}

impl Originator for ArticleController {
    fn label(&self) -> &str {
        "ArticleController"
    }

    fn as_cache_age_provider(&self) -> Option<&dyn CacheAgeProvider> {
        Some(&self.max_age)
    }
}

impl Controller for ArticleController {
    fn applicators(&self) -> &[PolicyApplicator] {
        &self.applicators
    }
}

// Handlers

async fn home() -> &'static str {
    "Home"
}

async fn article(Path(id): Path<u32>, request: Request) -> Result<String, StatusCode> {
    let article = find_article(id).ok_or(StatusCode::NOT_FOUND)?;
    let updated_at: Option<DateTime<Utc>> = Utc.timestamp_opt(article.updated_at, 0).single();
    if let Some(updated_at) = updated_at {
        request.touch(updated_at);
    }
    tracing::info!(id, max_age = article.max_age_minutes, "serving article");
    Ok(article.title.to_owned())
}

async fn health() -> &'static str {
    "OK"
}

async fn handle_policy_error(err: ServiceError<Infallible>) -> (StatusCode, String) {
    tracing::error!(error = %err, "policy stage failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_owned())
}

// Main

#[tokio::main]
async fn main() {
    let subscriber = tracing_subscriber::fmt()
        .pretty()
        .with_env_filter("debug,polis=trace")
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let catalog = Config::from_yaml(CONFIG)
        .and_then(Config::into_catalog)
        .expect("Invalid policy configuration");

    let home_controller = catalog
        .controller("HomePage")
        .expect("HomePage is declared");
    let article_controller = ArticleController {
        applicators: catalog
            .applicators("Page")
            .expect("Page is declared")
            .to_vec(),
        // every article shares the controller in this demo
        max_age: PageMaxAge::new(find_article(1).map_or("", |article| article.max_age_minutes)),
    };

    let policies = PolicyLayer::builder()
        .domain_filter(catalog.domain_filter().clone())
        .environment(catalog.environment())
        .build();

    let app = Router::new()
        .route("/", get(home).layer(ControllerLayer::new(home_controller)))
        .route(
            "/articles/{id}",
            get(article).layer(ControllerLayer::new(article_controller)),
        )
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_policy_error))
                .layer(policies),
        );

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .expect("Failed to bind to port 3000");
    tracing::info!(
        "Listening on http://{}",
        listener.local_addr().expect("bound listener has an address")
    );
    axum::serve(listener, app).await.expect("Server error");
}
