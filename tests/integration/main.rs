//! Router-level tests on the in-memory store

mod catalog;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use catalog_server::{
    api,
    config::AppConfig,
    repository::{memory::MemoryStore, Repository},
    services::Services,
    AppState,
};

pub struct TestApp {
    pub router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig::default();
        let repository = Repository::new(Arc::new(MemoryStore::new()));
        let services = Services::new(repository, &config.catalog);
        let state = AppState {
            services: Arc::new(services),
        };
        Self {
            router: api::router(state),
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }

    pub async fn post_form(&self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(
                serde_urlencoded::to_string(fields).expect("encodable form"),
            ))
            .expect("valid request");
        self.send(request).await
    }

    /// Create through the form endpoint and return the new record's id
    pub async fn create(&self, kind: &str, fields: &[(&str, &str)]) -> String {
        let response = self
            .post_form(&format!("/catalog/{}/create", kind), fields)
            .await;
        assert_eq!(response.status, StatusCode::SEE_OTHER, "{:?}", response.body);
        let location = response.location.expect("redirect location");
        let prefix = format!("/catalog/{}/", kind);
        location
            .strip_prefix(&prefix)
            .expect("detail location")
            .to_string()
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            location,
            body,
        }
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");

    let ready = app.get("/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
    assert_eq!(ready.body["status"], "ready");
}

#[tokio::test]
async fn test_root_redirects_to_catalog() {
    let app = TestApp::new();
    let response = app.get("/").await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/catalog"));
}
