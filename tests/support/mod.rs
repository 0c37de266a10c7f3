#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use repositories_api::{AppState, ServerConfig, UpdateMode, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_update_mode(update_mode: UpdateMode) -> Self {
        Self::with_config(ServerConfig {
            update_mode,
            ..ServerConfig::default()
        })
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let state = Arc::new(AppState::new(Arc::new(config)));
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let body = body
            .map(|value| Body::from(value.to_string()))
            .unwrap_or_else(Body::empty);
        self.send_body(method, uri, body).await
    }

    pub async fn send_raw(&self, method: Method, uri: &str, raw: &'static str) -> TestResponse {
        self.send_body(method, uri, Body::from(raw)).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn send_body(&self, method: Method, uri: &str, body: Body) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .expect("build request");
        self.send_request(request).await
    }

    pub async fn list(&self) -> Vec<Value> {
        let response = self.send(Method::GET, "/repositories", None).await;
        assert_eq!(response.status, StatusCode::OK);
        response
            .json()
            .as_array()
            .cloned()
            .expect("list returns an array")
    }

    /// Creates a repository and returns its JSON, asserting success.
    pub async fn create(&self, title: &str, url: &str, techs: &[&str]) -> Value {
        let response = self
            .send(
                Method::POST,
                "/repositories",
                Some(json!({ "title": title, "url": url, "techs": techs })),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "create failed: {:?}", response.text());
        response.json()
    }

    pub async fn like(&self, id: &str) -> TestResponse {
        self.send(Method::POST, &format!("/repositories/{id}/like"), None)
            .await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Keys listed in a validation rejection.
    pub fn validation_keys(&self) -> Vec<String> {
        self.json()["validation"]["body"]["keys"]
            .as_array()
            .expect("validation keys")
            .iter()
            .filter_map(|key| key.as_str().map(str::to_owned))
            .collect()
    }
}

pub fn id_of(repository: &Value) -> String {
    repository["id"]
        .as_str()
        .expect("repository id is a string")
        .to_string()
}
