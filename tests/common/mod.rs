#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use storefront_api::{config::AppConfig, db, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

pub const MULTIPART_BOUNDARY: &str = "storefront-test-boundary";

/// Application router backed by a throwaway SQLite file and upload directory.
pub struct TestApp {
    router: Router,
    pub state: Arc<AppState>,
    admin_token: String,
    user_token: String,
    _workdir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_pool_size(1).await
    }

    /// Pool with several connections so concurrent requests reach SQLite in parallel.
    pub async fn with_pool_size(connections: u32) -> Self {
        let workdir = tempfile::tempdir().expect("create temp dir");
        let db_path = workdir.path().join("storefront_test.db");
        let upload_dir = workdir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("create upload dir");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "integration_test_secret_value_0123456789abcdef".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = connections;
        cfg.db_min_connections = 1;
        cfg.upload_dir = upload_dir.display().to_string();
        cfg.max_upload_bytes = 64 * 1024;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = Arc::new(AppState::new(Arc::new(pool), cfg));
        let admin_token = state
            .auth
            .issue_token("admin-1", true)
            .expect("issue admin token");
        let user_token = state
            .auth
            .issue_token("shopper-1", false)
            .expect("issue user token");

        let router = storefront_api::build_router(state.clone());

        Self {
            router,
            state,
            admin_token,
            user_token,
            _workdir: workdir,
        }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    pub fn user_token(&self) -> &str {
        &self.user_token
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn upload_dir(&self) -> &str {
        &self.state.config.upload_dir
    }

    /// Send a request with an optional JSON body and bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", tok));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Method::GET, uri, None, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> Response {
        self.request(Method::POST, uri, Some(body), None).await
    }

    pub async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        let token = self.admin_token.clone();
        self.request(method, uri, body, Some(&token)).await
    }

    /// Send a multipart form as the admin user.
    pub async fn admin_multipart(&self, method: Method, uri: &str, parts: &[Part<'_>]) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("build multipart request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                out.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                out.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                out.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                out.extend_from_slice(bytes);
            }
        }
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    out
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
