//! Storefront Promotions API Library
//!
//! Coupon validation, gift card ledger, free-gift popup offers, free-product
//! bands, promotional banners and countdown timers for an e-commerce storefront.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::auth::{AuthConfig, AuthRouterExt, AuthService};

// App state definition
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config)));
        let services = handlers::AppServices::new(db.clone(), &config);
        Self {
            db,
            config,
            auth,
            services,
        }
    }
}

// Common response wrapper for operational endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Public and admin routes under `/api`.
pub fn api_routes(state: &AppState) -> Router<Arc<AppState>> {
    let public = Router::new()
        .nest("/coupons", handlers::coupons::public_routes())
        .nest("/giftcards", handlers::gift_cards::public_routes())
        .nest("/gift-popup", handlers::gift_popup::public_routes())
        .nest("/free-products", handlers::free_products::public_routes())
        .nest("/promomessages", handlers::promo_messages::public_routes())
        .nest("/promo-timers", handlers::promo_timers::public_routes());

    let admin = Router::new()
        .nest("/coupons", handlers::coupons::admin_routes())
        .nest(
            "/giftcards",
            handlers::gift_cards::admin_routes(state.config.max_upload_bytes),
        )
        .nest("/gift-popup", handlers::gift_popup::admin_routes())
        .nest("/free-products", handlers::free_products::admin_routes())
        .nest("/promomessages", handlers::promo_messages::admin_routes())
        .nest("/promo-timers", handlers::promo_timers::admin_routes())
        .with_admin(state.auth.clone());

    Router::new()
        .route("/status", get(api_status))
        .merge(public)
        .nest("/admin", admin)
}

/// The complete application router, minus transport-level layers (CORS,
/// compression, timeouts) which the binary adds.
pub fn build_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes(&state))
        .nest_service(services::uploads::PUBLIC_PREFIX, uploads)
        .merge(openapi::swagger_ui())
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "storefront-api",
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(status_data))
}

async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (axum::http::StatusCode, Json<ApiResponse<Value>>) {
    let healthy = db::check_connection(&state.db).await.is_ok();

    let health_data = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "checks": {
            "database": if healthy { "healthy" } else { "unhealthy" },
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    let status = if healthy {
        axum::http::StatusCode::OK
    } else {
        axum::http::StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ApiResponse::success(health_data)))
}
