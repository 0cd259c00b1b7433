use crate::handlers::common::{
    created_response, ensure_cart_value, no_content_response, success_response, AppJson,
    AppQuery,
};
use crate::{
    errors::{ErrorResponse, ServiceError},
    services::promo_messages::{CreatePromoMessageInput, UpdatePromoMessageInput},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_messages))
        .route("/best", get(best_message))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_all_messages).post(create_message))
        .route("/:id", put(update_message).delete(delete_message))
}

#[derive(Debug, Deserialize)]
pub struct CartTotalQuery {
    #[serde(rename = "cartTotal", alias = "cart_total", alias = "cart_value")]
    pub cart_total: Option<i64>,
}

/// Messages whose band covers the cart total, most specific first
#[utoipa::path(
    get,
    path = "/api/promomessages",
    summary = "Matching promo messages",
    params(("cartTotal" = Option<i64>, Query, description = "Cart total; all messages when omitted")),
    responses(
        (status = 200, description = "Matching messages", body = [crate::entities::promo_message::Model]),
        (status = 400, description = "Invalid cart total", body = ErrorResponse),
    ),
    tag = "Promo Messages"
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<CartTotalQuery>,
) -> Result<Response, ServiceError> {
    let cart_total = query.cart_total.map(ensure_cart_value).transpose()?;
    let messages = state.services.promo_messages.list(cart_total).await?;
    Ok(success_response(messages))
}

/// The single best banner for a cart total, or `null`
#[utoipa::path(
    get,
    path = "/api/promomessages/best",
    summary = "Best promo message",
    params(("cartTotal" = i64, Query, description = "Cart total in minor units")),
    responses(
        (status = 200, description = "Most specific message or null", body = Option<crate::entities::promo_message::Model>),
        (status = 400, description = "Missing or invalid cart total", body = ErrorResponse),
    ),
    tag = "Promo Messages"
)]
pub async fn best_message(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<CartTotalQuery>,
) -> Result<Response, ServiceError> {
    let cart_total = query
        .cart_total
        .ok_or_else(|| ServiceError::BadRequest("cartTotal is required".into()))
        .and_then(ensure_cart_value)?;
    let message = state.services.promo_messages.best(cart_total).await?;
    Ok(success_response(message))
}

async fn list_all_messages(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let messages = state.services.promo_messages.list(None).await?;
    Ok(success_response(messages))
}

async fn create_message(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreatePromoMessageInput>,
) -> Result<Response, ServiceError> {
    let message = state.services.promo_messages.create(payload).await?;
    Ok(created_response(message))
}

async fn update_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdatePromoMessageInput>,
) -> Result<Response, ServiceError> {
    let message = state.services.promo_messages.update(id, payload).await?;
    Ok(success_response(message))
}

async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.promo_messages.delete(id).await?;
    Ok(no_content_response())
}
