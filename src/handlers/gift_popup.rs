use crate::handlers::common::{
    ensure_cart_value, success_response, AppJson, AppQuery, CartValueQuery,
};
use crate::{
    errors::{ErrorResponse, ServiceError},
    services::gift_popup::{GiftOffer, UpdateGiftPopupInput},
    AppState,
};
use axum::{
    extract::State,
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_active_popup))
        .route("/offer", get(get_offer))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(get_popup_config).put(update_popup_config))
}

/// Current popup configuration, when switched on
#[utoipa::path(
    get,
    path = "/api/gift-popup",
    summary = "Active gift popup",
    responses(
        (status = 200, description = "Active configuration", body = crate::entities::gift_popup_config::Model),
        (status = 404, description = "Popup is switched off", body = ErrorResponse),
    ),
    tag = "Gift Popup"
)]
pub async fn get_active_popup(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let config = state.services.gift_popup.active_config().await?;
    Ok(success_response(config))
}

/// Gifts offerable for a cart total
#[utoipa::path(
    get,
    path = "/api/gift-popup/offer",
    summary = "Gift offer for cart",
    params(("cart_value" = i64, Query, description = "Cart total in minor units")),
    responses(
        (status = 200, description = "Offer evaluation", body = GiftOffer),
        (status = 400, description = "Invalid cart value", body = ErrorResponse),
    ),
    tag = "Gift Popup"
)]
pub async fn get_offer(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<CartValueQuery>,
) -> Result<Response, ServiceError> {
    let cart_value = ensure_cart_value(query.cart_value)?;
    let offer = state.services.gift_popup.offer(cart_value).await?;
    Ok(success_response(offer))
}

async fn get_popup_config(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let config = state.services.gift_popup.config().await?;
    Ok(success_response(config))
}

async fn update_popup_config(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<UpdateGiftPopupInput>,
) -> Result<Response, ServiceError> {
    let config = state.services.gift_popup.update(payload).await?;
    Ok(success_response(config))
}
