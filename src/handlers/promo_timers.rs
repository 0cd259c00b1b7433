use crate::handlers::common::{created_response, no_content_response, success_response, AppJson};
use crate::{
    errors::ServiceError,
    services::promo_timers::{ActiveTimer, CreatePromoTimerInput, UpdatePromoTimerInput},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/:product_id", get(timers_for_product))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_timers).post(create_timer))
        .route("/:id", put(update_timer).delete(delete_timer))
}

/// Running countdowns for a product
#[utoipa::path(
    get,
    path = "/api/promo-timers/{product_id}",
    summary = "Active promo timers",
    params(("product_id" = Uuid, Path, description = "Product id")),
    responses((status = 200, description = "Enabled, unexpired timers", body = [ActiveTimer])),
    tag = "Promo Timers"
)]
pub async fn timers_for_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let timers = state
        .services
        .promo_timers
        .active_for_product(product_id, Utc::now())
        .await?;
    Ok(success_response(timers))
}

async fn list_timers(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let timers = state.services.promo_timers.list().await?;
    Ok(success_response(timers))
}

async fn create_timer(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreatePromoTimerInput>,
) -> Result<Response, ServiceError> {
    let timer = state.services.promo_timers.create(payload).await?;
    Ok(created_response(timer))
}

async fn update_timer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdatePromoTimerInput>,
) -> Result<Response, ServiceError> {
    let timer = state.services.promo_timers.update(id, payload).await?;
    Ok(success_response(timer))
}

async fn delete_timer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.promo_timers.delete(id).await?;
    Ok(no_content_response())
}
