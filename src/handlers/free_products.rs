use crate::handlers::common::{
    created_response, ensure_cart_value, no_content_response, success_response, AppJson,
    AppQuery, CartValueQuery,
};
use crate::{
    errors::{ErrorResponse, ServiceError},
    services::free_products::{CreateFreeProductInput, UpdateFreeProductInput},
    AppState,
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_free_products))
        .route("/eligibility", get(check_eligibility))
        .route("/eligible", get(eligible_products))
}

pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_all_free_products).post(create_free_product))
        .route("/:id", put(update_free_product).delete(delete_free_product))
}

#[derive(Debug, Deserialize)]
pub struct EligibilityQuery {
    #[serde(alias = "productId")]
    pub product_id: Uuid,
    #[serde(alias = "cartValue", alias = "cartTotal")]
    pub cart_value: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EligibilityResponse {
    pub product_id: Uuid,
    pub cart_value: i64,
    pub eligible: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EligibleProductsResponse {
    pub cart_value: i64,
    pub product_ids: Vec<Uuid>,
}

/// Enabled free-product bands
#[utoipa::path(
    get,
    path = "/api/free-products",
    summary = "List free product bands",
    responses((status = 200, description = "Enabled bands", body = [crate::entities::free_product::Model])),
    tag = "Free Products"
)]
pub async fn list_free_products(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let bands = state.services.free_products.list_enabled().await?;
    Ok(success_response(bands))
}

/// Whether a product is free at a given cart total
#[utoipa::path(
    get,
    path = "/api/free-products/eligibility",
    summary = "Free product eligibility",
    params(
        ("product_id" = Uuid, Query, description = "Product to check"),
        ("cart_value" = i64, Query, description = "Cart total in minor units"),
    ),
    responses(
        (status = 200, description = "Eligibility result", body = EligibilityResponse),
        (status = 400, description = "Invalid query", body = ErrorResponse),
    ),
    tag = "Free Products"
)]
pub async fn check_eligibility(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<EligibilityQuery>,
) -> Result<Response, ServiceError> {
    let cart_value = ensure_cart_value(query.cart_value)?;
    let eligible = state
        .services
        .free_products
        .is_eligible(query.product_id, cart_value)
        .await?;

    Ok(success_response(EligibilityResponse {
        product_id: query.product_id,
        cart_value,
        eligible,
    }))
}

async fn eligible_products(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<CartValueQuery>,
) -> Result<Response, ServiceError> {
    let cart_value = ensure_cart_value(query.cart_value)?;
    let product_ids = state
        .services
        .free_products
        .eligible_products(cart_value)
        .await?;
    Ok(success_response(EligibleProductsResponse {
        cart_value,
        product_ids,
    }))
}

async fn list_all_free_products(
    State(state): State<Arc<AppState>>,
) -> Result<Response, ServiceError> {
    let bands = state.services.free_products.list_all().await?;
    Ok(success_response(bands))
}

async fn create_free_product(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateFreeProductInput>,
) -> Result<Response, ServiceError> {
    let band = state.services.free_products.create(payload).await?;
    Ok(created_response(band))
}

async fn update_free_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateFreeProductInput>,
) -> Result<Response, ServiceError> {
    let band = state.services.free_products.update(id, payload).await?;
    Ok(success_response(band))
}

async fn delete_free_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.free_products.delete(id).await?;
    Ok(no_content_response())
}
