use crate::handlers::common::{
    created_response, ensure_cart_value, no_content_response, success_response, validate_input,
    AppJson,
};
use crate::{
    errors::{ErrorResponse, ServiceError},
    services::coupons::{CouponQuote, CreateCouponInput, UpdateCouponInput, MSG_APPLIED},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Shopper-facing coupon endpoints
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/validate", post(validate_coupon))
        .route("/apply", post(apply_coupon))
}

/// Coupon management, mounted behind the admin guard
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_coupons).post(create_coupon))
        .route(
            "/:id",
            get(get_coupon).put(update_coupon).delete(delete_coupon),
        )
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1))]
    pub code: String,
    #[serde(alias = "cartValue")]
    pub cart_value: i64,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CouponValidationResponse {
    pub valid: bool,
    pub discount_value: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_cart_value: Option<i64>,
}

impl From<CouponQuote> for CouponValidationResponse {
    fn from(quote: CouponQuote) -> Self {
        Self {
            valid: true,
            discount_value: quote.discount_value,
            message: quote.message,
            minimum_cart_value: Some(quote.minimum_cart_value),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ApplyCouponRequest {
    #[validate(length(min = 1))]
    pub code: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ApplyCouponResponse {
    pub success: bool,
    pub message: String,
}

/// Check a coupon against a cart total
///
/// Business-rule rejections keep their 4xx status but use the validation
/// body shape, so callers always read `valid` and `message`.
#[utoipa::path(
    post,
    path = "/api/coupons/validate",
    summary = "Validate coupon",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon is valid for this cart", body = CouponValidationResponse),
        (status = 400, description = "Coupon rejected or malformed request", body = CouponValidationResponse),
        (status = 404, description = "Unknown coupon code", body = CouponValidationResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "Coupons"
)]
pub async fn validate_coupon(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ValidateCouponRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    let cart_value = ensure_cart_value(payload.cart_value)?;

    match state
        .services
        .coupons
        .validate(&payload.code, cart_value)
        .await
    {
        Ok(quote) => Ok(success_response(CouponValidationResponse::from(quote))),
        Err(rejection) if rejection.is_rejection() => {
            let body = CouponValidationResponse {
                valid: false,
                discount_value: 0,
                message: rejection.response_message(),
                minimum_cart_value: rejection.required_amount(),
            };
            Ok((rejection.status_code(), Json(body)).into_response())
        }
        Err(other) => Err(other),
    }
}

/// Consume one use of a coupon
#[utoipa::path(
    post,
    path = "/api/coupons/apply",
    summary = "Apply coupon",
    request_body = ApplyCouponRequest,
    responses(
        (status = 200, description = "Usage recorded", body = ApplyCouponResponse),
        (status = 400, description = "Coupon inactive, expired or exhausted", body = ErrorResponse),
        (status = 404, description = "Unknown coupon code", body = ErrorResponse),
    ),
    tag = "Coupons"
)]
pub async fn apply_coupon(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<ApplyCouponRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    state.services.coupons.apply(&payload.code).await?;

    Ok(success_response(ApplyCouponResponse {
        success: true,
        message: MSG_APPLIED.to_string(),
    }))
}

async fn list_coupons(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let coupons = state.services.coupons.list().await?;
    Ok(success_response(coupons))
}

async fn get_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let coupon = state.services.coupons.get(id).await?;
    Ok(success_response(coupon))
}

#[utoipa::path(
    post,
    path = "/api/admin/coupons",
    summary = "Create coupon",
    request_body = CreateCouponInput,
    responses(
        (status = 201, description = "Coupon created", body = crate::entities::coupon::Model),
        (status = 400, description = "Invalid coupon terms", body = ErrorResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "Duplicate code", body = ErrorResponse),
    ),
    tag = "Admin"
)]
pub async fn create_coupon(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<CreateCouponInput>,
) -> Result<Response, ServiceError> {
    let coupon = state.services.coupons.create(payload).await?;
    Ok(created_response(coupon))
}

async fn update_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateCouponInput>,
) -> Result<Response, ServiceError> {
    let coupon = state.services.coupons.update(id, payload).await?;
    Ok(success_response(coupon))
}

async fn delete_coupon(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    state.services.coupons.delete(id).await?;
    Ok(no_content_response())
}
