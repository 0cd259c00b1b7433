use crate::errors::ServiceError;
use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use validator::Validate;

/// JSON body extractor whose rejections render as `ErrorResponse`
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ServiceError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejections render as `ErrorResponse`
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ServiceError))]
pub struct AppQuery<T>(pub T);

/// Multipart form extractor; a non-multipart body is a `BadRequest`
#[derive(FromRequest)]
#[from_request(rejection(ServiceError))]
pub struct AppMultipart(pub Multipart);

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ServiceError> {
    input
        .validate()
        .map_err(|e| ServiceError::ValidationError(format!("Validation failed: {}", e)))
}

pub fn ensure_cart_value(cart_value: i64) -> Result<i64, ServiceError> {
    if cart_value < 0 {
        return Err(ServiceError::ValidationError(
            "cart_value must not be negative".into(),
        ));
    }
    Ok(cart_value)
}

/// `?cart_value=N`, also accepted as `cartValue` or `cartTotal`
#[derive(Debug, Deserialize, IntoParams)]
pub struct CartValueQuery {
    #[serde(alias = "cartValue", alias = "cartTotal")]
    pub cart_value: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_cart_values_are_rejected() {
        assert!(ensure_cart_value(-1).is_err());
        assert_eq!(ensure_cart_value(0).unwrap(), 0);
    }

    #[test]
    fn cart_value_query_accepts_aliases() {
        let q: CartValueQuery = query_from("cartTotal", 1200);
        assert_eq!(q.cart_value, 1200);
        let q: CartValueQuery = query_from("cart_value", 5);
        assert_eq!(q.cart_value, 5);
    }

    fn query_from(key: &str, value: i64) -> CartValueQuery {
        serde_json::from_value(serde_json::json!({ key: value })).unwrap()
    }
}
