use crate::handlers::common::{
    created_response, success_response, validate_input, AppJson, AppMultipart,
};
use crate::{
    errors::{ErrorResponse, ServiceError},
    services::gift_cards::{CreateGiftCardInput, GiftCardBalance, Redemption, UpdateGiftCardInput},
    AppState,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const IMAGE_FOLDER: &str = "giftcards";
// Room for the non-file form fields and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/redeem", post(redeem_gift_card))
        .route("/:code/balance", get(gift_card_balance))
}

/// Admin routes accept multipart bodies up to `max_upload_bytes` plus form overhead.
pub fn admin_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_gift_cards).post(create_gift_card))
        .route(
            "/:id",
            get(get_gift_card)
                .put(update_gift_card)
                .delete(retire_gift_card),
        )
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES),
        ))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RedeemGiftCardRequest {
    #[validate(length(min = 1))]
    pub code: String,
    pub amount: i64,
}

/// Debit a gift card
#[utoipa::path(
    post,
    path = "/api/giftcards/redeem",
    summary = "Redeem gift card",
    request_body = RedeemGiftCardRequest,
    responses(
        (status = 200, description = "Balance debited", body = Redemption),
        (status = 400, description = "Inactive, expired, insufficient balance or bad amount", body = ErrorResponse),
        (status = 404, description = "Unknown gift card code", body = ErrorResponse),
    ),
    tag = "Gift Cards"
)]
pub async fn redeem_gift_card(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<RedeemGiftCardRequest>,
) -> Result<Response, ServiceError> {
    validate_input(&payload)?;
    let redemption = state
        .services
        .gift_cards
        .redeem(&payload.code, payload.amount)
        .await?;
    Ok(success_response(redemption))
}

/// Look up a gift card's remaining balance
#[utoipa::path(
    get,
    path = "/api/giftcards/{code}/balance",
    summary = "Gift card balance",
    params(("code" = String, Path, description = "Gift card code")),
    responses(
        (status = 200, description = "Current balance", body = GiftCardBalance),
        (status = 404, description = "Unknown gift card code", body = ErrorResponse),
    ),
    tag = "Gift Cards"
)]
pub async fn gift_card_balance(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Response, ServiceError> {
    let balance = state.services.gift_cards.balance(&code).await?;
    Ok(success_response(balance))
}

async fn list_gift_cards(State(state): State<Arc<AppState>>) -> Result<Response, ServiceError> {
    let cards = state.services.gift_cards.list().await?;
    Ok(success_response(cards))
}

async fn get_gift_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let card = state.services.gift_cards.get(id).await?;
    Ok(success_response(card))
}

/// Fields of the admin gift card form; every one is optional at parse time.
#[derive(Debug, Default)]
struct GiftCardForm {
    code: Option<String>,
    title: Option<String>,
    initial_amount: Option<i64>,
    expiry_date: Option<DateTime<Utc>>,
    is_active: Option<bool>,
    image: Option<(String, Vec<u8>)>,
}

fn bad_field(field: &str, value: &str) -> ServiceError {
    ServiceError::BadRequest(format!("Invalid value for '{}': {}", field, value))
}

/// RFC 3339 timestamps, or a bare date meaning the end of that day (UTC).
pub fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

async fn read_form(mut multipart: Multipart) -> Result<GiftCardForm, ServiceError> {
    let mut form = GiftCardForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServiceError::BadRequest(format!("Could not read image: {}", e)))?;
            if !bytes.is_empty() {
                form.image = Some((file_name, bytes.to_vec()));
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ServiceError::BadRequest(format!("Could not read '{}': {}", name, e)))?;

        match name.as_str() {
            "code" => form.code = Some(value).filter(|v| !v.trim().is_empty()),
            "title" => form.title = Some(value),
            "initial_amount" | "initialAmount" | "amount" => {
                form.initial_amount =
                    Some(value.trim().parse().map_err(|_| bad_field(&name, &value))?)
            }
            "expiry_date" | "expiryDate" => {
                form.expiry_date = Some(parse_expiry(&value).ok_or_else(|| bad_field(&name, &value))?)
            }
            "is_active" | "isActive" => {
                form.is_active = Some(parse_bool(&value).ok_or_else(|| bad_field(&name, &value))?)
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn store_image(
    state: &AppState,
    image: Option<(String, Vec<u8>)>,
) -> Result<Option<String>, ServiceError> {
    match image {
        Some((file_name, bytes)) => state
            .services
            .uploads
            .save_image(IMAGE_FOLDER, &file_name, &bytes)
            .await
            .map(Some),
        None => Ok(None),
    }
}

async fn create_gift_card(
    State(state): State<Arc<AppState>>,
    AppMultipart(multipart): AppMultipart,
) -> Result<Response, ServiceError> {
    let form = read_form(multipart).await?;
    let title = form
        .title
        .ok_or_else(|| ServiceError::ValidationError("title is required".into()))?;
    let initial_amount = form
        .initial_amount
        .ok_or_else(|| ServiceError::ValidationError("initial_amount is required".into()))?;
    let expiry_date = form
        .expiry_date
        .ok_or_else(|| ServiceError::ValidationError("expiry_date is required".into()))?;

    let image_url = store_image(&state, form.image).await?;
    let input = CreateGiftCardInput {
        code: form.code,
        title,
        initial_amount,
        expiry_date,
        is_active: form.is_active.unwrap_or(true),
        image_url: image_url.clone(),
    };

    match state.services.gift_cards.create(input).await {
        Ok(card) => Ok(created_response(card)),
        Err(err) => {
            if let Some(url) = image_url {
                state.services.uploads.remove(&url).await;
            }
            Err(err)
        }
    }
}

async fn update_gift_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    AppMultipart(multipart): AppMultipart,
) -> Result<Response, ServiceError> {
    let form = read_form(multipart).await?;
    if form.code.is_some() || form.initial_amount.is_some() {
        warn!(gift_card_id = %id, "ignoring immutable gift card fields in update");
    }

    let image_url = store_image(&state, form.image).await?;
    let input = UpdateGiftCardInput {
        title: form.title,
        expiry_date: form.expiry_date,
        is_active: form.is_active,
        image_url: image_url.clone(),
    };

    match state.services.gift_cards.update(id, input).await {
        Ok((card, replaced)) => {
            if let Some(old) = replaced {
                state.services.uploads.remove(&old).await;
            }
            Ok(success_response(card))
        }
        Err(err) => {
            if let Some(url) = image_url {
                state.services.uploads.remove(&url).await;
            }
            Err(err)
        }
    }
}

async fn retire_gift_card(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, ServiceError> {
    let card = state.services.gift_cards.retire(id).await?;
    Ok(success_response(card))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn expiry_accepts_timestamps_and_dates() {
        let ts = parse_expiry("2030-01-02T03:04:05Z").unwrap();
        assert_eq!((ts.year(), ts.hour()), (2030, 3));

        let day = parse_expiry("2030-06-30").unwrap();
        assert_eq!((day.month(), day.day(), day.hour(), day.second()), (6, 30, 23, 59));

        assert!(parse_expiry("next tuesday").is_none());
    }

    #[test]
    fn form_booleans() {
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
