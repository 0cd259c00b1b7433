use crate::{
    entities::coupon::{self, DiscountType, Entity as Coupon, Model as CouponModel, UNLIMITED_USES},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const MSG_INVALID_CODE: &str = "Invalid coupon code";
pub const MSG_INACTIVE: &str = "Coupon is inactive";
pub const MSG_OUT_OF_WINDOW: &str = "Coupon is expired or not yet active";
pub const MSG_LIMIT_REACHED: &str = "Coupon usage limit reached";
pub const MSG_APPLIED: &str = "Coupon applied successfully";

/// Successful evaluation of a coupon against a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CouponQuote {
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub minimum_cart_value: i64,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCouponInput {
    #[validate(custom = "validate_code_format")]
    pub code: String,
    pub discount_amount: i64,
    pub discount_type: DiscountType,
    #[serde(default)]
    pub minimum_cart_value: i64,
    #[serde(default = "default_max_uses")]
    pub max_uses: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCouponInput {
    #[validate(custom = "validate_code_format")]
    pub code: Option<String>,
    pub discount_amount: Option<i64>,
    pub discount_type: Option<DiscountType>,
    pub minimum_cart_value: Option<i64>,
    pub max_uses: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

fn default_max_uses() -> i32 {
    UNLIMITED_USES
}

fn default_true() -> bool {
    true
}

fn validate_code_format(code: &str) -> Result<(), ValidationError> {
    let trimmed = code.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        let mut err = ValidationError::new("code");
        err.message = Some("Code must be between 1 and 64 characters".into());
        return Err(err);
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("code");
        err.message = Some("Code may only contain letters, digits, '-' and '_'".into());
        return Err(err);
    }
    Ok(())
}

/// Codes are matched case-insensitively by storing and querying them uppercased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Discount for `cart_value`, never more than the cart itself.
///
/// Percentages are whole percents; the result is rounded to the nearest
/// minor unit with halves rounded away from zero.
pub fn compute_discount(discount_type: DiscountType, amount: i64, cart_value: i64) -> i64 {
    if cart_value <= 0 || amount <= 0 {
        return 0;
    }

    let discount = match discount_type {
        DiscountType::Percentage => (Decimal::from(cart_value) * Decimal::from(amount)
            / Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(cart_value),
        DiscountType::Fixed => amount,
    };

    discount.clamp(0, cart_value)
}

/// Reason a coupon cannot be used right now, ignoring the cart.
pub fn usage_rejection(coupon: &CouponModel, now: DateTime<Utc>) -> Option<ServiceError> {
    if !coupon.is_active {
        return Some(ServiceError::Inactive(MSG_INACTIVE.to_string()));
    }
    if !coupon.is_within_window(now) {
        return Some(ServiceError::Expired(MSG_OUT_OF_WINDOW.to_string()));
    }
    if !coupon.has_uses_remaining() {
        return Some(ServiceError::LimitExhausted(MSG_LIMIT_REACHED.to_string()));
    }
    None
}

/// Runs every usability rule in order and prices the discount.
pub fn evaluate(
    coupon: &CouponModel,
    cart_value: i64,
    now: DateTime<Utc>,
) -> Result<CouponQuote, ServiceError> {
    if let Some(rejection) = usage_rejection(coupon, now) {
        return Err(rejection);
    }

    if cart_value < coupon.minimum_cart_value {
        return Err(ServiceError::ThresholdNotMet {
            message: format!(
                "Minimum cart value of {} required",
                coupon.minimum_cart_value
            ),
            required: coupon.minimum_cart_value,
        });
    }

    Ok(CouponQuote {
        code: coupon.code.clone(),
        discount_type: coupon.discount_type,
        discount_value: compute_discount(coupon.discount_type, coupon.discount_amount, cart_value),
        minimum_cart_value: coupon.minimum_cart_value,
        message: MSG_APPLIED.to_string(),
    })
}

/// Cross-field rules shared by create and update.
pub fn check_terms(
    discount_type: DiscountType,
    discount_amount: i64,
    minimum_cart_value: i64,
    max_uses: i32,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if discount_amount <= 0 {
        return Err(ServiceError::ValidationError(
            "discount_amount must be greater than zero".into(),
        ));
    }
    if discount_type == DiscountType::Percentage && discount_amount > 100 {
        return Err(ServiceError::ValidationError(
            "percentage discount must be between 1 and 100".into(),
        ));
    }
    if minimum_cart_value < 0 {
        return Err(ServiceError::ValidationError(
            "minimum_cart_value must not be negative".into(),
        ));
    }
    if max_uses != UNLIMITED_USES && max_uses < 1 {
        return Err(ServiceError::ValidationError(
            "max_uses must be -1 (unlimited) or at least 1".into(),
        ));
    }
    if end_date <= start_date {
        return Err(ServiceError::ValidationError(
            "end_date must be after start_date".into(),
        ));
    }
    Ok(())
}

/// Coupon lookup, evaluation and usage accounting.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<CouponModel>, ServiceError> {
        Ok(Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?)
    }

    /// Checks a coupon against a cart without consuming a use.
    #[instrument(skip(self))]
    pub async fn validate(&self, code: &str, cart_value: i64) -> Result<CouponQuote, ServiceError> {
        let code = normalize_code(code);
        let coupon = self
            .find_by_code(&code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(MSG_INVALID_CODE.to_string()))?;

        match evaluate(&coupon, cart_value, Utc::now()) {
            Ok(quote) => {
                counter!("storefront.coupons.validated", 1);
                debug!(code = %code, discount = quote.discount_value, "coupon valid");
                Ok(quote)
            }
            Err(rejection) => {
                counter!("storefront.coupons.rejected", 1);
                debug!(code = %code, reason = %rejection, "coupon rejected");
                Err(rejection)
            }
        }
    }

    /// Consumes one use with a single guarded increment.
    #[instrument(skip(self))]
    pub async fn apply(&self, code: &str) -> Result<CouponModel, ServiceError> {
        let code = normalize_code(code);
        let now = Utc::now();

        let result = Coupon::update_many()
            .col_expr(
                coupon::Column::UsedCount,
                Expr::col(coupon::Column::UsedCount).add(1),
            )
            .col_expr(coupon::Column::UpdatedAt, Expr::value(now))
            .filter(coupon::Column::Code.eq(code.as_str()))
            .filter(coupon::Column::IsActive.eq(true))
            .filter(coupon::Column::StartDate.lte(now))
            .filter(coupon::Column::EndDate.gte(now))
            .filter(
                Condition::any()
                    .add(coupon::Column::MaxUses.eq(UNLIMITED_USES))
                    .add(
                        Expr::col(coupon::Column::UsedCount)
                            .lt(Expr::col(coupon::Column::MaxUses)),
                    ),
            )
            .exec(&*self.db)
            .await?;

        let current = self.find_by_code(&code).await?;

        if result.rows_affected == 0 {
            counter!("storefront.coupons.apply_rejected", 1);
            let coupon =
                current.ok_or_else(|| ServiceError::NotFound(MSG_INVALID_CODE.to_string()))?;
            let rejection = usage_rejection(&coupon, now).unwrap_or_else(|| {
                ServiceError::Conflict("Coupon changed concurrently, retry".to_string())
            });
            warn!(code = %code, reason = %rejection, "coupon apply rejected");
            return Err(rejection);
        }

        counter!("storefront.coupons.applied", 1);
        let coupon = current.ok_or_else(|| {
            ServiceError::InternalError(format!("Coupon {} vanished after apply", code))
        })?;
        info!(code = %code, used_count = coupon.used_count, "coupon applied");
        Ok(coupon)
    }

    pub async fn list(&self) -> Result<Vec<CouponModel>, ServiceError> {
        Ok(Coupon::find()
            .order_by_desc(coupon::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<CouponModel, ServiceError> {
        Coupon::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))
    }

    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create(&self, input: CreateCouponInput) -> Result<CouponModel, ServiceError> {
        input.validate()?;
        check_terms(
            input.discount_type,
            input.discount_amount,
            input.minimum_cart_value,
            input.max_uses,
            input.start_date,
            input.end_date,
        )?;

        let code = normalize_code(&input.code);
        if self.find_by_code(&code).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            discount_amount: Set(input.discount_amount),
            discount_type: Set(input.discount_type),
            minimum_cart_value: Set(input.minimum_cart_value),
            max_uses: Set(input.max_uses),
            used_count: Set(0),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(coupon_id = %model.id, "coupon created");
        Ok(model)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<CouponModel, ServiceError> {
        input.validate()?;
        let existing = self.get(id).await?;

        let code = input
            .code
            .as_deref()
            .map(normalize_code)
            .unwrap_or_else(|| existing.code.clone());
        if code != existing.code {
            if let Some(other) = self.find_by_code(&code).await? {
                if other.id != id {
                    return Err(ServiceError::Conflict(format!(
                        "Coupon code {} already exists",
                        code
                    )));
                }
            }
        }

        let discount_type = input.discount_type.unwrap_or(existing.discount_type);
        let discount_amount = input.discount_amount.unwrap_or(existing.discount_amount);
        let minimum_cart_value = input
            .minimum_cart_value
            .unwrap_or(existing.minimum_cart_value);
        let max_uses = input.max_uses.unwrap_or(existing.max_uses);
        let start_date = input.start_date.unwrap_or(existing.start_date);
        let end_date = input.end_date.unwrap_or(existing.end_date);
        check_terms(
            discount_type,
            discount_amount,
            minimum_cart_value,
            max_uses,
            start_date,
            end_date,
        )?;

        let is_active = input.is_active.unwrap_or(existing.is_active);
        let mut active: coupon::ActiveModel = existing.into();
        active.code = Set(code);
        active.discount_type = Set(discount_type);
        active.discount_amount = Set(discount_amount);
        active.minimum_cart_value = Set(minimum_cart_value);
        active.max_uses = Set(max_uses);
        active.start_date = Set(start_date);
        active.end_date = Set(end_date);
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await?;
        info!(coupon_id = %id, "coupon updated");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = Coupon::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Coupon {} not found", id)));
        }
        info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }
}
