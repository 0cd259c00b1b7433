use crate::{
    entities::gift_card::{self, Entity as GiftCard, Model as GiftCardModel},
    errors::ServiceError,
    services::coupons::normalize_code,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

const MAX_CODE_ATTEMPTS: usize = 8;

pub const MSG_UNKNOWN_CARD: &str = "Invalid gift card code";
pub const MSG_CARD_INACTIVE: &str = "Gift card is inactive";
pub const MSG_CARD_EXPIRED: &str = "Gift card has expired";
pub const MSG_INSUFFICIENT: &str = "Insufficient gift card balance";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Redemption {
    pub success: bool,
    pub remaining_balance: i64,
}

/// What a shopper may see about a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GiftCardBalance {
    pub code: String,
    pub title: String,
    pub balance: i64,
    pub expiry_date: DateTime<Utc>,
    pub is_active: bool,
    pub image_url: Option<String>,
}

impl From<GiftCardModel> for GiftCardBalance {
    fn from(card: GiftCardModel) -> Self {
        Self {
            code: card.code,
            title: card.title,
            balance: card.balance,
            expiry_date: card.expiry_date,
            is_active: card.is_active,
            image_url: card.image_url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateGiftCardInput {
    pub code: Option<String>,
    pub title: String,
    pub initial_amount: i64,
    pub expiry_date: DateTime<Utc>,
    pub is_active: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateGiftCardInput {
    pub title: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub image_url: Option<String>,
}

/// Settings for minting card codes.
#[derive(Debug, Clone)]
pub struct CodeFormat {
    pub prefix: String,
    pub length: usize,
}

impl CodeFormat {
    pub fn generate(&self) -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(|b| char::from(b).to_ascii_uppercase())
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

/// Reason a debit of `amount` against `card` cannot go through.
pub fn redemption_rejection(
    card: &GiftCardModel,
    amount: i64,
    now: DateTime<Utc>,
) -> Option<ServiceError> {
    if !card.is_active {
        return Some(ServiceError::Inactive(MSG_CARD_INACTIVE.to_string()));
    }
    if card.is_expired(now) {
        return Some(ServiceError::Expired(MSG_CARD_EXPIRED.to_string()));
    }
    if amount > card.balance {
        return Some(ServiceError::InsufficientBalance(MSG_INSUFFICIENT.to_string()));
    }
    None
}

fn check_title(title: &str) -> Result<(), ServiceError> {
    if title.trim().is_empty() {
        return Err(ServiceError::ValidationError("title must not be empty".into()));
    }
    Ok(())
}

/// Retiring a card goes through `retire`, never through a backdated expiry.
pub fn check_expiry(expiry_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ServiceError> {
    if expiry_date <= now {
        return Err(ServiceError::ValidationError(
            "expiry_date must be in the future".into(),
        ));
    }
    Ok(())
}

/// Stored-value card ledger.
#[derive(Clone)]
pub struct GiftCardService {
    db: Arc<DatabaseConnection>,
    code_format: CodeFormat,
}

impl GiftCardService {
    pub fn new(db: Arc<DatabaseConnection>, code_format: CodeFormat) -> Self {
        Self { db, code_format }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<GiftCardModel>, ServiceError> {
        Ok(GiftCard::find()
            .filter(gift_card::Column::Code.eq(code))
            .one(&*self.db)
            .await?)
    }

    /// Debits `amount` in one guarded update and reports what is left.
    #[instrument(skip(self))]
    pub async fn redeem(&self, code: &str, amount: i64) -> Result<Redemption, ServiceError> {
        if amount <= 0 {
            return Err(ServiceError::ValidationError(
                "Redemption amount must be greater than zero".into(),
            ));
        }

        let code = normalize_code(code);
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let result = GiftCard::update_many()
            .col_expr(
                gift_card::Column::Balance,
                Expr::col(gift_card::Column::Balance).sub(amount),
            )
            .col_expr(gift_card::Column::UpdatedAt, Expr::value(now))
            .filter(gift_card::Column::Code.eq(code.as_str()))
            .filter(gift_card::Column::IsActive.eq(true))
            .filter(gift_card::Column::ExpiryDate.gte(now))
            .filter(gift_card::Column::Balance.gte(amount))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            counter!("storefront.giftcards.redeem_rejected", 1);

            let card = self
                .find_by_code(&code)
                .await?
                .ok_or_else(|| ServiceError::NotFound(MSG_UNKNOWN_CARD.to_string()))?;
            let rejection = redemption_rejection(&card, amount, now).unwrap_or_else(|| {
                ServiceError::Conflict("Gift card changed concurrently, retry".to_string())
            });
            warn!(code = %code, amount, reason = %rejection, "gift card redemption rejected");
            return Err(rejection);
        }

        let card = GiftCard::find()
            .filter(gift_card::Column::Code.eq(code.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(MSG_UNKNOWN_CARD.to_string()))?;
        txn.commit().await?;

        counter!("storefront.giftcards.redeemed", 1);
        info!(code = %code, amount, remaining = card.balance, "gift card redeemed");
        Ok(Redemption {
            success: true,
            remaining_balance: card.balance,
        })
    }

    pub async fn balance(&self, code: &str) -> Result<GiftCardBalance, ServiceError> {
        let code = normalize_code(code);
        self.find_by_code(&code)
            .await?
            .map(GiftCardBalance::from)
            .ok_or_else(|| ServiceError::NotFound(MSG_UNKNOWN_CARD.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<GiftCardModel>, ServiceError> {
        Ok(GiftCard::find()
            .order_by_desc(gift_card::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<GiftCardModel, ServiceError> {
        GiftCard::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Gift card {} not found", id)))
    }

    async fn unique_code(&self) -> Result<String, ServiceError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = self.code_format.generate();
            if self.find_by_code(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(ServiceError::InternalError(
            "Could not mint a unique gift card code".into(),
        ))
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: CreateGiftCardInput) -> Result<GiftCardModel, ServiceError> {
        check_title(&input.title)?;
        if input.initial_amount <= 0 {
            return Err(ServiceError::ValidationError(
                "initial_amount must be greater than zero".into(),
            ));
        }
        let now = Utc::now();
        check_expiry(input.expiry_date, now)?;

        let code = match input.code.as_deref().map(normalize_code) {
            Some(code) if !code.is_empty() => {
                if self.find_by_code(&code).await?.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Gift card code {} already exists",
                        code
                    )));
                }
                code
            }
            _ => self.unique_code().await?,
        };

        let model = gift_card::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            title: Set(input.title.trim().to_string()),
            initial_amount: Set(input.initial_amount),
            balance: Set(input.initial_amount),
            expiry_date: Set(input.expiry_date),
            is_active: Set(input.is_active),
            image_url: Set(input.image_url),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        counter!("storefront.giftcards.created", 1);
        info!(gift_card_id = %model.id, code = %model.code, "gift card created");
        Ok(model)
    }

    /// Returns the updated card and the image it replaced, if any.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateGiftCardInput,
    ) -> Result<(GiftCardModel, Option<String>), ServiceError> {
        let existing = self.get(id).await?;
        let mut replaced_image = None;

        let mut active: gift_card::ActiveModel = existing.clone().into();
        if let Some(title) = input.title {
            check_title(&title)?;
            active.title = Set(title.trim().to_string());
        }
        if let Some(expiry_date) = input.expiry_date {
            check_expiry(expiry_date, Utc::now())?;
            active.expiry_date = Set(expiry_date);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(image_url) = input.image_url {
            replaced_image = existing.image_url.filter(|old| *old != image_url);
            active.image_url = Set(Some(image_url));
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await?;
        info!(gift_card_id = %id, "gift card updated");
        Ok((model, replaced_image))
    }

    /// Cards keep their ledger history; deleting only takes them out of circulation.
    #[instrument(skip(self))]
    pub async fn retire(&self, id: Uuid) -> Result<GiftCardModel, ServiceError> {
        let existing = self.get(id).await?;
        let mut active: gift_card::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let model = active.update(&*self.db).await?;
        info!(gift_card_id = %id, "gift card retired");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn card(balance: i64) -> GiftCardModel {
        let now = Utc::now();
        GiftCardModel {
            id: Uuid::new_v4(),
            code: "GC-TEST".into(),
            title: "Birthday".into(),
            initial_amount: 5_000,
            balance,
            expiry_date: now + Duration::days(30),
            is_active: true,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn generated_codes_have_prefix_and_length() {
        let format = CodeFormat {
            prefix: "GC-".into(),
            length: 12,
        };
        let code = format.generate();
        assert!(code.starts_with("GC-"));
        assert_eq!(code.len(), 15);
        assert!(code[3..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_ne!(code, format.generate());
    }

    #[test]
    fn redemption_within_balance_is_allowed() {
        assert!(redemption_rejection(&card(1_000), 1_000, Utc::now()).is_none());
    }

    #[test]
    fn redemption_above_balance_is_rejected() {
        assert_matches!(
            redemption_rejection(&card(1_000), 1_001, Utc::now()),
            Some(ServiceError::InsufficientBalance(_))
        );
    }

    #[test]
    fn inactive_and_expired_cards_are_rejected() {
        let mut inactive = card(1_000);
        inactive.is_active = false;
        assert_matches!(
            redemption_rejection(&inactive, 1, Utc::now()),
            Some(ServiceError::Inactive(_))
        );

        let expired = card(1_000);
        let after = expired.expiry_date + Duration::seconds(1);
        assert_matches!(
            redemption_rejection(&expired, 1, after),
            Some(ServiceError::Expired(_))
        );
        assert!(redemption_rejection(&expired, 1, expired.expiry_date).is_none());
    }

    #[test]
    fn expiry_must_lie_ahead() {
        let now = Utc::now();
        assert_matches!(check_expiry(now, now), Err(ServiceError::ValidationError(_)));
        assert_matches!(
            check_expiry(now - Duration::days(1), now),
            Err(ServiceError::ValidationError(_))
        );
        assert!(check_expiry(now + Duration::minutes(1), now).is_ok());
    }
}
