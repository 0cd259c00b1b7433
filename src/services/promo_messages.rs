use crate::{
    entities::promo_message::{self, Entity as PromoMessage, Model as PromoMessageModel},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePromoMessageInput {
    #[serde(alias = "minCartValue")]
    #[validate(range(min = 0))]
    pub min_cart_value: i64,
    #[serde(alias = "maxCartValue")]
    #[validate(range(min = 0))]
    pub max_cart_value: i64,
    #[validate(length(min = 1, max = 500))]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdatePromoMessageInput {
    #[serde(alias = "minCartValue")]
    #[validate(range(min = 0))]
    pub min_cart_value: Option<i64>,
    #[serde(alias = "maxCartValue")]
    #[validate(range(min = 0))]
    pub max_cart_value: Option<i64>,
    #[validate(length(min = 1, max = 500))]
    pub message: Option<String>,
}

/// Highest minimum first; among equal minimums the narrower band, then the older record.
fn specificity(a: &PromoMessageModel, b: &PromoMessageModel) -> Ordering {
    b.min_cart_value
        .cmp(&a.min_cart_value)
        .then(a.max_cart_value.cmp(&b.max_cart_value))
        .then(a.created_at.cmp(&b.created_at))
}

/// All messages whose band contains `cart_value`, most specific first.
pub fn matching(messages: &[PromoMessageModel], cart_value: i64) -> Vec<PromoMessageModel> {
    let mut hits: Vec<PromoMessageModel> = messages
        .iter()
        .filter(|m| m.matches(cart_value))
        .cloned()
        .collect();
    hits.sort_by(specificity);
    hits
}

pub fn select(messages: &[PromoMessageModel], cart_value: i64) -> Option<&PromoMessageModel> {
    messages
        .iter()
        .filter(|m| m.matches(cart_value))
        .min_by(|a, b| specificity(a, b))
}

fn check_band(min: i64, max: i64, message: &str) -> Result<(), ServiceError> {
    if max < min {
        return Err(ServiceError::ValidationError(
            "max_cart_value must not be less than min_cart_value".into(),
        ));
    }
    if message.trim().is_empty() {
        return Err(ServiceError::ValidationError("message must not be empty".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct PromoMessageService {
    db: Arc<DatabaseConnection>,
}

impl PromoMessageService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn covering(&self, cart_value: i64) -> Result<Vec<PromoMessageModel>, ServiceError> {
        Ok(PromoMessage::find()
            .filter(promo_message::Column::MinCartValue.lte(cart_value))
            .filter(promo_message::Column::MaxCartValue.gte(cart_value))
            .all(&*self.db)
            .await?)
    }

    /// Without a cart value every message is returned, lowest band first.
    #[instrument(skip(self))]
    pub async fn list(&self, cart_value: Option<i64>) -> Result<Vec<PromoMessageModel>, ServiceError> {
        match cart_value {
            Some(value) => Ok(matching(&self.covering(value).await?, value)),
            None => Ok(PromoMessage::find()
                .order_by_asc(promo_message::Column::MinCartValue)
                .order_by_asc(promo_message::Column::MaxCartValue)
                .all(&*self.db)
                .await?),
        }
    }

    #[instrument(skip(self))]
    pub async fn best(&self, cart_value: i64) -> Result<Option<PromoMessageModel>, ServiceError> {
        let candidates = self.covering(cart_value).await?;
        Ok(select(&candidates, cart_value).cloned())
    }

    pub async fn create(
        &self,
        input: CreatePromoMessageInput,
    ) -> Result<PromoMessageModel, ServiceError> {
        input.validate()?;
        check_band(input.min_cart_value, input.max_cart_value, &input.message)?;

        let now = Utc::now();
        let model = promo_message::ActiveModel {
            id: Set(Uuid::new_v4()),
            min_cart_value: Set(input.min_cart_value),
            max_cart_value: Set(input.max_cart_value),
            message: Set(input.message.trim().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(promo_message_id = %model.id, "promo message created");
        Ok(model)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdatePromoMessageInput,
    ) -> Result<PromoMessageModel, ServiceError> {
        input.validate()?;
        let existing = PromoMessage::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Promo message {} not found", id)))?;

        let min = input.min_cart_value.unwrap_or(existing.min_cart_value);
        let max = input.max_cart_value.unwrap_or(existing.max_cart_value);
        let message = input
            .message
            .map(|m| m.trim().to_string())
            .unwrap_or_else(|| existing.message.clone());
        check_band(min, max, &message)?;

        let mut active: promo_message::ActiveModel = existing.into();
        active.min_cart_value = Set(min);
        active.max_cart_value = Set(max);
        active.message = Set(message);
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await?;
        info!(promo_message_id = %id, "promo message updated");
        Ok(model)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = PromoMessage::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Promo message {} not found", id)));
        }
        info!(promo_message_id = %id, "promo message deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message(min: i64, max: i64, text: &str, age_secs: i64) -> PromoMessageModel {
        let created = Utc::now() - Duration::seconds(age_secs);
        PromoMessageModel {
            id: Uuid::new_v4(),
            min_cart_value: min,
            max_cart_value: max,
            message: text.into(),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn no_band_means_no_message() {
        let all = vec![message(0, 999, "a", 0), message(2_000, 3_000, "b", 0)];
        assert!(select(&all, 1_500).is_none());
        assert!(matching(&all, 1_500).is_empty());
    }

    #[test]
    fn highest_minimum_wins() {
        let all = vec![
            message(0, 10_000, "wide", 0),
            message(2_000, 10_000, "narrow", 0),
        ];
        assert_eq!(select(&all, 5_000).map(|m| m.message.as_str()), Some("narrow"));
    }

    #[test]
    fn ties_prefer_tighter_then_older() {
        let all = vec![
            message(1_000, 9_000, "loose", 10),
            message(1_000, 5_000, "tight-new", 1),
            message(1_000, 5_000, "tight-old", 100),
        ];
        assert_eq!(
            select(&all, 2_000).map(|m| m.message.as_str()),
            Some("tight-old")
        );
        let ordered: Vec<_> = matching(&all, 2_000)
            .into_iter()
            .map(|m| m.message)
            .collect();
        assert_eq!(ordered, vec!["tight-old", "tight-new", "loose"]);
    }

    #[test]
    fn band_edges_are_inclusive() {
        let all = vec![message(1_000, 2_000, "edge", 0)];
        assert!(select(&all, 1_000).is_some());
        assert!(select(&all, 2_000).is_some());
        assert!(select(&all, 2_001).is_none());
    }

    #[test]
    fn band_checks() {
        assert!(check_band(100, 99, "x").is_err());
        assert!(check_band(100, 100, "x").is_ok());
        assert!(check_band(0, 100, "  ").is_err());
    }
}
