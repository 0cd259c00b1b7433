use crate::{
    entities::gift_popup_config::{
        self, Entity as GiftPopupConfig, GiftProductList, Model as GiftPopupModel, SINGLETON_ID,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Free gifts a shopper may pick for a given cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GiftOffer {
    pub eligible: bool,
    pub title: String,
    pub selectable_gifts: Vec<Uuid>,
    pub max_selectable: usize,
    pub min_cart_value: i64,
    pub max_cart_value: Option<i64>,
    /// How much more the cart needs before the popup unlocks.
    pub amount_to_unlock: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateGiftPopupInput {
    pub title: Option<String>,
    pub is_active: Option<bool>,
    pub min_cart_value: Option<i64>,
    /// Explicit `null` clears the upper bound.
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub max_cart_value: Option<Option<i64>>,
    pub max_selectable_gifts: Option<i32>,
    pub gift_products: Option<Vec<Uuid>>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<i64>::deserialize(deserializer).map(Some)
    }
}

pub fn evaluate_offer(config: &GiftPopupModel, cart_value: i64) -> GiftOffer {
    let eligible = config.is_active
        && cart_value >= config.min_cart_value
        && config.max_cart_value.map_or(true, |max| cart_value <= max);

    let max_selectable = if eligible {
        (config.max_selectable_gifts.max(0) as usize).min(config.gift_products.len())
    } else {
        0
    };

    let amount_to_unlock = (config.is_active && cart_value < config.min_cart_value)
        .then(|| config.min_cart_value - cart_value);

    GiftOffer {
        eligible,
        title: config.title.clone(),
        selectable_gifts: if eligible {
            config.gift_products.0.clone()
        } else {
            Vec::new()
        },
        max_selectable,
        min_cart_value: config.min_cart_value,
        max_cart_value: config.max_cart_value,
        amount_to_unlock,
    }
}

pub fn check_config(config: &GiftPopupModel) -> Result<(), ServiceError> {
    if config.title.trim().is_empty() {
        return Err(ServiceError::ValidationError("title must not be empty".into()));
    }
    if config.min_cart_value < 0 {
        return Err(ServiceError::ValidationError(
            "min_cart_value must not be negative".into(),
        ));
    }
    if let Some(max) = config.max_cart_value {
        if max <= config.min_cart_value {
            return Err(ServiceError::ValidationError(
                "max_cart_value must be greater than min_cart_value".into(),
            ));
        }
    }
    if config.max_selectable_gifts < 1 {
        return Err(ServiceError::ValidationError(
            "max_selectable_gifts must be at least 1".into(),
        ));
    }
    let products = &config.gift_products;
    if !products.is_empty() && config.max_selectable_gifts as usize > products.len() {
        return Err(ServiceError::ValidationError(
            "max_selectable_gifts cannot exceed the number of gift products".into(),
        ));
    }
    let distinct: HashSet<&Uuid> = products.0.iter().collect();
    if distinct.len() != products.len() {
        return Err(ServiceError::ValidationError(
            "gift_products must not contain duplicates".into(),
        ));
    }
    Ok(())
}

/// Reads the singleton popup configuration through an in-memory cache.
#[derive(Clone)]
pub struct GiftPopupService {
    db: Arc<DatabaseConnection>,
    cache: Arc<RwLock<Option<GiftPopupModel>>>,
}

impl GiftPopupService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn config(&self) -> Result<GiftPopupModel, ServiceError> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let mut slot = self.cache.write().await;
        if let Some(cached) = slot.as_ref() {
            return Ok(cached.clone());
        }

        let config = GiftPopupConfig::find_by_id(SINGLETON_ID)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError("Gift popup configuration row is missing".into())
            })?;
        debug!("gift popup configuration loaded");
        *slot = Some(config.clone());
        Ok(config)
    }

    /// The configuration as shown to shoppers; hidden while the popup is switched off.
    pub async fn active_config(&self) -> Result<GiftPopupModel, ServiceError> {
        let config = self.config().await?;
        if !config.is_active {
            return Err(ServiceError::NotFound("No active gift popup".into()));
        }
        Ok(config)
    }

    #[instrument(skip(self))]
    pub async fn offer(&self, cart_value: i64) -> Result<GiftOffer, ServiceError> {
        let config = self.config().await?;
        Ok(evaluate_offer(&config, cart_value))
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, input: UpdateGiftPopupInput) -> Result<GiftPopupModel, ServiceError> {
        let mut merged = self.config().await?;
        if let Some(title) = input.title {
            merged.title = title.trim().to_string();
        }
        if let Some(is_active) = input.is_active {
            merged.is_active = is_active;
        }
        if let Some(min) = input.min_cart_value {
            merged.min_cart_value = min;
        }
        if let Some(max) = input.max_cart_value {
            merged.max_cart_value = max;
        }
        if let Some(max_selectable) = input.max_selectable_gifts {
            merged.max_selectable_gifts = max_selectable;
        }
        if let Some(products) = input.gift_products {
            merged.gift_products = GiftProductList(products);
        }
        check_config(&merged)?;

        let active = gift_popup_config::ActiveModel {
            id: Set(SINGLETON_ID),
            title: Set(merged.title),
            is_active: Set(merged.is_active),
            min_cart_value: Set(merged.min_cart_value),
            max_cart_value: Set(merged.max_cart_value),
            max_selectable_gifts: Set(merged.max_selectable_gifts),
            gift_products: Set(merged.gift_products),
            updated_at: Set(Utc::now()),
        };
        let result = active.update(&*self.db).await;
        self.invalidate().await;
        let model = result?;

        info!(
            is_active = model.is_active,
            gifts = model.gift_products.len(),
            "gift popup configuration updated"
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min: i64, max: Option<i64>, max_selectable: i32, gifts: usize) -> GiftPopupModel {
        GiftPopupModel {
            id: SINGLETON_ID,
            title: "Pick a gift".into(),
            is_active: true,
            min_cart_value: min,
            max_cart_value: max,
            max_selectable_gifts: max_selectable,
            gift_products: GiftProductList((0..gifts).map(|_| Uuid::new_v4()).collect()),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn offer_inside_band_lists_gifts() {
        let cfg = config(2_000, Some(10_000), 2, 3);
        let offer = evaluate_offer(&cfg, 2_000);
        assert!(offer.eligible);
        assert_eq!(offer.selectable_gifts.len(), 3);
        assert_eq!(offer.max_selectable, 2);
        assert_eq!(offer.amount_to_unlock, None);
    }

    #[test]
    fn offer_below_minimum_reports_shortfall() {
        let cfg = config(2_000, None, 1, 2);
        let offer = evaluate_offer(&cfg, 1_500);
        assert!(!offer.eligible);
        assert!(offer.selectable_gifts.is_empty());
        assert_eq!(offer.max_selectable, 0);
        assert_eq!(offer.amount_to_unlock, Some(500));
    }

    #[test]
    fn offer_above_maximum_is_not_eligible() {
        let cfg = config(0, Some(5_000), 1, 1);
        assert!(evaluate_offer(&cfg, 5_000).eligible);
        assert!(!evaluate_offer(&cfg, 5_001).eligible);
    }

    #[test]
    fn inactive_popup_offers_nothing() {
        let mut cfg = config(0, None, 1, 2);
        cfg.is_active = false;
        let offer = evaluate_offer(&cfg, 10_000);
        assert!(!offer.eligible);
        assert_eq!(offer.amount_to_unlock, None);
    }

    #[test]
    fn max_selectable_is_bounded_by_gift_count() {
        let mut cfg = config(0, None, 3, 3);
        cfg.gift_products.0.truncate(1);
        assert_eq!(evaluate_offer(&cfg, 1).max_selectable, 1);
    }

    #[test]
    fn config_rules() {
        assert!(check_config(&config(0, None, 2, 3)).is_ok());
        assert!(check_config(&config(0, None, 4, 3)).is_err());
        assert!(check_config(&config(500, Some(500), 1, 1)).is_err());
        assert!(check_config(&config(0, None, 0, 0)).is_err());
        assert!(check_config(&config(0, None, 5, 0)).is_ok());

        let mut dup = config(0, None, 1, 1);
        let first = dup.gift_products.0[0];
        dup.gift_products.0.push(first);
        assert!(check_config(&dup).is_err());
    }
}
