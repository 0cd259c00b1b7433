use crate::{
    entities::free_product::{self, Entity as FreeProduct, Model as FreeProductModel},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateFreeProductInput {
    #[serde(alias = "productId")]
    pub product_id: Uuid,
    #[serde(alias = "minOrderValue")]
    pub min_order_value: i64,
    #[serde(default, alias = "maxOrderValue")]
    pub max_order_value: Option<i64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateFreeProductInput {
    #[serde(alias = "productId")]
    pub product_id: Option<Uuid>,
    #[serde(alias = "minOrderValue")]
    pub min_order_value: Option<i64>,
    /// Explicit `null` removes the upper bound.
    #[serde(default, alias = "maxOrderValue", deserialize_with = "some_nullable")]
    #[schema(value_type = Option<i64>)]
    pub max_order_value: Option<Option<i64>>,
    pub enabled: Option<bool>,
}

fn default_enabled() -> bool {
    true
}

fn some_nullable<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

pub fn check_band(min_order_value: i64, max_order_value: Option<i64>) -> Result<(), ServiceError> {
    if min_order_value <= 0 {
        return Err(ServiceError::ValidationError(
            "min_order_value must be greater than zero".into(),
        ));
    }
    if let Some(max) = max_order_value {
        if max <= min_order_value {
            return Err(ServiceError::ValidationError(
                "max_order_value must be greater than min_order_value".into(),
            ));
        }
    }
    Ok(())
}

/// Inclusive bands; a missing maximum extends to infinity.
pub fn bands_overlap(a: (i64, Option<i64>), b: (i64, Option<i64>)) -> bool {
    let a_max = a.1.unwrap_or(i64::MAX);
    let b_max = b.1.unwrap_or(i64::MAX);
    a.0 <= b_max && b.0 <= a_max
}

pub fn any_band_covers(bands: &[FreeProductModel], cart_value: i64) -> bool {
    bands
        .iter()
        .any(|band| band.enabled && band.covers(cart_value))
}

#[derive(Clone)]
pub struct FreeProductService {
    db: Arc<DatabaseConnection>,
}

impl FreeProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn list_enabled(&self) -> Result<Vec<FreeProductModel>, ServiceError> {
        Ok(FreeProduct::find()
            .filter(free_product::Column::Enabled.eq(true))
            .order_by_asc(free_product::Column::MinOrderValue)
            .all(&*self.db)
            .await?)
    }

    pub async fn list_all(&self) -> Result<Vec<FreeProductModel>, ServiceError> {
        Ok(FreeProduct::find()
            .order_by_asc(free_product::Column::ProductId)
            .order_by_asc(free_product::Column::MinOrderValue)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn is_eligible(&self, product_id: Uuid, cart_value: i64) -> Result<bool, ServiceError> {
        let bands = FreeProduct::find()
            .filter(free_product::Column::ProductId.eq(product_id))
            .filter(free_product::Column::Enabled.eq(true))
            .all(&*self.db)
            .await?;
        Ok(any_band_covers(&bands, cart_value))
    }

    /// Every product with an enabled band covering `cart_value`.
    pub async fn eligible_products(&self, cart_value: i64) -> Result<Vec<Uuid>, ServiceError> {
        let bands = FreeProduct::find()
            .filter(free_product::Column::Enabled.eq(true))
            .filter(free_product::Column::MinOrderValue.lte(cart_value))
            .filter(
                Condition::any()
                    .add(free_product::Column::MaxOrderValue.is_null())
                    .add(free_product::Column::MaxOrderValue.gte(cart_value)),
            )
            .all(&*self.db)
            .await?;

        let ids: BTreeSet<Uuid> = bands.into_iter().map(|band| band.product_id).collect();
        Ok(ids.into_iter().collect())
    }

    async fn ensure_no_overlap(
        &self,
        product_id: Uuid,
        band: (i64, Option<i64>),
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let siblings = FreeProduct::find()
            .filter(free_product::Column::ProductId.eq(product_id))
            .all(&*self.db)
            .await?;

        let clash = siblings
            .iter()
            .filter(|other| Some(other.id) != exclude)
            .find(|other| bands_overlap(band, (other.min_order_value, other.max_order_value)));

        match clash {
            Some(other) => Err(ServiceError::ValidationError(format!(
                "Order value band overlaps existing band {} for product {}",
                other.id, product_id
            ))),
            None => Ok(()),
        }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateFreeProductInput,
    ) -> Result<FreeProductModel, ServiceError> {
        check_band(input.min_order_value, input.max_order_value)?;
        self.ensure_no_overlap(
            input.product_id,
            (input.min_order_value, input.max_order_value),
            None,
        )
        .await?;

        let now = Utc::now();
        let model = free_product::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            min_order_value: Set(input.min_order_value),
            max_order_value: Set(input.max_order_value),
            enabled: Set(input.enabled),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(free_product_id = %model.id, product_id = %model.product_id, "free product band created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateFreeProductInput,
    ) -> Result<FreeProductModel, ServiceError> {
        let existing = FreeProduct::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Free product {} not found", id)))?;

        let product_id = input.product_id.unwrap_or(existing.product_id);
        let min_order_value = input.min_order_value.unwrap_or(existing.min_order_value);
        let max_order_value = input.max_order_value.unwrap_or(existing.max_order_value);
        check_band(min_order_value, max_order_value)?;
        self.ensure_no_overlap(product_id, (min_order_value, max_order_value), Some(id))
            .await?;

        let enabled = input.enabled.unwrap_or(existing.enabled);
        let mut active: free_product::ActiveModel = existing.into();
        active.product_id = Set(product_id);
        active.min_order_value = Set(min_order_value);
        active.max_order_value = Set(max_order_value);
        active.enabled = Set(enabled);
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await?;
        info!(free_product_id = %id, "free product band updated");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = FreeProduct::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Free product {} not found", id)));
        }
        info!(free_product_id = %id, "free product band deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(min: i64, max: Option<i64>, enabled: bool) -> FreeProductModel {
        let now = Utc::now();
        FreeProductModel {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            min_order_value: min,
            max_order_value: max,
            enabled,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn open_ended_band_covers_everything_above_minimum() {
        let bands = vec![band(1_000, None, true)];
        assert!(!any_band_covers(&bands, 999));
        assert!(any_band_covers(&bands, 1_000));
        assert!(any_band_covers(&bands, 1_000_000));
    }

    #[test]
    fn disabled_bands_never_match() {
        let bands = vec![band(1_000, None, false)];
        assert!(!any_band_covers(&bands, 5_000));
    }

    #[test]
    fn any_of_several_bands_is_enough() {
        let bands = vec![band(1_000, Some(1_999), true), band(5_000, None, true)];
        assert!(any_band_covers(&bands, 1_999));
        assert!(!any_band_covers(&bands, 3_000));
        assert!(any_band_covers(&bands, 5_000));
    }

    #[test]
    fn band_validation() {
        assert!(check_band(0, None).is_err());
        assert!(check_band(1_000, Some(1_000)).is_err());
        assert!(check_band(1_000, Some(1_001)).is_ok());
        assert!(check_band(1, None).is_ok());
    }

    #[test]
    fn overlap_detection_is_inclusive() {
        assert!(bands_overlap((1_000, Some(2_000)), (2_000, None)));
        assert!(!bands_overlap((1_000, Some(1_999)), (2_000, None)));
        assert!(bands_overlap((1_000, None), (50_000, Some(60_000))));
        assert!(!bands_overlap((3_000, Some(4_000)), (1_000, Some(2_000))));
    }
}
