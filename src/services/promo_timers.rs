use crate::{
    entities::promo_timer::{self, Entity as PromoTimer, Model as PromoTimerModel},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ActiveTimer {
    pub id: Uuid,
    pub product_id: Uuid,
    pub end_time: DateTime<Utc>,
    pub remaining_seconds: i64,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePromoTimerInput {
    #[serde(alias = "productId")]
    pub product_id: Uuid,
    #[serde(alias = "endTime")]
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdatePromoTimerInput {
    #[serde(alias = "productId")]
    pub product_id: Option<Uuid>,
    #[serde(alias = "endTime")]
    pub end_time: Option<DateTime<Utc>>,
    pub enabled: Option<bool>,
}

fn default_enabled() -> bool {
    true
}

pub fn running(timers: &[PromoTimerModel], now: DateTime<Utc>) -> Vec<ActiveTimer> {
    timers
        .iter()
        .filter(|t| t.enabled && t.end_time > now)
        .map(|t| ActiveTimer {
            id: t.id,
            product_id: t.product_id,
            end_time: t.end_time,
            remaining_seconds: t.remaining_seconds(now),
        })
        .collect()
}

#[derive(Clone)]
pub struct PromoTimerService {
    db: Arc<DatabaseConnection>,
}

impl PromoTimerService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn active_for_product(
        &self,
        product_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<ActiveTimer>, ServiceError> {
        let timers = PromoTimer::find()
            .filter(promo_timer::Column::ProductId.eq(product_id))
            .filter(promo_timer::Column::Enabled.eq(true))
            .filter(promo_timer::Column::EndTime.gt(now))
            .order_by_asc(promo_timer::Column::EndTime)
            .all(&*self.db)
            .await?;
        Ok(running(&timers, now))
    }

    pub async fn list(&self) -> Result<Vec<PromoTimerModel>, ServiceError> {
        Ok(PromoTimer::find()
            .order_by_asc(promo_timer::Column::EndTime)
            .all(&*self.db)
            .await?)
    }

    pub async fn create(&self, input: CreatePromoTimerInput) -> Result<PromoTimerModel, ServiceError> {
        let now = Utc::now();
        if input.end_time <= now {
            return Err(ServiceError::ValidationError(
                "end_time must be in the future".into(),
            ));
        }

        let model = promo_timer::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(input.product_id),
            end_time: Set(input.end_time),
            enabled: Set(input.enabled),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(promo_timer_id = %model.id, product_id = %model.product_id, "promo timer created");
        Ok(model)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: UpdatePromoTimerInput,
    ) -> Result<PromoTimerModel, ServiceError> {
        let existing = PromoTimer::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Promo timer {} not found", id)))?;

        let mut active: promo_timer::ActiveModel = existing.into();
        if let Some(product_id) = input.product_id {
            active.product_id = Set(product_id);
        }
        if let Some(end_time) = input.end_time {
            active.end_time = Set(end_time);
        }
        if let Some(enabled) = input.enabled {
            active.enabled = Set(enabled);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await?;
        info!(promo_timer_id = %id, "promo timer updated");
        Ok(model)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = PromoTimer::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Promo timer {} not found", id)));
        }
        info!(promo_timer_id = %id, "promo timer deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn only_enabled_future_timers_run() {
        let now = Utc::now();
        let timer = |offset: i64, enabled: bool| PromoTimerModel {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            end_time: now + Duration::seconds(offset),
            enabled,
            created_at: now,
            updated_at: now,
        };

        let timers = vec![timer(90, true), timer(-5, true), timer(300, false)];
        let active = running(&timers, now);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].remaining_seconds, 90);
    }
}
