use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Primary key of the only row this table ever holds.
pub const SINGLETON_ID: i32 = 1;

/// Product ids offered as free gifts, stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct GiftProductList(pub Vec<Uuid>);

impl GiftProductList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "gift_popup_config")]
#[schema(as = GiftPopupConfig)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub title: String,
    pub is_active: bool,
    pub min_cart_value: i64,
    pub max_cart_value: Option<i64>,
    pub max_selectable_gifts: i32,
    #[sea_orm(column_type = "Json")]
    #[schema(value_type = Vec<Uuid>)]
    pub gift_products: GiftProductList,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
