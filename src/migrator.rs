use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_coupons_table::Migration),
            Box::new(m20250301_000002_create_gift_cards_table::Migration),
            Box::new(m20250301_000003_create_gift_popup_config_table::Migration),
            Box::new(m20250301_000004_create_free_products_table::Migration),
            Box::new(m20250301_000005_create_promo_messages_table::Migration),
            Box::new(m20250301_000006_create_promo_timers_table::Migration),
            Box::new(m20250301_000007_seed_gift_popup_config::Migration),
        ]
    }
}

mod m20250301_000001_create_coupons_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_coupons_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Coupons::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Coupons::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(Coupons::Code)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Coupons::DiscountAmount).big_integer().not_null())
                        .col(ColumnDef::new(Coupons::DiscountType).string_len(16).not_null())
                        .col(
                            ColumnDef::new(Coupons::MinimumCartValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Coupons::MaxUses)
                                .integer()
                                .not_null()
                                .default(-1),
                        )
                        .col(
                            ColumnDef::new(Coupons::UsedCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Coupons::StartDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::EndDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Coupons::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Coupons::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Coupons {
        Table,
        Id,
        Code,
        DiscountAmount,
        DiscountType,
        MinimumCartValue,
        MaxUses,
        UsedCount,
        StartDate,
        EndDate,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000002_create_gift_cards_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_gift_cards_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(GiftCards::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(GiftCards::Id).uuid().not_null().primary_key())
                        .col(
                            ColumnDef::new(GiftCards::Code)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(GiftCards::Title).string_len(255).not_null())
                        .col(ColumnDef::new(GiftCards::InitialAmount).big_integer().not_null())
                        .col(ColumnDef::new(GiftCards::Balance).big_integer().not_null())
                        .col(
                            ColumnDef::new(GiftCards::ExpiryDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GiftCards::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(GiftCards::ImageUrl).string_len(1024).null())
                        .col(
                            ColumnDef::new(GiftCards::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(GiftCards::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GiftCards::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum GiftCards {
        Table,
        Id,
        Code,
        Title,
        InitialAmount,
        Balance,
        ExpiryDate,
        IsActive,
        ImageUrl,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000003_create_gift_popup_config_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_gift_popup_config_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(GiftPopupConfig::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(GiftPopupConfig::Id)
                                .integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(GiftPopupConfig::Title).string_len(255).not_null())
                        .col(
                            ColumnDef::new(GiftPopupConfig::IsActive)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(GiftPopupConfig::MinCartValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(GiftPopupConfig::MaxCartValue).big_integer().null())
                        .col(
                            ColumnDef::new(GiftPopupConfig::MaxSelectableGifts)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(GiftPopupConfig::GiftProducts).json().not_null())
                        .col(
                            ColumnDef::new(GiftPopupConfig::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(GiftPopupConfig::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum GiftPopupConfig {
        Table,
        Id,
        Title,
        IsActive,
        MinCartValue,
        MaxCartValue,
        MaxSelectableGifts,
        GiftProducts,
        UpdatedAt,
    }
}

mod m20250301_000004_create_free_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_free_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FreeProducts::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(FreeProducts::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(FreeProducts::ProductId).uuid().not_null())
                        .col(ColumnDef::new(FreeProducts::MinOrderValue).big_integer().not_null())
                        .col(ColumnDef::new(FreeProducts::MaxOrderValue).big_integer().null())
                        .col(
                            ColumnDef::new(FreeProducts::Enabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(FreeProducts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FreeProducts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_free_products_product_id")
                        .table(FreeProducts::Table)
                        .col(FreeProducts::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FreeProducts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum FreeProducts {
        Table,
        Id,
        ProductId,
        MinOrderValue,
        MaxOrderValue,
        Enabled,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000005_create_promo_messages_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000005_create_promo_messages_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PromoMessages::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(PromoMessages::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(PromoMessages::MinCartValue).big_integer().not_null())
                        .col(ColumnDef::new(PromoMessages::MaxCartValue).big_integer().not_null())
                        .col(ColumnDef::new(PromoMessages::Message).text().not_null())
                        .col(
                            ColumnDef::new(PromoMessages::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PromoMessages::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PromoMessages::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PromoMessages {
        Table,
        Id,
        MinCartValue,
        MaxCartValue,
        Message,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250301_000006_create_promo_timers_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000006_create_promo_timers_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PromoTimers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(PromoTimers::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(PromoTimers::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(PromoTimers::EndTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PromoTimers::Enabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(PromoTimers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PromoTimers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_promo_timers_product_id")
                        .table(PromoTimers::Table)
                        .col(PromoTimers::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PromoTimers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PromoTimers {
        Table,
        Id,
        ProductId,
        EndTime,
        Enabled,
        CreatedAt,
        UpdatedAt,
    }
}

/// Inserts the single gift popup configuration row so reads never have to create it.
mod m20250301_000007_seed_gift_popup_config {
    use super::m20250301_000003_create_gift_popup_config_table::GiftPopupConfig;
    use crate::entities::gift_popup_config::SINGLETON_ID;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000007_seed_gift_popup_config"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let insert = Query::insert()
                .into_table(GiftPopupConfig::Table)
                .columns([
                    GiftPopupConfig::Id,
                    GiftPopupConfig::Title,
                    GiftPopupConfig::IsActive,
                    GiftPopupConfig::MinCartValue,
                    GiftPopupConfig::MaxCartValue,
                    GiftPopupConfig::MaxSelectableGifts,
                    GiftPopupConfig::GiftProducts,
                    GiftPopupConfig::UpdatedAt,
                ])
                .values_panic([
                    SINGLETON_ID.into(),
                    "Choose your free gift".into(),
                    false.into(),
                    0i64.into(),
                    Option::<i64>::None.into(),
                    1i32.into(),
                    serde_json::Value::Array(Vec::new()).into(),
                    chrono::Utc::now().into(),
                ])
                .on_conflict(
                    OnConflict::column(GiftPopupConfig::Id)
                        .do_nothing()
                        .to_owned(),
                )
                .to_owned();

            manager.exec_stmt(insert).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let delete = Query::delete()
                .from_table(GiftPopupConfig::Table)
                .and_where(Expr::col(GiftPopupConfig::Id).eq(SINGLETON_ID))
                .to_owned();

            manager.exec_stmt(delete).await
        }
    }
}
