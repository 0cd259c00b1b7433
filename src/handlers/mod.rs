pub mod common;
pub mod coupons;
pub mod free_products;
pub mod gift_cards;
pub mod gift_popup;
pub mod promo_messages;
pub mod promo_timers;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::{
    coupons::CouponService,
    free_products::FreeProductService,
    gift_cards::{CodeFormat, GiftCardService},
    gift_popup::GiftPopupService,
    promo_messages::PromoMessageService,
    promo_timers::PromoTimerService,
    uploads::UploadStore,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub coupons: Arc<CouponService>,
    pub gift_cards: Arc<GiftCardService>,
    pub gift_popup: Arc<GiftPopupService>,
    pub free_products: Arc<FreeProductService>,
    pub promo_messages: Arc<PromoMessageService>,
    pub promo_timers: Arc<PromoTimerService>,
    pub uploads: Arc<UploadStore>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, config: &AppConfig) -> Self {
        let code_format = CodeFormat {
            prefix: config.gift_card_code_prefix.clone(),
            length: config.gift_card_code_length,
        };

        Self {
            coupons: Arc::new(CouponService::new(db_pool.clone())),
            gift_cards: Arc::new(GiftCardService::new(db_pool.clone(), code_format)),
            gift_popup: Arc::new(GiftPopupService::new(db_pool.clone())),
            free_products: Arc::new(FreeProductService::new(db_pool.clone())),
            promo_messages: Arc::new(PromoMessageService::new(db_pool.clone())),
            promo_timers: Arc::new(PromoTimerService::new(db_pool)),
            uploads: Arc::new(UploadStore::new(
                config.upload_dir.clone(),
                config.max_upload_bytes,
            )),
        }
    }
}
