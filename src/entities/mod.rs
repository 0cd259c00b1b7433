pub mod coupon;
pub mod free_product;
pub mod gift_card;
pub mod gift_popup_config;
pub mod promo_message;
pub mod promo_timer;
