// Promotion rule evaluation and record management
pub mod coupons;
pub mod free_products;
pub mod gift_cards;
pub mod gift_popup;
pub mod promo_messages;
pub mod promo_timers;

// Local file storage
pub mod uploads;
