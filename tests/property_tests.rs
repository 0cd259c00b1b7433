//! Property-based checks of the pricing and matching rules.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use storefront_api::entities::{
    coupon::{self, DiscountType},
    gift_card,
    gift_popup_config::{self, GiftProductList},
    promo_message,
};
use storefront_api::errors::ServiceError;
use storefront_api::services::{
    coupons::{compute_discount, evaluate, normalize_code},
    gift_cards::redemption_rejection,
    free_products::bands_overlap,
    gift_popup::evaluate_offer,
    promo_messages::{matching, select},
};
use uuid::Uuid;

fn discount_type_strategy() -> impl Strategy<Value = DiscountType> {
    prop_oneof![Just(DiscountType::Percentage), Just(DiscountType::Fixed)]
}

fn band_strategy() -> impl Strategy<Value = (i64, Option<i64>)> {
    (0i64..10_000, proptest::option::of(0i64..10_000))
        .prop_map(|(min, span)| (min, span.map(|s| min + s)))
}

fn message_strategy() -> impl Strategy<Value = promo_message::Model> {
    (0i64..5_000, 0i64..5_000, 0i64..1_000).prop_map(|(min, span, age)| {
        let created = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_else(Utc::now)
            + Duration::seconds(age);
        promo_message::Model {
            id: Uuid::new_v4(),
            min_cart_value: min,
            max_cart_value: min + span,
            message: format!("{}-{}", min, min + span),
            created_at: created,
            updated_at: created,
        }
    })
}

fn usable_coupon(discount_type: DiscountType, amount: i64, minimum: i64) -> coupon::Model {
    let now = Utc::now();
    coupon::Model {
        id: Uuid::new_v4(),
        code: "PROP".into(),
        discount_amount: amount,
        discount_type,
        minimum_cart_value: minimum,
        max_uses: coupon::UNLIMITED_USES,
        used_count: 0,
        start_date: now - Duration::days(1),
        end_date: now + Duration::days(1),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

fn live_card(balance: i64) -> gift_card::Model {
    let now = Utc::now();
    gift_card::Model {
        id: Uuid::new_v4(),
        code: "GC-PROP".into(),
        title: "Prop".into(),
        initial_amount: balance,
        balance,
        expiry_date: now + Duration::days(30),
        is_active: true,
        image_url: None,
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn carts_below_minimum_are_never_valid(
        discount_type in discount_type_strategy(),
        amount in 1i64..=100,
        minimum in 1i64..100_000,
        shortfall in 1i64..100_000,
    ) {
        let coupon = usable_coupon(discount_type, amount, minimum);
        let cart = (minimum - shortfall).max(0);
        let result = evaluate(&coupon, cart, Utc::now());
        let is_threshold = matches!(result, Err(ServiceError::ThresholdNotMet { required, .. }) if required == minimum);
        prop_assert!(is_threshold);
    }

    #[test]
    fn percentage_matches_rounded_formula(percent in 1i64..=100, cart in 0i64..1_000_000) {
        let coupon = usable_coupon(DiscountType::Percentage, percent, 0);
        let quote = evaluate(&coupon, cart, Utc::now()).map_err(|e| TestCaseError::fail(e.to_string()))?;
        // Half-up rounding on non-negative integers.
        let expected = (cart * percent * 2 + 100) / 200;
        prop_assert_eq!(quote.discount_value, expected.min(cart));
    }

    #[test]
    fn redemption_above_balance_is_rejected(balance in 0i64..1_000_000, excess in 1i64..1_000) {
        let card = live_card(balance);
        let over = redemption_rejection(&card, balance + excess, Utc::now());
        prop_assert!(matches!(over, Some(ServiceError::InsufficientBalance(_))));
        prop_assert!(redemption_rejection(&card, balance, Utc::now()).is_none());
    }

    #[test]
    fn discount_is_bounded_by_cart(
        discount_type in discount_type_strategy(),
        amount in 0i64..200_000,
        cart in 0i64..1_000_000,
    ) {
        let discount = compute_discount(discount_type, amount, cart);
        prop_assert!(discount >= 0);
        prop_assert!(discount <= cart);
    }

    #[test]
    fn percentage_discount_grows_with_cart(
        percent in 1i64..=100,
        cart in 0i64..1_000_000,
        extra in 0i64..10_000,
    ) {
        let smaller = compute_discount(DiscountType::Percentage, percent, cart);
        let larger = compute_discount(DiscountType::Percentage, percent, cart + extra);
        prop_assert!(smaller <= larger);
    }

    #[test]
    fn hundred_percent_is_the_whole_cart(cart in 0i64..1_000_000) {
        prop_assert_eq!(compute_discount(DiscountType::Percentage, 100, cart), cart);
    }

    #[test]
    fn code_normalization_is_idempotent(code in "[ a-zA-Z0-9_-]{0,20}") {
        let once = normalize_code(&code);
        prop_assert_eq!(normalize_code(&once), once.clone());
        prop_assert_eq!(normalize_code(&code.to_lowercase()), once);
    }

    #[test]
    fn band_overlap_is_symmetric_and_reflexive(a in band_strategy(), b in band_strategy()) {
        prop_assert_eq!(bands_overlap(a, b), bands_overlap(b, a));
        prop_assert!(bands_overlap(a, a));
    }

    #[test]
    fn best_message_heads_the_matching_list(
        messages in proptest::collection::vec(message_strategy(), 0..12),
        cart in 0i64..10_000,
    ) {
        let ranked = matching(&messages, cart);
        let best = select(&messages, cart);
        prop_assert_eq!(ranked.first().map(|m| m.id), best.map(|m| m.id));
        prop_assert!(ranked.iter().all(|m| m.min_cart_value <= cart && cart <= m.max_cart_value));
    }

    #[test]
    fn gift_offer_never_exceeds_configured_choices(
        is_active in any::<bool>(),
        min in 0i64..10_000,
        span in proptest::option::of(1i64..10_000),
        max_selectable in 1i32..6,
        gift_count in 0usize..6,
        cart in 0i64..25_000,
    ) {
        let config = gift_popup_config::Model {
            id: gift_popup_config::SINGLETON_ID,
            title: "Gifts".into(),
            is_active,
            min_cart_value: min,
            max_cart_value: span.map(|s| min + s),
            max_selectable_gifts: max_selectable,
            gift_products: GiftProductList((0..gift_count).map(|_| Uuid::new_v4()).collect()),
            updated_at: Utc::now(),
        };

        let offer = evaluate_offer(&config, cart);
        prop_assert!(offer.max_selectable <= gift_count);
        prop_assert!(offer.max_selectable <= max_selectable as usize);
        if !offer.eligible {
            prop_assert_eq!(offer.max_selectable, 0);
            prop_assert!(offer.selectable_gifts.is_empty());
        }
        if let Some(unlock) = offer.amount_to_unlock {
            prop_assert!(!offer.eligible);
            prop_assert_eq!(cart + unlock, min);
        }
    }
}
