use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront Promotions API",
        version = "0.1.0",
        description = r#"
# Storefront Promotions API

Evaluates coupons, gift cards, free-gift popups, free-product bands and
promotional banners against a cart, and manages those records.

## Money

All amounts (cart values, discounts, balances, thresholds) are integers in the
smallest currency unit.

## Authentication

Public endpoints need no credentials. Endpoints under `/api/admin` require a
JWT carrying `is_admin: true`, sent in the session cookie (default name
`token`) or as `Authorization: Bearer <token>`.

## Errors

```json
{
  "error": "Bad Request",
  "message": "Coupon is inactive",
  "request_id": "0d5f...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Coupons", description = "Coupon validation and usage"),
        (name = "Gift Cards", description = "Gift card balance and redemption"),
        (name = "Gift Popup", description = "Free-gift popup offers"),
        (name = "Free Products", description = "Automatic free products by order value"),
        (name = "Promo Messages", description = "Cart-value banners"),
        (name = "Promo Timers", description = "Product countdowns"),
        (name = "Admin", description = "Administrative endpoints")
    ),
    paths(
        // Coupons
        crate::handlers::coupons::validate_coupon,
        crate::handlers::coupons::apply_coupon,
        crate::handlers::coupons::create_coupon,

        // Gift cards
        crate::handlers::gift_cards::redeem_gift_card,
        crate::handlers::gift_cards::gift_card_balance,

        // Gift popup
        crate::handlers::gift_popup::get_active_popup,
        crate::handlers::gift_popup::get_offer,

        // Free products
        crate::handlers::free_products::list_free_products,
        crate::handlers::free_products::check_eligibility,

        // Promo messages
        crate::handlers::promo_messages::list_messages,
        crate::handlers::promo_messages::best_message,

        // Promo timers
        crate::handlers::promo_timers::timers_for_product,
    ),
    components(
        schemas(
            crate::entities::coupon::Model,
            crate::entities::coupon::DiscountType,
            crate::entities::gift_card::Model,
            crate::entities::gift_popup_config::Model,
            crate::entities::free_product::Model,
            crate::entities::promo_message::Model,
            crate::entities::promo_timer::Model,
            crate::services::coupons::UpdateCouponInput,
            crate::services::gift_popup::UpdateGiftPopupInput,
            crate::services::free_products::CreateFreeProductInput,
            crate::services::free_products::UpdateFreeProductInput,
            crate::services::promo_messages::CreatePromoMessageInput,
            crate::services::promo_messages::UpdatePromoMessageInput,
            crate::services::promo_timers::CreatePromoTimerInput,
            crate::services::promo_timers::UpdatePromoTimerInput,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
