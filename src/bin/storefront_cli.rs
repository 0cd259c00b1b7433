use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use storefront_api::{
    auth::{AuthConfig, AuthService},
    config::{self, AppConfig},
    db::{self, DbPool},
    handlers::{gift_cards::parse_expiry, AppServices},
    services::gift_cards::CreateGiftCardInput,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Token minting only needs configuration, not a database.
        Commands::Token(args) => {
            let config = config::load_config().context("failed to load application config")?;
            handle_token_command(&config, &args, cli.json)?;
        }
        Commands::Migrate => {
            let context = CliContext::initialize().await?;
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::Coupons(command) => {
            let context = CliContext::initialize().await?;
            handle_coupons_command(&context, command, cli.json).await?;
        }
        Commands::GiftCards(command) => {
            let context = CliContext::initialize().await?;
            handle_gift_cards_command(&context, command, cli.json).await?;
        }
        Commands::Popup(command) => {
            let context = CliContext::initialize().await?;
            handle_popup_command(&context, command, cli.json).await?;
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "storefront-cli",
    about = "Administrative tooling for the storefront promotions API",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Mint a signed session token
    Token(TokenArgs),
    #[command(subcommand)]
    Coupons(CouponsCommands),
    #[command(subcommand, name = "gift-cards")]
    GiftCards(GiftCardsCommands),
    #[command(subcommand)]
    Popup(PopupCommands),
}

#[derive(Args)]
struct TokenArgs {
    #[arg(long, help = "Subject (user id) to embed in the token")]
    subject: String,
    #[arg(long, action = ArgAction::SetTrue, help = "Grant the admin claim")]
    admin: bool,
}

#[derive(Subcommand)]
enum CouponsCommands {
    /// List every coupon
    List,
    /// Quote a coupon against a cart value without consuming a use
    Validate(CouponValidateArgs),
}

#[derive(Args)]
struct CouponValidateArgs {
    #[arg(long)]
    code: String,
    #[arg(long, help = "Cart value in minor units")]
    cart_value: i64,
}

#[derive(Subcommand)]
enum GiftCardsCommands {
    /// List every gift card
    List,
    /// Issue a new gift card
    Issue(GiftCardIssueArgs),
    /// Show the balance of a card
    Balance(GiftCardBalanceArgs),
}

#[derive(Args)]
struct GiftCardIssueArgs {
    #[arg(long)]
    title: String,
    #[arg(long, help = "Initial balance in minor units")]
    amount: i64,
    #[arg(long, help = "Expiry as RFC 3339 or YYYY-MM-DD")]
    expires: String,
    #[arg(long, help = "Explicit code; generated when omitted")]
    code: Option<String>,
}

#[derive(Args)]
struct GiftCardBalanceArgs {
    #[arg(long)]
    code: String,
}

#[derive(Subcommand)]
enum PopupCommands {
    /// Show the gift popup configuration
    Show,
    /// Evaluate the gift popup offer for a cart value
    Offer(PopupOfferArgs),
}

#[derive(Args)]
struct PopupOfferArgs {
    #[arg(long, help = "Cart value in minor units")]
    cart_value: i64,
}

struct CliContext {
    db: Arc<DbPool>,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);
        let services = AppServices::new(db.clone(), &config);

        Ok(Self { db, services })
    }
}

#[derive(Serialize)]
struct IssuedToken {
    subject: String,
    is_admin: bool,
    token: String,
}

fn handle_token_command(config: &AppConfig, args: &TokenArgs, json: bool) -> Result<()> {
    let auth = AuthService::new(AuthConfig::new(
        config.jwt_secret.clone(),
        config.auth_cookie_name.clone(),
        Duration::from_secs(config.jwt_expiration),
    ));
    let token = auth
        .issue_token(&args.subject, args.admin)
        .map_err(|e| anyhow!("failed to issue token: {}", e))?;

    if json {
        print_json(&IssuedToken {
            subject: args.subject.clone(),
            is_admin: args.admin,
            token,
        })?;
    } else {
        println!("{}", token);
    }
    Ok(())
}

async fn handle_coupons_command(
    context: &CliContext,
    command: CouponsCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.coupons;
    match command {
        CouponsCommands::List => {
            let coupons = service.list().await.context("failed to list coupons")?;
            if json {
                return print_json(&coupons);
            }
            if coupons.is_empty() {
                println!("No coupons found.");
            }
            for coupon in coupons {
                println!(
                    "- {} • {:?} {} • min {} • used {}/{} • {}",
                    coupon.code,
                    coupon.discount_type,
                    coupon.discount_amount,
                    coupon.minimum_cart_value,
                    coupon.used_count,
                    coupon.max_uses,
                    if coupon.is_active { "active" } else { "inactive" }
                );
            }
        }
        CouponsCommands::Validate(args) => {
            let quote = service
                .validate(&args.code, args.cart_value)
                .await
                .with_context(|| format!("coupon {} rejected", args.code))?;
            if json {
                return print_json(&quote);
            }
            println!("{} • discount {} • {}", quote.code, quote.discount_value, quote.message);
        }
    }
    Ok(())
}

async fn handle_gift_cards_command(
    context: &CliContext,
    command: GiftCardsCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.gift_cards;
    match command {
        GiftCardsCommands::List => {
            let cards = service.list().await.context("failed to list gift cards")?;
            if json {
                return print_json(&cards);
            }
            if cards.is_empty() {
                println!("No gift cards found.");
            }
            for card in cards {
                println!(
                    "- {} • {} • balance {}/{} • expires {}",
                    card.code,
                    card.title,
                    card.balance,
                    card.initial_amount,
                    card.expiry_date.to_rfc3339()
                );
            }
        }
        GiftCardsCommands::Issue(args) => {
            let expiry_date = parse_expiry(&args.expires)
                .ok_or_else(|| anyhow!("invalid expiry date: {}", args.expires))?;
            let card = service
                .create(CreateGiftCardInput {
                    code: args.code,
                    title: args.title,
                    initial_amount: args.amount,
                    expiry_date,
                    is_active: true,
                    image_url: None,
                })
                .await
                .context("failed to issue gift card")?;
            if json {
                return print_json(&card);
            }
            println!("Issued gift card {} with balance {}", card.code, card.balance);
        }
        GiftCardsCommands::Balance(args) => {
            let balance = service
                .balance(&args.code)
                .await
                .with_context(|| format!("failed to look up gift card {}", args.code))?;
            if json {
                return print_json(&balance);
            }
            println!(
                "{} • balance {} • expires {}",
                balance.code,
                balance.balance,
                balance.expiry_date.to_rfc3339()
            );
        }
    }
    Ok(())
}

async fn handle_popup_command(
    context: &CliContext,
    command: PopupCommands,
    json: bool,
) -> Result<()> {
    let service = &context.services.gift_popup;
    match command {
        PopupCommands::Show => {
            let popup = service.config().await.context("failed to load gift popup")?;
            if json {
                return print_json(&popup);
            }
            println!(
                "{} • {} • cart {}..{} • pick {} of {} gifts",
                popup.title,
                if popup.is_active { "active" } else { "inactive" },
                popup.min_cart_value,
                popup
                    .max_cart_value
                    .map(|max| max.to_string())
                    .unwrap_or_default(),
                popup.max_selectable_gifts,
                popup.gift_products.len()
            );
        }
        PopupCommands::Offer(args) => {
            let offer = service
                .offer(args.cart_value)
                .await
                .context("failed to evaluate gift popup")?;
            if json {
                return print_json(&offer);
            }
            if offer.eligible {
                println!(
                    "Eligible • choose up to {} of {:?}",
                    offer.max_selectable, offer.selectable_gifts
                );
            } else {
                println!(
                    "Not eligible{}",
                    offer
                        .amount_to_unlock
                        .map(|amount| format!(" • add {} to unlock", amount))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
