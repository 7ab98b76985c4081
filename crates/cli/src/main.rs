//! Copperpot CLI - drive the storefront SDK from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the guest session id
//! copperpot session
//!
//! # Cart
//! copperpot cart add 12 --quantity 2
//! copperpot cart show
//!
//! # Sign in and keep the session fresh
//! copperpot auth login --realm customer -e amina@example.com
//! copperpot auth watch --realm customer
//!
//! # Send the cart as a WhatsApp order
//! copperpot checkout -n "Amina Odhiambo" -p "0712 345 678" -a "14 Riverside Drive" -l 1
//! ```
//!
//! # Commands
//!
//! - `session` - Print the guest session id
//! - `wishlist` - Manage the local wishlist
//! - `cart` - Manage the server-side cart
//! - `delivery` - List delivery locations
//! - `auth` - Sign in, register, refresh and sign out (customer or admin)
//! - `checkout` - Build the WhatsApp order link and clear the cart
//!
//! Configuration is read from the environment (and `.env`); see
//! `StorefrontConfig` for the variables.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Command output goes to stdout, config failures to stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use copperpot_storefront::notify::TracingNotifier;
use copperpot_storefront::{Storefront, StorefrontConfig};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "copperpot")]
#[command(author, version, about = "Copperpot storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the guest session id
    Session,
    /// Manage the local wishlist
    Wishlist {
        #[command(subcommand)]
        action: commands::wishlist::WishlistAction,
    },
    /// Manage the server-side cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// List delivery locations
    Delivery {
        /// Include inactive locations
        #[arg(long)]
        all: bool,
    },
    /// Customer and admin sign-in
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Build the WhatsApp order link for the cart, then clear the cart
    Checkout(commands::checkout::CheckoutArgs),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "copperpot_storefront=info,copperpot_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let storefront = Storefront::from_config(config, Arc::new(TracingNotifier))?;

    match cli.command {
        Commands::Session => println!("{}", storefront.session_id()),
        Commands::Wishlist { action } => commands::wishlist::run(&storefront, action),
        Commands::Cart { action } => commands::cart::run(&storefront, action).await?,
        Commands::Delivery { all } => commands::delivery::list(&storefront, all).await?,
        Commands::Auth { action } => commands::auth::run(&storefront, action).await?,
        Commands::Checkout(args) => commands::checkout::run(&storefront, args).await?,
    }
    Ok(())
}
