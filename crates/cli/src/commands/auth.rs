//! Sign-in commands for customers and admins.

use std::sync::Arc;

use clap::Subcommand;
use copperpot_storefront::Storefront;
use copperpot_storefront::api::UserProfile;
use copperpot_storefront::auth::{AuthPhase, AuthRealm};
use secrecy::SecretString;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in
    Login {
        #[arg(long, default_value_t = AuthRealm::Customer)]
        realm: AuthRealm,
        /// Account email
        #[arg(short, long)]
        email: String,
        /// Password
        #[arg(long, env = "COPPERPOT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a customer account
    Register {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Account email
        #[arg(short, long)]
        email: String,
        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,
        /// Password
        #[arg(long, env = "COPPERPOT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored tokens
    Logout {
        #[arg(long, default_value_t = AuthRealm::Customer)]
        realm: AuthRealm,
    },
    /// Print the signed-in profile
    Profile {
        #[arg(long, default_value_t = AuthRealm::Customer)]
        realm: AuthRealm,
    },
    /// Keep the session fresh until interrupted
    Watch {
        #[arg(long, default_value_t = AuthRealm::Customer)]
        realm: AuthRealm,
    },
    /// Delete the customer account
    DeleteAccount {
        /// Password confirmation
        #[arg(long, env = "COPPERPOT_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

/// Run an auth command against the stored session for its realm.
///
/// # Errors
///
/// Returns an error if the backend rejects the request or the session has
/// expired.
pub async fn run(
    storefront: &Storefront,
    action: AuthAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        AuthAction::Login { realm, email, password } => {
            let auth = storefront.auth(realm);
            let profile = auth.login(&email, SecretString::from(password)).await?;
            print_profile(realm, &profile);
        }
        AuthAction::Register { name, email, phone, password } => {
            let auth = storefront.customer();
            let profile = auth
                .register(&name, &email, phone.as_deref(), SecretString::from(password))
                .await?;
            print_profile(AuthRealm::Customer, &profile);
        }
        AuthAction::Logout { realm } => {
            let auth = storefront.auth(realm);
            auth.restore().await;
            auth.logout().await;
            println!("Signed out of {realm}.");
        }
        AuthAction::Profile { realm } => {
            let auth = storefront.auth(realm);
            if auth.restore().await == AuthPhase::Unauthenticated {
                println!("Not signed in to {realm}.");
                return Ok(());
            }
            let profile = auth.fetch_profile().await?;
            print_profile(realm, &profile);
        }
        AuthAction::Watch { realm } => watch(storefront, realm).await?,
        AuthAction::DeleteAccount { password } => {
            let auth = storefront.customer();
            auth.restore().await;
            auth.delete_account(SecretString::from(password)).await?;
            println!("Account deleted.");
        }
    }
    Ok(())
}

async fn watch(storefront: &Storefront, realm: AuthRealm) -> Result<(), Box<dyn std::error::Error>> {
    let auth = storefront.auth(realm);
    let phase = auth.restore().await;
    println!("{realm}: {phase:?}");
    if phase == AuthPhase::Unauthenticated {
        return Ok(());
    }

    let mut phases = auth.subscribe();
    let handle = Arc::clone(auth).spawn_expiry_watch(storefront.config().session_check_interval);

    loop {
        tokio::select! {
            changed = phases.changed() => {
                if changed.is_err() {
                    break;
                }
                let phase = *phases.borrow_and_update();
                println!("{realm}: {phase:?}");
                if phase == AuthPhase::Unauthenticated {
                    break;
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    handle.abort();
    Ok(())
}

fn print_profile(realm: AuthRealm, profile: &UserProfile) {
    println!("Signed in to {realm} as {} <{}>", profile.name, profile.email);
    if let Some(role) = &profile.role {
        println!("Role: {role}");
    }
}
