//! Login, registration and logout.

use anyhow::{Context, Result};
use lumo_core::api::auth::mask_token;
use lumo_core::api::{AuthContext, AuthStore, StoredAuth};
use lumo_core::config::Config;
use lumo_types::AuthSession;

use super::{api_client_with, request_failed};

pub async fn login(config: &Config, username: &str, password: &str) -> Result<()> {
    let api = api_client_with(config, AuthContext::anonymous())?;
    let session = api
        .login(username, password)
        .await
        .map_err(|e| request_failed(e, "login"))?;
    store(session)
}

pub async fn register(
    config: &Config,
    username: &str,
    password: &str,
    email: Option<&str>,
) -> Result<()> {
    let api = api_client_with(config, AuthContext::anonymous())?;
    let session = api
        .register(username, password, email)
        .await
        .map_err(|e| request_failed(e, "registration"))?;
    store(session)
}

fn store(session: AuthSession) -> Result<()> {
    let store = AuthStore::default();
    let stored = StoredAuth::from(session);
    store.save(&stored).context("save credentials")?;
    tracing::info!(user = %stored.user.username, "logged in");
    println!(
        "Logged in as {} (token {})",
        stored.user.username,
        mask_token(&stored.token)
    );
    println!("Credentials saved to {}", store.path().display());
    Ok(())
}

pub fn logout() -> Result<()> {
    let store = AuthStore::default();
    if store.clear()? {
        println!("Logged out. Removed {}", store.path().display());
    } else {
        println!("Not logged in.");
    }
    Ok(())
}
