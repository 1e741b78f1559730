//! CLI command handlers.

pub mod ask;
pub mod auth;
pub mod chat;
pub mod config;
pub mod conversations;
pub mod history;
pub mod messages;

use anyhow::{Context, Result};
use lumo_core::api::{ApiClient, AuthContext, AuthStore, ClientError};
use lumo_core::config::Config;
use lumo_core::stream::StreamClient;

/// REST client using the stored login, if any.
pub(crate) fn api_client(config: &Config) -> Result<ApiClient> {
    let auth = AuthStore::default().context()?;
    api_client_with(config, auth)
}

pub(crate) fn api_client_with(config: &Config, auth: AuthContext) -> Result<ApiClient> {
    let base_url = config.effective_base_url()?;
    ApiClient::new(base_url, auth, config.request_timeout()).context("create API client")
}

pub(crate) fn stream_client(config: &Config, api: &ApiClient) -> Result<StreamClient> {
    let base_url = config.effective_base_url()?;
    StreamClient::new(base_url, api.auth().clone()).context("create stream client")
}

/// Wraps a backend error for display, pointing at `lumo login` on 401.
pub(crate) fn request_failed(err: ClientError, what: &str) -> anyhow::Error {
    let hint = if err.is_unauthorized() {
        " (run `lumo login` first)"
    } else {
        ""
    };
    anyhow::Error::new(err).context(format!("{what} failed{hint}"))
}
