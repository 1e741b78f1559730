//! Runtime execution modes.
//!
//! - `ask`: one message, reply streamed to stdout
//! - `chat`: full-screen terminal UI (optional feature)

pub mod ask;

#[cfg(feature = "tui")]
pub use lumo_tui::run_chat;

#[cfg(not(feature = "tui"))]
pub async fn run_chat(
    _config: lumo_core::config::Config,
    _api: lumo_core::api::ApiClient,
    _streams: lumo_core::stream::StreamClient,
    _conversation: Option<lumo_types::ConversationId>,
) -> anyhow::Result<()> {
    anyhow::bail!("TUI support is disabled in this build (feature \"tui\").");
}
