//! Full-screen chat client for lumo.

pub mod common;
pub mod effects;
pub mod events;
pub mod input;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod transcript;
pub mod update;

use std::io::{IsTerminal, Write, stderr};

use anyhow::Result;
use lumo_core::api::ApiClient;
use lumo_core::config::Config;
use lumo_core::stream::StreamClient;
use lumo_types::ConversationId;
pub use runtime::TuiRuntime;

/// Runs the interactive chat screen until the user quits.
///
/// # Errors
/// Returns an error when there is no terminal or the terminal fails.
pub async fn run_chat(
    config: Config,
    api: ApiClient,
    streams: StreamClient,
    conversation: Option<ConversationId>,
) -> Result<()> {
    if !stderr().is_terminal() {
        anyhow::bail!(
            "Chat mode requires a terminal.\n\
             Use `lumo ask <conversation> --prompt '...'` for non-interactive use."
        );
    }

    let mut err = stderr();
    writeln!(err, "lumo chat")?;
    writeln!(err, "Server: {}", api.base_url())?;
    if let Some(id) = conversation {
        writeln!(err, "Conversation: {id}")?;
    }
    err.flush()?;

    let mut runtime = TuiRuntime::new(config, api, streams)?;
    let result = runtime.run(conversation);
    drop(runtime);
    result?;

    writeln!(stderr(), "Goodbye!")?;
    Ok(())
}
