//! Ask command handler.

use anyhow::Result;
use lumo_core::config::Config;
use lumo_types::ConversationId;

use super::{api_client, stream_client};
use crate::modes;

pub async fn run(config: &Config, conversation: ConversationId, prompt: &str) -> Result<()> {
    let api = api_client(config)?;
    let streams = stream_client(config, &api)?;
    modes::ask::run_ask(config, api, streams, conversation, prompt).await
}
