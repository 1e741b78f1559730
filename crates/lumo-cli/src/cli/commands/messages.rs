//! Message mutations.

use anyhow::Result;
use lumo_core::config::Config;
use lumo_types::MessageId;

use super::{api_client, request_failed};

pub async fn delete(config: &Config, id: MessageId) -> Result<()> {
    let api = api_client(config)?;
    api.delete_message(id)
        .await
        .map_err(|e| request_failed(e, "message delete"))?;
    println!("Deleted message {id}");
    Ok(())
}
