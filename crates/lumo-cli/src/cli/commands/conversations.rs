//! Conversation list, create and delete.

use anyhow::Result;
use comfy_table::{ContentArrangement, Table};
use lumo_core::config::Config;
use lumo_types::{Conversation, ConversationId};

use super::{api_client, request_failed};

const PREVIEW_WIDTH: usize = 48;

pub async fn list(config: &Config, page: u32, page_size: u32) -> Result<()> {
    let api = api_client(config)?;
    let listing = api
        .list_conversations(page, page_size)
        .await
        .map_err(|e| request_failed(e, "conversation list"))?;

    if listing.conversations.is_empty() {
        println!("No conversations found.");
        return Ok(());
    }

    println!("{}", table(&listing.conversations));
    println!(
        "Page {} · {} of {} conversations",
        listing.page,
        listing.conversations.len(),
        listing.total
    );
    Ok(())
}

fn table(conversations: &[Conversation]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(["ID", "Title", "Last message", "Updated"]);
    for conversation in conversations {
        let updated = conversation
            .last_msg_at
            .or(conversation.updated_at)
            .unwrap_or(conversation.created_at);
        table.add_row([
            conversation.id.to_string(),
            conversation.title.clone(),
            preview(&conversation.last_msg),
            updated.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

fn preview(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > PREVIEW_WIDTH {
        let cut: String = line.chars().take(PREVIEW_WIDTH - 1).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

pub async fn create(config: &Config, title: Option<&str>) -> Result<()> {
    let api = api_client(config)?;
    let conversation = api
        .create_conversation(title)
        .await
        .map_err(|e| request_failed(e, "conversation create"))?;
    println!("Created conversation {}", conversation.id);
    Ok(())
}

pub async fn delete(config: &Config, id: ConversationId) -> Result<()> {
    let api = api_client(config)?;
    api.delete_conversation(id)
        .await
        .map_err(|e| request_failed(e, "conversation delete"))?;
    println!("Deleted conversation {id}");
    Ok(())
}
