//! Prints one page of history, oldest first.

use std::io::{Write, stdout};

use anyhow::Result;
use lumo_core::config::Config;
use lumo_types::{ConversationId, Message};

use super::{api_client, request_failed};

pub async fn show(
    config: &Config,
    conversation: ConversationId,
    page: u32,
    page_size: Option<u32>,
) -> Result<()> {
    let api = api_client(config)?;
    let page_size = page_size.map_or(config.effective_page_size(), |size| size.clamp(1, 100));
    let loaded = api
        .list_messages(conversation, page.max(1), page_size)
        .await
        .map_err(|e| request_failed(e, "history"))?;

    let mut out = stdout().lock();
    if loaded.messages.is_empty() {
        writeln!(out, "No messages on page {page}.")?;
        return Ok(());
    }
    // The backend returns newest first.
    for message in loaded.messages.iter().rev() {
        write_message(&mut out, message)?;
    }
    if loaded.messages.len() == page_size as usize {
        writeln!(
            out,
            "-- older messages: lumo history {conversation} --page {} --",
            page + 1
        )?;
    }
    Ok(())
}

fn write_message(out: &mut impl Write, message: &Message) -> Result<()> {
    writeln!(
        out,
        "[{}] {} #{}",
        message.created_at.format("%Y-%m-%d %H:%M"),
        message.role.label(),
        message.id
    )?;
    if message.has_reasoning() {
        for line in message.reasoning_content.lines() {
            writeln!(out, "  > {line}")?;
        }
    }
    for line in message.content.lines() {
        writeln!(out, "  {line}")?;
    }
    writeln!(out)?;
    Ok(())
}
