//! Async effect handlers.
//!
//! Each handler performs one backend call and returns the `UiEvent` that
//! carries its result. The runtime spawns them and delivers the event
//! through the inbox.

use lumo_core::api::ApiClient;
use lumo_core::config::Config;
use lumo_types::{ConversationId, MessageId};

use crate::events::UiEvent;

pub async fn load_history(
    api: ApiClient,
    conversation_id: ConversationId,
    page: u32,
    page_size: u32,
) -> UiEvent {
    let result = api.list_messages(conversation_id, page, page_size).await;
    UiEvent::HistoryLoaded {
        conversation_id,
        page,
        result,
    }
}

pub async fn delete_message(api: ApiClient, message_id: MessageId) -> UiEvent {
    let result = api.delete_message(message_id).await;
    UiEvent::MessageDeleted { message_id, result }
}

pub async fn create_conversation(api: ApiClient, title: Option<String>) -> UiEvent {
    let result = api.create_conversation(title.as_deref()).await;
    UiEvent::ConversationCreated { result }
}

/// Writes the reasoning flag to the config file off the UI thread.
pub async fn save_reasoning_mode(enabled: bool) -> UiEvent {
    let result = tokio::task::spawn_blocking(move || Config::save_reasoning_mode(enabled))
        .await
        .map_err(|e| e.to_string())
        .and_then(|saved| saved.map_err(|e| format!("{e:#}")));
    UiEvent::ReasoningModeSaved { result }
}
