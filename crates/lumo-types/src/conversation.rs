use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::{ConversationId, WireMessage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub last_msg: String,
    #[serde(default)]
    pub last_msg_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// One page of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationPage {
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    pub page: u32,
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
}

/// One page of message history, newest first as the backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    pub page: u32,
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
}
