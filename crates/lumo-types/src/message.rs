//! Chat messages: the client model and the backend wire shape.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type MessageId = i64;
pub type ConversationId = i64;

/// Backend code for a plain text message.
pub const TEXT_MESSAGE_TYPE: u8 = 1;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Maps the backend's `message_role` code (1 = assistant, 2 = user).
    pub fn from_wire(code: u8) -> Result<Self, UnknownRole> {
        match code {
            1 => Ok(Role::Assistant),
            2 => Ok(Role::User),
            other => Err(UnknownRole(other)),
        }
    }

    pub fn wire_code(self) -> u8 {
        match self {
            Role::Assistant => 1,
            Role::User => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::User => "you",
            Role::Assistant => "assistant",
        }
    }
}

/// A `message_role` code the client does not understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownRole(pub u8);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message_role {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

/// Whether a message can still receive stream deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Final,
    Streaming,
}

/// One entry of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub reasoning_content: String,
    pub role: Role,
    pub kind: MessageKind,
    pub conversation_id: ConversationId,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_streaming(&self) -> bool {
        self.kind == MessageKind::Streaming
    }

    pub fn has_reasoning(&self) -> bool {
        !self.reasoning_content.is_empty()
    }
}

/// A message as stored and returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: MessageId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub reasoning_content: String,
    #[serde(rename = "type", default = "default_message_type")]
    pub message_type: u8,
    pub message_role: u8,
    #[serde(default)]
    pub user_id: i64,
    pub conversation_id: ConversationId,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_message_type() -> u8 {
    TEXT_MESSAGE_TYPE
}

impl TryFrom<WireMessage> for Message {
    type Error = UnknownRole;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        Ok(Message {
            id: wire.id,
            content: wire.content,
            reasoning_content: wire.reasoning_content,
            role: Role::from_wire(wire.message_role)?,
            kind: MessageKind::Final,
            conversation_id: wire.conversation_id,
            created_at: wire.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_message_maps_roles() {
        let json = r#"{
            "id": 7,
            "created_at": "2025-03-01T10:00:00.123456+08:00",
            "updated_at": "2025-03-01T10:00:00.123456+08:00",
            "content": "hi",
            "reasoning_content": "",
            "type": 1,
            "message_role": 2,
            "user_id": 3,
            "conversation_id": 42,
            "conversation": null
        }"#;
        let wire: WireMessage = serde_json::from_str(json).unwrap();
        let message = Message::try_from(wire).unwrap();

        assert_eq!(message.id, 7);
        assert_eq!(message.role, Role::User);
        assert_eq!(message.kind, MessageKind::Final);
        assert_eq!(message.conversation_id, 42);
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let json = r#"{"id":1,"message_role":9,"conversation_id":1,"created_at":"2025-03-01T10:00:00Z"}"#;
        let wire: WireMessage = serde_json::from_str(json).unwrap();
        assert_eq!(Message::try_from(wire), Err(UnknownRole(9)));
    }
}
