//! Stream request and decoded stream events.

use serde::{Deserialize, Serialize};

use crate::message::{ConversationId, MessageId, TEXT_MESSAGE_TYPE};

/// Body of the streaming completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub conversation_id: ConversationId,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: u8,
    pub reason_modal: bool,
}

impl StreamRequest {
    pub fn text(conversation_id: ConversationId, content: impl Into<String>, reasoning: bool) -> Self {
        Self {
            conversation_id,
            content: content.into(),
            message_type: TEXT_MESSAGE_TYPE,
            reason_modal: reasoning,
        }
    }
}

/// One typed event decoded from a stream frame.
///
/// `Reasoning` and `Chunk` carry incremental text for the active assistant
/// message. `Complete` and `Done` end the turn; `Complete` may also carry
/// the ids the server assigned to the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Reasoning {
        delta: String,
    },
    Chunk {
        delta: String,
    },
    Complete {
        conversation_id: Option<ConversationId>,
        user_message_id: Option<MessageId>,
        ai_message_id: Option<MessageId>,
    },
    Done {
        conversation_id: Option<ConversationId>,
    },
    Error {
        message: String,
    },
}

impl StreamEvent {
    pub fn reasoning(delta: impl Into<String>) -> Self {
        StreamEvent::Reasoning {
            delta: delta.into(),
        }
    }

    pub fn chunk(delta: impl Into<String>) -> Self {
        StreamEvent::Chunk {
            delta: delta.into(),
        }
    }

    pub fn done() -> Self {
        StreamEvent::Done {
            conversation_id: None,
        }
    }

    /// True for the events that finalize the active message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Complete { .. } | StreamEvent::Done { .. })
    }

    /// Short name matching the wire `type` discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Reasoning { .. } => "reasoning",
            StreamEvent::Chunk { .. } => "chunk",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Done { .. } => "done",
            StreamEvent::Error { .. } => "error",
        }
    }
}
