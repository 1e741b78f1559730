//! Effects returned by the reducer.
//!
//! Only I/O lives here. Frame requests and scroll pinning coming out of
//! the chat view are absorbed into state by the reducer and never reach
//! the runtime.

use lumo_core::stream::SessionId;
use lumo_types::{ConversationId, MessageId, StreamRequest};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum UiEffect {
    Quit,
    LoadHistory {
        conversation_id: ConversationId,
        page: u32,
        page_size: u32,
    },
    /// Spawn the transport task for a session.
    OpenStream {
        session: SessionId,
        request: StreamRequest,
        cancel: CancellationToken,
    },
    DeleteMessage {
        message_id: MessageId,
    },
    CreateConversation {
        title: Option<String>,
    },
    SaveReasoningMode {
        enabled: bool,
    },
}
