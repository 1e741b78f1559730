//! Events consumed by the reducer.

use crossterm::event::Event;
use lumo_core::api::{ClientResult, LoadedPage};
use lumo_core::stream::SessionSignal;
use lumo_types::{Conversation, ConversationId, MessageId};

#[derive(Debug)]
pub enum UiEvent {
    /// Frame cadence; the only event that triggers a redraw.
    Tick,
    /// Current terminal size, sent first in every loop iteration.
    Frame { width: u16, height: u16 },
    Terminal(Event),
    Stream(SessionSignal),
    HistoryLoaded {
        conversation_id: ConversationId,
        page: u32,
        result: ClientResult<LoadedPage>,
    },
    MessageDeleted {
        message_id: MessageId,
        result: ClientResult<()>,
    },
    ConversationCreated {
        result: ClientResult<Conversation>,
    },
    ReasoningModeSaved {
        result: Result<(), String>,
    },
}
