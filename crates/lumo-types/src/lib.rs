//! Shared wire and domain types for lumo.
//!
//! Everything here is plain data: the backend's JSON shapes and the
//! client-side message model the engine mutates.

pub mod account;
pub mod conversation;
pub mod message;
pub mod stream;

pub use account::{AuthSession, User};
pub use conversation::{Conversation, ConversationPage, HistoryPage};
pub use message::{
    ConversationId, Message, MessageId, MessageKind, Role, UnknownRole, WireMessage,
};
pub use stream::{StreamEvent, StreamRequest};
