//! The loaded message window of one conversation.
//!
//! Messages are kept oldest first. History pages arrive newest first and
//! are reversed on the way in; page 1 replaces the window and later pages
//! are prepended. The last entry may be an assistant message that is
//! still streaming, and there is never more than one of those.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use lumo_types::{ConversationId, Message, MessageId, MessageKind, Role, StreamEvent};

/// Content given to an assistant reply that finished without any text.
pub const FALLBACK_EMPTY: &str = "The assistant returned no answer. Please try again.";
/// Content given to an assistant reply whose connection failed.
pub const FALLBACK_CONNECTION: &str = "Connection to the server failed. Please try again later.";
/// Content given to an empty assistant reply the user cancelled.
pub const CANCELLED_TEXT: &str = "Response cancelled.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    NoConversation,
    StreamingInProgress,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NoConversation => write!(f, "no conversation is open"),
            StoreError::StreamingInProgress => write!(f, "a reply is still streaming"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Pagination cursor over the backend's history pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    /// Last page merged into the window; 0 before the first load.
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
    pub loading: bool,
}

impl PageCursor {
    fn new(page_size: u32) -> Self {
        Self {
            page: 0,
            page_size,
            has_more: false,
            loading: false,
        }
    }
}

/// Ids of messages whose reasoning is shown expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpandedSet(BTreeSet<MessageId>);

impl ExpandedSet {
    pub fn contains(&self, id: MessageId) -> bool {
        self.0.contains(&id)
    }

    pub fn insert(&mut self, id: MessageId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: MessageId) -> bool {
        self.0.remove(&id)
    }

    /// Flips the marker for `id`; returns whether it is now expanded.
    pub fn toggle(&mut self, id: MessageId) -> bool {
        if self.0.remove(&id) {
            false
        } else {
            self.0.insert(id);
            true
        }
    }

    pub fn rename(&mut self, from: MessageId, to: MessageId) {
        if self.0.remove(&from) {
            self.0.insert(to);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Flags of the turn currently being answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnState {
    /// Reasoning deltas arrived since the last answer delta.
    pub reasoning_active: bool,
    /// A submitted turn has not finished yet.
    pub loading: bool,
}

/// What one batch did to the window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub changed: bool,
    /// Id of the assistant message a terminal event finalized.
    pub finished: Option<MessageId>,
    /// Texts of `error` events seen in the batch.
    pub errors: Vec<String>,
}

impl BatchOutcome {
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }
}

/// Strictly increasing millisecond ids for client-created messages.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: MessageId,
}

impl IdGenerator {
    pub fn next_at(&mut self, now_ms: MessageId) -> MessageId {
        self.last = now_ms.max(self.last + 1);
        self.last
    }

    pub fn next(&mut self) -> MessageId {
        self.next_at(Utc::now().timestamp_millis())
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptStore {
    conversation_id: Option<ConversationId>,
    messages: Vec<Message>,
    cursor: PageCursor,
    ids: IdGenerator,
    live_user: Option<MessageId>,
}

impl TranscriptStore {
    pub fn new(page_size: u32) -> Self {
        Self {
            conversation_id: None,
            messages: Vec::new(),
            cursor: PageCursor::new(page_size),
            ids: IdGenerator::default(),
            live_user: None,
        }
    }

    /// Starts an empty window for `conversation_id`.
    pub fn open(&mut self, conversation_id: ConversationId) {
        self.discard();
        self.conversation_id = Some(conversation_id);
    }

    /// Drops the window and forgets the conversation.
    pub fn discard(&mut self) {
        let page_size = self.cursor.page_size;
        self.conversation_id = None;
        self.messages.clear();
        self.cursor = PageCursor::new(page_size);
        self.live_user = None;
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub(crate) fn cursor_mut(&mut self) -> &mut PageCursor {
        &mut self.cursor
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.get(id).is_some()
    }

    /// Index of the assistant message receiving deltas, if any.
    pub fn active_index(&self) -> Option<usize> {
        let last = self.messages.len().checked_sub(1)?;
        let msg = &self.messages[last];
        (msg.role == Role::Assistant && msg.is_streaming()).then_some(last)
    }

    pub fn active(&self) -> Option<&Message> {
        self.active_index().map(|i| &self.messages[i])
    }

    pub fn has_streaming(&self) -> bool {
        self.messages.iter().any(Message::is_streaming)
    }

    /// Merges one history page given newest first.
    ///
    /// Page 1 replaces the window. A live exchange still in progress stays
    /// at the tail. Later pages are prepended, skipping ids already loaded.
    pub fn apply_page(&mut self, page: u32, mut newest_first: Vec<Message>) {
        let fetched = newest_first.len();
        newest_first.reverse();
        let mut incoming = newest_first;

        if page <= 1 {
            let tail: Vec<Message> = self
                .live_tail()
                .into_iter()
                .filter(|live| !incoming.iter().any(|m| m.id == live.id))
                .collect();
            incoming.extend(tail);
            self.messages = incoming;
            self.cursor.page = 1;
        } else {
            incoming.retain(|m| !self.contains(m.id));
            let skipped = fetched - incoming.len();
            if skipped > 0 {
                tracing::debug!(page, skipped, "skipped messages already in window");
            }
            incoming.append(&mut self.messages);
            self.messages = incoming;
            self.cursor.page = self.cursor.page.max(page);
        }

        self.cursor.has_more = fetched == self.cursor.page_size as usize;
        self.cursor.loading = false;
        tracing::debug!(
            page,
            fetched,
            window = self.messages.len(),
            has_more = self.cursor.has_more,
            "history page applied"
        );
    }

    fn live_tail(&self) -> Vec<Message> {
        let Some(active) = self.active_index() else {
            return Vec::new();
        };
        let start = self
            .live_user
            .and_then(|id| self.messages.iter().position(|m| m.id == id))
            .filter(|&i| i < active)
            .unwrap_or(active);
        self.messages[start..].to_vec()
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.messages.last() {
            Some(last) if last.created_at >= now => last.created_at + Duration::milliseconds(1),
            _ => now,
        }
    }

    /// Appends the echo of an outgoing user message.
    ///
    /// # Errors
    /// Fails when no conversation is open.
    pub fn append_live_user(&mut self, content: &str) -> Result<MessageId, StoreError> {
        let conversation_id = self.conversation_id.ok_or(StoreError::NoConversation)?;
        let message = Message {
            id: self.ids.next(),
            content: content.to_string(),
            reasoning_content: String::new(),
            role: Role::User,
            kind: MessageKind::Final,
            conversation_id,
            created_at: self.next_timestamp(),
        };
        let id = message.id;
        self.messages.push(message);
        self.live_user = Some(id);
        Ok(id)
    }

    /// Appends the empty assistant message the stream will fill.
    ///
    /// # Errors
    /// Fails when no conversation is open or a reply is already streaming.
    pub fn append_live_assistant_placeholder(&mut self) -> Result<MessageId, StoreError> {
        let conversation_id = self.conversation_id.ok_or(StoreError::NoConversation)?;
        if self.has_streaming() {
            return Err(StoreError::StreamingInProgress);
        }
        let message = Message {
            id: self.ids.next(),
            content: String::new(),
            reasoning_content: String::new(),
            role: Role::Assistant,
            kind: MessageKind::Streaming,
            conversation_id,
            created_at: self.next_timestamp(),
        };
        let id = message.id;
        self.messages.push(message);
        Ok(id)
    }

    /// Applies a batch of stream events in order.
    ///
    /// Work happens on a copy of the active message, the expanded set and
    /// the turn flags; the copies are written back together at the end.
    pub fn apply_batch(
        &mut self,
        events: &[StreamEvent],
        expanded: &mut ExpandedSet,
        turn: &mut TurnState,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let Some(index) = self.active_index() else {
            if !events.is_empty() {
                tracing::debug!(events = events.len(), "batch without an active message ignored");
            }
            return outcome;
        };

        let mut msg = self.messages[index].clone();
        let mut staged_expanded = expanded.clone();
        let mut staged_turn = *turn;
        let mut user_rename = None;

        for event in events {
            if !msg.is_streaming() {
                tracing::debug!(kind = event.kind(), "event after finalization ignored");
                continue;
            }
            match event {
                StreamEvent::Reasoning { delta } => {
                    msg.reasoning_content.push_str(delta);
                    if !staged_turn.reasoning_active {
                        staged_turn.reasoning_active = true;
                        staged_expanded.insert(msg.id);
                    }
                    outcome.changed = true;
                }
                StreamEvent::Chunk { delta } => {
                    msg.content.push_str(delta);
                    staged_turn.reasoning_active = false;
                    outcome.changed = true;
                }
                StreamEvent::Error { message } => {
                    if msg.content.is_empty() {
                        msg.content.clone_from(message);
                    }
                    outcome.errors.push(message.clone());
                    outcome.changed = true;
                }
                StreamEvent::Complete {
                    user_message_id,
                    ai_message_id,
                    ..
                } => {
                    let old_id = msg.id;
                    Self::finalize(&mut msg, &mut staged_expanded, &mut staged_turn);
                    if let Some(new_id) = *ai_message_id {
                        if self.can_adopt(old_id, new_id) {
                            msg.id = new_id;
                            staged_expanded.rename(old_id, new_id);
                        }
                    }
                    if let (Some(live), Some(new_id)) = (self.live_user, *user_message_id) {
                        if self.can_adopt(live, new_id) && new_id != msg.id {
                            user_rename = Some((live, new_id));
                        }
                    }
                    outcome.finished = Some(msg.id);
                    outcome.changed = true;
                }
                StreamEvent::Done { .. } => {
                    Self::finalize(&mut msg, &mut staged_expanded, &mut staged_turn);
                    outcome.finished = Some(msg.id);
                    outcome.changed = true;
                }
            }
        }

        if let Some((from, to)) = user_rename {
            if let Some(user) = self.messages.iter_mut().find(|m| m.id == from) {
                user.id = to;
            }
            staged_expanded.rename(from, to);
        }
        if outcome.finished.is_some() {
            self.live_user = None;
        }
        self.messages[index] = msg;
        *expanded = staged_expanded;
        *turn = staged_turn;

        tracing::debug!(
            events = events.len(),
            finished = outcome.is_finished(),
            errors = outcome.errors.len(),
            "batch applied"
        );
        outcome
    }

    fn finalize(msg: &mut Message, expanded: &mut ExpandedSet, turn: &mut TurnState) {
        if msg.content.is_empty() {
            msg.content = FALLBACK_EMPTY.to_string();
        }
        msg.kind = MessageKind::Final;
        turn.reasoning_active = false;
        turn.loading = false;
        // Finished reasoning collapses.
        expanded.remove(msg.id);
    }

    fn can_adopt(&self, current: MessageId, new_id: MessageId) -> bool {
        if current == new_id {
            return false;
        }
        if self.contains(new_id) {
            tracing::warn!(current, new_id, "server id already in window, keeping client id");
            return false;
        }
        true
    }

    /// Ends the active reply after a transport failure.
    ///
    /// The reply keeps whatever reasoning and text it had and is frozen as
    /// is; one separate assistant entry carrying `text` follows it. Returns
    /// false when nothing was streaming.
    pub fn fail_active(&mut self, text: &str) -> bool {
        let Some(index) = self.active_index() else {
            return false;
        };
        self.live_user = None;
        let created_at = self.next_timestamp();
        let msg = &mut self.messages[index];
        msg.kind = MessageKind::Final;
        let conversation_id = msg.conversation_id;
        let fallback = Message {
            id: self.ids.next(),
            content: text.to_string(),
            reasoning_content: String::new(),
            role: Role::Assistant,
            kind: MessageKind::Final,
            conversation_id,
            created_at,
        };
        self.messages.push(fallback);
        true
    }

    /// Freezes the active reply after the user cancelled it.
    pub fn finalize_cancelled(&mut self) -> Option<MessageId> {
        let index = self.active_index()?;
        self.live_user = None;
        let msg = &mut self.messages[index];
        msg.kind = MessageKind::Final;
        if msg.content.is_empty() {
            msg.content = CANCELLED_TEXT.to_string();
        }
        Some(msg.id)
    }

    /// Removes the one entry with `id`, keeping the order of the rest.
    pub fn remove_message(&mut self, id: MessageId) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        if self.live_user == Some(id) {
            self.live_user = None;
        }
        Some(self.messages.remove(index))
    }

    /// Id of the most recent assistant message that has reasoning text.
    pub fn last_with_reasoning(&self) -> Option<MessageId> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant && m.has_reasoning())
            .map(|m| m.id)
    }
}
