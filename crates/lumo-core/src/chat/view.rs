//! The conversation view state machine.
//!
//! [`ChatView`] owns the transcript, the expanded-reasoning set, the
//! coalescer, the pagination controller and the current stream session.
//! It never performs I/O: every method returns [`ViewEffect`]s that the
//! host carries out, feeding results back through the `on_*` methods.

use lumo_types::{ConversationId, Message, MessageId, StreamEvent, StreamRequest};
use tokio_util::sync::CancellationToken;

use super::coalescer::Coalescer;
use super::error::{EngineError, SubmitRejected};
use super::notice::Notice;
use super::pagination::{AutoScroll, PaginationController, ScrollThresholds, Viewport};
use super::transcript::{
    BatchOutcome, ExpandedSet, FALLBACK_CONNECTION, StoreError, TranscriptStore, TurnState,
};
use crate::api::client::LoadedPage;
use crate::api::error::{ClientError, ClientResult};
use crate::config::Config;
use crate::stream::session::{
    SessionId, SessionObserver, SessionSignal, SessionStatus, StreamSession,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewConfig {
    pub page_size: u32,
    pub reasoning_mode: bool,
    pub thresholds: ScrollThresholds,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            reasoning_mode: false,
            thresholds: ScrollThresholds::default(),
        }
    }
}

impl ViewConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.effective_page_size(),
            reasoning_mode: config.reasoning_mode,
            thresholds: config.scroll_thresholds(),
        }
    }
}

/// Work the host must perform for the view.
#[derive(Debug, Clone)]
pub enum ViewEffect {
    LoadHistory {
        conversation_id: ConversationId,
        page: u32,
        page_size: u32,
    },
    /// Start the transport for `session`; it must stop when `cancel` fires.
    OpenStream {
        session: SessionId,
        request: StreamRequest,
        cancel: CancellationToken,
    },
    DeleteMessage {
        message_id: MessageId,
    },
    /// Call [`ChatView::on_frame`] on the next frame.
    RequestFrame,
    ScrollToBottom,
}

/// Everything the session callbacks touch.
#[derive(Debug)]
struct ViewState {
    store: TranscriptStore,
    expanded: ExpandedSet,
    coalescer: Coalescer,
    pagination: PaginationController,
    turn: TurnState,
    notices: Vec<Notice>,
    frame_requested: bool,
    grew: bool,
}

impl ViewState {
    fn apply(&mut self, batch: &[StreamEvent]) -> BatchOutcome {
        let outcome = self
            .store
            .apply_batch(batch, &mut self.expanded, &mut self.turn);
        for text in &outcome.errors {
            self.notices.push(Notice::error(text.clone()));
        }
        if outcome.changed {
            self.grew = true;
        }
        outcome
    }

    fn take_effects(&mut self) -> Vec<ViewEffect> {
        let mut effects = Vec::new();
        if std::mem::take(&mut self.frame_requested) {
            effects.push(ViewEffect::RequestFrame);
        }
        if std::mem::take(&mut self.grew)
            && self.pagination.on_transcript_grew() == AutoScroll::Pin
        {
            effects.push(ViewEffect::ScrollToBottom);
        }
        effects
    }
}

impl SessionObserver for ViewState {
    fn on_event(&mut self, event: StreamEvent) {
        if self.coalescer.push(event) {
            self.frame_requested = true;
        }
    }

    fn on_error(&mut self, error: &ClientError) {
        // Whatever arrived before the failure still lands in the transcript.
        let pending = self.coalescer.drain_now();
        if !pending.is_empty() {
            self.apply(&pending);
        }
        if self.store.fail_active(FALLBACK_CONNECTION) {
            self.grew = true;
        }
        self.turn = TurnState::default();
        self.notices.push(Notice::error(
            EngineError::Transport(error.clone()).to_string(),
        ));
    }

    fn on_close(&mut self, status: SessionStatus) {
        if status == SessionStatus::Closed && self.store.has_streaming() {
            tracing::debug!("stream ended without a terminal frame");
            self.on_event(StreamEvent::done());
        }
    }
}

#[derive(Debug)]
pub struct ChatView {
    config: ViewConfig,
    session: Option<StreamSession>,
    session_seq: u64,
    state: ViewState,
}

impl ChatView {
    pub fn new(config: ViewConfig) -> Self {
        Self {
            config,
            session: None,
            session_seq: 0,
            state: ViewState {
                store: TranscriptStore::new(config.page_size),
                expanded: ExpandedSet::default(),
                coalescer: Coalescer::new(),
                pagination: PaginationController::new(config.thresholds),
                turn: TurnState::default(),
                notices: Vec::new(),
                frame_requested: false,
                grew: false,
            },
        }
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.state.store.conversation_id()
    }

    pub fn messages(&self) -> &[Message] {
        self.state.store.messages()
    }

    pub fn store(&self) -> &TranscriptStore {
        &self.state.store
    }

    pub fn expanded(&self) -> &ExpandedSet {
        &self.state.expanded
    }

    pub fn is_expanded(&self, id: MessageId) -> bool {
        self.state.expanded.contains(id)
    }

    pub fn turn(&self) -> TurnState {
        self.state.turn
    }

    pub fn reasoning_mode(&self) -> bool {
        self.config.reasoning_mode
    }

    pub fn set_reasoning_mode(&mut self, enabled: bool) {
        self.config.reasoning_mode = enabled;
    }

    pub fn session_status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map_or(SessionStatus::Idle, StreamSession::status)
    }

    /// Frames the decoder dropped in the current or last session.
    pub fn dropped_frames(&self) -> u64 {
        self.session.as_ref().map_or(0, StreamSession::dropped_frames)
    }

    /// True while a turn is in progress.
    pub fn is_busy(&self) -> bool {
        self.state.turn.loading
            || self.session.as_ref().is_some_and(StreamSession::is_active)
            || self.state.store.has_streaming()
    }

    pub fn is_pinned(&self) -> bool {
        self.state.pagination.is_pinned()
    }

    pub fn show_jump(&self) -> bool {
        self.state.pagination.show_jump()
    }

    pub fn is_loading_history(&self) -> bool {
        self.state.store.cursor().loading
    }

    pub fn has_more_history(&self) -> bool {
        self.state.store.cursor().has_more
    }

    /// Switches to `conversation_id` and asks for its newest page.
    pub fn open(&mut self, conversation_id: ConversationId) -> Vec<ViewEffect> {
        self.teardown();
        self.state.store.open(conversation_id);
        tracing::debug!(conversation_id, "conversation opened");
        self.load_page(1).into_iter().collect()
    }

    fn load_page(&mut self, page: u32) -> Option<ViewEffect> {
        let conversation_id = self.state.store.conversation_id()?;
        let page = self
            .state
            .pagination
            .request_page(&mut self.state.store, page)?;
        Some(ViewEffect::LoadHistory {
            conversation_id,
            page,
            page_size: self.config.page_size,
        })
    }

    /// Sends a user message and opens a stream for the reply.
    ///
    /// # Errors
    /// Rejects empty text, a missing conversation, and any submission made
    /// while the previous turn is still running. A rejected submission
    /// changes nothing.
    pub fn submit(&mut self, text: &str) -> Result<Vec<ViewEffect>, SubmitRejected> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitRejected::Empty);
        }
        let conversation_id = self
            .state
            .store
            .conversation_id()
            .ok_or(SubmitRejected::NoConversation)?;
        if self.state.turn.loading || self.session.as_ref().is_some_and(StreamSession::is_active)
        {
            return Err(SubmitRejected::Busy);
        }
        if self.state.store.has_streaming() {
            return Err(SubmitRejected::StreamingInProgress);
        }

        let store_err = |e: StoreError| match e {
            StoreError::NoConversation => SubmitRejected::NoConversation,
            StoreError::StreamingInProgress => SubmitRejected::StreamingInProgress,
        };
        self.state.store.append_live_user(text).map_err(store_err)?;
        self.state
            .store
            .append_live_assistant_placeholder()
            .map_err(store_err)?;
        self.state.turn = TurnState {
            reasoning_active: false,
            loading: true,
        };

        self.session_seq += 1;
        let mut session = StreamSession::new(SessionId(self.session_seq));
        let cancel = session.connect();
        let id = session.id();
        self.session = Some(session);
        self.state.pagination.jump_to_bottom();

        tracing::info!(
            conversation_id,
            session = %id,
            reasoning = self.config.reasoning_mode,
            "message submitted"
        );

        Ok(vec![
            ViewEffect::OpenStream {
                session: id,
                request: StreamRequest::text(conversation_id, text, self.config.reasoning_mode),
                cancel,
            },
            ViewEffect::ScrollToBottom,
        ])
    }

    /// Routes a transport signal into the current session.
    pub fn on_stream_signal(&mut self, signal: SessionSignal) -> Vec<ViewEffect> {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.id() == signal.session)
        else {
            tracing::debug!(session = %signal.session, "signal for a stale session dropped");
            return Vec::new();
        };
        session.dispatch(signal.signal, &mut self.state);
        self.state.take_effects()
    }

    /// Applies everything queued since the last frame as one batch.
    pub fn on_frame(&mut self) -> Vec<ViewEffect> {
        let batch = self.state.coalescer.begin_flush();
        if !batch.is_empty() {
            let outcome = self.state.apply(&batch);
            if outcome.is_finished() {
                if let Some(session) = self.session.as_mut() {
                    session.close(&mut self.state);
                }
            }
        }

        let mut effects = Vec::new();
        if self.state.coalescer.end_flush() {
            effects.push(ViewEffect::RequestFrame);
        }
        for effect in self.state.take_effects() {
            let duplicate = matches!(effect, ViewEffect::RequestFrame)
                && effects.iter().any(|e| matches!(e, ViewEffect::RequestFrame));
            if !duplicate {
                effects.push(effect);
            }
        }
        effects
    }

    /// Records a scroll; may ask for an older page.
    pub fn on_scroll(&mut self, viewport: Viewport) -> Vec<ViewEffect> {
        let Some(conversation_id) = self.state.store.conversation_id() else {
            return Vec::new();
        };
        self.state
            .pagination
            .on_scroll(&mut self.state.store, viewport)
            .map(|page| ViewEffect::LoadHistory {
                conversation_id,
                page,
                page_size: self.config.page_size,
            })
            .into_iter()
            .collect()
    }

    /// Commits a history page, or raises a notice when it failed.
    ///
    /// `viewport` is the view as it was before the page is merged.
    pub fn on_history_loaded(
        &mut self,
        conversation_id: ConversationId,
        page: u32,
        result: ClientResult<LoadedPage>,
        viewport: Viewport,
    ) -> Vec<ViewEffect> {
        if self.state.store.conversation_id() != Some(conversation_id) {
            tracing::debug!(conversation_id, page, "history for another conversation dropped");
            return Vec::new();
        }

        let messages = result.map(|loaded| loaded.messages);
        match self
            .state
            .pagination
            .finish_load(&mut self.state.store, page, messages, viewport)
        {
            Ok(true) if page == 1 => {
                self.state.pagination.jump_to_bottom();
                vec![ViewEffect::ScrollToBottom]
            }
            Ok(_) => Vec::new(),
            Err(err) => {
                self.state.notices.push(Notice::error(err.to_string()));
                Vec::new()
            }
        }
    }

    /// Scroll offset to apply after an older page was prepended.
    pub fn restore_scroll(&mut self, new_height: usize) -> Option<usize> {
        self.state.pagination.restore_scroll(new_height)
    }

    pub fn jump_to_bottom(&mut self) -> Vec<ViewEffect> {
        self.state.pagination.jump_to_bottom();
        vec![ViewEffect::ScrollToBottom]
    }

    /// Asks the host to delete a loaded message.
    pub fn delete_message(&mut self, id: MessageId) -> Vec<ViewEffect> {
        if self.is_busy() {
            self.state
                .notices
                .push(Notice::warning("Wait for the reply to finish before deleting"));
            return Vec::new();
        }
        if !self.state.store.contains(id) {
            self.state
                .notices
                .push(Notice::warning(format!("Message {id} is not loaded")));
            return Vec::new();
        }
        vec![ViewEffect::DeleteMessage { message_id: id }]
    }

    /// Removes a message the server confirmed deleted and reloads the
    /// newest page.
    pub fn on_message_deleted(&mut self, id: MessageId, result: ClientResult<()>) -> Vec<ViewEffect> {
        match result {
            Ok(()) => {
                self.state.store.remove_message(id);
                self.state.expanded.remove(id);
                self.state.notices.push(Notice::success("Message deleted"));
                self.load_page(1).into_iter().collect()
            }
            Err(err) => {
                tracing::warn!(message_id = id, error = %err, "delete failed");
                self.state
                    .notices
                    .push(Notice::error(EngineError::Mutation(err).to_string()));
                Vec::new()
            }
        }
    }

    /// Stops the reply in progress. Queued events are discarded.
    pub fn cancel_stream(&mut self) -> bool {
        let active = self.session.as_ref().is_some_and(StreamSession::is_active);
        if !active && !self.state.store.has_streaming() {
            return false;
        }
        self.state.coalescer.cancel();
        self.state.store.finalize_cancelled();
        self.state.turn = TurnState::default();
        if let Some(session) = self.session.as_mut() {
            session.close(&mut self.state);
        }
        self.state.notices.push(Notice::info("Response cancelled"));
        tracing::info!("stream cancelled by user");
        true
    }

    /// Closes the session and drops the window.
    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close(&mut self.state);
        }
        self.state.coalescer.cancel();
        self.state.store.discard();
        self.state.expanded.clear();
        self.state.pagination.reset();
        self.state.turn = TurnState::default();
        self.state.frame_requested = false;
        self.state.grew = false;
    }

    /// Flips the reasoning expansion of `id`. Returns false when the
    /// message has no reasoning to show.
    pub fn toggle_reasoning(&mut self, id: MessageId) -> bool {
        let has_reasoning = self.state.store.get(id).is_some_and(Message::has_reasoning);
        if !has_reasoning {
            return false;
        }
        self.state.expanded.toggle(id);
        true
    }

    pub fn last_with_reasoning(&self) -> Option<MessageId> {
        self.state.store.last_with_reasoning()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.state.notices)
    }
}
