//! One-shot ask mode.
//!
//! Drives the same [`ChatView`] as the terminal UI. Each pass of the loop
//! below is one frame: every signal that has arrived is routed, then the
//! queued events are applied as a single batch.
//!
//! # Output contract
//! - Reply text goes to stdout as it arrives.
//! - Reasoning, notices and errors go to stderr.

use std::io::{Stderr, Stdout, Write, stderr, stdout};

use anyhow::{Result, anyhow};
use lumo_core::api::ApiClient;
use lumo_core::chat::{ChatView, Notice, NoticeLevel, ViewConfig, ViewEffect, Viewport};
use lumo_core::config::Config;
use lumo_core::core::interrupt::{self, InterruptedError};
use lumo_core::stream::{SessionSignal, StreamClient};
use lumo_types::{ConversationId, Role};
use tokio::sync::mpsc;

/// Sends `prompt` to `conversation` and streams the reply.
///
/// # Errors
/// Returns an error when the history cannot be loaded, the message is
/// rejected, the reply fails, or the user interrupts.
pub async fn run_ask(
    config: &Config,
    api: ApiClient,
    streams: StreamClient,
    conversation: ConversationId,
    prompt: &str,
) -> Result<()> {
    let mut view = ChatView::new(ViewConfig::from_config(config));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut host = AskHost {
        api,
        streams,
        tx,
        frame_pending: false,
    };
    let mut renderer = AskRenderer::new();

    // Opening loads the newest page so the reply lands after it.
    let effects = view.open(conversation);
    host.execute(&mut view, effects).await;
    if let Some(error) = renderer.notices(view.take_notices()) {
        return Err(anyhow!(error));
    }

    let effects = view
        .submit(prompt)
        .map_err(|rejected| anyhow!("Message not sent: {rejected}"))?;
    renderer.track(&view);
    host.execute(&mut view, effects).await;

    let mut failed = None;
    while view.is_busy() {
        tokio::select! {
            biased;
            () = interrupt::wait_for_interrupt() => {
                view.cancel_stream();
                renderer.finish();
                return Err(InterruptedError.into());
            }
            signal = rx.recv() => {
                let Some(signal) = signal else { break };
                host.route(&mut view, signal).await;
                while let Ok(signal) = rx.try_recv() {
                    host.route(&mut view, signal).await;
                }
            }
        }

        host.flush(&mut view).await;
        renderer.render(&view);
        if let Some(error) = renderer.notices(view.take_notices()) {
            failed = Some(error);
        }
    }

    renderer.finish();
    tracing::debug!(dropped_frames = view.dropped_frames(), "ask finished");
    view.teardown();
    match failed {
        Some(error) => Err(anyhow!(error)),
        None => Ok(()),
    }
}

/// Carries out view effects for ask mode.
struct AskHost {
    api: ApiClient,
    streams: StreamClient,
    tx: mpsc::UnboundedSender<SessionSignal>,
    frame_pending: bool,
}

impl AskHost {
    async fn route(&mut self, view: &mut ChatView, signal: SessionSignal) {
        let effects = view.on_stream_signal(signal);
        self.execute(view, effects).await;
    }

    /// Applies queued events until the view stops asking for frames.
    async fn flush(&mut self, view: &mut ChatView) {
        while std::mem::take(&mut self.frame_pending) {
            let effects = view.on_frame();
            self.execute(view, effects).await;
        }
    }

    async fn execute(&mut self, view: &mut ChatView, effects: Vec<ViewEffect>) {
        let mut queue = effects;
        while !queue.is_empty() {
            let mut next = Vec::new();
            for effect in queue {
                match effect {
                    ViewEffect::RequestFrame => self.frame_pending = true,
                    ViewEffect::ScrollToBottom => {}
                    ViewEffect::LoadHistory {
                        conversation_id,
                        page,
                        page_size,
                    } => {
                        let result = self
                            .api
                            .list_messages(conversation_id, page, page_size)
                            .await;
                        next.extend(view.on_history_loaded(
                            conversation_id,
                            page,
                            result,
                            Viewport::default(),
                        ));
                    }
                    ViewEffect::OpenStream {
                        session,
                        request,
                        cancel,
                    } => {
                        let _ = self.streams.spawn(session, request, cancel, self.tx.clone());
                    }
                    ViewEffect::DeleteMessage { message_id } => {
                        let result = self.api.delete_message(message_id).await;
                        next.extend(view.on_message_deleted(message_id, result));
                    }
                }
            }
            queue = next;
        }
    }
}

/// Writes the growing reply to stdout and everything else to stderr.
struct AskRenderer {
    stdout: Stdout,
    stderr: Stderr,
    /// Index of the assistant message for this turn.
    reply: Option<usize>,
    reasoning_printed: usize,
    content_printed: usize,
    /// Assistant entries after the reply (fallbacks) already written.
    trailing_printed: usize,
}

impl AskRenderer {
    fn new() -> Self {
        Self {
            stdout: stdout(),
            stderr: stderr(),
            reply: None,
            reasoning_printed: 0,
            content_printed: 0,
            trailing_printed: 0,
        }
    }

    /// Remembers the placeholder that `submit` just appended.
    fn track(&mut self, view: &ChatView) {
        self.reply = view
            .messages()
            .iter()
            .rposition(|m| m.role == Role::Assistant);
    }

    fn render(&mut self, view: &ChatView) {
        let Some(reply) = self.reply else { return };
        let Some(message) = view.messages().get(reply) else {
            return;
        };

        if let Some(delta) = message.reasoning_content.get(self.reasoning_printed..)
            && !delta.is_empty()
        {
            if self.reasoning_printed == 0 {
                let _ = write!(self.stderr, "[reasoning] ");
            }
            let _ = write!(self.stderr, "{delta}");
            let _ = self.stderr.flush();
            self.reasoning_printed = message.reasoning_content.len();
        }

        if let Some(delta) = message.content.get(self.content_printed..)
            && !delta.is_empty()
        {
            if self.content_printed == 0 && self.reasoning_printed > 0 {
                let _ = writeln!(self.stderr);
            }
            let _ = write!(self.stdout, "{delta}");
            let _ = self.stdout.flush();
            self.content_printed = message.content.len();
        }

        let trailing: Vec<&str> = view
            .messages()
            .get(reply + 1..)
            .unwrap_or_default()
            .iter()
            .filter(|m| m.role == Role::Assistant && !m.is_streaming())
            .map(|m| m.content.as_str())
            .collect();
        for text in trailing.iter().skip(self.trailing_printed) {
            if self.content_printed > 0 || self.trailing_printed > 0 {
                let _ = writeln!(self.stdout);
            } else if self.reasoning_printed > 0 {
                let _ = writeln!(self.stderr);
            }
            let _ = write!(self.stdout, "{text}");
            self.trailing_printed += 1;
        }
        let _ = self.stdout.flush();
    }

    /// Prints notices and returns the last error among them.
    fn notices(&mut self, notices: Vec<Notice>) -> Option<String> {
        let mut error = None;
        for notice in notices {
            if notice.level == NoticeLevel::Error {
                error = Some(notice.text);
                continue;
            }
            let _ = writeln!(self.stderr, "{}: {}", notice.level.label(), notice.text);
        }
        error
    }

    fn finish(&mut self) {
        if self.content_printed > 0 || self.trailing_printed > 0 {
            let _ = writeln!(self.stdout);
            let _ = self.stdout.flush();
        } else if self.reasoning_printed > 0 {
            let _ = writeln!(self.stderr);
        }
    }
}
