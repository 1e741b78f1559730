//! The reducer: `(state, event) -> effects`.
//!
//! All chat behavior is delegated to [`lumo_core::chat::ChatView`]. This
//! module maps terminal input onto view operations and view effects onto
//! runtime effects. Frame requests and bottom pinning stay in state.

use std::time::Instant;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind};
use lumo_core::chat::{Notice, ViewEffect};
use lumo_types::ConversationId;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::input::{Command, parse_command};
use crate::state::AppState;

const WHEEL_ROWS: usize = 3;

/// Opens the conversation given on the command line, if any.
pub fn start(state: &mut AppState, conversation: Option<ConversationId>) -> Vec<UiEffect> {
    match conversation {
        Some(id) => {
            let effects = state.view.open(id);
            absorb(state, effects)
        }
        None => {
            state
                .notices
                .push(Notice::info("Type /open <id> or /new [title] to start"));
            Vec::new()
        }
    }
}

pub fn update(state: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    let effects = match event {
        UiEvent::Tick => on_tick(state),
        UiEvent::Frame { width, height } => {
            state.set_size(width, height);
            state.refresh_layout();
            Vec::new()
        }
        UiEvent::Terminal(event) => on_terminal(state, event),
        UiEvent::Stream(signal) => {
            let effects = state.view.on_stream_signal(signal);
            absorb(state, effects)
        }
        UiEvent::HistoryLoaded {
            conversation_id,
            page,
            result,
        } => {
            let viewport = state.viewport();
            let effects = state
                .view
                .on_history_loaded(conversation_id, page, result, viewport);
            let effects = absorb(state, effects);
            let rows = state.refresh_layout();
            if let Some(offset) = state.view.restore_scroll(rows) {
                state.scroll.set_offset(offset);
            }
            effects
        }
        UiEvent::MessageDeleted { message_id, result } => {
            let effects = state.view.on_message_deleted(message_id, result);
            absorb(state, effects)
        }
        UiEvent::ConversationCreated { result } => match result {
            Ok(conversation) => {
                state.notices.push(Notice::success(format!(
                    "Created conversation #{}",
                    conversation.id
                )));
                state.scroll.to_bottom();
                let effects = state.view.open(conversation.id);
                absorb(state, effects)
            }
            Err(err) => {
                state
                    .notices
                    .push(Notice::error(format!("Failed to create conversation: {err}")));
                Vec::new()
            }
        },
        UiEvent::ReasoningModeSaved { result } => {
            if let Err(err) = result {
                state
                    .notices
                    .push(Notice::warning(format!("Reasoning mode not saved: {err}")));
            }
            Vec::new()
        }
    };
    state.pull_notices();
    effects
}

fn on_tick(state: &mut AppState) -> Vec<UiEffect> {
    if state.view.is_busy() {
        state.spinner_frame = state.spinner_frame.wrapping_add(1);
    }
    state.notices.expire(Instant::now());

    let effects = if std::mem::take(&mut state.frame_pending) {
        let effects = state.view.on_frame();
        absorb(state, effects)
    } else {
        Vec::new()
    };
    state.refresh_layout();
    effects
}

/// Keeps frame and scroll requests in state and forwards the I/O.
fn absorb(state: &mut AppState, effects: Vec<ViewEffect>) -> Vec<UiEffect> {
    let mut out = Vec::new();
    for effect in effects {
        match effect {
            ViewEffect::RequestFrame => state.frame_pending = true,
            ViewEffect::ScrollToBottom => state.scroll.to_bottom(),
            ViewEffect::LoadHistory {
                conversation_id,
                page,
                page_size,
            } => out.push(UiEffect::LoadHistory {
                conversation_id,
                page,
                page_size,
            }),
            ViewEffect::OpenStream {
                session,
                request,
                cancel,
            } => out.push(UiEffect::OpenStream {
                session,
                request,
                cancel,
            }),
            ViewEffect::DeleteMessage { message_id } => {
                out.push(UiEffect::DeleteMessage { message_id });
            }
        }
    }
    out
}

fn on_terminal(state: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => on_key(state, key),
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => scroll_by(state, -(WHEEL_ROWS as isize)),
            MouseEventKind::ScrollDown => scroll_by(state, WHEEL_ROWS as isize),
            _ => Vec::new(),
        },
        Event::Paste(text) => {
            state.input.insert_str(&text);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn on_key(state: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let page = state.layout.transcript_height.saturating_sub(1).max(1) as isize;

    match key.code {
        KeyCode::Char('c') if ctrl => vec![UiEffect::Quit],
        KeyCode::Char('r') if ctrl => toggle_reasoning_mode(state),
        KeyCode::Esc => {
            if !state.view.cancel_stream() {
                if state.input.is_empty() {
                    return vec![UiEffect::Quit];
                }
                state.input.clear();
            }
            Vec::new()
        }
        KeyCode::Enter => on_enter(state),
        KeyCode::Tab => {
            if let Some(id) = state.view.last_with_reasoning() {
                state.view.toggle_reasoning(id);
            }
            Vec::new()
        }
        KeyCode::PageUp => scroll_by(state, -page),
        KeyCode::PageDown => scroll_by(state, page),
        KeyCode::Up => scroll_by(state, -1),
        KeyCode::Down => scroll_by(state, 1),
        KeyCode::End if state.input.is_empty() => {
            let effects = state.view.jump_to_bottom();
            absorb(state, effects)
        }
        KeyCode::End => {
            state.input.end();
            Vec::new()
        }
        KeyCode::Home => {
            state.input.home();
            Vec::new()
        }
        KeyCode::Left => {
            state.input.left();
            Vec::new()
        }
        KeyCode::Right => {
            state.input.right();
            Vec::new()
        }
        KeyCode::Backspace => {
            state.input.backspace();
            Vec::new()
        }
        KeyCode::Delete => {
            state.input.delete();
            Vec::new()
        }
        KeyCode::Char(c) if !ctrl => {
            state.input.insert(c);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn toggle_reasoning_mode(state: &mut AppState) -> Vec<UiEffect> {
    let enabled = !state.view.reasoning_mode();
    state.view.set_reasoning_mode(enabled);
    state.config.reasoning_mode = enabled;
    let label = if enabled { "on" } else { "off" };
    state
        .notices
        .push(Notice::info(format!("Reasoning mode {label}")));
    vec![UiEffect::SaveReasoningMode { enabled }]
}

fn on_enter(state: &mut AppState) -> Vec<UiEffect> {
    let line = state.input.text().to_string();
    if let Some(command) = parse_command(&line) {
        state.input.clear();
        return match command {
            Ok(command) => run_command(state, command),
            Err(message) => {
                state.notices.push(Notice::warning(message));
                Vec::new()
            }
        };
    }

    match state.view.submit(&line) {
        Ok(effects) => {
            state.input.clear();
            absorb(state, effects)
        }
        Err(rejected) => {
            state.notices.push(Notice::warning(format!("Not sent: {rejected}")));
            Vec::new()
        }
    }
}

fn run_command(state: &mut AppState, command: Command) -> Vec<UiEffect> {
    match command {
        Command::Open(id) => {
            state.scroll.to_bottom();
            let effects = state.view.open(id);
            absorb(state, effects)
        }
        Command::New(title) => vec![UiEffect::CreateConversation { title }],
        Command::Delete(id) => {
            let effects = state.view.delete_message(id);
            absorb(state, effects)
        }
        Command::Expand(id) => {
            if !state.view.toggle_reasoning(id) {
                state
                    .notices
                    .push(Notice::warning(format!("Message {id} has no reasoning")));
            }
            Vec::new()
        }
        Command::Quit => vec![UiEffect::Quit],
    }
}

fn scroll_by(state: &mut AppState, rows: isize) -> Vec<UiEffect> {
    if rows < 0 {
        state.scroll.scroll_up(rows.unsigned_abs());
    } else {
        state.scroll.scroll_down(rows.unsigned_abs());
    }
    let viewport = state.viewport();
    let effects = state.view.on_scroll(viewport);
    absorb(state, effects)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use lumo_core::api::{ClientError, ClientErrorKind, LoadedPage};
    use lumo_core::config::Config;
    use lumo_core::stream::{SessionSignal, TransportSignal};
    use lumo_types::{Message, MessageKind, Role, StreamEvent};

    use super::*;

    fn key(code: KeyCode) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn ctrl(c: char) -> UiEvent {
        UiEvent::Terminal(Event::Key(KeyEvent::new(
            KeyCode::Char(c),
            KeyModifiers::CONTROL,
        )))
    }

    fn type_text(state: &mut AppState, text: &str) {
        for c in text.chars() {
            update(state, key(KeyCode::Char(c)));
        }
    }

    fn history(count: i64) -> Vec<Message> {
        (1..=count)
            .rev()
            .map(|id| Message {
                id,
                content: format!("message {id}"),
                reasoning_content: String::new(),
                role: if id % 2 == 0 { Role::Assistant } else { Role::User },
                kind: MessageKind::Final,
                conversation_id: 5,
                created_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
            })
            .collect()
    }

    fn opened(count: i64) -> AppState {
        let mut state = AppState::new(Config::default());
        update(&mut state, UiEvent::Frame { width: 80, height: 24 });
        let effects = start(&mut state, Some(5));
        assert!(matches!(
            effects.as_slice(),
            [UiEffect::LoadHistory {
                conversation_id: 5,
                page: 1,
                ..
            }]
        ));
        update(
            &mut state,
            UiEvent::HistoryLoaded {
                conversation_id: 5,
                page: 1,
                result: Ok(LoadedPage {
                    messages: history(count),
                    page: 1,
                    page_size: 10,
                    total: count as u64,
                }),
            },
        );
        state
    }

    fn submit(state: &mut AppState, text: &str) -> lumo_core::stream::SessionId {
        type_text(state, text);
        let effects = update(state, key(KeyCode::Enter));
        match effects.as_slice() {
            [UiEffect::OpenStream { session, request, .. }] => {
                assert_eq!(request.content, text);
                *session
            }
            other => panic!("expected OpenStream, got {other:?}"),
        }
    }

    fn signal(session: lumo_core::stream::SessionId, signal: TransportSignal) -> UiEvent {
        UiEvent::Stream(SessionSignal { session, signal })
    }

    #[test]
    fn test_submit_streams_into_transcript_on_tick() {
        let mut state = opened(2);
        let session = submit(&mut state, "hello");
        assert!(state.input.is_empty());

        update(&mut state, signal(session, TransportSignal::Opened));
        update(
            &mut state,
            signal(session, TransportSignal::Frame(StreamEvent::chunk("Hi"))),
        );
        update(
            &mut state,
            signal(session, TransportSignal::Frame(StreamEvent::chunk(" there"))),
        );
        assert!(state.frame_pending);
        // Nothing lands before the frame.
        assert_eq!(state.view.messages().last().unwrap().content, "");

        update(&mut state, UiEvent::Tick);
        assert!(!state.frame_pending);
        assert_eq!(state.view.messages().last().unwrap().content, "Hi there");
        assert!(state.scroll.is_following());

        update(
            &mut state,
            signal(session, TransportSignal::Frame(StreamEvent::done())),
        );
        update(&mut state, UiEvent::Tick);
        assert!(!state.view.is_busy());
    }

    #[test]
    fn test_empty_submit_raises_notice() {
        let mut state = opened(2);
        let effects = update(&mut state, key(KeyCode::Enter));
        assert!(effects.is_empty());
        assert!(state.notices.current().unwrap().text.starts_with("Not sent"));
    }

    #[test]
    fn test_esc_cancels_stream_before_quitting() {
        let mut state = opened(2);
        let session = submit(&mut state, "hello");
        update(&mut state, signal(session, TransportSignal::Opened));

        assert!(update(&mut state, key(KeyCode::Esc)).is_empty());
        assert!(!state.view.is_busy());
        assert!(matches!(
            update(&mut state, key(KeyCode::Esc)).as_slice(),
            [UiEffect::Quit]
        ));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut state = opened(2);
        assert!(matches!(
            update(&mut state, ctrl('c')).as_slice(),
            [UiEffect::Quit]
        ));
    }

    #[test]
    fn test_ctrl_r_toggles_and_saves_reasoning_mode() {
        let mut state = opened(2);
        let effects = update(&mut state, ctrl('r'));
        assert!(matches!(
            effects.as_slice(),
            [UiEffect::SaveReasoningMode { enabled: true }]
        ));
        assert!(state.view.reasoning_mode());
        assert!(state.config.reasoning_mode);
    }

    #[test]
    fn test_scrolling_to_top_requests_older_page() {
        let mut state = opened(10);
        assert!(state.view.has_more_history());

        let effects = update(&mut state, key(KeyCode::PageUp));
        let effects = if effects.is_empty() {
            update(&mut state, key(KeyCode::PageUp))
        } else {
            effects
        };
        assert!(matches!(
            effects.as_slice(),
            [UiEffect::LoadHistory { page: 2, .. }]
        ));
        assert!(!state.scroll.is_following());
    }

    #[test]
    fn test_slash_commands() {
        let mut state = opened(2);

        type_text(&mut state, "/new Trip");
        assert!(matches!(
            update(&mut state, key(KeyCode::Enter)).as_slice(),
            [UiEffect::CreateConversation { title: Some(t) }] if t == "Trip"
        ));

        type_text(&mut state, "/delete 2");
        assert!(matches!(
            update(&mut state, key(KeyCode::Enter)).as_slice(),
            [UiEffect::DeleteMessage { message_id: 2 }]
        ));

        type_text(&mut state, "/open 9");
        assert!(matches!(
            update(&mut state, key(KeyCode::Enter)).as_slice(),
            [UiEffect::LoadHistory {
                conversation_id: 9,
                page: 1,
                ..
            }]
        ));
        assert_eq!(state.view.conversation_id(), Some(9));
    }

    #[test]
    fn test_transport_failure_surfaces_notice() {
        let mut state = opened(2);
        let session = submit(&mut state, "hello");
        update(
            &mut state,
            signal(
                session,
                TransportSignal::Failed(ClientError::new(ClientErrorKind::Connect, "refused")),
            ),
        );
        let notice = state.notices.current().unwrap();
        assert!(notice.text.starts_with("Stream failed"));
        assert!(!state.view.is_busy());
    }

    #[test]
    fn test_created_conversation_is_opened() {
        let mut state = opened(2);
        let effects = update(
            &mut state,
            UiEvent::ConversationCreated {
                result: Ok(lumo_types::Conversation {
                    id: 77,
                    title: "New".to_string(),
                    user_id: 1,
                    last_msg: String::new(),
                    last_msg_at: None,
                    created_at: Utc::now(),
                    updated_at: None,
                }),
            },
        );
        assert!(matches!(
            effects.as_slice(),
            [UiEffect::LoadHistory {
                conversation_id: 77,
                ..
            }]
        ));
    }
}
