//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! The reducer in [`crate::update`] is pure. Everything that touches the
//! network, the filesystem or the terminal happens here.
//!
//! Async results come back through a single inbox channel. Stream signals
//! have their own channel so that they can be drained in order with the
//! rest of the frame's events.

mod handlers;

use std::future::Future;
use std::io::Stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use lumo_core::api::ApiClient;
use lumo_core::config::Config;
use lumo_core::core::interrupt;
use lumo_core::stream::{SessionSignal, StreamClient};
use lumo_types::ConversationId;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::{render, terminal, update};

/// Poll interval while nothing is streaming.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    api: ApiClient,
    streams: StreamClient,
    inbox_tx: mpsc::UnboundedSender<UiEvent>,
    inbox_rx: mpsc::UnboundedReceiver<UiEvent>,
    stream_tx: mpsc::UnboundedSender<SessionSignal>,
    stream_rx: mpsc::UnboundedReceiver<SessionSignal>,
    frame_duration: Duration,
    last_tick: Instant,
    last_terminal_event: Instant,
}

impl TuiRuntime {
    /// Enters the alternate screen and builds the initial state.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be set up.
    pub fn new(config: Config, api: ApiClient, streams: StreamClient) -> Result<Self> {
        terminal::install_panic_hook();
        interrupt::reset();

        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let frame_duration = config.frame_duration();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (stream_tx, stream_rx) = mpsc::unbounded_channel();

        let now = Instant::now();
        Ok(Self {
            terminal,
            state: AppState::new(config),
            api,
            streams,
            inbox_tx,
            inbox_rx,
            stream_tx,
            stream_rx,
            frame_duration,
            last_tick: now,
            last_terminal_event: now,
        })
    }

    /// Runs until the user quits.
    ///
    /// # Errors
    /// Returns an error if drawing or reading terminal input fails.
    pub fn run(&mut self, conversation: Option<ConversationId>) -> Result<()> {
        terminal::enable_input_capture()?;

        let size = self.terminal.size()?;
        self.state.set_size(size.width, size.height);
        let effects = update::start(&mut self.state, conversation);
        self.execute_effects(effects);

        let result = self.event_loop();
        let _ = terminal::disable_input_capture();
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.should_quit {
            if interrupt::is_interrupted() {
                if self.state.view.cancel_stream() {
                    interrupt::reset();
                } else {
                    break;
                }
            }

            let mut events = self.collect_events()?;
            let size = self.terminal.size()?;
            events.insert(
                0,
                UiEvent::Frame {
                    width: size.width,
                    height: size.height,
                },
            );

            for event in events {
                if matches!(event, UiEvent::Terminal(_)) {
                    self.last_terminal_event = Instant::now();
                }
                // Renders happen at tick cadence only.
                if matches!(event, UiEvent::Tick) {
                    dirty = true;
                }
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| render::render(&self.state, frame))?;
                dirty = false;
            }
        }

        Ok(())
    }

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        let needs_fast_poll = self.state.view.is_busy()
            || self.state.frame_pending
            || self.state.view.is_loading_history()
            || self.last_terminal_event.elapsed() < IDLE_POLL_DURATION;
        let tick_interval = if needs_fast_poll {
            self.frame_duration
        } else {
            IDLE_POLL_DURATION
        };

        while let Ok(signal) = self.stream_rx.try_recv() {
            events.push(UiEvent::Stream(signal));
        }
        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };
        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    /// Runs `f` on the tokio runtime and posts its event to the inbox.
    fn spawn_effect<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = UiEvent> + Send + 'static,
    {
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(f().await);
        });
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => self.state.should_quit = true,
            UiEffect::LoadHistory {
                conversation_id,
                page,
                page_size,
            } => {
                let api = self.api.clone();
                self.spawn_effect(move || {
                    handlers::load_history(api, conversation_id, page, page_size)
                });
            }
            UiEffect::OpenStream {
                session,
                request,
                cancel,
            } => {
                // Dropping the handle detaches the task; `cancel` stops it.
                let _ = self
                    .streams
                    .spawn(session, request, cancel, self.stream_tx.clone());
            }
            UiEffect::DeleteMessage { message_id } => {
                let api = self.api.clone();
                self.spawn_effect(move || handlers::delete_message(api, message_id));
            }
            UiEffect::CreateConversation { title } => {
                let api = self.api.clone();
                self.spawn_effect(move || handlers::create_conversation(api, title));
            }
            UiEffect::SaveReasoningMode { enabled } => {
                self.spawn_effect(move || handlers::save_reasoning_mode(enabled));
            }
        }
    }
}

impl Drop for TuiRuntime {
    fn drop(&mut self) {
        self.state.view.teardown();
        let _ = terminal::restore_terminal();
    }
}
