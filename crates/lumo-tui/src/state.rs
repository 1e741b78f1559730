//! Application state for the chat screen.

use std::time::{Duration, Instant};

use lumo_core::chat::{ChatView, Notice, ViewConfig, Viewport};
use lumo_core::config::Config;

use crate::input::InputState;
use crate::render::transcript_size;
use crate::transcript::{ScrollState, build_lines};

/// How long a notice stays in the status bar.
pub const NOTICE_TTL: Duration = Duration::from_secs(6);

/// The most recent notice, until it expires.
#[derive(Debug, Default)]
pub struct NoticeBar {
    current: Option<(Notice, Instant)>,
}

impl NoticeBar {
    pub fn push(&mut self, notice: Notice) {
        self.push_at(notice, Instant::now());
    }

    pub fn push_at(&mut self, notice: Notice, now: Instant) {
        self.current = Some((notice, now));
    }

    pub fn current(&self) -> Option<&Notice> {
        self.current.as_ref().map(|(notice, _)| notice)
    }

    pub fn expire(&mut self, now: Instant) {
        if self
            .current
            .as_ref()
            .is_some_and(|(_, shown)| now.duration_since(*shown) >= NOTICE_TTL)
        {
            self.current = None;
        }
    }
}

/// Terminal geometry as of the last `Frame` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutState {
    pub width: u16,
    pub height: u16,
    pub transcript_width: usize,
    pub transcript_height: usize,
    /// Rendered transcript rows at the last refresh.
    pub total_rows: usize,
}

#[derive(Debug)]
pub struct AppState {
    pub view: ChatView,
    pub config: Config,
    pub input: InputState,
    pub scroll: ScrollState,
    pub notices: NoticeBar,
    pub layout: LayoutState,
    /// The view asked for a batch flush on the next tick.
    pub frame_pending: bool,
    pub spinner_frame: usize,
    pub should_quit: bool,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            view: ChatView::new(ViewConfig::from_config(&config)),
            config,
            input: InputState::default(),
            scroll: ScrollState::default(),
            notices: NoticeBar::default(),
            layout: LayoutState::default(),
            frame_pending: false,
            spinner_frame: 0,
            should_quit: false,
        }
    }

    pub fn set_size(&mut self, width: u16, height: u16) {
        let (transcript_width, transcript_height) = transcript_size(width, height);
        self.layout.width = width;
        self.layout.height = height;
        self.layout.transcript_width = transcript_width;
        self.layout.transcript_height = transcript_height;
    }

    /// Recounts transcript rows and clamps the scroll position.
    pub fn refresh_layout(&mut self) -> usize {
        let rows = build_lines(&self.view, self.layout.transcript_width, self.spinner_frame).len();
        self.layout.total_rows = rows;
        self.scroll.resolve(rows, self.layout.transcript_height);
        rows
    }

    pub fn viewport(&self) -> Viewport {
        self.scroll.viewport()
    }

    pub fn pull_notices(&mut self) {
        for notice in self.view.take_notices() {
            self.notices.push(notice);
        }
    }
}
