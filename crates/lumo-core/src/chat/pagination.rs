//! Backward history loading and scroll position policy.
//!
//! Distances are in whatever unit the host measures its viewport in
//! (rendered rows for the terminal UI).

use lumo_types::Message;

use super::error::EngineError;
use super::transcript::TranscriptStore;
use crate::api::error::ClientError;

/// Distances that drive scroll decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollThresholds {
    /// Within this distance of the bottom the view stays pinned.
    pub pin: usize,
    /// Beyond this distance from the bottom the jump affordance shows.
    pub jump: usize,
    /// Within this distance of the top the next page is requested.
    pub load_more: usize,
}

/// Row-sized defaults for the terminal UI. A host that measures pixels
/// wants roughly ten times these.
impl Default for ScrollThresholds {
    fn default() -> Self {
        Self {
            pin: 1,
            jump: 2,
            load_more: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub scroll_top: usize,
    pub client_height: usize,
    pub scroll_height: usize,
}

impl Viewport {
    pub fn max_scroll(&self) -> usize {
        self.scroll_height.saturating_sub(self.client_height)
    }

    pub fn distance_from_bottom(&self) -> usize {
        self.max_scroll().saturating_sub(self.scroll_top)
    }
}

/// What to do with the viewport after the transcript grew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoScroll {
    Pin,
    ShowJump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScrollAnchor {
    old_top: usize,
    old_height: usize,
}

#[derive(Debug, Clone)]
pub struct PaginationController {
    thresholds: ScrollThresholds,
    in_flight: Option<u32>,
    anchor: Option<ScrollAnchor>,
    pinned: bool,
    show_jump: bool,
}

impl PaginationController {
    pub fn new(thresholds: ScrollThresholds) -> Self {
        Self {
            thresholds,
            in_flight: None,
            anchor: None,
            pinned: true,
            show_jump: false,
        }
    }

    pub fn thresholds(&self) -> ScrollThresholds {
        self.thresholds
    }

    pub fn in_flight(&self) -> Option<u32> {
        self.in_flight
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn show_jump(&self) -> bool {
        self.show_jump
    }

    /// Marks `page` as loading. Returns `None` while another page is
    /// still in flight.
    pub fn request_page(&mut self, store: &mut TranscriptStore, page: u32) -> Option<u32> {
        if let Some(pending) = self.in_flight {
            tracing::debug!(page, pending, "page request suppressed");
            return None;
        }
        self.in_flight = Some(page);
        store.cursor_mut().loading = true;
        Some(page)
    }

    /// Records a scroll and returns the older page to fetch, if the top of
    /// the window came into range.
    pub fn on_scroll(&mut self, store: &mut TranscriptStore, viewport: Viewport) -> Option<u32> {
        let distance = viewport.distance_from_bottom();
        self.pinned = distance <= self.thresholds.pin;
        self.show_jump = distance > self.thresholds.jump;

        let cursor = *store.cursor();
        let near_top = viewport.scroll_top <= self.thresholds.load_more;
        if near_top && cursor.has_more && cursor.page >= 1 && self.in_flight.is_none() {
            self.request_page(store, cursor.page + 1)
        } else {
            None
        }
    }

    /// Commits the result of a page request.
    ///
    /// Returns `Ok(false)` for a response nobody is waiting for. When an
    /// older page is prepended, `viewport` is remembered so that
    /// [`PaginationController::restore_scroll`] can keep the visible
    /// content in place.
    ///
    /// # Errors
    /// Returns [`EngineError::HistoryLoad`] when the fetch failed. The
    /// window and the page cursor are left as they were.
    pub fn finish_load(
        &mut self,
        store: &mut TranscriptStore,
        page: u32,
        result: Result<Vec<Message>, ClientError>,
        viewport: Viewport,
    ) -> Result<bool, EngineError> {
        if self.in_flight != Some(page) {
            tracing::debug!(page, in_flight = ?self.in_flight, "stale page response dropped");
            return Ok(false);
        }
        self.in_flight = None;

        match result {
            Ok(newest_first) => {
                if page > 1 {
                    self.anchor = Some(ScrollAnchor {
                        old_top: viewport.scroll_top,
                        old_height: viewport.scroll_height,
                    });
                }
                store.apply_page(page, newest_first);
                Ok(true)
            }
            Err(err) => {
                store.cursor_mut().loading = false;
                tracing::warn!(page, error = %err, "history page failed");
                Err(EngineError::HistoryLoad(err))
            }
        }
    }

    /// Scroll offset that keeps previously visible content in place after
    /// a prepend, given the new total height.
    pub fn restore_scroll(&mut self, new_height: usize) -> Option<usize> {
        let anchor = self.anchor.take()?;
        Some(new_height.saturating_sub(anchor.old_height) + anchor.old_top)
    }

    pub fn has_pending_restore(&self) -> bool {
        self.anchor.is_some()
    }

    /// Decides how to follow a transcript that grew at the bottom.
    pub fn on_transcript_grew(&mut self) -> AutoScroll {
        if self.pinned {
            self.show_jump = false;
            AutoScroll::Pin
        } else {
            self.show_jump = true;
            AutoScroll::ShowJump
        }
    }

    pub fn jump_to_bottom(&mut self) {
        self.pinned = true;
        self.show_jump = false;
    }

    pub fn reset(&mut self) {
        self.in_flight = None;
        self.anchor = None;
        self.pinned = true;
        self.show_jump = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ClientErrorKind;
    use crate::chat::transcript::tests::page_desc;

    /// Thresholds for a host that measures in pixels.
    const PIXELS: ScrollThresholds = ScrollThresholds {
        pin: 10,
        jump: 20,
        load_more: 20,
    };

    fn loaded_store() -> (TranscriptStore, PaginationController) {
        let mut store = TranscriptStore::new(10);
        store.open(42);
        let mut pager = PaginationController::new(PIXELS);
        assert_eq!(pager.request_page(&mut store, 1), Some(1));
        pager
            .finish_load(&mut store, 1, Ok(page_desc(20, 11)), Viewport::default())
            .unwrap();
        (store, pager)
    }

    fn at(scroll_top: usize, scroll_height: usize) -> Viewport {
        Viewport {
            scroll_top,
            client_height: 100,
            scroll_height,
        }
    }

    #[test]
    fn test_full_first_page_has_more_but_does_not_advance() {
        let (store, pager) = loaded_store();
        let cursor = store.cursor();
        assert!(cursor.has_more);
        assert_eq!(cursor.page, 1);
        assert!(!cursor.loading);
        assert_eq!(pager.in_flight(), None);
    }

    #[test]
    fn test_request_is_reentrancy_guarded() {
        let (mut store, mut pager) = loaded_store();
        assert_eq!(pager.on_scroll(&mut store, at(0, 500)), Some(2));
        assert!(store.cursor().loading);
        assert_eq!(pager.on_scroll(&mut store, at(0, 500)), None);
        assert_eq!(pager.request_page(&mut store, 2), None);
    }

    #[test]
    fn test_no_load_far_from_top_or_without_more() {
        let (mut store, mut pager) = loaded_store();
        assert_eq!(pager.on_scroll(&mut store, at(200, 500)), None);

        let mut short = TranscriptStore::new(10);
        short.open(1);
        let mut pager = PaginationController::new(PIXELS);
        pager.request_page(&mut short, 1);
        pager
            .finish_load(&mut short, 1, Ok(page_desc(3, 1)), Viewport::default())
            .unwrap();
        assert_eq!(pager.on_scroll(&mut short, at(0, 50)), None);
    }

    #[test]
    fn test_prepend_restores_scroll_offset() {
        let (mut store, mut pager) = loaded_store();
        let page = pager.on_scroll(&mut store, at(5, 400)).unwrap();

        assert!(
            pager
                .finish_load(&mut store, page, Ok(page_desc(10, 1)), at(5, 400))
                .unwrap()
        );
        assert_eq!(store.len(), 20);
        // new_top == old_top + (new_height - old_height)
        assert_eq!(pager.restore_scroll(760), Some(5 + 360));
        assert_eq!(pager.restore_scroll(760), None);
    }

    #[test]
    fn test_failed_load_keeps_window_and_cursor() {
        let (mut store, mut pager) = loaded_store();
        let before = store.messages().to_vec();
        let page = pager.on_scroll(&mut store, at(0, 400)).unwrap();

        let err = pager
            .finish_load(
                &mut store,
                page,
                Err(ClientError::new(ClientErrorKind::Timeout, "timed out")),
                at(0, 400),
            )
            .unwrap_err();

        assert!(matches!(err, EngineError::HistoryLoad(_)));
        assert_eq!(store.messages(), &before[..]);
        assert_eq!(store.cursor().page, 1);
        assert!(!store.cursor().loading);
        assert!(!pager.has_pending_restore());
        // A later scroll can try again.
        assert_eq!(pager.on_scroll(&mut store, at(0, 400)), Some(2));
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let (mut store, mut pager) = loaded_store();
        assert_eq!(
            pager.finish_load(&mut store, 3, Ok(page_desc(5, 1)), at(0, 100)),
            Ok(false)
        );
        assert_eq!(store.len(), 10);
    }

    #[test]
    fn test_pin_and_jump_thresholds_are_independent() {
        let (mut store, mut pager) = loaded_store();

        // 15 rows above the bottom: past pin, not yet past jump.
        pager.on_scroll(&mut store, at(385, 500));
        assert!(!pager.is_pinned());
        assert!(!pager.show_jump());

        pager.on_scroll(&mut store, at(300, 500));
        assert!(pager.show_jump());
        assert_eq!(pager.on_transcript_grew(), AutoScroll::ShowJump);

        pager.on_scroll(&mut store, at(395, 500));
        assert!(pager.is_pinned());
        assert_eq!(pager.on_transcript_grew(), AutoScroll::Pin);
        assert!(!pager.show_jump());
    }

    #[test]
    fn test_default_thresholds_are_in_rows() {
        let mut store = TranscriptStore::new(10);
        store.open(42);
        let mut pager = PaginationController::new(ScrollThresholds::default());
        pager.request_page(&mut store, 1);
        pager
            .finish_load(&mut store, 1, Ok(page_desc(20, 11)), Viewport::default())
            .unwrap();
        let rows = |scroll_top| Viewport {
            scroll_top,
            client_height: 20,
            scroll_height: 60,
        };

        // One row up still follows; three rows up shows the jump hint.
        assert_eq!(pager.on_scroll(&mut store, rows(39)), None);
        assert!(pager.is_pinned());
        pager.on_scroll(&mut store, rows(37));
        assert!(!pager.is_pinned());
        assert!(pager.show_jump());

        // Five rows below the top is not close enough to load more.
        assert_eq!(pager.on_scroll(&mut store, rows(5)), None);
        assert_eq!(pager.on_scroll(&mut store, rows(2)), Some(2));
    }

    #[test]
    fn test_jump_to_bottom_repins() {
        let (mut store, mut pager) = loaded_store();
        pager.on_scroll(&mut store, at(100, 500));
        pager.jump_to_bottom();
        assert!(pager.is_pinned());
        assert!(!pager.show_jump());
    }
}
