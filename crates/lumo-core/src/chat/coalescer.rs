//! Per-frame batching of stream events.
//!
//! Events are queued in arrival order. The first push after a flush asks
//! the host for a frame; later pushes ride along with that request. A
//! flush drains everything queued so far, and if more arrived while the
//! batch was being applied, another frame is requested.

use std::collections::VecDeque;

use lumo_types::StreamEvent;

#[derive(Debug, Default)]
pub struct Coalescer {
    queue: VecDeque<StreamEvent>,
    flush_scheduled: bool,
}

impl Coalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `event`. Returns true when the caller must schedule a frame.
    pub fn push(&mut self, event: StreamEvent) -> bool {
        self.queue.push_back(event);
        if self.flush_scheduled {
            false
        } else {
            self.flush_scheduled = true;
            true
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.flush_scheduled
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Takes the whole queue for one batch.
    ///
    /// The scheduled flag stays set until [`Coalescer::end_flush`], so
    /// pushes made while the batch is applied do not request a second
    /// frame on their own.
    pub fn begin_flush(&mut self) -> Vec<StreamEvent> {
        self.queue.drain(..).collect()
    }

    /// Finishes a flush. Returns true when events are waiting and another
    /// frame is needed.
    pub fn end_flush(&mut self) -> bool {
        self.flush_scheduled = !self.queue.is_empty();
        self.flush_scheduled
    }

    /// Drains the queue outside the frame cycle, leaving the schedule
    /// untouched.
    pub fn drain_now(&mut self) -> Vec<StreamEvent> {
        self.queue.drain(..).collect()
    }

    /// Drops queued events and any pending frame request.
    pub fn cancel(&mut self) {
        if !self.queue.is_empty() {
            tracing::debug!(discarded = self.queue.len(), "coalescer cancelled");
        }
        self.queue.clear();
        self.flush_scheduled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_first_push_requests_frame() {
        let mut c = Coalescer::new();
        assert!(c.push(StreamEvent::chunk("a")));
        assert!(!c.push(StreamEvent::chunk("b")));
        assert!(!c.push(StreamEvent::chunk("c")));
        assert!(c.is_scheduled());
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn test_flush_preserves_order_and_clears_schedule() {
        let mut c = Coalescer::new();
        c.push(StreamEvent::reasoning("a"));
        c.push(StreamEvent::chunk("b"));

        let batch = c.begin_flush();
        assert_eq!(
            batch,
            vec![StreamEvent::reasoning("a"), StreamEvent::chunk("b")]
        );
        assert!(!c.end_flush());
        assert!(!c.is_scheduled());
        assert!(c.push(StreamEvent::chunk("c")));
    }

    #[test]
    fn test_push_during_flush_reschedules() {
        let mut c = Coalescer::new();
        c.push(StreamEvent::chunk("a"));

        let batch = c.begin_flush();
        assert_eq!(batch.len(), 1);
        // Arrives while the batch is being applied.
        assert!(!c.push(StreamEvent::chunk("b")));
        assert!(c.end_flush());

        assert_eq!(c.begin_flush(), vec![StreamEvent::chunk("b")]);
        assert!(!c.end_flush());
    }

    #[test]
    fn test_cancel_discards_queue() {
        let mut c = Coalescer::new();
        c.push(StreamEvent::chunk("a"));
        c.push(StreamEvent::done());
        c.cancel();

        assert!(c.is_empty());
        assert!(!c.is_scheduled());
        assert!(c.begin_flush().is_empty());
    }
}
