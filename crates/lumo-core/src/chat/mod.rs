//! The chat engine: update coalescing, the transcript window, history
//! pagination, and the view that ties them to a stream session.

pub mod coalescer;
pub mod error;
pub mod notice;
pub mod pagination;
pub mod transcript;
pub mod view;

pub use coalescer::Coalescer;
pub use error::{EngineError, SubmitRejected};
pub use notice::{Notice, NoticeLevel};
pub use pagination::{AutoScroll, PaginationController, ScrollThresholds, Viewport};
pub use transcript::{
    BatchOutcome, CANCELLED_TEXT, ExpandedSet, FALLBACK_CONNECTION, FALLBACK_EMPTY, PageCursor,
    TranscriptStore, TurnState,
};
pub use view::{ChatView, ViewConfig, ViewEffect};
