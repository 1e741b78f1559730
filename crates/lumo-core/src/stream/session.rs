//! Lifecycle of one streaming connection.
//!
//! The transport task runs elsewhere and reports [`TransportSignal`]s
//! tagged with the [`SessionId`] it was started for. The session turns
//! those into observer callbacks and enforces the state machine:
//!
//! ```text
//! idle -> connecting -> open -> { closed | errored }
//! ```
//!
//! Both end states are terminal. Once terminal, no further `on_event` or
//! `on_error` reaches the observer, and `on_close` has fired exactly once.

use std::fmt;

use lumo_types::StreamEvent;
use tokio_util::sync::CancellationToken;

use super::decode::DecodeError;
use crate::api::error::ClientError;
use crate::chat::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Closed | SessionStatus::Errored)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Open => "streaming",
            SessionStatus::Closed => "closed",
            SessionStatus::Errored => "errored",
        }
    }
}

/// What the transport task reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportSignal {
    /// Response headers arrived with a success status.
    Opened,
    Frame(StreamEvent),
    /// A frame was dropped by the decoder.
    Malformed(DecodeError),
    /// The connection failed; no more signals follow.
    Failed(ClientError),
    /// The server ended the stream.
    Ended,
}

/// A transport signal addressed to one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSignal {
    pub session: SessionId,
    pub signal: TransportSignal,
}

/// Receives session callbacks.
pub trait SessionObserver {
    fn on_event(&mut self, event: StreamEvent);
    fn on_error(&mut self, error: &ClientError);
    fn on_close(&mut self, status: SessionStatus);
    /// A frame was dropped; the stream goes on.
    fn on_dropped(&mut self, _error: &EngineError) {}
}

#[derive(Debug)]
pub struct StreamSession {
    id: SessionId,
    status: SessionStatus,
    cancel: CancellationToken,
    delivered: u64,
    dropped_frames: u64,
}

impl StreamSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            status: SessionStatus::Idle,
            cancel: CancellationToken::new(),
            delivered: 0,
            dropped_frames: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Frames the decoder threw away during this session.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Moves to `connecting` and hands out the token the transport task
    /// must watch.
    pub fn connect(&mut self) -> CancellationToken {
        if self.status == SessionStatus::Idle {
            self.status = SessionStatus::Connecting;
        }
        self.cancel.clone()
    }

    /// Routes one transport signal to the observer.
    pub fn dispatch(&mut self, signal: TransportSignal, observer: &mut impl SessionObserver) {
        if self.status.is_terminal() {
            tracing::debug!(session = %self.id, ?signal, "signal after session end dropped");
            return;
        }

        match signal {
            TransportSignal::Opened => {
                self.status = SessionStatus::Open;
                tracing::debug!(session = %self.id, "stream opened");
            }
            TransportSignal::Frame(event) => {
                self.status = SessionStatus::Open;
                self.delivered += 1;
                observer.on_event(event);
            }
            TransportSignal::Malformed(err) => {
                self.dropped_frames += 1;
                tracing::warn!(
                    session = %self.id,
                    payload = %err.payload,
                    dropped = self.dropped_frames,
                    "dropping malformed stream frame"
                );
                let error = EngineError::Decode(err);
                tracing::debug!(session = %self.id, error = %error, "frame dropped");
                observer.on_dropped(&error);
            }
            TransportSignal::Failed(err) => {
                tracing::error!(session = %self.id, kind = %err.kind, error = %err, "stream failed");
                observer.on_error(&err);
                self.finish(SessionStatus::Errored, observer);
            }
            TransportSignal::Ended => {
                tracing::debug!(session = %self.id, "stream ended by server");
                self.finish(SessionStatus::Closed, observer);
            }
        }
    }

    /// Closes the session. Safe to call any number of times; the observer
    /// sees `on_close` only once.
    pub fn close(&mut self, observer: &mut impl SessionObserver) {
        if self.status.is_terminal() {
            return;
        }
        self.finish(SessionStatus::Closed, observer);
    }

    fn finish(&mut self, status: SessionStatus, observer: &mut impl SessionObserver) {
        self.cancel.cancel();
        self.status = status;
        tracing::debug!(
            session = %self.id,
            status = status.label(),
            delivered = self.delivered,
            dropped_frames = self.dropped_frames,
            "session finished"
        );
        observer.on_close(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ClientErrorKind;

    #[derive(Default)]
    struct Recorder {
        events: Vec<StreamEvent>,
        errors: Vec<ClientError>,
        closes: Vec<SessionStatus>,
        dropped: Vec<EngineError>,
    }

    impl SessionObserver for Recorder {
        fn on_event(&mut self, event: StreamEvent) {
            self.events.push(event);
        }

        fn on_error(&mut self, error: &ClientError) {
            self.errors.push(error.clone());
        }

        fn on_close(&mut self, status: SessionStatus) {
            self.closes.push(status);
        }

        fn on_dropped(&mut self, error: &EngineError) {
            self.dropped.push(error.clone());
        }
    }

    fn connected() -> (StreamSession, CancellationToken) {
        let mut session = StreamSession::new(SessionId(1));
        let token = session.connect();
        (session, token)
    }

    #[test]
    fn test_state_machine_happy_path() {
        let (mut session, token) = connected();
        let mut rec = Recorder::default();
        assert_eq!(session.status(), SessionStatus::Connecting);

        session.dispatch(TransportSignal::Opened, &mut rec);
        assert_eq!(session.status(), SessionStatus::Open);

        session.dispatch(TransportSignal::Frame(StreamEvent::chunk("a")), &mut rec);
        session.dispatch(TransportSignal::Frame(StreamEvent::chunk("b")), &mut rec);
        session.dispatch(TransportSignal::Ended, &mut rec);

        assert_eq!(
            rec.events,
            vec![StreamEvent::chunk("a"), StreamEvent::chunk("b")]
        );
        assert_eq!(rec.closes, vec![SessionStatus::Closed]);
        assert_eq!(session.status(), SessionStatus::Closed);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut session, _token) = connected();
        let mut rec = Recorder::default();

        session.close(&mut rec);
        session.close(&mut rec);
        session.close(&mut rec);

        assert_eq!(rec.closes, vec![SessionStatus::Closed]);
    }

    #[test]
    fn test_no_callbacks_after_close() {
        let (mut session, _token) = connected();
        let mut rec = Recorder::default();

        session.close(&mut rec);
        session.dispatch(TransportSignal::Frame(StreamEvent::chunk("late")), &mut rec);
        session.dispatch(
            TransportSignal::Failed(ClientError::new(ClientErrorKind::Connect, "late")),
            &mut rec,
        );
        session.dispatch(TransportSignal::Ended, &mut rec);

        assert!(rec.events.is_empty());
        assert!(rec.errors.is_empty());
        assert_eq!(rec.closes.len(), 1);
    }

    #[test]
    fn test_failure_reports_once_then_closes() {
        let (mut session, token) = connected();
        let mut rec = Recorder::default();
        let err = ClientError::new(ClientErrorKind::Stream, "reset by peer");

        session.dispatch(TransportSignal::Failed(err.clone()), &mut rec);
        session.dispatch(TransportSignal::Failed(err.clone()), &mut rec);
        session.close(&mut rec);

        assert_eq!(rec.errors, vec![err]);
        assert_eq!(rec.closes, vec![SessionStatus::Errored]);
        assert_eq!(session.status(), SessionStatus::Errored);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_malformed_frames_are_counted_not_delivered() {
        let (mut session, _token) = connected();
        let mut rec = Recorder::default();

        let bad = DecodeError {
            message: "expected value".to_string(),
            payload: "{oops".to_string(),
        };
        session.dispatch(TransportSignal::Malformed(bad.clone()), &mut rec);
        session.dispatch(TransportSignal::Frame(StreamEvent::chunk("ok")), &mut rec);

        assert_eq!(rec.dropped, vec![EngineError::Decode(bad)]);
        assert!(rec.errors.is_empty());
        assert_eq!(session.dropped_frames(), 1);
        assert_eq!(session.delivered(), 1);
        assert_eq!(rec.events, vec![StreamEvent::chunk("ok")]);
        assert!(session.is_active());
    }
}
