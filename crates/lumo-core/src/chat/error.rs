use std::fmt;

use crate::api::error::ClientError;
use crate::stream::decode::DecodeError;

/// Failures the chat engine reports to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// One frame could not be decoded; the stream went on.
    Decode(DecodeError),
    /// The stream connection failed and the turn ended.
    Transport(ClientError),
    /// A history page could not be fetched; the window is unchanged.
    HistoryLoad(ClientError),
    /// A create or delete call was refused; nothing local changed.
    Mutation(ClientError),
}

impl EngineError {
    pub fn client_error(&self) -> Option<&ClientError> {
        match self {
            EngineError::Decode(_) => None,
            EngineError::Transport(e) | EngineError::HistoryLoad(e) | EngineError::Mutation(e) => {
                Some(e)
            }
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Decode(e) => write!(f, "{e}"),
            EngineError::Transport(e) => write!(f, "Stream failed: {e}"),
            EngineError::HistoryLoad(e) => write!(f, "Failed to load history: {e}"),
            EngineError::Mutation(e) => write!(f, "Request failed: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Decode(e) => Some(e),
            EngineError::Transport(e) | EngineError::HistoryLoad(e) | EngineError::Mutation(e) => {
                Some(e)
            }
        }
    }
}

/// Why a submission was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    Empty,
    NoConversation,
    /// A turn is still loading or its session is still open.
    Busy,
    /// A reply is still streaming into the window.
    StreamingInProgress,
}

impl fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRejected::Empty => write!(f, "message is empty"),
            SubmitRejected::NoConversation => write!(f, "no conversation is open"),
            SubmitRejected::Busy => write!(f, "wait for the current reply to finish"),
            SubmitRejected::StreamingInProgress => write!(f, "a reply is still streaming"),
        }
    }
}

impl std::error::Error for SubmitRejected {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ClientErrorKind;

    #[test]
    fn test_display_prefixes_category() {
        let err = EngineError::HistoryLoad(ClientError::new(ClientErrorKind::Timeout, "timed out"));
        assert_eq!(err.to_string(), "Failed to load history: timed out");
        assert_eq!(err.client_error().unwrap().kind, ClientErrorKind::Timeout);
    }
}
