//! Stream frame decoding.
//!
//! Each SSE `data:` payload is a JSON object with a `type` discriminator.
//! Unknown types decode to nothing; malformed payloads are reported as a
//! [`DecodeError`] so the caller can drop the frame and keep reading.

use std::fmt;
use std::pin::Pin;

use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use lumo_types::{ConversationId, MessageId, StreamEvent};
use serde::Deserialize;

use crate::api::error::{ClientError, ClientErrorKind, ClientResult};

const MAX_PAYLOAD_PREVIEW: usize = 200;

/// A single frame that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub message: String,
    /// Leading part of the offending payload.
    pub payload: String,
}

impl DecodeError {
    fn new(message: impl Into<String>, payload: &str) -> Self {
        Self {
            message: message.into(),
            payload: payload.chars().take(MAX_PAYLOAD_PREVIEW).collect(),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed stream frame: {}", self.message)
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    frame_type: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    conversation_id: Option<ConversationId>,
    #[serde(default)]
    user_message_id: Option<MessageId>,
    #[serde(default)]
    user_message: Option<RawMessageRef>,
    #[serde(default)]
    ai_message: Option<RawMessageRef>,
}

#[derive(Debug, Deserialize)]
struct RawMessageRef {
    id: MessageId,
}

/// Decodes one frame payload.
///
/// Returns `Ok(None)` for keep-alive payloads and unrecognized types.
///
/// # Errors
/// Returns a [`DecodeError`] when the payload is not a JSON frame.
pub fn decode_frame(data: &str) -> Result<Option<StreamEvent>, DecodeError> {
    let trimmed = data.trim();
    if trimmed.is_empty() || trimmed == "[DONE]" {
        return Ok(None);
    }

    let raw: RawFrame =
        serde_json::from_str(trimmed).map_err(|e| DecodeError::new(e.to_string(), trimmed))?;

    let event = match raw.frame_type.as_str() {
        "reasoning" => StreamEvent::Reasoning {
            delta: raw.reasoning_content.unwrap_or_default(),
        },
        "chunk" => StreamEvent::Chunk {
            delta: raw.content.unwrap_or_default(),
        },
        "complete" => StreamEvent::Complete {
            conversation_id: raw.conversation_id,
            user_message_id: raw
                .user_message
                .map(|m| m.id)
                .or(raw.user_message_id),
            ai_message_id: raw.ai_message.map(|m| m.id),
        },
        "done" => StreamEvent::Done {
            conversation_id: raw.conversation_id,
        },
        "error" => StreamEvent::Error {
            message: raw
                .msg
                .or(raw.content)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "the server reported an error".to_string()),
        },
        other => {
            tracing::trace!(frame_type = other, "ignoring unknown stream frame type");
            return Ok(None);
        }
    };

    Ok(Some(event))
}

/// Outcome of reading one frame off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Event(StreamEvent),
    /// Keep-alive or a type this client does not know.
    Ignored,
    Malformed(DecodeError),
}

/// Turns a byte stream into decoded frames.
///
/// Transport-level failures (including invalid UTF-8 or broken SSE
/// framing) surface as `Err`; a bad JSON payload is a
/// [`Frame::Malformed`] item and the stream keeps going.
pub struct FrameStream<S> {
    inner: EventStream<S>,
}

impl<S> FrameStream<S> {
    pub fn new(stream: S) -> Self
    where
        S: Eventsource,
    {
        Self {
            inner: stream.eventsource(),
        }
    }
}

impl<S, E> Stream for FrameStream<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    type Item = ClientResult<Frame>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        use std::task::Poll;

        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                let frame = match decode_frame(&event.data) {
                    Ok(Some(ev)) => Frame::Event(ev),
                    Ok(None) => Frame::Ignored,
                    Err(err) => Frame::Malformed(err),
                };
                Poll::Ready(Some(Ok(frame)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(ClientError::new(
                ClientErrorKind::Stream,
                format!("SSE stream error: {e}"),
            )))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
