//! Streaming completions: frame decoding, session lifecycle and the HTTP
//! transport task.

pub mod decode;
pub mod session;
pub mod transport;

pub use decode::{DecodeError, Frame, FrameStream, decode_frame};
pub use session::{
    SessionId, SessionObserver, SessionSignal, SessionStatus, StreamSession, TransportSignal,
};
pub use transport::StreamClient;
