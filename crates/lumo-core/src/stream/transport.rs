//! HTTP side of a stream session.
//!
//! [`StreamClient::spawn`] posts the prompt and pumps decoded frames back
//! to the owner as [`SessionSignal`]s over an unbounded channel. The task
//! stops as soon as the session's cancellation token fires or the
//! receiving side goes away.

use futures_util::StreamExt;
use lumo_types::StreamRequest;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::decode::{Frame, FrameStream};
use super::session::{SessionId, SessionSignal, TransportSignal};
use crate::api::auth::AuthContext;
use crate::api::client::{USER_AGENT, routes};
use crate::api::error::{ClientError, ClientResult, classify_reqwest_error};

/// Opens streaming completions against the backend.
///
/// The underlying HTTP client has no overall timeout: a stream stays open
/// for as long as the server keeps it open.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    base_url: String,
    auth: AuthContext,
}

impl StreamClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, auth: AuthContext) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| classify_reqwest_error(&e))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, routes::MESSAGE_STREAM)
    }

    /// Starts the transport task for `session`.
    pub fn spawn(
        &self,
        session: SessionId,
        request: StreamRequest,
        cancel: CancellationToken,
        tx: UnboundedSender<SessionSignal>,
    ) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let outbox = Outbox { session, tx };
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(%session, "stream transport cancelled");
                }
                () = client.pump(&request, &outbox) => {}
            }
        })
    }

    async fn pump(&self, request: &StreamRequest, outbox: &Outbox) {
        let mut builder = self
            .http
            .post(self.endpoint())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .json(request);
        if let Some(token) = self.auth.bearer_for(routes::MESSAGE_STREAM) {
            builder = builder.bearer_auth(token);
        }

        tracing::debug!(
            session = %outbox.session,
            conversation_id = request.conversation_id,
            reasoning = request.reason_modal,
            "opening stream"
        );

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                outbox.send(TransportSignal::Failed(classify_reqwest_error(&e)));
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            outbox.send(TransportSignal::Failed(ClientError::http_status(
                status.as_u16(),
                &body,
            )));
            return;
        }

        if !outbox.send(TransportSignal::Opened) {
            return;
        }

        let mut frames = FrameStream::new(response.bytes_stream());
        while let Some(item) = frames.next().await {
            let signal = match item {
                Ok(Frame::Event(event)) => TransportSignal::Frame(event),
                Ok(Frame::Ignored) => continue,
                Ok(Frame::Malformed(err)) => TransportSignal::Malformed(err),
                Err(err) => {
                    outbox.send(TransportSignal::Failed(err));
                    return;
                }
            };
            if !outbox.send(signal) {
                return;
            }
        }

        outbox.send(TransportSignal::Ended);
    }
}

struct Outbox {
    session: SessionId,
    tx: UnboundedSender<SessionSignal>,
}

impl Outbox {
    /// Returns false once the receiver is gone.
    fn send(&self, signal: TransportSignal) -> bool {
        self.tx
            .send(SessionSignal {
                session: self.session,
                signal,
            })
            .is_ok()
    }
}
