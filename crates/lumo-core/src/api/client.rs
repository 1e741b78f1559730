//! REST client for the chat backend.
//!
//! Every response is wrapped in `{code, msg, data}`; a non-200 `code` is a
//! failure even when the HTTP status is 200.

use std::time::Duration;

use lumo_types::{
    AuthSession, Conversation, ConversationId, ConversationPage, HistoryPage, Message, MessageId,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::auth::AuthContext;
use super::error::{ClientError, ClientResult, classify_reqwest_error};

/// Standard User-Agent header for lumo requests.
pub const USER_AGENT: &str = concat!("lumo/", env!("CARGO_PKG_VERSION"));

pub(crate) mod routes {
    pub const LOGIN: &str = "/api/auth/login";
    pub const REGISTER: &str = "/api/auth/register";
    pub const MESSAGE_LIST: &str = "/api/message/list";
    pub const MESSAGE_DELETE: &str = "/api/message/delete";
    pub const MESSAGE_STREAM: &str = "/api/message/stream";
    pub const CONVERSATION_CREATE: &str = "/api/conversation/create";
    pub const CONVERSATION_LIST: &str = "/api/conversation/list";
    pub const CONVERSATION_DELETE: &str = "/api/conversation/delete";
}

const OK_CODE: i64 = 200;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> ClientResult<Option<T>> {
        if self.code == OK_CODE {
            Ok(self.data)
        } else {
            let text = self.msg.or(self.message);
            Err(ClientError::api(self.code, text.as_deref()))
        }
    }
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateConversation<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

/// One history page converted to client messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPage {
    /// Newest first, exactly as the backend ordered them.
    pub messages: Vec<Message>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl LoadedPage {
    fn from_wire(page: HistoryPage) -> ClientResult<Self> {
        let messages = page
            .messages
            .into_iter()
            .map(|wire| {
                let id = wire.id;
                Message::try_from(wire)
                    .map_err(|e| ClientError::parse(format!("message {id}: {e}")))
            })
            .collect::<ClientResult<Vec<_>>>()?;
        Ok(Self {
            messages,
            page: page.page,
            page_size: page.page_size,
            total: page.total,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: AuthContext,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        auth: AuthContext,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| classify_reqwest_error(&e))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.auth.bearer_for(path) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> ClientResult<Option<T>> {
        let response = builder
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        if !status.is_success() {
            return Err(ClientError::http_status(status.as_u16(), &body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            ClientError::parse(format!("Failed to parse response: {e}")).with_details(body.clone())
        })?;
        envelope.into_data()
    }

    async fn send_data<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> ClientResult<T> {
        self.send(builder)
            .await?
            .ok_or_else(|| ClientError::parse(format!("Response for {what} had no data")))
    }

    /// # Errors
    /// Returns an error if the backend rejects the credentials.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<AuthSession> {
        let body = Credentials {
            username,
            password,
            email: None,
        };
        let builder = self
            .request(reqwest::Method::POST, routes::LOGIN)
            .json(&body);
        self.send_data(builder, "login").await
    }

    /// # Errors
    /// Returns an error if the backend refuses the registration.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> ClientResult<AuthSession> {
        let body = Credentials {
            username,
            password,
            email,
        };
        let builder = self
            .request(reqwest::Method::POST, routes::REGISTER)
            .json(&body);
        self.send_data(builder, "register").await
    }

    /// Fetches one page of history, newest first.
    ///
    /// # Errors
    /// Returns an error if the request fails or the page cannot be parsed.
    pub async fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: u32,
        page_size: u32,
    ) -> ClientResult<LoadedPage> {
        let builder = self
            .request(reqwest::Method::GET, routes::MESSAGE_LIST)
            .query(&[
                ("conversation_id", conversation_id.to_string()),
                ("page", page.to_string()),
                ("page_size", page_size.to_string()),
            ]);
        let page: HistoryPage = self.send_data(builder, "message list").await?;
        LoadedPage::from_wire(page)
    }

    /// # Errors
    /// Returns an error if the backend refuses the delete.
    pub async fn delete_message(&self, id: MessageId) -> ClientResult<()> {
        let path = format!("{}/{id}", routes::MESSAGE_DELETE);
        let builder = self.request(reqwest::Method::DELETE, &path);
        self.send::<Value>(builder).await.map(|_| ())
    }

    /// # Errors
    /// Returns an error if the backend refuses to create the conversation.
    pub async fn create_conversation(&self, title: Option<&str>) -> ClientResult<Conversation> {
        let builder = self
            .request(reqwest::Method::POST, routes::CONVERSATION_CREATE)
            .json(&CreateConversation { title });
        self.send_data(builder, "conversation create").await
    }

    /// # Errors
    /// Returns an error if the request fails or the list cannot be parsed.
    pub async fn list_conversations(
        &self,
        page: u32,
        page_size: u32,
    ) -> ClientResult<ConversationPage> {
        let builder = self
            .request(reqwest::Method::GET, routes::CONVERSATION_LIST)
            .query(&[("page", page), ("page_size", page_size)]);
        self.send_data(builder, "conversation list").await
    }

    /// # Errors
    /// Returns an error if the backend refuses the delete.
    pub async fn delete_conversation(&self, id: ConversationId) -> ClientResult<()> {
        let path = format!("{}/{id}", routes::CONVERSATION_DELETE);
        let builder = self.request(reqwest::Method::DELETE, &path);
        self.send::<Value>(builder).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use super::*;
    use crate::api::error::ClientErrorKind;

    fn client(server: &MockServer, auth: AuthContext) -> ApiClient {
        ApiClient::new(server.uri(), auth, Duration::from_secs(5)).unwrap()
    }

    fn wire_message(id: i64, role: u8) -> Value {
        json!({
            "id": id,
            "created_at": format!("2025-03-01T10:00:{:02}Z", id),
            "updated_at": "2025-03-01T10:00:00Z",
            "content": format!("m{id}"),
            "reasoning_content": "",
            "type": 1,
            "message_role": role,
            "user_id": 1,
            "conversation_id": 42
        })
    }

    #[tokio::test]
    async fn test_list_messages_sends_query_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/message/list"))
            .and(query_param("conversation_id", "42"))
            .and(query_param("page", "2"))
            .and(query_param("page_size", "10"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "msg": "ok",
                "data": {
                    "page": 2,
                    "page_size": 10,
                    "total": 2,
                    "messages": [wire_message(12, 1), wire_message(11, 2)]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client(&server, AuthContext::with_token("tok"))
            .list_messages(42, 2, 10)
            .await
            .unwrap();

        assert_eq!(page.page, 2);
        let ids: Vec<_> = page.messages.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![12, 11]);
    }

    #[tokio::test]
    async fn test_login_never_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(|req: &Request| {
                if req.headers.contains_key("authorization") {
                    ResponseTemplate::new(400)
                } else {
                    ResponseTemplate::new(200).set_body_json(json!({
                        "code": 200,
                        "msg": "ok",
                        "data": {
                            "token": "fresh",
                            "user": {"id": 3, "username": "ada", "email": "a@b.c",
                                     "nickname": "", "avatar": "", "created_at": 1}
                        }
                    }))
                }
            })
            .mount(&server)
            .await;

        let session = client(&server, AuthContext::with_token("stale"))
            .login("ada", "pw")
            .await
            .unwrap();
        assert_eq!(session.token, "fresh");
        assert_eq!(session.user.id, 3);
    }

    #[tokio::test]
    async fn test_envelope_code_failure_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/message/delete/9"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 400, "msg": "not found", "data": null
            })))
            .mount(&server)
            .await;

        let err = client(&server, AuthContext::with_token("tok"))
            .delete_message(9)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Api);
        assert!(err.message.contains("not found"));
    }

    #[tokio::test]
    async fn test_http_401_maps_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/conversation/list"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "code": 401, "msg": "token expired", "data": null
            })))
            .mount(&server)
            .await;

        let err = client(&server, AuthContext::anonymous())
            .list_conversations(1, 10)
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.message, "HTTP 401: token expired");
    }

    #[tokio::test]
    async fn test_delete_accepts_null_data() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/conversation/delete/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200, "msg": "deleted", "data": null
            })))
            .mount(&server)
            .await;

        client(&server, AuthContext::with_token("tok"))
            .delete_conversation(5)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_conversation_returns_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/conversation/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "msg": "ok",
                "data": {
                    "id": 77, "title": "trip", "user_id": 1, "last_msg": "",
                    "last_msg_at": null,
                    "created_at": "2025-03-01T10:00:00Z",
                    "updated_at": "2025-03-01T10:00:00Z"
                }
            })))
            .mount(&server)
            .await;

        let conversation = client(&server, AuthContext::with_token("tok"))
            .create_conversation(Some("trip"))
            .await
            .unwrap();
        assert_eq!(conversation.id, 77);
        assert_eq!(conversation.title, "trip");
    }

    #[tokio::test]
    async fn test_unknown_role_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/message/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {"page": 1, "page_size": 10, "total": 1,
                         "messages": [wire_message(1, 7)]}
            })))
            .mount(&server)
            .await;

        let err = client(&server, AuthContext::anonymous())
            .list_messages(42, 1, 10)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::Parse);
    }
}
