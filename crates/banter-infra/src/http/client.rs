//! HttpBackendClient -- concrete [`BackendClient`] over the Banter HTTP API.
//!
//! Every request carries the caller identity in the `X-User-Id` header.
//! Non-2xx responses map to [`BackendError`] through the JSON error
//! envelope when present, falling back to the body text or status reason.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use banter_core::backend::{BackendClient, ChatReply, ChatRequest, ChunkStream};
use banter_types::chat::{Conversation, ConversationId};
use banter_types::config::ClientConfig;
use banter_types::error::BackendError;
use banter_types::identity::UserIdentity;
use banter_types::memory::{MemoryEntry, MemoryId};

use super::streaming::chunk_stream;
use super::types::{CreateConversationBody, ErrorEnvelope, UpdateConversationBody};

/// Longest body text echoed back as an error message.
const MAX_ERROR_BODY: usize = 300;

/// Backend client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackendClient {
    /// Header carrying the caller identity.
    pub const IDENTITY_HEADER: &'static str = "X-User-Id";

    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| BackendError::Transport(format!("invalid backend URL '{base_url}': {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(BackendError::Transport(format!(
                "invalid backend URL '{base_url}': not a base URL"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, BackendError> {
        Self::new(&config.backend_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL plus percent-encoded path segments.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, identity: &UserIdentity, segments: &[&str]) -> RequestBuilder {
        let url = self.url(segments);
        debug!(%method, %url, "Backend request");
        self.client
            .request(method, url)
            .header(Self::IDENTITY_HEADER, identity.as_str())
    }
}

impl BackendClient for HttpBackendClient {
    async fn list_conversations(
        &self,
        identity: &UserIdentity,
    ) -> Result<Vec<Conversation>, BackendError> {
        let response = self
            .request(Method::GET, identity, &["conversations"])
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn create_conversation(
        &self,
        identity: &UserIdentity,
        title: Option<&str>,
    ) -> Result<Conversation, BackendError> {
        let response = self
            .request(Method::POST, identity, &["conversations"])
            .json(&CreateConversationBody { title })
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn get_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
    ) -> Result<Conversation, BackendError> {
        let response = self
            .request(Method::GET, identity, &["conversations", id.as_str()])
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn update_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        title: &str,
    ) -> Result<Conversation, BackendError> {
        let response = self
            .request(Method::PUT, identity, &["conversations", id.as_str()])
            .json(&UpdateConversationBody { title })
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn delete_conversation(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
    ) -> Result<(), BackendError> {
        let response = self
            .request(Method::DELETE, identity, &["conversations", id.as_str()])
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await.map(drop)
    }

    async fn send_chat(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        request: &ChatRequest,
    ) -> Result<ChatReply, BackendError> {
        let response = self
            .request(Method::POST, identity, &["conversations", id.as_str(), "chat"])
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    fn stream_chat(
        &self,
        identity: &UserIdentity,
        id: &ConversationId,
        request: ChatRequest,
    ) -> ChunkStream {
        let builder = self
            .request(Method::POST, identity, &["conversations", id.as_str(), "chat"])
            .header(reqwest::header::ACCEPT, "text/plain")
            .json(&request);
        chunk_stream(builder)
    }

    async fn list_memories(
        &self,
        identity: &UserIdentity,
    ) -> Result<Vec<MemoryEntry>, BackendError> {
        let response = self
            .request(Method::GET, identity, &["memories"])
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn delete_memory(
        &self,
        identity: &UserIdentity,
        id: &MemoryId,
    ) -> Result<(), BackendError> {
        let response = self
            .request(Method::DELETE, identity, &["memories", id.0.as_str()])
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await.map(drop)
    }
}

pub(crate) fn transport_error(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

/// Pass 2xx responses through; turn anything else into a `BackendError`.
pub(crate) async fn check_status(response: Response) -> Result<Response, BackendError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

async fn error_from_response(response: Response) -> BackendError {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return BackendError::NotFound;
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(ErrorEnvelope::into_message)
        .ok()
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty()).then(|| text.chars().take(MAX_ERROR_BODY).collect())
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    BackendError::Reported {
        status: Some(status.as_u16()),
        message,
    }
}

/// Decode a 2xx JSON body into `T`.
///
/// A 2xx body carrying the error envelope is a backend-reported error; any
/// other shape mismatch is `Malformed`.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let response = check_status(response).await?;
    let body = response.bytes().await.map_err(transport_error)?;

    serde_json::from_slice::<T>(&body).map_err(|e| {
        match serde_json::from_slice::<ErrorEnvelope>(&body) {
            Ok(envelope) => BackendError::Reported {
                status: None,
                message: envelope.into_message(),
            },
            Err(_) => BackendError::Malformed(e.to_string()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn alice() -> UserIdentity {
        UserIdentity::new("alice").unwrap()
    }

    fn client(server: &MockServer) -> HttpBackendClient {
        HttpBackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn conversation_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": "New Chat",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        })
    }

    #[test]
    fn url_encodes_segments_and_keeps_base_path() {
        let client = HttpBackendClient::new("http://localhost:3000/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url(&["conversations"]).path(), "/api/conversations");
        assert_eq!(
            client.url(&["conversations", "a b/c", "chat"]).path(),
            "/api/conversations/a%20b%2Fc/chat"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(HttpBackendClient::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpBackendClient::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn list_conversations_sends_identity_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations"))
            .and(header("X-User-Id", "alice"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([conversation_json("c-1"), conversation_json("c-2")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let conversations = client(&server).list_conversations(&alice()).await.unwrap();
        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[1].id, ConversationId::new("c-2"));
    }

    #[tokio::test]
    async fn create_conversation_posts_optional_title() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(201).set_body_json(conversation_json("c-9")))
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server).create_conversation(&alice(), None).await.unwrap();
        assert_eq!(created.id, ConversationId::new("c-9"));
    }

    #[tokio::test]
    async fn get_conversation_includes_messages() {
        let server = MockServer::start().await;
        let mut body = conversation_json("c-1");
        body["messages"] = json!([
            {"id": "m1", "role": "user", "content": "hi"},
            {"id": "m2", "role": "assistant", "content": "hello"}
        ]);
        Mock::given(method("GET"))
            .and(path("/conversations/c-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let conv = client(&server)
            .get_conversation(&alice(), &ConversationId::new("c-1"))
            .await
            .unwrap();
        assert_eq!(conv.messages.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_conversation_puts_title() {
        let server = MockServer::start().await;
        let mut body = conversation_json("c-1");
        body["title"] = json!("Soup");
        Mock::given(method("PUT"))
            .and(path("/conversations/c-1"))
            .and(body_json(json!({"title": "Soup"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let updated = client(&server)
            .update_conversation(&alice(), &ConversationId::new("c-1"), "Soup")
            .await
            .unwrap();
        assert_eq!(updated.title, "Soup");
    }

    #[tokio::test]
    async fn delete_maps_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/conversations/c-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/conversations/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(client
            .delete_conversation(&alice(), &ConversationId::new("c-1"))
            .await
            .is_ok());
        assert_eq!(
            client
                .delete_conversation(&alice(), &ConversationId::new("gone"))
                .await,
            Err(BackendError::NotFound)
        );
    }

    #[tokio::test]
    async fn send_chat_reads_response_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations/c-1/chat"))
            .and(header("accept", "application/json"))
            .and(body_json(json!({"content": "hi"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Hello!"})))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest {
            content: "hi".to_string(),
            attachments: Vec::new(),
        };
        let reply = client(&server)
            .send_chat(&alice(), &ConversationId::new("c-1"), &request)
            .await
            .unwrap();
        assert_eq!(reply.response, "Hello!");
    }

    #[tokio::test]
    async fn send_chat_rejects_other_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Hello!"})))
            .mount(&server)
            .await;

        let request = ChatRequest {
            content: "hi".to_string(),
            attachments: Vec::new(),
        };
        let err = client(&server)
            .send_chat(&alice(), &ConversationId::new("c-1"), &request)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn success_status_with_error_envelope_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/memories"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"error": {"message": "memory service offline"}})),
            )
            .mount(&server)
            .await;

        let err = client(&server).list_memories(&alice()).await.unwrap_err();
        assert_eq!(
            err,
            BackendError::Reported {
                status: None,
                message: "memory service offline".to_string()
            }
        );
    }

    #[tokio::test]
    async fn error_envelope_and_fallbacks() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "model unavailable"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/memories"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/memories/m-1"))
            .respond_with(ResponseTemplate::new(502).set_body_string("upstream timed out"))
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(
            client.list_conversations(&alice()).await.unwrap_err(),
            BackendError::Reported {
                status: Some(500),
                message: "model unavailable".to_string()
            }
        );
        assert_eq!(
            client.list_memories(&alice()).await.unwrap_err(),
            BackendError::Reported {
                status: Some(503),
                message: "Service Unavailable".to_string()
            }
        );
        assert_eq!(
            client.delete_memory(&alice(), &MemoryId::new("m-1")).await.unwrap_err(),
            BackendError::Reported {
                status: Some(502),
                message: "upstream timed out".to_string()
            }
        );
    }

    #[tokio::test]
    async fn list_memories_parses_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/memories"))
            .and(header("X-User-Id", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "m-1", "content": "Prefers metric units", "created_at": "2025-03-01T12:00:00Z"}
            ])))
            .mount(&server)
            .await;

        let memories = client(&server).list_memories(&alice()).await.unwrap();
        assert_eq!(memories[0].content, "Prefers metric units");
    }

    #[tokio::test]
    async fn stream_chat_yields_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations/c-1/chat"))
            .and(header("accept", "text/plain"))
            .and(header("X-User-Id", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hello, w\u{f6}rld \u{1f30d}"))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest {
            content: "hi".to_string(),
            attachments: Vec::new(),
        };
        let chunks: Vec<Result<String, BackendError>> = client(&server)
            .stream_chat(&alice(), &ConversationId::new("c-1"), request)
            .collect()
            .await;
        let text: String = chunks.into_iter().map(Result::unwrap).collect();
        assert_eq!(text, "Hello, w\u{f6}rld \u{1f30d}");
    }

    #[tokio::test]
    async fn stream_chat_is_lazy_and_maps_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations/c-1/chat"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "slow down"}})),
            )
            .mount(&server)
            .await;

        let request = ChatRequest {
            content: "hi".to_string(),
            attachments: Vec::new(),
        };
        let mut stream = client(&server).stream_chat(&alice(), &ConversationId::new("c-1"), request);
        assert!(server.received_requests().await.unwrap().is_empty());

        let first = stream.next().await.unwrap();
        assert_eq!(
            first,
            Err(BackendError::Reported {
                status: Some(429),
                message: "slow down".to_string()
            })
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let client = HttpBackendClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = client.list_conversations(&alice()).await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
