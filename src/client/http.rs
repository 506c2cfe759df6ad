use crate::api::schemas::auth::{Login, Registration, SessionResponse};
use crate::api::schemas::messaging::{
    ConversationResponse, ConversationView, ConversationsResponse, ErrorResponse, MessageView, MessagesResponse,
    SendMessageRequest, SendMessageResponse, StartConversation,
};
use crate::client::error::ClientError;
use crate::client::session::Session;
use crate::domain::message::MessageDraft;
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

pub const API_URL_ENV: &str = "BHROMON_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL including the `/api` prefix, without a trailing slash.
    pub base_url: String,
    /// Per-request deadline. Unset means requests wait as long as the transport allows.
    pub timeout: Option<Duration>,
    /// Drafts longer than this are rejected before any request is made.
    pub max_message_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
            max_message_length: 2000,
        }
    }

    /// Reads the base URL from `BHROMON_API_URL`, falling back to the local default.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map_or_else(Self::default, Self::new)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn http_client(&self) -> Result<reqwest::Client, ClientError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body).map(|e| e.message).ok().or_else(|| {
        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });
    tracing::debug!(status = %status, message = ?message, "Request rejected");
    Err(ClientError::from_status(status, message))
}

/// Unauthenticated calls that produce a [`Session`].
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AuthClient {
    /// # Errors
    /// Returns `ClientError::Network` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Ok(Self { http: config.http_client()?, config })
    }

    /// # Errors
    /// `Conflict` when the username is taken, `Validation` for a malformed payload.
    pub async fn register(&self, registration: &Registration) -> Result<Session, ClientError> {
        let response = self.http.post(self.config.url("/auth/register")).json(registration).send().await?;
        let session: SessionResponse = decode(response).await?;
        Ok(session.into())
    }

    /// # Errors
    /// `Unauthorized` for unknown usernames or wrong passwords.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ClientError> {
        let payload = Login { username: username.to_string(), password: password.to_string() };
        let response = self.http.post(self.config.url("/auth/login")).json(&payload).send().await?;
        let session: SessionResponse = decode(response).await?;
        Ok(session.into())
    }
}

/// Authenticated messaging calls on behalf of one [`Session`].
#[derive(Debug, Clone)]
pub struct MessagingClient {
    http: reqwest::Client,
    config: ClientConfig,
    session: Session,
}

impl MessagingClient {
    /// # Errors
    /// Returns `ClientError::Network` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig, session: Session) -> Result<Self, ClientError> {
        Ok(Self { http: config.http_client()?, config, session })
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Swaps in a refreshed credential for every subsequent request.
    pub fn replace_session(&mut self, session: Session) {
        tracing::debug!(user_id = %session.user_id, "Session replaced");
        self.session = session;
    }

    /// # Errors
    /// `Unauthorized` if the session is no longer valid.
    pub async fn list_conversations(&self) -> Result<Vec<ConversationView>, ClientError> {
        let response = self
            .http
            .get(self.config.url("/messages/conversations"))
            .bearer_auth(&self.session.token)
            .send()
            .await?;
        let body: ConversationsResponse = decode(response).await?;
        Ok(body.conversations)
    }

    /// Fetches the thread oldest first. The server marks the counterpart's messages as read.
    ///
    /// # Errors
    /// `NotFound` if the conversation does not exist or the session user is not a participant.
    pub async fn get_messages(&self, conversation_id: Uuid) -> Result<Vec<MessageView>, ClientError> {
        let response = self
            .http
            .get(self.config.url(&format!("/messages/conversations/{conversation_id}")))
            .bearer_auth(&self.session.token)
            .send()
            .await?;
        let body: MessagesResponse = decode(response).await?;
        Ok(body.messages)
    }

    /// Opens the conversation with `participant_id`, or returns the existing one.
    ///
    /// # Errors
    /// `NotFound` for an unknown participant, `Validation` for an invalid pairing.
    pub async fn start_conversation(&self, participant_id: Uuid) -> Result<ConversationView, ClientError> {
        let response = self
            .http
            .post(self.config.url("/messages/conversations"))
            .bearer_auth(&self.session.token)
            .json(&StartConversation { participant_id })
            .send()
            .await?;
        let body: ConversationResponse = decode(response).await?;
        Ok(body.conversation)
    }

    /// # Errors
    /// `Validation` without touching the network when the draft is invalid; otherwise
    /// whatever the server answers.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        draft: &MessageDraft,
    ) -> Result<SendMessageResponse, ClientError> {
        draft
            .validate_with_limit(self.config.max_message_length)
            .map_err(|e| ClientError::Validation(e.to_string()))?;

        let response = self
            .http
            .post(self.config.url("/messages/send"))
            .bearer_auth(&self.session.token)
            .json(&SendMessageRequest::to_conversation(conversation_id, draft))
            .send()
            .await?;
        decode(response).await
    }
}
