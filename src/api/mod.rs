pub mod http;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::chat::ChatMessage;
use self::http::HttpChatApi;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("access to this chat was denied")]
    Forbidden,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("push connection is not open")]
    NotConnected,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// REST surface of the chat backend, keyed by request id.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn check_access(&self, request_id: &str) -> Result<bool, ApiError>;

    async fn list_messages(&self, request_id: &str) -> Result<Vec<ChatMessage>, ApiError>;

    /// Messages created strictly after `after`, oldest first.
    async fn list_messages_since(
        &self,
        request_id: &str,
        after: &str
    ) -> Result<Vec<ChatMessage>, ApiError>;

    async fn post_message(&self, request_id: &str, content: &str) -> Result<ChatMessage, ApiError>;

    async fn message_count(&self, request_id: &str) -> Result<u64, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub session_cookie: Option<String>,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            session_cookie: None,
            timeout: Duration::from_secs(10),
        }
    }
}

pub fn new_client(config: &ApiConfig) -> Result<Arc<dyn ChatApi>, ApiError> {
    let client = HttpChatApi::from_config(config)?;
    Ok(Arc::new(client))
}
