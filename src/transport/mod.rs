pub mod polling;
pub mod websocket;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ ApiError, ChatApi };
use crate::models::chat::ChatMessage;
use self::polling::PollingTransport;
use self::websocket::WebSocketTransport;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    Polling,
    WebSocket,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseTransportTypeError {
    message: String,
}

impl fmt::Display for ParseTransportTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseTransportTypeError {}

impl FromStr for TransportType {
    type Err = ParseTransportTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "polling" | "poll" | "http" => Ok(TransportType::Polling),
            "websocket" | "ws" => Ok(TransportType::WebSocket),
            _ =>
                Err(ParseTransportTypeError {
                    message: format!("Invalid transport type: '{}'", s),
                }),
        }
    }
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportType::Polling => write!(f, "polling"),
            TransportType::WebSocket => write!(f, "websocket"),
        }
    }
}

/// Background notification for the widget. Every event carries the
/// generation of the conversation that started the producing task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Tick {
        generation: u64,
    },
    Delivered {
        generation: u64,
        messages: Vec<ChatMessage>,
    },
    Closed {
        generation: u64,
        reason: String,
    },
}

impl TransportEvent {
    pub fn generation(&self) -> u64 {
        match self {
            | TransportEvent::Tick { generation }
            | TransportEvent::Delivered { generation, .. }
            | TransportEvent::Closed { generation, .. } => *generation,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<TransportEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Handle to a running timer or push connection. Dropping it stops the task.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// How a widget receives and sends messages for one conversation.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn transport_type(&self) -> TransportType;

    fn api(&self) -> Arc<dyn ChatApi>;

    async fn load_history(&self, request_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.api().list_messages(request_id).await
    }

    /// Starts the update source: a repeating tick for polling, a live
    /// connection for push.
    async fn subscribe(
        &self,
        request_id: &str,
        generation: u64,
        events: EventSender
    ) -> Result<Subscription, ApiError>;

    async fn fetch_since(&self, request_id: &str, after: &str) -> Result<Vec<ChatMessage>, ApiError> {
        self.api().list_messages_since(request_id, after).await
    }

    /// Returns the server echo when the transport gets one back directly.
    async fn send(&self, request_id: &str, content: &str) -> Result<Option<ChatMessage>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub transport_type: TransportType,
    pub poll_interval: Duration,
    pub ws_url: Option<String>,
    pub session_cookie: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            transport_type: TransportType::Polling,
            poll_interval: DEFAULT_POLL_INTERVAL,
            ws_url: None,
            session_cookie: None,
        }
    }
}

pub fn new_transport(
    config: &TransportConfig,
    api: Arc<dyn ChatApi>
) -> Result<Arc<dyn ChatTransport>, ApiError> {
    let transport: Arc<dyn ChatTransport> = match config.transport_type {
        TransportType::Polling => {
            let specific = PollingTransport::new(api, config.poll_interval)?;
            Arc::new(specific)
        }
        TransportType::WebSocket => {
            let ws_url = config.ws_url
                .as_deref()
                .ok_or_else(|| ApiError::InvalidConfig("websocket transport needs a URL".into()))?;
            let specific = WebSocketTransport::new(api, ws_url, config.session_cookie.clone())?;
            Arc::new(specific)
        }
    };
    Ok(transport)
}
