use clap::Parser;
use std::time::Duration;

use crate::api::{ ApiConfig, ApiError };
use crate::transport::websocket::derive_ws_url;
use crate::transport::{ TransportConfig, TransportType };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat Backend Args ---
    /// Base URL of the portal serving /api/chat (e.g., http://localhost:8080)
    #[arg(long, env = "CHAT_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// WebSocket base URL for push updates. Derived from CHAT_BASE_URL if not set.
    #[arg(long, env = "CHAT_WS_URL")]
    pub ws_url: Option<String>,

    /// Session cookie forwarded on every request (e.g., JSESSIONID=abc123)
    #[arg(long, env = "CHAT_SESSION_COOKIE")]
    pub session_cookie: Option<String>,

    /// Timeout in seconds for each HTTP request.
    #[arg(long, env = "CHAT_REQUEST_TIMEOUT_SECS", default_value = "10")]
    pub request_timeout_secs: u64,

    // --- Conversation Args ---
    /// Request id identifying the tutoring conversation.
    #[arg(long, env = "CHAT_REQUEST_ID")]
    pub request_id: String,

    /// Display name of the chat partner, used for the title.
    #[arg(long, env = "CHAT_PARTNER_NAME", default_value = "your partner")]
    pub partner_name: String,

    // --- Update Args ---
    /// How new messages arrive (polling, websocket)
    #[arg(long, env = "CHAT_TRANSPORT", default_value = "polling")]
    pub transport: TransportType,

    /// Seconds between polls when using the polling transport.
    #[arg(long, env = "CHAT_POLL_INTERVAL_SECS", default_value = "5")]
    pub poll_interval_secs: u64,

    // --- General App Args ---
    /// Print the number of messages in the conversation and exit.
    #[arg(long, default_value = "false")]
    pub count: bool,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}

impl Args {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            session_cookie: self.session_cookie.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn transport_config(&self) -> Result<TransportConfig, ApiError> {
        let ws_url = match (&self.transport, &self.ws_url) {
            (_, Some(url)) if !url.trim().is_empty() => Some(url.clone()),
            (TransportType::WebSocket, _) => Some(derive_ws_url(&self.base_url)?),
            _ => None,
        };
        Ok(TransportConfig {
            transport_type: self.transport,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            ws_url,
            session_cookie: self.session_cookie.clone(),
        })
    }
}
