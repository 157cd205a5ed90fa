use serde::{ Serialize, Deserialize };

use super::chat::ChatMessage;

/// Frame the client writes to `/ws/chat/{requestId}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    pub content: String,
    pub request_id: String,
}

/// Frame pushed by the server. A bare message object is a delivery; an
/// object with an `error` field reports a server-side failure.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ServerMessage {
    Error {
        error: String,
    },
    Message(ChatMessage),
}
