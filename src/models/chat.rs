use serde::{ Serialize, Deserialize };

/// Longest message body the chat endpoint accepts.
pub const MAX_CONTENT_LENGTH: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    pub content: String,
    pub created_at_iso: String,
    #[serde(default)]
    pub current_user: bool,
}

impl ChatMessage {
    pub fn new(sender_name: &str, content: &str, created_at_iso: &str, current_user: bool) -> Self {
        Self {
            id: None,
            sender_name: sender_name.to_string(),
            sender_email: None,
            content: content.to_string(),
            created_at_iso: created_at_iso.to_string(),
            current_user,
        }
    }
}

/// The conversation a widget currently has open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    pub request_id: String,
    pub partner_name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub can_access: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageCount {
    pub count: u64,
}
