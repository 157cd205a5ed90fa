use chrono::{ DateTime, Local };

use crate::models::chat::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Own,
    Partner,
}

impl MessageKind {
    pub fn css_class(self) -> &'static str {
        match self {
            MessageKind::Own => "own-message",
            MessageKind::Partner => "partner-message",
        }
    }
}

/// Display-ready message. Fields hold raw text; each view escapes for its
/// own medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub kind: MessageKind,
    pub sender: String,
    pub time: String,
    pub content: String,
}

impl RenderedMessage {
    pub fn from_message(message: &ChatMessage) -> Self {
        Self {
            kind: if message.current_user { MessageKind::Own } else { MessageKind::Partner },
            sender: message.sender_name.clone(),
            time: time_of_day(&message.created_at_iso),
            content: message.content.clone(),
        }
    }

    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"chat-message {}\">\
<div class=\"message-header\">\
<span class=\"sender-name\">{}</span>\
<span class=\"message-time\">{}</span>\
</div>\
<div class=\"message-content\">{}</div>\
</div>",
            self.kind.css_class(),
            escape_html(&self.sender),
            escape_html(&self.time),
            escape_html(&self.content)
        )
    }
}

pub fn render_all(messages: &[ChatMessage]) -> Vec<RenderedMessage> {
    messages.iter().map(RenderedMessage::from_message).collect()
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Drops terminal control characters (escape sequences included) but keeps
/// newlines and tabs.
pub fn strip_control(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Local `HH:MM:SS` for an RFC 3339 timestamp; unparsable input is shown as-is.
pub fn time_of_day(created_at_iso: &str) -> String {
    match DateTime::parse_from_rfc3339(created_at_iso) {
        Ok(ts) => ts.with_timezone(&Local).format("%H:%M:%S").to_string(),
        Err(_) => created_at_iso.to_string(),
    }
}
