use super::ChatView;
use crate::render::{ escape_html, RenderedMessage };

/// In-memory model of the chat modal's DOM. The message container holds
/// serialized nodes; `to_html` renders the whole modal fragment.
#[derive(Debug, Default, Clone)]
pub struct HtmlView {
    pub visible: bool,
    pub title: String,
    pub nodes: Vec<String>,
    pub placeholder: Option<String>,
    /// Index of the node scrolled into view; `nodes.len()` means the bottom.
    pub scroll_position: usize,
    pub input_value: String,
    pub input_disabled: bool,
    pub input_focused: bool,
    pub alerts: Vec<String>,
}

impl HtmlView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll_position == self.nodes.len()
    }

    pub fn messages_html(&self) -> String {
        match &self.placeholder {
            Some(text) => format!("<div class=\"error-message\">{}</div>", escape_html(text)),
            None => self.nodes.concat(),
        }
    }

    pub fn to_html(&self) -> String {
        let display = if self.visible { "block" } else { "none" };
        let disabled = if self.input_disabled { " disabled" } else { "" };
        format!(
            "<div id=\"chatModal\" style=\"display: {}\">\
<h3 id=\"chatTitle\">{}</h3>\
<div id=\"chatMessages\">{}</div>\
<input id=\"chatInput\" type=\"text\" value=\"{}\"{}>\
</div>",
            display,
            escape_html(&self.title),
            self.messages_html(),
            escape_html(&self.input_value),
            disabled
        )
    }
}

impl ChatView for HtmlView {
    fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
        self.input_focused = false;
    }

    fn clear_messages(&mut self) {
        self.nodes.clear();
        self.placeholder = None;
        self.scroll_position = 0;
    }

    fn append_messages(&mut self, messages: &[RenderedMessage]) {
        if messages.is_empty() {
            return;
        }
        self.placeholder = None;
        self.nodes.extend(messages.iter().map(RenderedMessage::to_html));
    }

    fn show_error_placeholder(&mut self, text: &str) {
        self.nodes.clear();
        self.placeholder = Some(text.to_string());
        self.scroll_position = 0;
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_position = self.nodes.len();
    }

    fn alert(&mut self, text: &str) {
        self.alerts.push(text.to_string());
    }

    fn draft(&self) -> String {
        self.input_value.clone()
    }

    fn set_draft(&mut self, text: &str) {
        self.input_value = text.to_string();
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_disabled = !enabled;
    }

    fn focus_input(&mut self) {
        self.input_focused = self.visible && !self.input_disabled;
    }
}
