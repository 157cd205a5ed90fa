use log::warn;
use std::io::{ self, Stdout, Write };

use super::ChatView;
use crate::render::{ strip_control, MessageKind, RenderedMessage };

/// Line-oriented view for the console runner.
pub struct TerminalView<W: Write = Stdout> {
    out: W,
    visible: bool,
    input_enabled: bool,
    draft: String,
}

impl TerminalView<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, visible: false, input_enabled: true, draft: String::new() }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, line: &str) {
        if let Err(e) = writeln!(self.out, "{}", line) {
            warn!("Failed to write to terminal: {}", e);
        }
    }

    fn format_message(message: &RenderedMessage) -> String {
        let marker = match message.kind {
            MessageKind::Own => '>',
            MessageKind::Partner => '<',
        };
        format!(
            "{} [{}] {}: {}",
            marker,
            strip_control(&message.time),
            strip_control(&message.sender),
            strip_control(&message.content)
        )
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn set_title(&mut self, title: &str) {
        let title = strip_control(title);
        self.write_line(&format!("=== {} ===", title));
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        if self.visible {
            self.write_line("--- chat closed ---");
        }
        self.visible = false;
    }

    fn clear_messages(&mut self) {}

    fn append_messages(&mut self, messages: &[RenderedMessage]) {
        for message in messages {
            let line = Self::format_message(message);
            self.write_line(&line);
        }
    }

    fn show_error_placeholder(&mut self, text: &str) {
        self.write_line(&format!("(!) {}", text));
    }

    fn scroll_to_bottom(&mut self) {
        if let Err(e) = self.out.flush() {
            warn!("Failed to flush terminal: {}", e);
        }
    }

    fn alert(&mut self, text: &str) {
        self.write_line(&format!("[alert] {}", text));
    }

    fn draft(&self) -> String {
        self.draft.clone()
    }

    fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    fn focus_input(&mut self) {
        if self.visible && self.input_enabled {
            let _ = write!(self.out, "> ");
            let _ = self.out.flush();
        }
    }
}
