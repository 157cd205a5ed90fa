pub mod html;
pub mod terminal;

use crate::render::RenderedMessage;

/// Presentation surface the widget drives. Mirrors the pieces of a chat
/// modal: title, message container, composer input, and blocking alerts.
pub trait ChatView {
    fn set_title(&mut self, title: &str);
    fn show(&mut self);
    fn hide(&mut self);

    /// Empties the message container.
    fn clear_messages(&mut self);
    /// Adds nodes after the existing ones, in order.
    fn append_messages(&mut self, messages: &[RenderedMessage]);
    /// Replaces the message container with an inline error.
    fn show_error_placeholder(&mut self, text: &str);
    fn scroll_to_bottom(&mut self);

    fn alert(&mut self, text: &str);

    fn draft(&self) -> String;
    fn set_draft(&mut self, text: &str);
    fn set_input_enabled(&mut self, enabled: bool);
    fn focus_input(&mut self);
}
