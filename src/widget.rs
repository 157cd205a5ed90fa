use log::{ debug, error, info, warn };
use std::sync::Arc;

use crate::api::ApiError;
use crate::models::chat::{ ChatMessage, Conversation, MAX_CONTENT_LENGTH };
use crate::render::render_all;
use crate::transport::{ ChatTransport, EventSender, Subscription, TransportEvent };
use crate::view::ChatView;

pub const NO_ACCESS_NOTICE: &str = "You do not have access to this chat.";
pub const ACCESS_CHECK_FAILED_NOTICE: &str = "Unable to access chat. Please try again.";
pub const ACCESS_DENIED_NOTICE: &str = "Access denied to this chat.";
pub const LOAD_FAILED_PLACEHOLDER: &str = "Unable to load messages. Please try again.";
pub const SEND_FORBIDDEN_NOTICE: &str = "You are not authorized to send messages in this chat.";
pub const SEND_FAILED_NOTICE: &str = "Failed to send message. Please try again.";
pub const CONNECTION_LOST_NOTICE: &str = "Chat connection lost. Please reopen the chat.";
pub const CONNECTION_FAILED_NOTICE: &str = "Unable to connect to chat. Please try again.";

/// Chat controller for one modal. Owns all conversation state; background
/// tasks only reach it through `TransportEvent`s handed to `handle_event`.
pub struct ChatWidget<V: ChatView> {
    transport: Arc<dyn ChatTransport>,
    view: V,
    events: EventSender,
    conversation: Option<Conversation>,
    cursor: Option<String>,
    generation: u64,
    updates: Option<Subscription>,
    rendered: usize,
}

impl<V: ChatView> ChatWidget<V> {
    pub fn new(transport: Arc<dyn ChatTransport>, view: V, events: EventSender) -> Self {
        Self {
            transport,
            view,
            events,
            conversation: None,
            cursor: None,
            generation: 0,
            updates: None,
            rendered: 0,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_open(&self) -> bool {
        self.conversation.is_some()
    }

    pub fn is_updating(&self) -> bool {
        self.updates.is_some()
    }

    /// Number of message nodes currently in the view.
    pub fn rendered_count(&self) -> usize {
        self.rendered
    }

    fn request_id(&self) -> Option<String> {
        self.conversation.as_ref().map(|c| c.request_id.clone())
    }

    pub async fn open(&mut self, request_id: &str, partner_name: &str) {
        if self.is_open() {
            debug!("Replacing open conversation with request {}", request_id);
            self.close();
        }

        self.generation += 1;
        self.conversation = Some(Conversation {
            request_id: request_id.to_string(),
            partner_name: partner_name.to_string(),
        });

        match self.transport.api().check_access(request_id).await {
            Ok(true) => {}
            Ok(false) => {
                info!("Access to chat for request {} denied", request_id);
                self.view.alert(NO_ACCESS_NOTICE);
                self.reset();
                return;
            }
            Err(e) => {
                error!("Error checking chat access for request {}: {}", request_id, e);
                self.view.alert(ACCESS_CHECK_FAILED_NOTICE);
                self.reset();
                return;
            }
        }

        self.view.set_title(&format!("Chat with {}", partner_name));
        self.load_history().await;
        if !self.is_open() {
            // history load revoked access
            return;
        }

        self.start_updates().await;
        if !self.is_open() {
            return;
        }

        self.view.show();
        self.view.focus_input();
        info!(
            "Opened chat for request {} via {} (generation {})",
            request_id,
            self.transport.transport_type(),
            self.generation
        );
    }

    pub fn close(&mut self) {
        self.view.hide();
        self.stop_updates();
        if let Some(conversation) = self.conversation.take() {
            info!("Closed chat for request {}", conversation.request_id);
        }
        self.cursor = None;
        self.generation += 1;
    }

    /// Drops conversation state when opening is aborted before the modal shows.
    fn reset(&mut self) {
        self.stop_updates();
        self.conversation = None;
        self.cursor = None;
        self.generation += 1;
    }

    pub async fn load_history(&mut self) {
        let Some(request_id) = self.request_id() else {
            return;
        };

        match self.transport.load_history(&request_id).await {
            Ok(messages) => {
                self.view.clear_messages();
                self.rendered = 0;
                // An empty reload keeps the previous cursor.
                self.append(&messages);
            }
            Err(ApiError::Forbidden) => {
                warn!("History for request {} is forbidden", request_id);
                self.view.alert(ACCESS_DENIED_NOTICE);
                self.close();
            }
            Err(e) => {
                error!("Error loading messages for request {}: {}", request_id, e);
                self.rendered = 0;
                self.view.show_error_placeholder(LOAD_FAILED_PLACEHOLDER);
            }
        }
    }

    pub async fn poll_for_new(&mut self) {
        let (Some(request_id), Some(after)) = (self.request_id(), self.cursor.clone()) else {
            return;
        };

        match self.transport.fetch_since(&request_id, &after).await {
            Ok(messages) => {
                if !messages.is_empty() {
                    debug!("Poll for request {} returned {} message(s)", request_id, messages.len());
                    self.append(&messages);
                }
            }
            Err(e) => {
                debug!("Poll for request {} failed: {}", request_id, e);
            }
        }
    }

    pub async fn send(&mut self, text: &str) {
        let Some(request_id) = self.request_id() else {
            return;
        };
        let content = text.trim();
        if content.is_empty() {
            return;
        }
        // The backend measures length in UTF-16 code units.
        if content.encode_utf16().count() > MAX_CONTENT_LENGTH {
            self.view.alert(&format!("Message too long (max {} characters).", MAX_CONTENT_LENGTH));
            return;
        }

        let generation = self.generation;
        self.view.set_input_enabled(false);

        match self.transport.send(&request_id, content).await {
            Ok(echo) => {
                self.view.set_draft("");
                if let Some(message) = echo {
                    self.append(std::slice::from_ref(&message));
                }
            }
            Err(ApiError::Forbidden) => {
                warn!("Sending to request {} is forbidden", request_id);
                self.view.alert(SEND_FORBIDDEN_NOTICE);
                self.close();
            }
            Err(e) => {
                error!("Error sending message to request {}: {}", request_id, e);
                self.view.alert(SEND_FAILED_NOTICE);
            }
        }

        self.view.set_input_enabled(true);
        if self.generation == generation {
            self.view.focus_input();
        }
    }

    pub async fn message_count(&self) -> Result<u64, ApiError> {
        let request_id = self.request_id().ok_or(ApiError::NotConnected)?;
        self.transport.api().message_count(&request_id).await
    }

    pub async fn handle_event(&mut self, event: TransportEvent) {
        if event.generation() != self.generation || !self.is_open() {
            debug!(
                "Dropping stale event from generation {} (current {})",
                event.generation(),
                self.generation
            );
            return;
        }

        match event {
            TransportEvent::Tick { .. } => self.poll_for_new().await,
            TransportEvent::Delivered { messages, .. } => self.append(&messages),
            TransportEvent::Closed { reason, .. } => {
                warn!("Update subscription ended: {}", reason);
                self.view.alert(CONNECTION_LOST_NOTICE);
                self.close();
            }
        }
    }

    async fn start_updates(&mut self) {
        if self.updates.is_some() {
            return;
        }
        let Some(request_id) = self.request_id() else {
            return;
        };

        match self.transport.subscribe(&request_id, self.generation, self.events.clone()).await {
            Ok(subscription) => {
                self.updates = Some(subscription);
            }
            Err(e) => {
                error!("Failed to start updates for request {}: {}", request_id, e);
                self.view.alert(CONNECTION_FAILED_NOTICE);
                self.reset();
            }
        }
    }

    fn stop_updates(&mut self) {
        if self.updates.take().is_some() {
            debug!("Stopped updates (generation {})", self.generation);
        }
    }

    fn append(&mut self, messages: &[ChatMessage]) {
        let Some(last) = messages.last() else {
            return;
        };
        self.view.append_messages(&render_all(messages));
        self.rendered += messages.len();
        self.view.scroll_to_bottom();
        self.cursor = Some(last.created_at_iso.clone());
    }
}
