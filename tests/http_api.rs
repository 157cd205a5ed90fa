use std::sync::{ Arc, Mutex };
use std::time::Duration;

use axum::extract::{ Path, Query, State };
use axum::http::{ HeaderMap, StatusCode };
use axum::routing::get;
use axum::{ Json, Router };
use serde::Deserialize;

use partner_chat::api::http::HttpChatApi;
use partner_chat::api::{ ApiError, ChatApi };
use partner_chat::models::chat::{ AccessResponse, ChatMessage, MessageCount, SendMessageRequest };
use partner_chat::transport::polling::PollingTransport;
use partner_chat::transport::{ event_channel, ChatTransport, TransportEvent };
use partner_chat::view::html::HtmlView;
use partner_chat::view::ChatView;
use partner_chat::widget::{ ChatWidget, SEND_FORBIDDEN_NOTICE };

#[derive(Default)]
struct BackendState {
    messages: Vec<ChatMessage>,
    minute: u32,
    deny_access: bool,
    forbid_writes: bool,
    fail_since: bool,
    since_queries: Vec<String>,
    ajax_posts: usize,
}

#[derive(Clone, Default)]
struct Backend {
    state: Arc<Mutex<BackendState>>,
}

impl Backend {
    fn next_timestamp(state: &mut BackendState) -> String {
        state.minute += 1;
        format!("2025-01-15T10:{:02}:00Z", state.minute)
    }

    fn push_partner(&self, content: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let ts = Self::next_timestamp(&mut state);
        state.messages.push(ChatMessage::new("Alex", content, &ts, false));
        ts
    }

    fn with<T>(&self, f: impl FnOnce(&mut BackendState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }
}

#[derive(Deserialize)]
struct SinceQuery {
    after: String,
}

async fn access(State(backend): State<Backend>, Path(_id): Path<String>) -> Json<AccessResponse> {
    let can_access = backend.with(|s| !s.deny_access);
    Json(AccessResponse { can_access })
}

async fn list(
    State(backend): State<Backend>,
    Path(_id): Path<String>
) -> Result<Json<Vec<ChatMessage>>, StatusCode> {
    backend.with(|s| {
        if s.deny_access {
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(Json(s.messages.clone()))
    })
}

async fn since(
    State(backend): State<Backend>,
    Path(_id): Path<String>,
    Query(query): Query<SinceQuery>
) -> Result<Json<Vec<ChatMessage>>, StatusCode> {
    backend.with(|s| {
        s.since_queries.push(query.after.clone());
        if s.fail_since {
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        let newer = s.messages
            .iter()
            .filter(|m| m.created_at_iso.as_str() > query.after.as_str())
            .cloned()
            .collect();
        Ok(Json(newer))
    })
}

async fn post(
    State(backend): State<Backend>,
    Path(_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<SendMessageRequest>
) -> Result<Json<ChatMessage>, StatusCode> {
    backend.with(|s| {
        if s.forbid_writes {
            return Err(StatusCode::FORBIDDEN);
        }
        if body.content.trim().is_empty() {
            return Err(StatusCode::BAD_REQUEST);
        }
        if headers.get("X-Requested-With").is_some_and(|v| v == "XMLHttpRequest") {
            s.ajax_posts += 1;
        }
        let ts = Backend::next_timestamp(s);
        let message = ChatMessage::new("Me", &body.content, &ts, true);
        s.messages.push(message.clone());
        Ok(Json(message))
    })
}

async fn count(State(backend): State<Backend>, Path(_id): Path<String>) -> Json<MessageCount> {
    let count = backend.with(|s| s.messages.len() as u64);
    Json(MessageCount { count })
}

async fn spawn_backend(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/chat/request/{id}/access", get(access))
        .route("/api/chat/request/{id}/messages", get(list).post(post))
        .route("/api/chat/request/{id}/messages/since", get(since))
        .route("/api/chat/request/{id}/count", get(count))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn widget_for(
    base_url: &str,
    interval: Duration
) -> (ChatWidget<HtmlView>, partner_chat::transport::EventReceiver) {
    let api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::new(base_url).unwrap());
    let transport: Arc<dyn ChatTransport> = Arc::new(PollingTransport::new(api, interval).unwrap());
    let (tx, rx) = event_channel();
    (ChatWidget::new(transport, HtmlView::new(), tx), rx)
}

fn contents(view: &HtmlView) -> Vec<String> {
    view.nodes
        .iter()
        .filter_map(|node| {
            let start = node.find("<div class=\"message-content\">")? + 29;
            let end = node[start..].find("</div>")? + start;
            Some(node[start..end].to_string())
        })
        .collect()
}

#[tokio::test]
async fn history_poll_and_send_round_trip() {
    let backend = Backend::default();
    let t1 = backend.push_partner("hi");
    let base_url = spawn_backend(backend.clone()).await;
    let (mut widget, _rx) = widget_for(&base_url, Duration::from_secs(60)).await;

    widget.open("42", "Alex").await;
    assert!(widget.view().visible);
    assert_eq!(widget.cursor(), Some(t1.as_str()));

    let t2 = backend.push_partner("yo");
    widget.poll_for_new().await;
    assert_eq!(contents(widget.view()), vec!["hi", "yo"]);
    assert_eq!(widget.cursor(), Some(t2.as_str()));

    widget.view_mut().set_draft("thanks");
    widget.send("thanks").await;
    assert_eq!(contents(widget.view()), vec!["hi", "yo", "thanks"]);
    assert_eq!(widget.view().input_value, "");
    assert!(!widget.view().input_disabled);
    assert_eq!(backend.with(|s| s.ajax_posts), 1);

    // The echo advanced the cursor, so the next poll cannot duplicate it.
    widget.poll_for_new().await;
    assert_eq!(contents(widget.view()), vec!["hi", "yo", "thanks"]);
    assert_eq!(widget.message_count().await.unwrap(), 3);
}

#[tokio::test]
async fn timer_ticks_drive_polling() {
    let backend = Backend::default();
    backend.push_partner("hi");
    let base_url = spawn_backend(backend.clone()).await;
    let (mut widget, mut rx) = widget_for(&base_url, Duration::from_millis(50)).await;

    widget.open("42", "Alex").await;
    backend.push_partner("<img src=x onerror=alert(1)>");

    let event = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(event, TransportEvent::Tick { .. }));
    widget.handle_event(event).await;

    assert_eq!(contents(widget.view()), vec!["hi", "&lt;img src=x onerror=alert(1)&gt;"]);
    assert!(widget.view().is_scrolled_to_bottom());
}

#[tokio::test]
async fn poll_failure_leaves_view_untouched() {
    let backend = Backend::default();
    backend.push_partner("hi");
    let base_url = spawn_backend(backend.clone()).await;
    let (mut widget, _rx) = widget_for(&base_url, Duration::from_secs(60)).await;
    widget.open("42", "Alex").await;

    backend.with(|s| s.fail_since = true);
    backend.push_partner("missed for now");
    widget.poll_for_new().await;
    assert_eq!(contents(widget.view()), vec!["hi"]);
    assert!(widget.view().alerts.is_empty());

    backend.with(|s| s.fail_since = false);
    widget.poll_for_new().await;
    assert_eq!(contents(widget.view()), vec!["hi", "missed for now"]);
}

#[tokio::test]
async fn denied_access_keeps_modal_hidden() {
    let backend = Backend::default();
    backend.with(|s| s.deny_access = true);
    let base_url = spawn_backend(backend).await;
    let (mut widget, mut rx) = widget_for(&base_url, Duration::from_millis(20)).await;

    widget.open("42", "Alex").await;
    assert!(!widget.view().visible);
    assert!(!widget.is_updating());
    let waited = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(waited.is_err(), "no timer should be running");
}

#[tokio::test]
async fn revoked_write_access_closes_chat() {
    let backend = Backend::default();
    backend.push_partner("hi");
    let base_url = spawn_backend(backend.clone()).await;
    let (mut widget, _rx) = widget_for(&base_url, Duration::from_secs(60)).await;
    widget.open("42", "Alex").await;

    backend.with(|s| s.forbid_writes = true);
    widget.send("still there?").await;

    assert!(!widget.is_open());
    assert_eq!(widget.cursor(), None);
    assert_eq!(widget.view().alerts, vec![SEND_FORBIDDEN_NOTICE.to_string()]);
}

#[tokio::test]
async fn since_cursor_is_sent_verbatim() {
    let backend = Backend::default();
    let base_url = spawn_backend(backend.clone()).await;
    let api = HttpChatApi::new(&base_url).unwrap();

    let offset_ts = "2025-01-15T11:30:00.5+01:00";
    api.list_messages_since("42", offset_ts).await.unwrap();
    assert_eq!(backend.with(|s| s.since_queries.clone()), vec![offset_ts.to_string()]);
}

#[tokio::test]
async fn client_maps_statuses() {
    let backend = Backend::default();
    backend.with(|s| s.deny_access = true);
    let base_url = spawn_backend(backend).await;
    let api = HttpChatApi::new(&base_url).unwrap();

    assert!(!api.check_access("42").await.unwrap());
    assert!(matches!(api.list_messages("42").await, Err(ApiError::Forbidden)));
    assert_eq!(api.message_count("42").await.unwrap(), 0);

    let missing = HttpChatApi::new(&format!("{}/nowhere", base_url)).unwrap();
    assert!(matches!(missing.list_messages("42").await, Err(ApiError::Status(404))));
}
