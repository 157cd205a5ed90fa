use async_trait::async_trait;
use futures::{ SinkExt, StreamExt };
use log::{ debug, info, warn };
use std::sync::Arc;
use tokio::sync::{ mpsc, Mutex };
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use url::Url;

use super::{ ChatTransport, EventSender, Subscription, TransportEvent, TransportType };
use crate::api::{ ApiError, ChatApi };
use crate::models::chat::ChatMessage;
use crate::models::websocket::{ ClientMessage, ServerMessage };

const OUTGOING_BUFFER: usize = 32;

/// Push subscription over `/ws/chat/{requestId}`. History and access still
/// go through the REST API.
pub struct WebSocketTransport {
    api: Arc<dyn ChatApi>,
    ws_base: Url,
    session_cookie: Option<String>,
    outgoing: Mutex<Option<mpsc::Sender<String>>>,
}

/// `http(s)://host/path` becomes `ws(s)://host/path`; ws URLs pass through.
pub fn derive_ws_url(base_url: &str) -> Result<String, ApiError> {
    let mut url = Url::parse(base_url).map_err(|e|
        ApiError::InvalidConfig(format!("base URL '{}': {}", base_url, e))
    )?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ApiError::InvalidConfig(format!("no websocket scheme for '{}'", other)));
        }
    };
    url.set_scheme(scheme).map_err(|_|
        ApiError::InvalidConfig(format!("cannot switch '{}' to {}", base_url, scheme))
    )?;
    Ok(url.to_string())
}

impl WebSocketTransport {
    pub fn new(
        api: Arc<dyn ChatApi>,
        ws_url: &str,
        session_cookie: Option<String>
    ) -> Result<Self, ApiError> {
        let ws_base = Url::parse(ws_url).map_err(|e|
            ApiError::InvalidConfig(format!("websocket URL '{}': {}", ws_url, e))
        )?;
        if !matches!(ws_base.scheme(), "ws" | "wss") {
            return Err(ApiError::InvalidConfig(format!("'{}' is not a ws:// or wss:// URL", ws_url)));
        }
        Ok(Self {
            api,
            ws_base,
            session_cookie: session_cookie.filter(|c| !c.trim().is_empty()),
            outgoing: Mutex::new(None),
        })
    }

    pub fn socket_url(&self, request_id: &str) -> Url {
        let mut url = self.ws_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["ws", "chat"]).push(request_id);
        }
        url
    }
}

#[async_trait]
impl ChatTransport for WebSocketTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::WebSocket
    }

    fn api(&self) -> Arc<dyn ChatApi> {
        self.api.clone()
    }

    async fn subscribe(
        &self,
        request_id: &str,
        generation: u64,
        events: EventSender
    ) -> Result<Subscription, ApiError> {
        let url = self.socket_url(request_id);
        let mut request = url.as_str().into_client_request()?;
        if let Some(cookie) = &self.session_cookie {
            let value = HeaderValue::from_str(cookie).map_err(|e|
                ApiError::InvalidConfig(format!("session cookie: {}", e))
            )?;
            request.headers_mut().insert(COOKIE, value);
        }

        let (stream, _) = connect_async(request).await?;
        info!("Connected to {} (generation {})", url, generation);
        let (mut sink, mut source) = stream.split();
        let (tx, mut rx) = mpsc::channel::<String>(OUTGOING_BUFFER);
        *self.outgoing.lock().await = Some(tx);

        let handle = tokio::spawn(async move {
            let reason = loop {
                tokio::select! {
                    outgoing = rx.recv() => {
                        let Some(text) = outgoing else {
                            break None;
                        };
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            break Some(format!("send failed: {}", e));
                        }
                    }
                    incoming = source.next() => {
                        match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerMessage>(&text) {
                                    Ok(ServerMessage::Message(message)) => {
                                        let event = TransportEvent::Delivered {
                                            generation,
                                            messages: vec![message],
                                        };
                                        if events.send(event).is_err() {
                                            break None;
                                        }
                                    }
                                    Ok(ServerMessage::Error { error }) => {
                                        warn!("Chat server reported an error: {}", error);
                                    }
                                    Err(e) => {
                                        warn!("Ignoring unparsable frame: {}", e);
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if sink.send(Message::Pong(data)).await.is_err() {
                                    break Some("failed to answer ping".to_string());
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                break Some("connection closed by server".to_string());
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                break Some(e.to_string());
                            }
                        }
                    }
                }
            };

            if let Some(reason) = reason {
                debug!("Push connection ended: {}", reason);
                let _ = events.send(TransportEvent::Closed { generation, reason });
            }
            let _ = sink.close().await;
        });

        Ok(Subscription::new(handle))
    }

    async fn send(&self, request_id: &str, content: &str) -> Result<Option<ChatMessage>, ApiError> {
        let tx = self.outgoing.lock().await.clone().ok_or(ApiError::NotConnected)?;
        let frame = ClientMessage {
            content: content.to_string(),
            request_id: request_id.to_string(),
        };
        let json = serde_json::to_string(&frame)?;
        tx.send(json).await.map_err(|_| ApiError::NotConnected)?;
        Ok(None)
    }
}
