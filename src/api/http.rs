use async_trait::async_trait;
use log::debug;
use reqwest::header::{ HeaderMap, HeaderValue, COOKIE };
use reqwest::{ Client as HttpClient, Response, StatusCode };
use serde::de::DeserializeOwned;
use url::Url;

use super::{ ApiConfig, ApiError, ChatApi };
use crate::models::chat::{ AccessResponse, ChatMessage, MessageCount, SendMessageRequest };

const CHAT_API_ROOT: [&str; 3] = ["api", "chat", "request"];

#[derive(Debug, Clone)]
pub struct HttpChatApi {
    http: HttpClient,
    base_url: Url,
}

impl HttpChatApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::from_config(&ApiConfig { base_url: base_url.to_string(), ..ApiConfig::default() })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url).map_err(|e|
            ApiError::InvalidConfig(format!("base URL '{}': {}", config.base_url, e))
        )?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidConfig(format!("base URL '{}' cannot be a base", base_url)));
        }

        let mut headers = HeaderMap::new();
        if let Some(cookie) = config.session_cookie.as_deref().filter(|c| !c.trim().is_empty()) {
            let value = HeaderValue::from_str(cookie).map_err(|e|
                ApiError::InvalidConfig(format!("session cookie: {}", e))
            )?;
            headers.insert(COOKIE, value);
        }

        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    /// `{base}/api/chat/request/{request_id}/{tail...}` with each segment
    /// percent-encoded.
    fn endpoint(&self, request_id: &str, tail: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(CHAT_API_ROOT).push(request_id).extend(tail);
        }
        url
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(ApiError::Forbidden);
        }
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn check_access(&self, request_id: &str) -> Result<bool, ApiError> {
        let url = self.endpoint(request_id, &["access"]);
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        let access: AccessResponse = Self::decode(resp).await?;
        Ok(access.can_access)
    }

    async fn list_messages(&self, request_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let url = self.endpoint(request_id, &["messages"]);
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::decode(resp).await
    }

    async fn list_messages_since(
        &self,
        request_id: &str,
        after: &str
    ) -> Result<Vec<ChatMessage>, ApiError> {
        let url = self.endpoint(request_id, &["messages", "since"]);
        debug!("GET {} after={}", url, after);
        let resp = self.http.get(url).query(&[("after", after)]).send().await?;
        Self::decode(resp).await
    }

    async fn post_message(&self, request_id: &str, content: &str) -> Result<ChatMessage, ApiError> {
        let url = self.endpoint(request_id, &["messages"]);
        debug!("POST {}", url);
        let body = SendMessageRequest { content: content.to_string() };
        let resp = self.http
            .post(url)
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&body)
            .send().await?;
        Self::decode(resp).await
    }

    async fn message_count(&self, request_id: &str) -> Result<u64, ApiError> {
        let url = self.endpoint(request_id, &["count"]);
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        let count: MessageCount = Self::decode(resp).await?;
        Ok(count.count)
    }
}
