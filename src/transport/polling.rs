use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{ self, Instant, MissedTickBehavior };

use super::{ ChatTransport, EventSender, Subscription, TransportEvent, TransportType };
use crate::api::{ ApiError, ChatApi };
use crate::models::chat::ChatMessage;

/// Fixed-interval timer over the REST endpoints.
pub struct PollingTransport {
    api: Arc<dyn ChatApi>,
    interval: Duration,
}

impl PollingTransport {
    pub fn new(api: Arc<dyn ChatApi>, interval: Duration) -> Result<Self, ApiError> {
        if interval.is_zero() {
            return Err(ApiError::InvalidConfig("poll interval must be greater than zero".into()));
        }
        Ok(Self { api, interval })
    }
}

#[async_trait]
impl ChatTransport for PollingTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Polling
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
        let period = self.interval;
        debug!("Polling request {} every {:?} (generation {})", request_id, period, generation);

        let handle = tokio::spawn(async move {
            // First tick lands one full period after start.
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if events.send(TransportEvent::Tick { generation }).is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(handle))
    }

    async fn send(&self, request_id: &str, content: &str) -> Result<Option<ChatMessage>, ApiError> {
        let echo = self.api.post_message(request_id, content).await?;
        Ok(Some(echo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::HttpChatApi;
    use crate::transport::event_channel;

    fn transport(interval: Duration) -> Result<PollingTransport, ApiError> {
        let api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::new("http://localhost:9").unwrap());
        PollingTransport::new(api, interval)
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(matches!(transport(Duration::ZERO), Err(ApiError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_period_with_generation() {
        let polling = transport(Duration::from_secs(5)).unwrap();
        let (tx, mut rx) = event_channel();
        let _sub = polling.subscribe("42", 9, tx).await.unwrap();

        time::sleep(Duration::from_millis(4_900)).await;
        assert!(rx.try_recv().is_err());

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Tick { generation: 9 });

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(rx.try_recv().unwrap(), TransportEvent::Tick { generation: 9 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_subscription_stops_ticks() {
        let polling = transport(Duration::from_secs(5)).unwrap();
        let (tx, mut rx) = event_channel();
        let sub = polling.subscribe("42", 1, tx).await.unwrap();
        assert!(sub.is_active());
        drop(sub);

        time::sleep(Duration::from_secs(30)).await;
        assert!(rx.recv().await.is_none());
    }
}
