//! Delivery Bus
//!
//! Publishes `Delivery` envelopes on a Redis pub/sub channel so that every
//! server process can forward them to the connections it holds.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, info, instrument, warn};

use crate::domain::Delivery;
use crate::shared::error::AppError;

/// Delay before the subscriber reconnects after its stream ended.
const RESUBSCRIBE_BACKOFF: Duration = Duration::from_secs(1);

/// Cross-process publish of deliveries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a delivery to every server process.
    async fn publish(&self, delivery: &Delivery) -> Result<(), AppError>;
}

/// Redis pub/sub backed event bus.
#[derive(Clone)]
pub struct RedisEventBus {
    conn: ConnectionManager,
    channel: String,
}

impl RedisEventBus {
    pub fn new(conn: ConnectionManager, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    #[instrument(skip(self, delivery), fields(event = delivery.event.event_name()), level = "debug")]
    async fn publish(&self, delivery: &Delivery) -> Result<(), AppError> {
        let payload = serde_json::to_string(delivery)?;
        let mut conn = self.conn.clone();

        let receivers: i64 = conn.publish(&self.channel, payload).await?;
        debug!(channel = %self.channel, receivers = receivers, "Delivery published");

        Ok(())
    }
}

impl std::fmt::Debug for RedisEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisEventBus")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

/// Subscribe to the delivery channel and hand every decoded delivery to
/// `sink`. Reconnects with a fixed backoff whenever the subscription drops.
/// Never returns; the caller aborts the task on shutdown.
pub async fn run_delivery_subscriber<F>(client: redis::Client, channel: String, sink: F)
where
    F: Fn(Delivery) + Send + Sync + 'static,
{
    loop {
        match subscribe_once(&client, &channel, &sink).await {
            Ok(()) => warn!(channel = %channel, "Delivery subscription ended"),
            Err(e) => warn!(channel = %channel, error = %e, "Delivery subscription failed"),
        }
        tokio::time::sleep(RESUBSCRIBE_BACKOFF).await;
    }
}

async fn subscribe_once<F>(
    client: &redis::Client,
    channel: &str,
    sink: &F,
) -> Result<(), redis::RedisError>
where
    F: Fn(Delivery) + Send + Sync,
{
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    info!(channel = %channel, "Subscribed to delivery channel");

    let mut messages = pubsub.on_message();
    while let Some(msg) = messages.next().await {
        let payload: String = match msg.get_payload() {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Unreadable delivery payload");
                continue;
            }
        };
        match decode_delivery(&payload) {
            Some(delivery) => sink(delivery),
            None => warn!(payload_len = payload.len(), "Malformed delivery skipped"),
        }
    }

    Ok(())
}

fn decode_delivery(payload: &str) -> Option<Delivery> {
    serde_json::from_str(payload).ok()
}
