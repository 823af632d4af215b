use async_trait::async_trait;
use common_kafka::kafka_consumer::{RecvErr, SingleTopicConsumer};
use tracing::{info, warn};

use crate::error::FeedError;

/// One payload as delivered by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub payload: Vec<u8>,
    pub partition: Option<i32>,
    pub offset: Option<i64>,
}

impl RawEvent {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            partition: None,
            offset: None,
        }
    }
}

/// Where raw events come from.
///
/// `next` must be cancel safe: the relay drops its future when shutdown is
/// requested while it is waiting.
#[async_trait]
pub trait Feed: Send {
    /// The next event, a consume-level error, or `None` once the feed has
    /// nothing more to give for now.
    async fn next(&mut self) -> Option<Result<RawEvent, FeedError>>;

    /// Leaves the subscription. Called once, on shutdown.
    async fn close(&mut self);
}

pub struct KafkaFeed {
    consumer: SingleTopicConsumer,
    closed: bool,
}

impl KafkaFeed {
    pub fn new(consumer: SingleTopicConsumer) -> Self {
        Self {
            consumer,
            closed: false,
        }
    }
}

#[async_trait]
impl Feed for KafkaFeed {
    async fn next(&mut self) -> Option<Result<RawEvent, FeedError>> {
        let event = match self.consumer.recv().await {
            Ok(message) => Ok(RawEvent {
                payload: message.payload.unwrap_or_default(),
                partition: Some(message.partition),
                offset: Some(message.offset),
            }),
            Err(RecvErr::Kafka(e)) => Err(FeedError::Consume(e.to_string())),
        };
        Some(event)
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        match self.consumer.close() {
            Ok(()) => info!(topic = self.consumer.topic(), "left kafka subscription"),
            Err(e) => warn!(
                topic = self.consumer.topic(),
                "failed to commit offsets while closing consumer: {}", e
            ),
        }
    }
}
