use health::HealthHandle;
use rdkafka::{
    consumer::{CommitMode, Consumer, ConsumerContext, StreamConsumer},
    error::{KafkaError, RDKafkaErrorCode},
    ClientConfig, ClientContext, Message, Statistics,
};
use tracing::{debug, info, warn};

use crate::config::{ConsumerConfig, KafkaConfig};

pub struct KafkaContext {
    liveness: Option<HealthHandle>,
}

impl ClientContext for KafkaContext {
    fn stats(&self, stats: Statistics) {
        // The client only emits statistics while its event loop is being polled
        if let Some(liveness) = &self.liveness {
            liveness.report_healthy();
        }

        metrics::gauge!("kafka_consumer_callback_queue_depth").set(stats.replyq as f64);

        for (topic, topic_stats) in stats.topics {
            for (partition, partition_stats) in topic_stats.partitions {
                // librdkafka reports -1 for partitions this member isn't assigned
                if partition_stats.consumer_lag < 0 {
                    continue;
                }
                metrics::gauge!(
                    "kafka_consumer_lag",
                    "topic" => topic.clone(),
                    "partition" => partition.to_string()
                )
                .set(partition_stats.consumer_lag as f64);
            }
        }
    }
}

impl ConsumerContext for KafkaContext {}

/// One message as received, copied out of the client's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub payload: Option<Vec<u8>>,
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum RecvErr {
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),
}

/// A consumer subscribed to exactly one topic for its whole lifetime.
///
/// Offsets are stored as soon as a message is handed out, so a message is
/// never redelivered to this group after a restart, whatever happens to it
/// downstream.
pub struct SingleTopicConsumer {
    consumer: StreamConsumer<KafkaContext>,
    topic: String,
}

impl SingleTopicConsumer {
    pub fn new(
        common_config: KafkaConfig,
        consumer_config: ConsumerConfig,
    ) -> Result<Self, KafkaError> {
        Self::create(common_config, consumer_config, None)
    }

    /// Like `new`, reporting liveness every time the client emits statistics.
    pub fn with_liveness(
        common_config: KafkaConfig,
        consumer_config: ConsumerConfig,
        liveness: HealthHandle,
    ) -> Result<Self, KafkaError> {
        Self::create(common_config, consumer_config, Some(liveness))
    }

    fn create(
        common_config: KafkaConfig,
        consumer_config: ConsumerConfig,
        liveness: Option<HealthHandle>,
    ) -> Result<Self, KafkaError> {
        let mut client_config = ClientConfig::new();
        common_config.apply(&mut client_config);
        client_config
            .set("statistics.interval.ms", "10000")
            .set("group.id", &consumer_config.kafka_consumer_group)
            .set(
                "auto.offset.reset",
                &consumer_config.kafka_consumer_offset_reset,
            )
            .set(
                "enable.auto.commit",
                consumer_config.kafka_consumer_auto_commit.to_string(),
            )
            .set(
                "auto.commit.interval.ms",
                consumer_config
                    .kafka_consumer_auto_commit_interval_ms
                    .to_string(),
            )
            .set("enable.auto.offset.store", "false");

        debug!("rdkafka configuration: {:?}", client_config);
        let consumer: StreamConsumer<KafkaContext> =
            client_config.create_with_context(KafkaContext { liveness })?;
        consumer.subscribe(&[consumer_config.kafka_consumer_topic.as_str()])?;

        info!(
            hosts = %common_config.kafka_hosts,
            group = %consumer_config.kafka_consumer_group,
            topic = %consumer_config.kafka_consumer_topic,
            "subscribed to kafka topic"
        );

        Ok(Self {
            consumer,
            topic: consumer_config.kafka_consumer_topic,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the next message. Cancel-safe: dropping the future before it
    /// resolves loses nothing.
    pub async fn recv(&self) -> Result<RawMessage, RecvErr> {
        let message = self.consumer.recv().await?;

        if let Err(e) = self.consumer.store_offset_from_message(&message) {
            warn!(
                partition = message.partition(),
                offset = message.offset(),
                "failed to store offset: {}",
                e
            );
        }

        Ok(RawMessage {
            payload: message.payload().map(<[u8]>::to_vec),
            partition: message.partition(),
            offset: message.offset(),
        })
    }

    /// Flushes stored offsets and leaves the subscription. The group itself is
    /// left when the consumer is dropped.
    pub fn close(&self) -> Result<(), KafkaError> {
        let committed = match self.consumer.commit_consumer_state(CommitMode::Sync) {
            // Nothing was consumed since the last commit
            Err(KafkaError::ConsumerCommit(RDKafkaErrorCode::NoOffset)) => Ok(()),
            other => other,
        };
        self.consumer.unsubscribe();
        committed
    }
}
