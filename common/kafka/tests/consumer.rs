use std::time::Duration;

use common_kafka::kafka_consumer::SingleTopicConsumer;
use common_kafka::test::{create_mock_kafka, mock_configs, produce_payloads};
use health::HealthRegistry;

const TOPIC: &str = "datafeed";

#[tokio::test]
async fn receives_payloads_in_order() {
    let cluster = create_mock_kafka(TOPIC).expect("failed to create mock brokers");
    produce_payloads(
        &cluster.bootstrap_servers(),
        TOPIC,
        &[r#"{"message_type":"update_position"}"#, "not json at all"],
    )
    .expect("failed to seed topic");

    let (kafka, consumer) = mock_configs(cluster.bootstrap_servers(), "in-order", TOPIC);
    let consumer = SingleTopicConsumer::new(kafka, consumer).expect("failed to create consumer");
    assert_eq!(consumer.topic(), TOPIC);

    let first = tokio::time::timeout(Duration::from_secs(30), consumer.recv())
        .await
        .expect("timed out waiting for first message")
        .expect("recv failed");
    assert_eq!(
        first.payload.as_deref(),
        Some(br#"{"message_type":"update_position"}"#.as_slice())
    );

    let second = tokio::time::timeout(Duration::from_secs(30), consumer.recv())
        .await
        .expect("timed out waiting for second message")
        .expect("recv failed");
    assert_eq!(second.payload.as_deref(), Some(b"not json at all".as_slice()));
    assert_eq!(second.partition, first.partition);
    assert!(second.offset > first.offset);

    consumer.close().expect("failed to close consumer");
}

#[tokio::test]
async fn close_without_consuming_is_clean() {
    let cluster = create_mock_kafka(TOPIC).expect("failed to create mock brokers");
    let (kafka, consumer) = mock_configs(cluster.bootstrap_servers(), "idle", TOPIC);

    let registry = HealthRegistry::new("liveness");
    let liveness = registry.register("kafka_consumer", time::Duration::seconds(30));
    let consumer = SingleTopicConsumer::with_liveness(kafka, consumer, liveness)
        .expect("failed to create consumer");

    consumer.close().expect("failed to close consumer");
}
