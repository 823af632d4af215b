use assert_json_diff::assert_json_eq;
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use position_relay::position::{AltitudeMode, Transformer};
use position_relay::relay::{Relay, RelayState, RelaySummary};
use position_relay::sinks::Dispatcher;
use position_relay::test_utils::{
    other_message, position_update, ChannelFeed, FailingSink, FeedSender, MemorySink,
};

struct Harness {
    feed: FeedSender,
    cancel: CancellationToken,
    task: JoinHandle<(Relay, RelaySummary)>,
}

impl Harness {
    fn start(mode: AltitudeMode, dispatcher: Dispatcher) -> Self {
        let (feed, channel) = ChannelFeed::channel();
        let cancel = CancellationToken::new();
        let mut relay = Relay::new(Transformer::new(mode), dispatcher, cancel.clone());
        let task = tokio::spawn(async move {
            let summary = relay.run(channel).await;
            (relay, summary)
        });
        Self { feed, cancel, task }
    }

    async fn stop(self) -> (Relay, RelaySummary) {
        self.cancel.cancel();
        self.task.await.unwrap()
    }
}

fn parse(record: &str) -> Value {
    serde_json::from_str(record).unwrap()
}

#[tokio::test]
async fn other_message_types_are_dropped_silently() {
    let console = MemorySink::default();
    let harness = Harness::start(
        AltitudeMode::PassThrough,
        Dispatcher::new().with_sink(console.clone()),
    );

    for message_type in ["add_client", "remove_client", "update_flight_plan"] {
        harness.feed.event(other_message(message_type));
    }
    harness.feed.wait_until_idle(3).await;

    let (_, summary) = harness.stop().await;
    assert!(console.records().is_empty());
    assert_eq!(
        summary,
        RelaySummary {
            received: 3,
            filtered: 3,
            ..Default::default()
        }
    );
}

#[tokio::test]
async fn malformed_payload_is_skipped_and_the_next_event_processed() {
    let console = MemorySink::default();
    let harness = Harness::start(
        AltitudeMode::PassThrough,
        Dispatcher::new().with_sink(console.clone()),
    );

    harness
        .feed
        .event(r#"{"message_type":"update_position","data":{"callsign":"UA"#);
    harness
        .feed
        .event(position_update("UAL123", 37.7, -122.4, 5000));
    harness.feed.wait_until_idle(2).await;

    let (_, summary) = harness.stop().await;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.dispatched, 1);

    let records = console.records();
    assert_eq!(records.len(), 1);
    assert_json_eq!(
        parse(&records[0]),
        json!({
            "callsign": "UAL123",
            "altitude": 5000,
            "position": r#"{"type":"Point","coordinates":[-122.4,37.7]}"#
        })
    );
}

#[tokio::test]
async fn incomplete_position_update_is_skipped() {
    let console = MemorySink::default();
    let harness = Harness::start(
        AltitudeMode::PassThrough,
        Dispatcher::new().with_sink(console.clone()),
    );

    harness.feed.event(
        json!({
            "message_type": "update_position",
            "data": {"callsign": "BAW9", "latitude": 51.47, "longitude": -0.45}
        })
        .to_string(),
    );
    harness.feed.event(position_update("BAW9", 51.47, -0.45, 1200));
    harness.feed.wait_until_idle(2).await;

    let (_, summary) = harness.stop().await;
    assert_eq!(summary.failed, 1);
    assert_eq!(console.records().len(), 1);
}

#[tokio::test]
async fn failing_broadcast_does_not_affect_console_delivery() {
    let broadcast = FailingSink::default();
    let console = MemorySink::default();
    let harness = Harness::start(
        AltitudeMode::PassThrough,
        Dispatcher::new()
            .with_sink(broadcast.clone())
            .with_sink(console.clone()),
    );

    harness.feed.event(position_update("AAL1", 40.6, -73.8, 3000));
    harness.feed.event(position_update("AAL2", 40.7, -73.9, 4000));
    harness.feed.wait_until_idle(2).await;

    let (_, summary) = harness.stop().await;
    assert_eq!(broadcast.attempts(), 2);
    assert_eq!(summary.dispatched, 2);
    assert_eq!(summary.failed, 0);

    let callsigns: Vec<Value> = console
        .records()
        .iter()
        .map(|record| parse(record)["callsign"].clone())
        .collect();
    assert_eq!(callsigns, vec![json!("AAL1"), json!("AAL2")]);
}

#[tokio::test]
async fn feed_errors_and_end_of_stream_do_not_stop_the_loop() {
    let console = MemorySink::default();
    let harness = Harness::start(
        AltitudeMode::PassThrough,
        Dispatcher::new().with_sink(console.clone()),
    );

    harness.feed.error("Broker: Unknown topic or partition");
    harness.feed.end_of_stream();
    harness.feed.event(position_update("SWA9", 33.9, -118.4, 2000));
    harness.feed.wait_until_idle(3).await;

    let (relay, summary) = harness.stop().await;
    assert_eq!(relay.state(), RelayState::Stopped);
    assert_eq!(summary.feed_errors, 1);
    assert_eq!(summary.dispatched, 1);
    assert_eq!(console.records().len(), 1);
}

#[tokio::test]
async fn converted_mode_emits_meters() {
    let console = MemorySink::default();
    let harness = Harness::start(
        AltitudeMode::Converted,
        Dispatcher::new().with_sink(console.clone()),
    );

    harness.feed.event(position_update("DLH4AB", 50.03, 8.57, 32808));
    harness.feed.wait_until_idle(1).await;
    harness.stop().await;

    let record = parse(&console.records()[0]);
    let altitude = record["altitude"].as_f64().unwrap();
    assert!((altitude - 10000.0).abs() < 1e-6);

    let position = parse(record["position"].as_str().unwrap());
    let coordinates = position["coordinates"].as_array().unwrap();
    assert_eq!(coordinates.len(), 3);
    assert_eq!(coordinates[0], json!(8.57));
    assert_eq!(coordinates[1], json!(50.03));
    assert!((coordinates[2].as_f64().unwrap() - 10000.0).abs() < 1e-6);
}

#[tokio::test]
async fn cancel_while_waiting_stops_and_closes_once() {
    let console = MemorySink::default();
    let harness = Harness::start(
        AltitudeMode::PassThrough,
        Dispatcher::new().with_sink(console.clone()),
    );
    harness.feed.wait_until_idle(0).await;

    let feed = harness.feed.clone();
    let (relay, summary) = harness.stop().await;

    assert_eq!(relay.state(), RelayState::Stopped);
    assert_eq!(feed.closes(), 1);
    assert_eq!(summary, RelaySummary::default());

    // Nothing is pulled after shutdown
    feed.event(position_update("LATE1", 0.0, 0.0, 0));
    assert_eq!(feed.handed_out(), 0);
    assert!(console.records().is_empty());
}

#[tokio::test]
async fn already_cancelled_relay_processes_nothing() {
    let console = MemorySink::default();
    let (feed, channel) = ChannelFeed::channel();
    feed.event(position_update("EARLY1", 1.0, 2.0, 300));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut relay = Relay::new(
        Transformer::default(),
        Dispatcher::new().with_sink(console.clone()),
        cancel,
    );

    let summary = relay.run(channel).await;

    assert_eq!(relay.state(), RelayState::Stopped);
    assert_eq!(summary.received, 0);
    assert_eq!(feed.closes(), 1);
    assert!(console.records().is_empty());
}
