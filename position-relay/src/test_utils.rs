use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::encoder::EncodedRecord;
use crate::error::{FeedError, SinkError};
use crate::feed::{Feed, RawEvent};
use crate::sinks::Sink;

type FeedItem = Option<Result<RawEvent, FeedError>>;

#[derive(Default)]
struct FeedProbe {
    handed_out: AtomicUsize,
    waiting: AtomicBool,
    closes: AtomicUsize,
}

/// An in-memory feed. Blocks like a real one when nothing is queued.
pub struct ChannelFeed {
    rx: mpsc::UnboundedReceiver<FeedItem>,
    probe: Arc<FeedProbe>,
}

/// Test side of a `ChannelFeed`.
#[derive(Clone)]
pub struct FeedSender {
    tx: mpsc::UnboundedSender<FeedItem>,
    probe: Arc<FeedProbe>,
}

impl ChannelFeed {
    pub fn channel() -> (FeedSender, ChannelFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        let probe = Arc::new(FeedProbe::default());
        (
            FeedSender {
                tx,
                probe: probe.clone(),
            },
            ChannelFeed { rx, probe },
        )
    }
}

#[async_trait]
impl Feed for ChannelFeed {
    async fn next(&mut self) -> FeedItem {
        let item = match self.rx.try_recv() {
            Ok(item) => item,
            Err(_) => {
                self.probe.waiting.store(true, Ordering::SeqCst);
                match self.rx.recv().await {
                    Some(item) => item,
                    // Nobody can send anymore, wait for cancellation
                    None => std::future::pending().await,
                }
            }
        };
        self.probe.waiting.store(false, Ordering::SeqCst);
        self.probe.handed_out.fetch_add(1, Ordering::SeqCst);
        item
    }

    async fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        self.rx.close();
    }
}

impl FeedSender {
    pub fn event(&self, payload: impl Into<Vec<u8>>) {
        self.push(Some(Ok(RawEvent::new(payload))));
    }

    pub fn error(&self, reason: &str) {
        self.push(Some(Err(FeedError::Consume(reason.to_owned()))));
    }

    pub fn end_of_stream(&self) {
        self.push(None);
    }

    fn push(&self, item: FeedItem) {
        if self.tx.send(item).is_err() {
            tracing::debug!("feed already closed, item dropped");
        }
    }

    /// Number of items (events, errors and end-of-stream markers) handed to the relay.
    pub fn handed_out(&self) -> usize {
        self.probe.handed_out.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.probe.closes.load(Ordering::SeqCst)
    }

    /// Waits until `count` items were handed out and the relay is blocked
    /// pulling the next one, meaning all of them have been processed.
    pub async fn wait_until_idle(&self, count: usize) {
        wait_until(|| {
            self.handed_out() >= count && self.probe.waiting.load(Ordering::SeqCst)
        })
        .await
    }
}

/// Polls `condition` until it holds. Panics after five seconds.
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not met in time");
}

/// Keeps every record it is given.
#[derive(Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn records(&self) -> Vec<String> {
        self.lock().clone()
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn deliver(&self, record: &EncodedRecord) -> Result<(), SinkError> {
        self.lock().push(record.as_str().to_owned());
        Ok(())
    }
}

/// Fails every delivery, counting attempts.
#[derive(Clone, Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sink for FailingSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn deliver(&self, _record: &EncodedRecord) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Io(io::Error::from(
            io::ErrorKind::ConnectionRefused,
        )))
    }
}

pub fn encoded(text: &str) -> EncodedRecord {
    EncodedRecord(text.to_owned())
}

/// A feed payload for a position update.
pub fn position_update(callsign: &str, latitude: f64, longitude: f64, altitude: i64) -> String {
    json!({
        "message_type": "update_position",
        "data": {
            "callsign": callsign,
            "latitude": latitude,
            "longitude": longitude,
            "altitude": altitude,
        }
    })
    .to_string()
}

/// A feed payload of some other message type.
pub fn other_message(message_type: &str) -> String {
    json!({
        "message_type": message_type,
        "data": {"callsign": "IGNORED", "cid": 1234567}
    })
    .to_string()
}
