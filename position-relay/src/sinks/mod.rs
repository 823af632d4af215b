use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, error};

use crate::encoder::EncodedRecord;
use crate::error::SinkError;
use crate::metrics_consts::{SINK_DELIVERIES, SINK_FAILURES};

pub mod broadcast;
pub mod console;

pub use broadcast::BroadcastSink;
pub use console::ConsoleSink;

/// A destination for encoded records. Delivery is best effort: a sink is
/// handed each record once and never asked to retry.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Used in logs and as the `sink` metric label.
    fn name(&self) -> &'static str;

    async fn deliver(&self, record: &EncodedRecord) -> Result<(), SinkError>;
}

/// Outcome of handing one record to every sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans a record out to a fixed set of sinks, in the order they were added.
#[derive(Default)]
pub struct Dispatcher {
    sinks: Vec<Box<dyn Sink>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink<S>(mut self, sink: S) -> Self
    where
        S: Sink + 'static,
    {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn sink_names(&self) -> Vec<&'static str> {
        self.sinks.iter().map(|sink| sink.name()).collect()
    }

    /// Delivers `record` to every sink. A failing sink is logged and skipped,
    /// it never keeps the record from the sinks after it.
    pub async fn dispatch(&self, record: &EncodedRecord) -> DispatchReport {
        let mut report = DispatchReport::default();

        for sink in &self.sinks {
            match sink.deliver(record).await {
                Ok(()) => {
                    debug!(sink = sink.name(), "record delivered");
                    counter!(SINK_DELIVERIES, "sink" => sink.name()).increment(1);
                    report.delivered += 1;
                }
                Err(e) => {
                    error!(sink = sink.name(), "failed to deliver record: {}", e);
                    counter!(SINK_FAILURES, "sink" => sink.name()).increment(1);
                    report.failed += 1;
                }
            }
        }

        report
    }
}
