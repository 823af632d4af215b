use std::time::{Duration, Instant};

use health::HealthHandle;
use metrics::{counter, gauge, histogram};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::encoder::encode;
use crate::error::{DecodeError, PipelineError};
use crate::feed::{Feed, RawEvent};
use crate::message::DecodedMessage;
use crate::metrics_consts::{
    EMPTY_EVENTS, EVENTS_DISPATCHED, EVENTS_FILTERED, EVENTS_RECEIVED, EVENT_ERRORS,
    EVENT_PROCESS_TIME, FEED_END_OF_STREAM, FEED_ERRORS, LOOP_STATE,
};
use crate::position::Transformer;
use crate::sinks::{DispatchReport, Dispatcher};

/// How long to wait before pulling again after the feed reported it was empty.
pub const END_OF_STREAM_BACKOFF: Duration = Duration::from_millis(100);

/// How often the loop reports liveness while it waits for events.
pub const LIVENESS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Running,
    /// Shutdown was requested, the feed is being closed.
    Draining,
    Stopped,
}

impl RelayState {
    fn as_gauge(&self) -> f64 {
        match self {
            RelayState::Running => 0.0,
            RelayState::Draining => 1.0,
            RelayState::Stopped => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Not a position update, dropped without error.
    Filtered,
    Dispatched(DispatchReport),
}

/// Counters for one run of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelaySummary {
    pub received: u64,
    pub filtered: u64,
    pub dispatched: u64,
    pub failed: u64,
    pub feed_errors: u64,
}

pub struct Relay {
    transformer: Transformer,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
    liveness: Option<HealthHandle>,
    state: RelayState,
    summary: RelaySummary,
}

impl Relay {
    pub fn new(
        transformer: Transformer,
        dispatcher: Dispatcher,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transformer,
            dispatcher,
            cancel,
            liveness: None,
            state: RelayState::Running,
            summary: RelaySummary::default(),
        }
    }

    pub fn with_liveness(mut self, liveness: HealthHandle) -> Self {
        self.liveness = Some(liveness);
        self
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn summary(&self) -> RelaySummary {
        self.summary
    }

    /// Pulls and processes events one at a time until cancelled, then closes
    /// the feed. Nothing that happens to a single event stops the loop.
    pub async fn run<F: Feed>(&mut self, mut feed: F) -> RelaySummary {
        self.set_state(RelayState::Running);
        info!(
            altitude_unit = %self.transformer.mode(),
            sinks = ?self.dispatcher.sink_names(),
            "relay started"
        );

        let mut heartbeat = tokio::time::interval(LIVENESS_INTERVAL);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = heartbeat.tick() => {
                    self.report_alive();
                    continue;
                }
                next = feed.next() => next,
            };

            match next {
                Some(Ok(event)) => self.handle(&event).await,
                Some(Err(e)) => {
                    warn!("feed error, pulling again: {}", e);
                    counter!(FEED_ERRORS).increment(1);
                    self.summary.feed_errors += 1;
                }
                None => {
                    debug!("feed drained, backing off");
                    counter!(FEED_END_OF_STREAM).increment(1);
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(END_OF_STREAM_BACKOFF) => {}
                    }
                }
            }
        }

        self.set_state(RelayState::Draining);
        info!("shutdown requested, closing feed");
        feed.close().await;
        self.set_state(RelayState::Stopped);
        info!(summary = ?self.summary, "relay stopped");

        self.summary
    }

    /// Runs one event through decode, filter, transform, encode and dispatch.
    pub async fn process_event(&self, event: &RawEvent) -> Result<EventOutcome, PipelineError> {
        let message = DecodedMessage::decode(&event.payload)?;
        if !message.is_position_update() {
            trace!(message_type = %message.message_type, "skipping message");
            return Ok(EventOutcome::Filtered);
        }

        let record = self.transformer.transform(&message)?;
        let encoded = encode(&record)?;
        Ok(EventOutcome::Dispatched(
            self.dispatcher.dispatch(&encoded).await,
        ))
    }

    async fn handle(&mut self, event: &RawEvent) {
        let start = Instant::now();
        self.summary.received += 1;
        counter!(EVENTS_RECEIVED).increment(1);

        match self.process_event(event).await {
            Ok(EventOutcome::Filtered) => {
                self.summary.filtered += 1;
                counter!(EVENTS_FILTERED).increment(1);
            }
            Ok(EventOutcome::Dispatched(_)) => {
                self.summary.dispatched += 1;
                counter!(EVENTS_DISPATCHED).increment(1);
            }
            Err(e) => {
                if matches!(e, PipelineError::Decode(DecodeError::Empty)) {
                    counter!(EMPTY_EVENTS).increment(1);
                }
                warn!(
                    stage = e.stage(),
                    partition = event.partition,
                    offset = event.offset,
                    "skipping event: {}",
                    e
                );
                self.summary.failed += 1;
                counter!(EVENT_ERRORS, "stage" => e.stage()).increment(1);
            }
        }

        histogram!(EVENT_PROCESS_TIME).record(start.elapsed().as_millis() as f64);
    }

    fn report_alive(&self) {
        if let Some(liveness) = &self.liveness {
            liveness.report_healthy();
        }
    }

    fn set_state(&mut self, state: RelayState) {
        self.state = state;
        gauge!(LOOP_STATE).set(state.as_gauge());
    }
}
