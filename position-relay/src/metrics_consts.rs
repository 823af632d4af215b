pub const EVENTS_RECEIVED: &str = "relay_events_received_total";
pub const EVENTS_FILTERED: &str = "relay_events_filtered_total";
pub const EVENTS_DISPATCHED: &str = "relay_events_dispatched_total";
pub const EVENT_ERRORS: &str = "relay_event_errors_total";
pub const EMPTY_EVENTS: &str = "relay_empty_events_total";
pub const FEED_ERRORS: &str = "relay_feed_errors_total";
pub const FEED_END_OF_STREAM: &str = "relay_feed_end_of_stream_total";
pub const SINK_DELIVERIES: &str = "relay_sink_deliveries_total";
pub const SINK_FAILURES: &str = "relay_sink_failures_total";
pub const EVENT_PROCESS_TIME: &str = "relay_event_process_time_ms";
pub const LOOP_STATE: &str = "relay_loop_state";
