pub mod config;
pub mod kafka_consumer;

/// Topic the public position datafeed is published on.
pub const DATAFEED_TOPIC: &str = "datafeed";
