pub mod config;
pub mod encoder;
pub mod error;
pub mod feed;
pub mod message;
pub mod metrics;
pub mod metrics_consts;
pub mod position;
pub mod relay;
pub mod sinks;
pub mod test_utils;
