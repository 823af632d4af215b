use common_kafka::config::{ConsumerConfig, KafkaConfig};
use common_kafka::DATAFEED_TOPIC;
use envconfig::Envconfig;

use crate::position::AltitudeMode;

pub const DEFAULT_CONSUMER_GROUP: &str = "position-relay";

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3310")]
    pub port: u16,

    #[envconfig(default = "true")]
    pub export_prometheus: bool,

    // feet keeps the feed's unit and a flat point, meters converts and adds
    // the elevation to the point
    #[envconfig(default = "feet")]
    pub altitude_unit: AltitudeMode,

    // Unset disables the UDP sink
    pub broadcast_port: Option<u16>,

    #[envconfig(default = "true")]
    pub console_sink: bool,

    #[envconfig(nested = true)]
    pub kafka: KafkaConfig,

    #[envconfig(nested = true)]
    pub consumer: ConsumerConfig,
}

impl Config {
    /// Reads the environment after filling in the consumer defaults.
    pub fn init_with_defaults() -> Result<Self, envconfig::Error> {
        ConsumerConfig::set_defaults(DEFAULT_CONSUMER_GROUP, DATAFEED_TOPIC, true);
        Self::init_from_env()
    }

    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
