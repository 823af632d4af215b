use envconfig::Envconfig;
use rdkafka::ClientConfig;

#[derive(Envconfig, Clone)]
pub struct KafkaConfig {
    #[envconfig(default = "localhost:9092")]
    pub kafka_hosts: String,

    #[envconfig(default = "false")]
    pub kafka_tls: bool,

    // PLAIN, SCRAM-SHA-256, SCRAM-SHA-512. Unset disables SASL entirely.
    pub kafka_sasl_mechanism: Option<String>,

    pub kafka_sasl_username: Option<String>,

    pub kafka_sasl_password: Option<String>,
}

impl KafkaConfig {
    /// The librdkafka `security.protocol` implied by the TLS and SASL settings.
    pub fn security_protocol(&self) -> &'static str {
        match (self.kafka_tls, self.kafka_sasl_mechanism.is_some()) {
            (false, false) => "plaintext",
            (true, false) => "ssl",
            (false, true) => "sasl_plaintext",
            (true, true) => "sasl_ssl",
        }
    }

    /// Applies connection and authentication settings to a client config.
    pub fn apply(&self, client_config: &mut ClientConfig) {
        client_config
            .set("bootstrap.servers", &self.kafka_hosts)
            .set("security.protocol", self.security_protocol());

        if self.kafka_tls {
            client_config.set("enable.ssl.certificate.verification", "false");
        }

        if let Some(mechanism) = &self.kafka_sasl_mechanism {
            client_config.set("sasl.mechanism", mechanism);
            if let Some(username) = &self.kafka_sasl_username {
                client_config.set("sasl.username", username);
            }
            if let Some(password) = &self.kafka_sasl_password {
                client_config.set("sasl.password", password);
            }
        }
    }
}

#[derive(Envconfig, Clone)]
pub struct ConsumerConfig {
    pub kafka_consumer_group: String,
    pub kafka_consumer_topic: String,

    // A fresh group replays whatever the broker still retains, matching how the
    // datafeed has always been read. Set "latest" to only see live traffic.
    #[envconfig(default = "earliest")]
    pub kafka_consumer_offset_reset: String, // earliest, latest

    // Offsets are stored by the consumer as soon as a message is received
    // (at-most-once), auto commit only controls when they are flushed.
    pub kafka_consumer_auto_commit: bool,

    #[envconfig(default = "5000")]
    pub kafka_consumer_auto_commit_interval_ms: i32,
}

impl ConsumerConfig {
    /// Consumer settings are application specific, so applications set their
    /// defaults here before parsing their own config struct.
    pub fn set_defaults(consumer_group: &str, consumer_topic: &str, auto_commit: bool) {
        if std::env::var("KAFKA_CONSUMER_GROUP").is_err() {
            std::env::set_var("KAFKA_CONSUMER_GROUP", consumer_group);
        };
        if std::env::var("KAFKA_CONSUMER_TOPIC").is_err() {
            std::env::set_var("KAFKA_CONSUMER_TOPIC", consumer_topic);
        };
        if std::env::var("KAFKA_CONSUMER_AUTO_COMMIT").is_err() {
            std::env::set_var("KAFKA_CONSUMER_AUTO_COMMIT", auto_commit.to_string());
        }
    }
}
