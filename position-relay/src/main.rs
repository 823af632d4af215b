//! Relay live positions from the datafeed to the console and a local UDP port.
use anyhow::Context;
use common_kafka::kafka_consumer::SingleTopicConsumer;
use health::HealthRegistry;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use position_relay::config::Config;
use position_relay::feed::KafkaFeed;
use position_relay::metrics::{router, serve, setup_metrics_recorder};
use position_relay::position::Transformer;
use position_relay::relay::Relay;
use position_relay::sinks::{BroadcastSink, ConsoleSink, Dispatcher};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_with_defaults().context("invalid configuration")?;

    let liveness = HealthRegistry::new("liveness");
    let relay_liveness = liveness.register("relay_loop", time::Duration::seconds(30));
    let kafka_liveness = liveness.register("kafka_consumer", time::Duration::seconds(30));

    let recorder = if config.export_prometheus {
        Some(setup_metrics_recorder().context("failed to install metrics recorder")?)
    } else {
        None
    };
    let bind = config.bind();
    let app = router(liveness, recorder);
    tokio::spawn(async move {
        if let Err(e) = serve(app, &bind).await {
            error!("failed to serve probes on {}: {}", bind, e);
        }
    });

    let consumer =
        SingleTopicConsumer::with_liveness(config.kafka, config.consumer, kafka_liveness)
            .context("failed to create kafka consumer")?;

    let mut dispatcher = Dispatcher::new();
    if config.console_sink {
        dispatcher.push(Box::new(ConsoleSink::stdout()));
    }
    if let Some(port) = config.broadcast_port {
        let sink = BroadcastSink::bind(port)
            .await
            .context("failed to bind broadcast socket")?;
        dispatcher.push(Box::new(sink));
    }
    if dispatcher.is_empty() {
        warn!("no sinks configured, records will be dropped");
    }

    let cancel = CancellationToken::new();
    let mut term = signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = term.recv() => {},
            _ = interrupt.recv() => {},
        };
        info!("Shutting down gracefully...");
        shutdown.cancel();
    });

    let mut relay = Relay::new(Transformer::new(config.altitude_unit), dispatcher, cancel)
        .with_liveness(relay_liveness);
    let summary = relay.run(KafkaFeed::new(consumer)).await;

    info!(
        received = summary.received,
        dispatched = summary.dispatched,
        filtered = summary.filtered,
        failed = summary.failed,
        "relay exited"
    );
    Ok(())
}
