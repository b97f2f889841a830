//! Telemetry
//!
//! Structured logging via tracing and an optional Prometheus metrics
//! endpoint. Counters are registered lazily at their call sites
//! (`sgwsniper_auctions_scheduled`, `sgwsniper_alerts_fired`,
//! `sgwsniper_bids_submitted`).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;

/// Guard that keeps telemetry alive for the process lifetime
pub struct TelemetryGuard {
    _priv: (),
}

/// Initialize logging and, when configured, the metrics endpoint
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    init_logging(&config.log_level)?;

    if let Some(port) = config.metrics_port {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], port))
            .install()
            .map_err(|e| anyhow::anyhow!("Failed to start metrics endpoint: {e}"))?;
        tracing::info!(port, "Prometheus metrics endpoint listening");
    }

    Ok(TelemetryGuard { _priv: () })
}

fn init_logging(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to init logging: {e}"))?;

    Ok(())
}
