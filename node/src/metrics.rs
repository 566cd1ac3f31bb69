//! # Prometheus Metrics
//!
//! Operational metrics for the minting API, scraped at `/metrics` on the
//! configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `badge` prefix so they do not collide with the default registry.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use badge_protocol::{BadgeAction, ErrorKind};

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct BadgeMetrics {
    registry: Registry,
    /// Mint requests received, by action.
    pub mint_requests_total: IntCounterVec,
    /// Failed mint requests, by error kind.
    pub mint_failures_total: IntCounterVec,
    /// Time from request to submitted transaction, in seconds.
    pub mint_latency_seconds: Histogram,
}

impl BadgeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("badge".into()), None)
            .expect("failed to create prometheus registry");

        let mint_requests_total = IntCounterVec::new(
            Opts::new("mint_requests_total", "Mint requests received, by action"),
            &["action"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(mint_requests_total.clone()))
            .expect("metric registration");

        let mint_failures_total = IntCounterVec::new(
            Opts::new("mint_failures_total", "Failed mint requests, by error kind"),
            &["kind"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(mint_failures_total.clone()))
            .expect("metric registration");

        let mint_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "mint_latency_seconds",
                "Latency from mint request to submitted transaction in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(mint_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            mint_requests_total,
            mint_failures_total,
            mint_latency_seconds,
        }
    }

    /// Counts a request. Requests whose action fails to parse count as `unknown`.
    pub fn record_request(&self, action: Option<BadgeAction>) {
        let label = action.map(|a| a.to_string()).unwrap_or_else(|| "unknown".into());
        self.mint_requests_total
            .with_label_values(&[label.as_str()])
            .inc();
    }

    pub fn record_failure(&self, kind: ErrorKind) {
        self.mint_failures_total
            .with_label_values(&[kind.to_string().as_str()])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for BadgeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<BadgeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
