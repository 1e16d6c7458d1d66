//! # Prometheus Metrics — Exposition for Container Orchestration
//!
//! Exposes welcomehome operational metrics in the Prometheus text exposition
//! format for scraping by Prometheus or any OpenMetrics-compatible collector.
//!
//! ## Metrics Exposed
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `welcomehome_http_request_duration_seconds` | Histogram | `method`, `path` | HTTP request latency |
//! | `welcomehome_donations_recorded_total` | Counter | — | Items recorded at intake |
//! | `welcomehome_orders_started_total` | Counter | — | Orders started by staff |
//! | `welcomehome_orders_total` | Gauge | — | Orders on file |
//! | `welcomehome_inventory_items` | Gauge | — | Items on file |
//!
//! Gauges are refreshed from the server's 30-second background loop; the
//! `/metrics` endpoint renders the current registry state on each scrape.

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Label set for the HTTP duration histogram.
#[derive(Clone, Debug, Hash, PartialEq, Eq, prometheus_client::encoding::EncodeLabelSet)]
pub struct HttpLabel {
    pub method: String,
    pub path: String,
}

/// Thread-safe metrics registry for the welcomehome server.
///
/// All fields use atomic types and are safe to update from any async task.
pub struct Metrics {
    pub registry: Registry,
    pub http_request_duration: Family<HttpLabel, Histogram>,
    pub donations_recorded: Counter,
    pub orders_started: Counter,
    pub orders_total: Gauge,
    pub inventory_items: Gauge,
}

impl Metrics {
    /// Create a new metrics registry with all welcomehome metrics registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_request_duration = Family::<HttpLabel, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 14))
        });
        registry.register(
            "welcomehome_http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_request_duration.clone(),
        );

        let donations_recorded = Counter::default();
        registry.register(
            "welcomehome_donations_recorded",
            "Total items recorded at donation intake",
            donations_recorded.clone(),
        );

        let orders_started = Counter::default();
        registry.register(
            "welcomehome_orders_started",
            "Total orders started by staff",
            orders_started.clone(),
        );

        let orders_total = Gauge::default();
        registry.register(
            "welcomehome_orders_total",
            "Number of orders on file",
            orders_total.clone(),
        );

        let inventory_items = Gauge::default();
        registry.register(
            "welcomehome_inventory_items",
            "Number of items on file",
            inventory_items.clone(),
        );

        Self {
            registry,
            http_request_duration,
            donations_recorded,
            orders_started,
            orders_total,
            inventory_items,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).expect("encoding metrics should not fail");
        buf
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
