//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for PageHost:
//! - Tenant resolution counts by source (query parameter, host, none)
//! - Page render counts by route and outcome
//! - Render latency per route

use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for PageHost
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Tenant resolutions, labelled by how the tenant was found
    pub tenant_resolutions_total: CounterVec,
    /// Public page renders, labelled by route and outcome
    pub page_renders_total: CounterVec,
    /// Time spent resolving and rendering a public page
    pub page_render_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let tenant_resolutions_total = CounterVec::new(
            Opts::new(
                "pagehost_tenant_resolutions_total",
                "Total number of tenant resolutions by source",
            ),
            &["source"],
        )?;

        let page_renders_total = CounterVec::new(
            Opts::new(
                "pagehost_page_renders_total",
                "Total number of public page renders",
            ),
            &["route", "outcome"],
        )?;

        let page_render_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pagehost_page_render_duration_seconds",
                "Public page render duration in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
            &["route"],
        )?;

        registry.register(Box::new(tenant_resolutions_total.clone()))?;
        registry.register(Box::new(page_renders_total.clone()))?;
        registry.register(Box::new(page_render_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            tenant_resolutions_total,
            page_renders_total,
            page_render_duration_seconds,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record how a request's tenant was resolved
    ///
    /// `source` is `query_param`, `host` or `none`.
    pub fn record_resolution(&self, source: &str) {
        self.tenant_resolutions_total
            .with_label_values(&[source])
            .inc();
    }

    /// Record a finished page render
    pub fn record_render(&self, route: &str, outcome: RenderOutcome, duration_secs: f64) {
        self.page_renders_total
            .with_label_values(&[route, outcome.as_str()])
            .inc();
        self.page_render_duration_seconds
            .with_label_values(&[route])
            .observe(duration_secs);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}

/// Outcome label for page renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Ok,
    Placeholder,
    NotFound,
    Error,
}

impl RenderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Placeholder => "placeholder",
            Self::NotFound => "not_found",
            Self::Error => "error",
        }
    }
}
