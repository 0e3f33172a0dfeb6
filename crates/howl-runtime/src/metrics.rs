//! Metrics recorder installation.
//!
//! With the `prometheus` feature and `metrics.enabled = true`, dispatch
//! timings are recorded into a Prometheus recorder whose text exposition is
//! available from [`MetricsHandle::render`]. Otherwise timings are discarded.

use std::sync::Arc;

use tracing::info;

use crate::config::MetricsConfig;
use crate::error::RuntimeResult;
use howl_framework::{FacadeSink, Metrics};

/// Histogram buckets, in seconds, for dispatch timings.
pub const DISPATCH_BUCKETS: [f64; 12] = [
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Handle to the installed recorder.
#[derive(Clone, Default)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus: Option<metrics_exporter_prometheus::PrometheusHandle>,
    enabled: bool,
}

impl MetricsHandle {
    /// Whether dispatch timings are recorded.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The [`Metrics`] the dispatcher should record into.
    pub fn dispatch_metrics(&self) -> Metrics {
        if self.enabled {
            Metrics::new(Arc::new(FacadeSink))
        } else {
            Metrics::noop()
        }
    }

    /// Metrics in Prometheus text format, empty when nothing is exported.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        if let Some(handle) = &self.prometheus {
            return handle.render();
        }
        String::new()
    }
}

impl std::fmt::Debug for MetricsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsHandle")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Installs the metrics recorder. Call once at startup.
pub fn init_metrics(config: &MetricsConfig) -> RuntimeResult<MetricsHandle> {
    if !config.enabled {
        info!("Metrics collection is disabled");
        return Ok(MetricsHandle::default());
    }

    #[cfg(feature = "prometheus")]
    {
        let handle = init_prometheus(config)?;
        info!("Prometheus metrics recorder installed");
        Ok(MetricsHandle {
            prometheus: Some(handle),
            enabled: true,
        })
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!("Metrics enabled without an exporter, recording into the global recorder");
        Ok(MetricsHandle { enabled: true })
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(
    config: &MetricsConfig,
) -> RuntimeResult<metrics_exporter_prometheus::PrometheusHandle> {
    use crate::error::RuntimeError;
    use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};

    let mut builder = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Prefix("howl_command".to_string()), &DISPATCH_BUCKETS)
        .map_err(|e| RuntimeError::Metrics(e.to_string()))?;

    for (key, value) in &config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    builder
        .install_recorder()
        .map_err(|e| RuntimeError::Metrics(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_render_nothing() {
        let handle = init_metrics(&MetricsConfig::default()).unwrap();
        assert!(!handle.is_enabled());
        assert!(handle.render().is_empty());
        handle.dispatch_metrics().start_retention_timer().observe();
    }
}
