//! Dispatch instrumentation.
//!
//! The dispatcher measures two things per command:
//!
//! - **retention**: time from event receipt to dispatch start
//! - **processing**: time spent in [`Command::execute`](crate::Command::execute),
//!   labelled by command kind
//!
//! Where the numbers go is decided by the [`MetricsSink`] handed to
//! [`Metrics::new`]. [`FacadeSink`] forwards to whatever `metrics` recorder is
//! installed globally; [`NoopSink`] discards everything.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metric names recorded by [`FacadeSink`].
pub mod names {
    /// Histogram: event received to dispatch start.
    pub const RETENTION_SECONDS: &str = "howl_command_retention_seconds";
    /// Histogram: command execution time.
    pub const PROCESSING_SECONDS: &str = "howl_command_processing_seconds";
    /// Label carrying the command kind.
    pub const COMMAND_LABEL: &str = "command";
}

/// Destination for dispatch timings.
pub trait MetricsSink: Send + Sync + 'static {
    fn record_retention(&self, elapsed: Duration);

    fn record_processing(&self, kind: &str, elapsed: Duration);
}

/// Records through the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeSink;

impl MetricsSink for FacadeSink {
    fn record_retention(&self, elapsed: Duration) {
        metrics::histogram!(names::RETENTION_SECONDS).record(elapsed.as_secs_f64());
    }

    fn record_processing(&self, kind: &str, elapsed: Duration) {
        metrics::histogram!(names::PROCESSING_SECONDS, names::COMMAND_LABEL => kind.to_string())
            .record(elapsed.as_secs_f64());
    }
}

/// Discards every measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn record_retention(&self, _elapsed: Duration) {}

    fn record_processing(&self, _kind: &str, _elapsed: Duration) {}
}

/// Timer factory bound to one sink.
#[derive(Clone)]
pub struct Metrics {
    sink: Arc<dyn MetricsSink>,
}

impl Metrics {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    /// Metrics that go nowhere.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    /// Starts a retention timer at the current instant.
    pub fn start_retention_timer(&self) -> RetentionTimer {
        self.retention_timer_since(Instant::now())
    }

    /// Starts a retention timer at an earlier instant, typically event receipt.
    pub fn retention_timer_since(&self, received_at: Instant) -> RetentionTimer {
        RetentionTimer {
            sink: Arc::clone(&self.sink),
            started: received_at,
        }
    }

    /// Starts a processing timer for `kind`. The time is recorded when the
    /// returned guard is dropped.
    pub fn start_processing_timer(&self, kind: &str) -> ProcessingTimer {
        ProcessingTimer {
            sink: Arc::clone(&self.sink),
            kind: kind.to_string(),
            started: Instant::now(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(Arc::new(FacadeSink))
    }
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

/// Measures retention. Recorded once, by [`observe`](Self::observe).
///
/// Dropping an unobserved timer records nothing; events that never reach
/// dispatch have no retention.
#[must_use = "retention is only recorded by `observe`"]
pub struct RetentionTimer {
    sink: Arc<dyn MetricsSink>,
    started: Instant,
}

impl RetentionTimer {
    /// Records the elapsed time and returns it.
    pub fn observe(self) -> Duration {
        let elapsed = self.started.elapsed();
        self.sink.record_retention(elapsed);
        elapsed
    }
}

/// Measures command processing. Recorded on drop, so every exit path counts.
#[must_use = "the processing time is recorded when the timer is dropped"]
pub struct ProcessingTimer {
    sink: Arc<dyn MetricsSink>,
    kind: String,
    started: Instant,
}

impl Drop for ProcessingTimer {
    fn drop(&mut self) {
        self.sink
            .record_processing(&self.kind, self.started.elapsed());
    }
}
