mod graphite_reporter;
mod in_memory_reporter;
mod noop_reporter;

use std::time::{SystemTime, UNIX_EPOCH};

pub use graphite_reporter::{GraphiteReportCollector, METRIC_NAMESPACE};
pub use in_memory_reporter::InMemoryReportCollector;
pub use noop_reporter::NoopReportCollector;

/// One named measurement: a latency in milliseconds or a point-in-time count.
///
/// The timestamp is captured when the metric is created, not when it is written to the
/// collector, so queueing delays in the sink never skew the series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMetric {
    name: String,
    value: u64,
    timestamp: SystemTime,
}

impl ReportMetric {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: 0,
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn unix_timestamp(&self) -> u64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

pub trait ReportCollector {
    fn add_metric(&mut self, metric: ReportMetric);

    /// Flush anything buffered and release resources held by the collector.
    fn finalize(&self);
}
