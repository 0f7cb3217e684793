use crate::report::{ReportCollector, ReportMetric};
use std::sync::Arc;

/// Collects metrics into memory instead of sending them anywhere.
///
/// Used by tests to assert on emitted events, and for dry runs where no collector is available.
#[derive(Default)]
pub struct InMemoryReportCollector {
    metrics: Arc<parking_lot::Mutex<Vec<ReportMetric>>>,
}

impl InMemoryReportCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle onto the collected metrics that stays valid after the collector is boxed.
    pub fn handle(&self) -> Arc<parking_lot::Mutex<Vec<ReportMetric>>> {
        self.metrics.clone()
    }
}

impl ReportCollector for InMemoryReportCollector {
    fn add_metric(&mut self, metric: ReportMetric) {
        self.metrics.lock().push(metric);
    }

    fn finalize(&self) {
        log::info!("Collected {} metrics", self.metrics.lock().len());
    }
}
