use crate::report::{ReportCollector, ReportMetric};

/// Discards every metric. Useful when running a scenario just to generate load.
pub struct NoopReportCollector;

impl ReportCollector for NoopReportCollector {
    fn add_metric(&mut self, _metric: ReportMetric) {}

    fn finalize(&self) {}
}
