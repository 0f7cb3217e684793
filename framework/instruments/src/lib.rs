pub mod report;

use fleetload_core::prelude::ShutdownListener;
use report::{
    GraphiteReportCollector, InMemoryReportCollector, NoopReportCollector, ReportCollector,
    ReportMetric,
};
use tokio::runtime::Runtime;

/// Selects how metrics leave the process.
#[derive(Debug, Clone)]
pub enum ReportConfig {
    /// Stream newline-delimited plaintext records to a Graphite-compatible collector.
    Graphite { host: String, port: u16 },
    /// Keep metrics in memory. Mostly useful for tests and local dry runs.
    InMemory,
    /// Discard all metrics.
    Noop,
}

impl ReportConfig {
    /// Construct the reporter for this configuration.
    ///
    /// For the Graphite reporter this opens the collector connection immediately, so that a
    /// misconfigured sink fails the run before any load is generated.
    pub fn init(
        self,
        runtime: &Runtime,
        shutdown_listener: ShutdownListener,
    ) -> anyhow::Result<Reporter> {
        let collector: Box<dyn ReportCollector + Send> = match self {
            ReportConfig::Graphite { host, port } => Box::new(GraphiteReportCollector::new(
                runtime,
                shutdown_listener,
                &host,
                port,
            )?),
            ReportConfig::InMemory => Box::new(InMemoryReportCollector::new()),
            ReportConfig::Noop => Box::new(NoopReportCollector),
        };

        Ok(Reporter::new(collector))
    }
}

/// Shared handle that serializes metric emission from all virtual users onto one collector.
pub struct Reporter {
    collector: parking_lot::Mutex<Box<dyn ReportCollector + Send>>,
}

impl Reporter {
    pub fn new(collector: Box<dyn ReportCollector + Send>) -> Self {
        Self {
            collector: parking_lot::Mutex::new(collector),
        }
    }

    pub fn add_metric(&self, metric: ReportMetric) {
        self.collector.lock().add_metric(metric);
    }

    /// Flush pending metrics and release the collector connection.
    ///
    /// Must be called once, after the shutdown signal has been sent and all virtual users have
    /// stopped. Blocks until the flush completes.
    pub fn finalize(&self) {
        self.collector.lock().finalize();
    }
}
