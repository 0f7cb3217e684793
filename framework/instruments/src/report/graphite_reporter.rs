use crate::report::{ReportCollector, ReportMetric};
use anyhow::Context;
use fleetload_core::prelude::ShutdownListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::select;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Prefix applied to every metric name on the wire.
pub const METRIC_NAMESPACE: &str = "performance";

/// Streams metrics to a Graphite-compatible collector as newline-delimited plaintext records.
///
/// All metrics funnel through a single writer task over one TCP connection, so concurrent
/// emitters can never interleave partial records on the wire. The connection is opened when the
/// collector is constructed and closed, after a drain and flush, when the run shuts down.
pub struct GraphiteReportCollector {
    writer: UnboundedSender<ReportMetric>,
    join_handle: JoinHandle<()>,
    flush_complete: Arc<AtomicBool>,
}

impl GraphiteReportCollector {
    pub fn new(
        runtime: &Runtime,
        shutdown_listener: ShutdownListener,
        host: &str,
        port: u16,
    ) -> anyhow::Result<Self> {
        let addr = format!("{host}:{port}");
        let stream = runtime
            .block_on(TcpStream::connect(&addr))
            .with_context(|| format!("Failed to connect to metrics collector at {addr}"))?;

        let flush_complete = Arc::new(AtomicBool::new(false));
        let (writer, join_handle) =
            start_write_task(runtime, shutdown_listener, stream, flush_complete.clone());

        Ok(Self {
            writer,
            join_handle,
            flush_complete,
        })
    }
}

impl ReportCollector for GraphiteReportCollector {
    fn add_metric(&mut self, metric: ReportMetric) {
        if let Err(e) = self.writer.send(metric) {
            if self.flush_complete.load(Ordering::Relaxed) {
                log::info!("Metric dropped because the write task has finished: {e}");
            } else {
                log::warn!("Failed to record metric: {e}");
            }
        }
    }

    fn finalize(&self) {
        let wait_started = std::time::Instant::now();
        let mut notify_timer = std::time::Instant::now();
        while !self.flush_complete.load(Ordering::Relaxed) {
            if notify_timer.elapsed().as_secs() > 10 {
                log::warn!(
                    "Still waiting for metrics to flush after {} seconds.",
                    wait_started.elapsed().as_secs()
                );
                notify_timer = std::time::Instant::now();
            }

            // If the write task has exited there is nothing left to wait for.
            if self.join_handle.is_finished() {
                break;
            }

            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    }
}

/// One record per metric: `<namespace>.<name> <value> <unix-timestamp>\n`.
///
/// Dots inside the metric name would create extra levels in the Graphite tree, so they are
/// replaced with dashes before the namespace is applied.
pub(crate) fn format_record(metric: &ReportMetric) -> String {
    format!(
        "{}.{} {} {}\n",
        METRIC_NAMESPACE,
        metric.name().replace('.', "-"),
        metric.value(),
        metric.unix_timestamp()
    )
}

fn start_write_task(
    runtime: &Runtime,
    mut shutdown_listener: ShutdownListener,
    mut stream: TcpStream,
    flush_complete: Arc<AtomicBool>,
) -> (UnboundedSender<ReportMetric>, JoinHandle<()>) {
    let (writer, mut receiver) = tokio::sync::mpsc::unbounded_channel::<ReportMetric>();

    let join_handle = runtime.spawn(async move {
        loop {
            select! {
                _ = shutdown_listener.wait_for_shutdown() => {
                    log::debug!("Shutting down metrics writer");
                    break;
                }
                metric = receiver.recv() => {
                    match metric {
                        Some(metric) => write_record(&mut stream, &metric).await,
                        None => break,
                    }
                }
            }
        }

        // Drain whatever is still queued before closing the connection.
        let mut drained = 0;
        while let Ok(metric) = receiver.try_recv() {
            write_record(&mut stream, &metric).await;
            drained += 1;
        }
        if drained > 0 {
            log::debug!("Drained {drained} remaining metrics");
        }

        if let Err(e) = stream.flush().await {
            log::warn!("Failed to flush metrics connection: {e}");
        }
        if let Err(e) = stream.shutdown().await {
            log::warn!("Failed to close metrics connection: {e}");
        }

        flush_complete.store(true, Ordering::Relaxed);
    });

    (writer, join_handle)
}

async fn write_record(stream: &mut TcpStream, metric: &ReportMetric) {
    if let Err(e) = stream.write_all(format_record(metric).as_bytes()).await {
        log::warn!("Failed to send metric to collector: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_has_namespace_value_and_timestamp() {
        let metric = ReportMetric::new("fleet_spawn_up").with_value(1250);
        let record = format_record(&metric);

        let fields: Vec<&str> = record.trim_end().split(' ').collect();
        assert_eq!(3, fields.len());
        assert_eq!("performance.fleet_spawn_up", fields[0]);
        assert_eq!("1250", fields[1]);
        assert_eq!(metric.unix_timestamp().to_string(), fields[2]);
        assert!(record.ends_with('\n'));
    }

    #[test]
    fn dots_in_metric_names_become_dashes() {
        let metric = ReportMetric::new("fleet.scaling.up").with_value(1);
        let record = format_record(&metric);

        assert!(record.starts_with("performance.fleet-scaling-up "));
    }
}
