use std::future::Future;

use fleetload_core::prelude::{ShutdownHandle, ShutdownSignalError};

/// Owns the async runtime that user threads submit their network work to.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
    shutdown_handle: ShutdownHandle,
}

impl Executor {
    pub(crate) fn new(runtime: tokio::runtime::Runtime, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            runtime,
            shutdown_handle,
        }
    }

    /// Run async code in place, blocking the calling user thread until it completes.
    ///
    /// The future is raced against the run's shutdown signal: when the run stops, in-flight
    /// work is cancelled and a [ShutdownSignalError] comes back. A poll loop therefore only
    /// ends through convergence, its own deadline, or process shutdown.
    pub fn execute_in_place<T>(
        &self,
        fut: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        let mut shutdown_listener = self.shutdown_handle.new_listener();
        self.runtime.block_on(async move {
            tokio::select! {
                result = fut => result,
                _ = shutdown_listener.wait_for_shutdown() => {
                    Err(anyhow::anyhow!(ShutdownSignalError::default()))
                },
            }
        })
    }

    /// Submit async code to run in the background.
    ///
    /// The future is not cancelled on shutdown and the runner does not wait for it. Inside
    /// behaviour hooks prefer [Executor::execute_in_place] so that an iteration finishes
    /// before the next one is scheduled.
    pub fn spawn(&self, fut: impl Future<Output = ()> + Send + 'static) {
        self.runtime.spawn(fut);
    }
}
