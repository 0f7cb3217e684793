use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::{Receiver, Sender};

/// Broadcasts a shutdown signal to every [ShutdownListener] created from it.
///
/// The handle is cheap to clone and can be triggered from any thread. Listeners created after
/// the signal has been sent will not observe it, so create listeners up front.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
        }
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.sender.send(()) {
            // Fails when nobody is listening for a shutdown signal, which is harmless.
            log::warn!("Failed to send shutdown signal: {e:?}");
        }
    }

    pub fn new_listener(&self) -> ShutdownListener {
        ShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Debug)]
pub struct ShutdownListener {
    receiver: Receiver<()>,
}

impl Clone for ShutdownListener {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
        }
    }
}

impl ShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>) -> Self {
        Self { receiver }
    }

    /// Point in time check whether the shutdown signal has been received. Once this returns
    /// true, in-progress work should be wound down so the scenario can stop.
    pub fn should_shutdown(&mut self) -> bool {
        match self.receiver.try_recv() {
            Ok(_) => true,
            Err(TryRecvError::Closed) => true,
            // Empty or lagged, keep running.
            Err(_) => false,
        }
    }

    /// Wait until the shutdown signal is received. Safe to race against another future so that
    /// the signal can cancel work in progress.
    pub async fn wait_for_shutdown(&mut self) {
        // A closed channel means the handle is gone, treat it the same as a signal.
        let _ = self.receiver.recv().await;
    }
}

/// Returned by the executor when a future was cancelled because the run is shutting down.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listener_sees_signal() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        assert!(!listener.should_shutdown());
        handle.shutdown();
        assert!(listener.should_shutdown());
    }

    #[tokio::test]
    async fn cloned_listener_sees_signal_sent_after_clone() {
        let handle = ShutdownHandle::new();
        let listener = handle.new_listener();
        let mut cloned = listener.clone();

        handle.shutdown();
        assert!(cloned.should_shutdown());
    }

    #[tokio::test]
    async fn wait_for_shutdown_resolves_when_handle_dropped() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();

        drop(handle);
        listener.wait_for_shutdown().await;
    }
}
