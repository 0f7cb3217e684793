use crate::error::ClientError;
use crate::resource::ObservedStatus;
use std::future::Future;
use std::time::{Duration, Instant};

/// How long a convergence wait may run before it is reported as timed out.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30 * 60);

/// Pause between polls, so a slow convergence does not hammer the target API.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// The outcome of a bounded convergence wait. Both variants carry the elapsed wall time, and
/// neither is an error: a timeout is reported as a metric event and the scenario moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Converged(Duration),
    TimedOut(Duration),
}

impl PollOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Converged(elapsed) | PollOutcome::TimedOut(elapsed) => *elapsed,
        }
    }
}

/// Repeatedly fetch a resource's status until `predicate` holds or `deadline` elapses.
///
/// `fetch` is typically `client.read(resource)?.status()`. An absent status never converges;
/// the predicate only ever sees a status the server actually reported. Transport and decode
/// failures propagate and abort the caller's current iteration.
pub async fn await_condition<F, Fut, P>(
    mut fetch: F,
    predicate: P,
    deadline: Duration,
) -> Result<PollOutcome, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<ObservedStatus>, ClientError>>,
    P: Fn(&ObservedStatus) -> bool,
{
    let started = Instant::now();

    loop {
        if let Some(status) = fetch().await? {
            if predicate(&status) {
                return Ok(PollOutcome::Converged(started.elapsed()));
            }
        }

        if started.elapsed() > deadline {
            return Ok(PollOutcome::TimedOut(started.elapsed()));
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
