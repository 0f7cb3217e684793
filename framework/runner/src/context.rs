use crate::cli::ScenarioCli;
use crate::executor::Executor;
use fleetload_core::prelude::{ShutdownHandle, ShutdownListener};
use fleetload_instruments::Reporter;
use std::{fmt::Debug, sync::Arc};

/// Values stored in a context must be constructible before the scenario provides them and safe
/// to hand to the user threads.
pub trait UserValuesConstraint: Default + Debug + Send + Sync + 'static {}

impl UserValuesConstraint for () {}

/// State shared by the whole run: the executor, the metrics reporter, the parsed CLI and a
/// scenario-global value `RV` populated during setup. Read-only once the users have started.
pub struct RunnerContext<RV: UserValuesConstraint> {
    executor: Arc<Executor>,
    reporter: Arc<Reporter>,
    shutdown_handle: ShutdownHandle,
    cli: ScenarioCli,
    run_id: String,
    value: RV,
}

impl<RV: UserValuesConstraint> RunnerContext<RV> {
    pub(crate) fn new(
        executor: Arc<Executor>,
        reporter: Arc<Reporter>,
        shutdown_handle: ShutdownHandle,
        cli: ScenarioCli,
        run_id: String,
    ) -> Self {
        Self {
            executor,
            reporter,
            shutdown_handle,
            cli,
            run_id,
            value: Default::default(),
        }
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn reporter(&self) -> Arc<Reporter> {
        self.reporter.clone()
    }

    pub fn cli(&self) -> &ScenarioCli {
        &self.cli
    }

    pub fn get_connection_string(&self) -> Option<&str> {
        self.cli.connection_string.as_deref()
    }

    pub fn get_run_id(&self) -> &str {
        &self.run_id
    }

    /// Signal the whole run to stop. Used by scenarios that decide they are done early and by
    /// tests.
    pub fn force_stop_scenario(&self) {
        self.shutdown_handle.shutdown();
    }

    pub fn get_mut(&mut self) -> &mut RV {
        &mut self.value
    }

    pub fn get(&self) -> &RV {
        &self.value
    }
}

/// Per-virtual-user state: the user's identity, a view of the shared runner context, and a
/// user-local value `V`. Owned exclusively by one user thread, never shared.
pub struct UserContext<RV: UserValuesConstraint, V: UserValuesConstraint> {
    user_id: String,
    runner_context: Arc<RunnerContext<RV>>,
    shutdown_listener: ShutdownListener,
    value: V,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> UserContext<RV, V> {
    pub(crate) fn new(
        user_id: String,
        runner_context: Arc<RunnerContext<RV>>,
        shutdown_listener: ShutdownListener,
    ) -> Self {
        Self {
            user_id,
            runner_context,
            shutdown_listener,
            value: Default::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn runner_context(&self) -> &Arc<RunnerContext<RV>> {
        &self.runner_context
    }

    pub fn shutdown_listener(&mut self) -> &mut ShutdownListener {
        &mut self.shutdown_listener
    }

    pub fn get_mut(&mut self) -> &mut V {
        &mut self.value
    }

    pub fn get(&self) -> &V {
        &self.value
    }
}
