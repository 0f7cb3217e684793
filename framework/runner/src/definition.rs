use std::collections::HashMap;
use std::sync::Arc;

use crate::cli::ScenarioCli;
use crate::context::{RunnerContext, UserContext, UserValuesConstraint};

pub type HookResult = anyhow::Result<()>;

pub type GlobalHookMut<RV> = fn(&mut RunnerContext<RV>) -> HookResult;
pub type GlobalHook<RV> = fn(Arc<RunnerContext<RV>>) -> HookResult;
pub type UserHookMut<RV, V> = fn(&mut UserContext<RV, V>) -> HookResult;

/// The builder for a scenario definition.
///
/// Use this at the start of a scenario binary to declare the hooks that make up the scenario.
/// `RV` is the scenario-global value held by the runner context, `V` the per-user value.
pub struct ScenarioDefinitionBuilder<RV: UserValuesConstraint, V: UserValuesConstraint> {
    /// The name of the scenario, which should be unique within the test suite.
    ///
    /// Recommended value is `env!("CARGO_PKG_NAME")`.
    name: String,
    cli: ScenarioCli,
    default_duration_s: Option<u64>,
    /// Global setup hook, run exactly once, single-threaded, before any virtual user starts.
    setup_fn: Option<GlobalHookMut<RV>>,
    /// Per-user setup hook, run once for each user as its thread starts.
    setup_user_fn: Option<UserHookMut<RV, V>>,
    /// The behaviours users cycle through. Either one default behaviour for every user, or
    /// named behaviours assigned counts through the CLI.
    user_behaviour: HashMap<String, UserHookMut<RV, V>>,
    /// Per-user teardown, run when the user stops. Best effort.
    teardown_user_fn: Option<UserHookMut<RV, V>>,
    /// Global teardown, run after all users have stopped. Best effort.
    teardown_fn: Option<GlobalHook<RV>>,
}

pub(crate) struct ScenarioDefinition<RV: UserValuesConstraint, V: UserValuesConstraint> {
    pub name: String,
    pub cli: ScenarioCli,
    pub duration_s: Option<u64>,
    pub setup_fn: Option<GlobalHookMut<RV>>,
    pub setup_user_fn: Option<UserHookMut<RV, V>>,
    pub user_behaviour: HashMap<String, UserHookMut<RV, V>>,
    pub teardown_user_fn: Option<UserHookMut<RV, V>>,
    pub teardown_fn: Option<GlobalHook<RV>>,
    /// One entry per virtual user to spawn, naming the behaviour that user runs.
    pub assigned_behaviours: Vec<String>,
}

impl<RV: UserValuesConstraint, V: UserValuesConstraint> ScenarioDefinitionBuilder<RV, V> {
    /// Initialise a new scenario definition from the scenario name and already-parsed command
    /// line arguments.
    pub fn new(name: &str, cli: ScenarioCli) -> Self {
        Self {
            name: name.to_string(),
            cli,
            default_duration_s: None,
            setup_fn: None,
            setup_user_fn: None,
            user_behaviour: HashMap::new(),
            teardown_user_fn: None,
            teardown_fn: None,
        }
    }

    /// Initialise a new scenario definition, parsing the command line and setting up logging.
    pub fn new_with_init(name: &str) -> Self {
        Self::new(name, crate::init::init())
    }

    /// Duration to use when the CLI does not specify one. Without either, the scenario runs
    /// until it is stopped.
    pub fn with_default_duration_s(mut self, duration_s: u64) -> Self {
        self.default_duration_s = Some(duration_s);
        self
    }

    pub fn use_setup(mut self, setup_fn: GlobalHookMut<RV>) -> Self {
        self.setup_fn = Some(setup_fn);
        self
    }

    pub fn use_user_setup(mut self, setup_user_fn: UserHookMut<RV, V>) -> Self {
        self.setup_user_fn = Some(setup_user_fn);
        self
    }

    /// Set the behaviour that every user runs unless the CLI assigns named behaviours.
    pub fn use_user_behaviour(self, behaviour: UserHookMut<RV, V>) -> Self {
        self.use_named_user_behaviour("default", behaviour)
    }

    pub fn use_named_user_behaviour(mut self, name: &str, behaviour: UserHookMut<RV, V>) -> Self {
        let previous = self.user_behaviour.insert(name.to_string(), behaviour);

        if previous.is_some() {
            panic!("Behaviour [{}] is already defined", name);
        }

        self
    }

    pub fn use_user_teardown(mut self, teardown_user_fn: UserHookMut<RV, V>) -> Self {
        self.teardown_user_fn = Some(teardown_user_fn);
        self
    }

    pub fn use_teardown(mut self, teardown_fn: GlobalHook<RV>) -> Self {
        self.teardown_fn = Some(teardown_fn);
        self
    }

    pub(crate) fn build(self) -> anyhow::Result<ScenarioDefinition<RV, V>> {
        if self.cli.max_wait_ms < self.cli.min_wait_ms {
            anyhow::bail!(
                "Think-time bounds are inverted: min {}ms > max {}ms",
                self.cli.min_wait_ms,
                self.cli.max_wait_ms
            );
        }

        let duration_s = if self.cli.soak {
            None
        } else {
            self.cli.duration.or(self.default_duration_s)
        };

        let assigned_behaviours = self.resolve_behaviours()?;

        Ok(ScenarioDefinition {
            name: self.name,
            cli: self.cli,
            duration_s,
            setup_fn: self.setup_fn,
            setup_user_fn: self.setup_user_fn,
            user_behaviour: self.user_behaviour,
            teardown_user_fn: self.teardown_user_fn,
            teardown_fn: self.teardown_fn,
            assigned_behaviours,
        })
    }

    fn resolve_behaviours(&self) -> anyhow::Result<Vec<String>> {
        for (name, _) in &self.cli.behaviour {
            if !self.user_behaviour.contains_key(name) {
                anyhow::bail!("Behaviour [{}] is not defined by this scenario", name);
            }
        }

        let assigned_count: usize = self.cli.behaviour.iter().map(|(_, count)| count).sum();
        let total_users = self.cli.users.unwrap_or(std::cmp::max(1, assigned_count));

        if assigned_count > total_users {
            anyhow::bail!(
                "{} users are assigned behaviours but only {} users are configured",
                assigned_count,
                total_users
            );
        }

        let mut assigned = Vec::with_capacity(total_users);
        for (name, count) in &self.cli.behaviour {
            assigned.extend(std::iter::repeat(name.clone()).take(*count));
        }

        // Users without a CLI assignment run the default behaviour. A scenario that defines
        // no default simply idles those users after setup, which some setup-only tests rely on.
        while assigned.len() < total_users {
            assigned.push("default".to_string());
        }

        Ok(assigned)
    }
}
