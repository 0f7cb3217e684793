mod common;
mod context;
mod runner_context;

pub mod prelude {
    /// Common operations for fleet scenarios.
    ///
    /// This is a good place to start if you are getting started writing scenarios.
    pub use crate::common::*;

    pub use crate::context::FleetUserContext;
    pub use crate::runner_context::{FleetRunnerContext, SharedFleet};

    /// Re-export of the `fleetload_runner` prelude.
    ///
    /// This is for convenience so that scenarios can depend on a single crate for the runner.
    pub use fleetload_runner::prelude::*;

    /// Re-export of the API client for convenience.
    pub use agones_client::prelude::*;
}
