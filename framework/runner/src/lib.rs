mod cli;
mod context;
mod definition;
mod executor;
mod init;
mod monitor;
mod progress;
mod run;
mod shutdown;
mod types;

pub mod prelude {
    pub use crate::cli::{ReporterOpt, ScenarioCli};
    pub use crate::context::{RunnerContext, UserContext, UserValuesConstraint};
    pub use crate::definition::{HookResult, ScenarioDefinitionBuilder};
    pub use crate::executor::Executor;
    pub use crate::run::run;
    pub use crate::types::FleetloadResult;

    pub use fleetload_core::prelude::*;
    pub use fleetload_instruments::report::ReportMetric;
    pub use fleetload_instruments::{ReportConfig, Reporter};
}
