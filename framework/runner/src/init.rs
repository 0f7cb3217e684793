use crate::cli::ScenarioCli;
use clap::Parser;

/// Initialise logging and parse the command line for a scenario.
pub(crate) fn init() -> ScenarioCli {
    env_logger::init();

    ScenarioCli::parse()
}
