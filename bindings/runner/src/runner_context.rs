use agones_client::prelude::{ResourceClient, ResourceRef};
use fleetload_runner::prelude::UserValuesConstraint;

/// Scenario-global values, populated during the setup hook and read-only afterwards.
#[derive(Default, Debug)]
pub struct FleetRunnerContext {
    pub client: Option<ResourceClient>,
    pub shared_fleet: Option<SharedFleet>,
}

impl UserValuesConstraint for FleetRunnerContext {}

/// The fleet provisioned once before allocation load starts, claimed against by every user.
#[derive(Debug, Clone)]
pub struct SharedFleet {
    pub name: String,
    pub reference: ResourceRef,
}
