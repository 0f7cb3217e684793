use fleetload_runner::prelude::UserValuesConstraint;

/// Per-user values for fleet scenarios.
///
/// Scenario state lives in iteration locals; `SV` is available for scenarios that need to
/// carry values across iterations.
#[derive(Default, Debug)]
pub struct FleetUserContext<SV: UserValuesConstraint = ()> {
    pub scenario_values: SV,
}

impl<SV: UserValuesConstraint> UserValuesConstraint for FleetUserContext<SV> {}
