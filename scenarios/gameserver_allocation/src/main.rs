use agones_fleetload_runner::prelude::*;
use anyhow::Context;
use std::time::Duration;

fn setup(ctx: &mut RunnerContext<FleetRunnerContext>) -> HookResult {
    // All users allocate out of one fleet, provisioned before any load starts.
    setup_shared_fleet(ctx)?;
    Ok(())
}

fn user_behaviour(ctx: &mut UserContext<FleetRunnerContext, FleetUserContext>) -> HookResult {
    let client = scenario_client(ctx.runner_context())?;
    let reporter = ctx.runner_context().reporter();
    let deadline = Duration::from_secs(ctx.runner_context().cli().deadline_seconds);
    let fleet = ctx
        .runner_context()
        .get()
        .shared_fleet
        .clone()
        .context("The shared fleet was not provisioned during setup")?;

    ctx.runner_context()
        .executor()
        .execute_in_place(async { run_allocation(&client, &reporter, &fleet, deadline).await })?;

    Ok(())
}

fn main() -> FleetloadResult<()> {
    let builder = ScenarioDefinitionBuilder::<FleetRunnerContext, FleetUserContext>::new_with_init(
        env!("CARGO_PKG_NAME"),
    )
    .use_setup(setup)
    .use_user_behaviour(user_behaviour);

    run(builder)?;

    Ok(())
}
