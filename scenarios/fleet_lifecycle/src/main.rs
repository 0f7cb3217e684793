use agones_fleetload_runner::prelude::*;

fn setup(ctx: &mut RunnerContext<FleetRunnerContext>) -> HookResult {
    configure_client(ctx)?;
    Ok(())
}

fn user_behaviour(ctx: &mut UserContext<FleetRunnerContext, FleetUserContext>) -> HookResult {
    let client = scenario_client(ctx.runner_context())?;
    let reporter = ctx.runner_context().reporter();
    let cfg = LifecycleConfig::from_runner_context(ctx.runner_context());

    ctx.runner_context()
        .executor()
        .execute_in_place(async { run_fleet_lifecycle(&client, &reporter, &cfg).await })?;

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
