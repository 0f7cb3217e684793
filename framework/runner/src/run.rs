use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fleetload_core::prelude::{ShutdownSignalError, UserBailError};
use fleetload_instruments::ReportConfig;
use rand::Rng;

use crate::cli::ReporterOpt;
use crate::context::{RunnerContext, UserContext, UserValuesConstraint};
use crate::definition::ScenarioDefinitionBuilder;
use crate::executor::Executor;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::shutdown::start_shutdown_listener;

/// Run a scenario to completion: setup, the virtual-user population, teardown, metrics flush.
pub fn run<RV: UserValuesConstraint, V: UserValuesConstraint>(
    definition: ScenarioDefinitionBuilder<RV, V>,
) -> anyhow::Result<()> {
    let definition = definition.build()?;

    log::info!("Running scenario: {}", definition.name);

    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    let shutdown_handle = start_shutdown_listener(&runtime);

    // The metrics connection is scoped to the run: opened here, before any load starts, and
    // released by the finalize call at the bottom.
    let report_config = match definition.cli.reporter {
        ReporterOpt::Graphite => ReportConfig::Graphite {
            host: definition.cli.metrics_host.clone(),
            port: definition.cli.metrics_port,
        },
        ReporterOpt::InMemory => ReportConfig::InMemory,
        ReporterOpt::Noop => ReportConfig::Noop,
    };
    let reporter = Arc::new(
        report_config
            .init(&runtime, shutdown_handle.new_listener())
            .context("Failed to initialise the metrics reporter")?,
    );

    let executor = Arc::new(Executor::new(runtime, shutdown_handle.clone()));

    let run_id = definition
        .cli
        .run_id
        .clone()
        .unwrap_or_else(|| nanoid::nanoid!(8));
    log::info!("Run id: {run_id}");

    let mut runner_context = RunnerContext::new(
        executor,
        reporter,
        shutdown_handle.clone(),
        definition.cli.clone(),
        run_id,
    );

    // Global setup runs exactly once, before any virtual user exists. Scenarios use this to
    // provision shared resources; no load starts until it has finished.
    if let Some(setup_fn) = &definition.setup_fn {
        if let Err(e) = setup_fn(&mut runner_context) {
            // The metrics connection is already open; release it before failing the run.
            shutdown_handle.shutdown();
            runner_context.reporter().finalize();
            return Err(e);
        }
    }

    if let Some(duration) = definition.duration_s {
        if !definition.cli.no_progress {
            start_progress(
                Duration::from_secs(duration),
                shutdown_handle.new_listener(),
            );
        }

        // Stop the run once the duration has elapsed.
        let timer_handle = shutdown_handle.clone();
        runner_context.executor().spawn(async move {
            tokio::time::sleep(Duration::from_secs(duration)).await;
            timer_handle.shutdown();
        });
    }

    let runner_context = Arc::new(runner_context);
    let runner_context_for_teardown = runner_context.clone();

    // Warn about a saturated generator before it skews the numbers.
    start_monitor(shutdown_handle.new_listener());

    let think_time = definition.cli.min_wait_ms..=definition.cli.max_wait_ms;

    let mut handles = Vec::new();
    for (user_index, behaviour_name) in definition.assigned_behaviours.iter().enumerate() {
        let runner_context = runner_context.clone();

        let setup_user_fn = definition.setup_user_fn;
        let behaviour_fn = definition.user_behaviour.get(behaviour_name).copied();
        let teardown_user_fn = definition.teardown_user_fn;

        // One listener to check between iterations, one for the behaviour implementation.
        let mut cycle_shutdown_listener = shutdown_handle.new_listener();
        let delegated_shutdown_listener = shutdown_handle.new_listener();
        let think_time = think_time.clone();

        let user_id = format!("user-{}", user_index);

        handles.push(
            std::thread::Builder::new()
                .name(user_id.clone())
                .spawn(move || {
                    let mut context = UserContext::new(
                        user_id.clone(),
                        runner_context,
                        delegated_shutdown_listener,
                    );

                    if let Some(setup_user_fn) = setup_user_fn {
                        if let Err(e) = setup_user_fn(&mut context) {
                            log::error!("User setup failed for {}: {:?}", user_id, e);
                            return;
                        }
                    }

                    if let Some(behaviour) = behaviour_fn {
                        loop {
                            if cycle_shutdown_listener.should_shutdown() {
                                log::debug!("Stopping user {}", user_id);
                                break;
                            }

                            match behaviour(&mut context) {
                                Ok(()) => {}
                                Err(e) if e.is::<ShutdownSignalError>() => {
                                    // Expected while shutting down; the check at the top of
                                    // the loop will break out.
                                }
                                Err(e) if e.is::<UserBailError>() => {
                                    log::warn!("User {} is bailing out", user_id);
                                    break;
                                }
                                Err(e) => {
                                    // Contained at the iteration boundary: log it and let the
                                    // user start its next iteration fresh.
                                    log::error!("User behaviour failed for {}: {:?}", user_id, e);
                                }
                            }

                            // Think-time between iterations.
                            let pause = rand::thread_rng().gen_range(think_time.clone());
                            std::thread::sleep(Duration::from_millis(pause));
                        }
                    }

                    if let Some(teardown_user_fn) = teardown_user_fn {
                        if let Err(e) = teardown_user_fn(&mut context) {
                            log::error!("User teardown failed for {}: {:?}", user_id, e);
                        }
                    }
                })
                .expect("Failed to spawn thread for virtual user"),
        );
    }

    for handle in handles {
        handle
            .join()
            .map_err(|e| anyhow::anyhow!("Error joining thread for virtual user: {:?}", e))?;
    }

    if let Some(teardown_fn) = definition.teardown_fn {
        // Best effort: reporting and shutdown still happen cleanly if the teardown fails.
        if let Err(e) = teardown_fn(runner_context_for_teardown.clone()) {
            log::error!("Teardown failed: {:?}", e);
        }
    }

    // All users have stopped. Make sure the signal has fired so the metrics writer drains,
    // then block until the flush completes and the connection is closed.
    shutdown_handle.shutdown();
    runner_context_for_teardown.reporter().finalize();

    Ok(())
}
