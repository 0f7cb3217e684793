use std::time::{Duration, Instant};

use agones_client::prelude::*;
use anyhow::Context;
use fleetload_instruments::report::ReportMetric;
use fleetload_instruments::Reporter;
use fleetload_runner::prelude::{HookResult, RunnerContext};
use serde_json::{json, Value};

use crate::runner_context::{FleetRunnerContext, SharedFleet};

/// Collection path for fleets in a namespace.
pub fn fleets_path(namespace: &str) -> String {
    format!("/apis/agones.dev/v1/namespaces/{namespace}/fleets")
}

/// Collection path for game server allocations in a namespace.
pub fn allocations_path(namespace: &str) -> String {
    format!("/apis/allocation.agones.dev/v1/namespaces/{namespace}/gameserverallocations")
}

/// How a fleet being created gets its name.
pub enum FleetName<'a> {
    /// Let the server generate a unique name from this prefix.
    Generated(&'a str),
    /// Use exactly this name.
    Fixed(&'a str),
}

fn game_server_template() -> Value {
    json!({
        "spec": {
            "ports": [
                {
                    "name": "default",
                    "portPolicy": "Dynamic",
                    "containerPort": 26000
                }
            ],
            "template": {
                "spec": {
                    "containers": [
                        {
                            "name": "simple-game-server",
                            "image": "gcr.io/agones-images/simple-game-server:0.3",
                            "resources": {
                                "requests": { "cpu": "20m", "memory": "64Mi" },
                                "limits": { "cpu": "20m", "memory": "64Mi" }
                            }
                        }
                    ]
                }
            }
        }
    })
}

pub fn fleet_create_payload(namespace: &str, name: FleetName<'_>, replicas: u32) -> Value {
    let metadata = match name {
        FleetName::Generated(prefix) => json!({
            "generateName": prefix,
            "namespace": namespace,
        }),
        FleetName::Fixed(name) => json!({
            "name": name,
            "namespace": namespace,
        }),
    };

    json!({
        "apiVersion": "agones.dev/v1",
        "kind": "Fleet",
        "metadata": metadata,
        "spec": {
            "replicas": replicas,
            "scheduling": "Packed",
            "strategy": { "type": "RollingUpdate" },
            "template": game_server_template(),
        }
    })
}

/// Full replacement payload for scaling an existing fleet. The `resourceVersion` must come
/// from a read done just before the update.
pub fn fleet_update_payload(
    namespace: &str,
    name: &str,
    version: &ResourceVersion,
    replicas: u32,
) -> Value {
    json!({
        "apiVersion": "agones.dev/v1",
        "kind": "Fleet",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "resourceVersion": version.as_str(),
        },
        "spec": {
            "replicas": replicas,
            "scheduling": "Packed",
            "strategy": { "type": "RollingUpdate" },
            "template": game_server_template(),
        }
    })
}

pub fn allocation_payload(namespace: &str, fleet_name: &str) -> Value {
    json!({
        "apiVersion": "allocation.agones.dev/v1",
        "kind": "GameServerAllocation",
        "metadata": {
            "generateName": "gs-allocation-",
            "namespace": namespace,
        },
        "spec": {
            "required": {
                "matchLabels": {
                    "agones.dev/fleet": fleet_name,
                }
            }
        }
    })
}

/// Settings for one fleet lifecycle iteration.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub namespace: String,
    pub fleet_size: u32,
    pub deadline: Duration,
}

impl LifecycleConfig {
    pub fn from_runner_context(ctx: &RunnerContext<FleetRunnerContext>) -> Self {
        Self {
            namespace: ctx.cli().namespace.clone(),
            fleet_size: ctx.cli().fleet_size,
            deadline: Duration::from_secs(ctx.cli().deadline_seconds),
        }
    }
}

/// Build the API client from the connection string and store it on the runner context.
///
/// Call this from a setup hook, before any user thread needs the client.
pub fn configure_client(ctx: &mut RunnerContext<FleetRunnerContext>) -> HookResult {
    let connection_string = ctx
        .get_connection_string()
        .context("A connection string is required, pass `--connection-string`")?
        .to_string();

    ctx.get_mut().client = Some(ResourceClient::new(&connection_string)?);

    Ok(())
}

/// Fetch the client configured by [configure_client].
pub fn scenario_client(ctx: &RunnerContext<FleetRunnerContext>) -> anyhow::Result<ResourceClient> {
    ctx.get()
        .client
        .clone()
        .context("No API client available, run `configure_client` during setup")
}

/// Create the fleet that allocation users share and wait for it to be fully scaled, then
/// store it on the runner context.
///
/// Load must not start against a half-ready fleet, so a convergence timeout here fails the
/// whole run rather than being reported as a metric.
pub fn setup_shared_fleet(ctx: &mut RunnerContext<FleetRunnerContext>) -> HookResult {
    configure_client(ctx)?;

    let client = scenario_client(ctx)?;
    let namespace = ctx.cli().namespace.clone();
    let size = ctx.cli().fleet_size;
    let deadline = Duration::from_secs(ctx.cli().deadline_seconds);
    let name = format!("scale-test-fleet-{}", ctx.get_run_id());

    let shared_fleet = ctx.executor().execute_in_place(async {
        provision_shared_fleet(&client, &namespace, &name, size, deadline).await
    })?;

    ctx.get_mut().shared_fleet = Some(shared_fleet);

    Ok(())
}

async fn provision_shared_fleet(
    client: &ResourceClient,
    namespace: &str,
    name: &str,
    size: u32,
    deadline: Duration,
) -> anyhow::Result<SharedFleet> {
    log::info!("Creating shared fleet {name} with {size} replicas");

    let created = client
        .create(
            &fleets_path(namespace),
            &fleet_create_payload(namespace, FleetName::Fixed(name), size),
        )
        .await?;
    let reference = created.self_link()?;

    match await_ready_replicas(client, &reference, size, deadline).await? {
        PollOutcome::Converged(elapsed) => {
            log::info!(
                "Shared fleet {name} reached {size} ready replicas after {}ms",
                elapsed.as_millis()
            );
            Ok(SharedFleet {
                name: name.to_string(),
                reference,
            })
        }
        PollOutcome::TimedOut(_) => anyhow::bail!(
            "Shared fleet {name} did not reach {size} ready replicas before the deadline"
        ),
    }
}

/// Poll a fleet until its ready-replica count matches `target` or the deadline elapses.
pub async fn await_ready_replicas(
    client: &ResourceClient,
    fleet: &ResourceRef,
    target: u32,
    deadline: Duration,
) -> Result<PollOutcome, ClientError> {
    await_condition(
        || async move { client.read(fleet).await?.status() },
        |status| status.ready_replicas == Some(target),
        deadline,
    )
    .await
}

/// One full fleet lifecycle: create a fleet of one, scale it up to the configured size, scale
/// it back to zero, then delete it.
///
/// Each completed step emits its latency under the step's event name. A step that does not
/// converge before the deadline emits `<event>_timeout` instead and the iteration moves on to
/// the next step, so a stuck backend still produces a signal rather than a wedged user.
pub async fn run_fleet_lifecycle(
    client: &ResourceClient,
    reporter: &Reporter,
    cfg: &LifecycleConfig,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let created = client
        .create(
            &fleets_path(&cfg.namespace),
            &fleet_create_payload(
                &cfg.namespace,
                FleetName::Generated("fleet-simple-game-server-"),
                1,
            ),
        )
        .await?;
    let fleet = created.self_link()?;
    let name = created.name()?.to_string();

    let outcome = await_ready_replicas(client, &fleet, 1, cfg.deadline).await?;
    report_scaling_step(reporter, "fleet_spawn_up", started, outcome);

    scale_fleet(client, reporter, cfg, &fleet, &name, cfg.fleet_size, "fleet_scaling_up").await?;
    scale_fleet(client, reporter, cfg, &fleet, &name, 0, "fleet_scaling_down").await?;

    // The fleet's identity is abandoned either way, so a failed delete only gets logged.
    if let Err(e) = client.delete(&fleet).await {
        log::debug!("Best-effort delete of fleet {name} failed: {e}");
    }

    Ok(())
}

async fn scale_fleet(
    client: &ResourceClient,
    reporter: &Reporter,
    cfg: &LifecycleConfig,
    fleet: &ResourceRef,
    name: &str,
    replicas: u32,
    event: &str,
) -> anyhow::Result<()> {
    let started = Instant::now();
    let outcome = client
        .update_with_retry(fleet, |version| {
            fleet_update_payload(&cfg.namespace, name, version, replicas)
        })
        .await?;

    match outcome {
        UpdateOutcome::Stale => {
            // Already retried once with a fresh version. Abandon the step and let the
            // iteration continue with the next one.
            log::warn!("Fleet {name}: update to {replicas} replicas was stale twice, skipping {event}");
        }
        UpdateOutcome::Applied(_) => {
            let outcome = await_ready_replicas(client, fleet, replicas, cfg.deadline).await?;
            report_scaling_step(reporter, event, started, outcome);
        }
    }

    Ok(())
}

fn report_scaling_step(reporter: &Reporter, event: &str, started: Instant, outcome: PollOutcome) {
    match outcome {
        PollOutcome::Converged(_) => {
            emit(reporter, event, elapsed_ms(started));
        }
        PollOutcome::TimedOut(_) => {
            log::warn!("{event}: fleet did not reach the target replica count before the deadline");
            emit(reporter, &format!("{event}_timeout"), elapsed_ms(started));
        }
    }
}

/// One allocation iteration against the shared fleet: sample the fleet's ready-replica count,
/// request an allocation, then follow the allocation to a terminal state.
///
/// The creation response may already carry the outcome; it is inspected before any follow-up
/// read so the common case costs a single request.
pub async fn run_allocation(
    client: &ResourceClient,
    reporter: &Reporter,
    fleet: &SharedFleet,
    deadline: Duration,
) -> anyhow::Result<()> {
    // Point-in-time gauge of how many replicas are left to claim.
    let ready_replicas = client
        .read(&fleet.reference)
        .await?
        .status()?
        .and_then(|status| status.ready_replicas)
        .with_context(|| format!("Shared fleet {} reports no readyReplicas", fleet.name))?;
    emit(reporter, "ReadyReplicas", ready_replicas as u64);

    let namespace = allocation_namespace(&fleet.reference)?;

    let started = Instant::now();
    let mut doc = client
        .create(
            &allocations_path(&namespace),
            &allocation_payload(&namespace, &fleet.name),
        )
        .await?;

    loop {
        match doc.status()?.and_then(|status| status.state) {
            Some(AllocationState::Allocated) => {
                emit(reporter, "GameServerAllocated", elapsed_ms(started));
                break;
            }
            Some(AllocationState::UnAllocated) => {
                emit(reporter, "GameServerUnAllocated", elapsed_ms(started));
                break;
            }
            Some(AllocationState::Pending) | None => {
                if started.elapsed() > deadline {
                    log::warn!(
                        "Allocation against fleet {} did not settle before the deadline",
                        fleet.name
                    );
                    emit(reporter, "GameServerAllocationTimeout", elapsed_ms(started));
                    break;
                }

                let reference = doc.self_link()?;
                tokio::time::sleep(POLL_INTERVAL).await;
                doc = client.read(&reference).await?;
            }
        }
    }

    Ok(())
}

/// Allocations live in the same namespace as the fleet they claim from. Recover it from the
/// fleet's locator rather than carrying it separately.
fn allocation_namespace(fleet: &ResourceRef) -> anyhow::Result<String> {
    let path = fleet.as_str();
    let mut segments = path.split('/');
    while let Some(segment) = segments.next() {
        if segment == "namespaces" {
            if let Some(namespace) = segments.next() {
                return Ok(namespace.to_string());
            }
        }
    }

    anyhow::bail!("Fleet locator {path} carries no namespace")
}

fn emit(reporter: &Reporter, name: &str, value: u64) {
    reporter.add_metric(ReportMetric::new(name).with_value(value));
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
