mod common;

use std::time::Duration;

use agones_fleetload_runner::prelude::*;
use common::{CannedResponse, StubApi};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const FLEET_PATH: &str =
    "/apis/agones.dev/v1/namespaces/default/fleets/fleet-simple-game-server-x1";

fn fleet_doc(version: &str, ready: Option<u32>) -> Value {
    let mut doc = json!({
        "apiVersion": "agones.dev/v1",
        "kind": "Fleet",
        "metadata": {
            "name": "fleet-simple-game-server-x1",
            "namespace": "default",
            "resourceVersion": version,
            "selfLink": FLEET_PATH,
        },
        "spec": { "replicas": 1 }
    });
    if let Some(ready) = ready {
        doc["status"] = json!({ "readyReplicas": ready, "replicas": ready });
    }
    doc
}

fn lifecycle_config() -> LifecycleConfig {
    LifecycleConfig {
        namespace: "default".to_string(),
        fleet_size: 3,
        deadline: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn lifecycle_emits_one_event_per_scaling_step() {
    let stub = StubApi::start(vec![
        // Create, then converge on one ready replica.
        CannedResponse::ok(fleet_doc("1", None)),
        CannedResponse::ok(fleet_doc("2", Some(1))),
        // Scale up: version read, update, converge.
        CannedResponse::ok(fleet_doc("2", Some(1))),
        CannedResponse::ok(fleet_doc("3", Some(1))),
        CannedResponse::ok(fleet_doc("4", Some(3))),
        // Scale down: version read, update, converge.
        CannedResponse::ok(fleet_doc("4", Some(3))),
        CannedResponse::ok(fleet_doc("5", Some(3))),
        CannedResponse::ok(fleet_doc("6", Some(0))),
        // Delete.
        CannedResponse::ok(json!({})),
    ]);

    let client = ResourceClient::new(stub.base_url()).unwrap();
    let (reporter, metrics) = common::recording_reporter();

    run_fleet_lifecycle(&client, &reporter, &lifecycle_config())
        .await
        .unwrap();

    assert_eq!(
        vec!["fleet_spawn_up", "fleet_scaling_up", "fleet_scaling_down"],
        common::event_names(&metrics)
    );

    // Deletion happens but is never reported as an event.
    assert_eq!(
        vec![
            "POST /apis/agones.dev/v1/namespaces/default/fleets".to_string(),
            format!("GET {FLEET_PATH}"),
            format!("GET {FLEET_PATH}"),
            format!("PUT {FLEET_PATH}"),
            format!("GET {FLEET_PATH}"),
            format!("GET {FLEET_PATH}"),
            format!("PUT {FLEET_PATH}"),
            format!("GET {FLEET_PATH}"),
            format!("DELETE {FLEET_PATH}"),
        ],
        stub.request_lines()
    );
}

#[tokio::test]
async fn scaling_updates_target_the_configured_size() {
    let stub = StubApi::start(vec![
        CannedResponse::ok(fleet_doc("1", None)),
        CannedResponse::ok(fleet_doc("2", Some(1))),
        CannedResponse::ok(fleet_doc("2", Some(1))),
        CannedResponse::ok(fleet_doc("3", Some(1))),
        CannedResponse::ok(fleet_doc("4", Some(3))),
        CannedResponse::ok(fleet_doc("4", Some(3))),
        CannedResponse::ok(fleet_doc("5", Some(3))),
        CannedResponse::ok(fleet_doc("6", Some(0))),
        CannedResponse::ok(json!({})),
    ]);

    let client = ResourceClient::new(stub.base_url()).unwrap();
    let (reporter, _metrics) = common::recording_reporter();

    run_fleet_lifecycle(&client, &reporter, &lifecycle_config())
        .await
        .unwrap();

    let requests = stub.requests();

    let scale_up: Value = serde_json::from_str(&requests[3].body).unwrap();
    assert_eq!(Some(3), scale_up["spec"]["replicas"].as_u64());
    assert_eq!(Some("2"), scale_up["metadata"]["resourceVersion"].as_str());

    let scale_down: Value = serde_json::from_str(&requests[6].body).unwrap();
    assert_eq!(Some(0), scale_down["spec"]["replicas"].as_u64());
    assert_eq!(Some("4"), scale_down["metadata"]["resourceVersion"].as_str());
}

#[tokio::test]
async fn timed_out_step_reports_a_timeout_event_and_the_iteration_continues() {
    let stub = StubApi::start(vec![
        // Create; the fleet never reports a status, so the spawn step times out.
        CannedResponse::ok(fleet_doc("1", None)),
        CannedResponse::ok(fleet_doc("1", None)),
        // The remaining steps still run and converge.
        CannedResponse::ok(fleet_doc("2", None)),
        CannedResponse::ok(fleet_doc("3", None)),
        CannedResponse::ok(fleet_doc("4", Some(3))),
        CannedResponse::ok(fleet_doc("4", Some(3))),
        CannedResponse::ok(fleet_doc("5", Some(3))),
        CannedResponse::ok(fleet_doc("6", Some(0))),
        CannedResponse::ok(json!({})),
    ]);

    let client = ResourceClient::new(stub.base_url()).unwrap();
    let (reporter, metrics) = common::recording_reporter();

    let cfg = LifecycleConfig {
        deadline: Duration::ZERO,
        ..lifecycle_config()
    };
    run_fleet_lifecycle(&client, &reporter, &cfg).await.unwrap();

    assert_eq!(
        vec![
            "fleet_spawn_up_timeout",
            "fleet_scaling_up",
            "fleet_scaling_down"
        ],
        common::event_names(&metrics)
    );
}
