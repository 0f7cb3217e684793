mod common;

use std::time::Duration;

use agones_fleetload_runner::prelude::*;
use common::{CannedResponse, StubApi};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const FLEET_PATH: &str = "/apis/agones.dev/v1/namespaces/default/fleets/f1";

fn fleet_doc(version: &str, ready: Option<u32>) -> Value {
    let mut doc = json!({
        "apiVersion": "agones.dev/v1",
        "kind": "Fleet",
        "metadata": {
            "name": "f1",
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

#[tokio::test]
async fn stale_update_is_retried_once_with_a_fresh_version() {
    let stub = StubApi::start(vec![
        CannedResponse::ok(fleet_doc("1", None)),
        CannedResponse::conflict(),
        CannedResponse::ok(fleet_doc("2", None)),
        CannedResponse::ok(fleet_doc("3", None)),
    ]);

    let client = ResourceClient::new(stub.base_url()).unwrap();
    let fleet = ResourceRef::new(FLEET_PATH);

    let outcome = client
        .update_with_retry(&fleet, |version| {
            fleet_update_payload("default", "f1", version, 100)
        })
        .await
        .unwrap();

    assert!(matches!(outcome, UpdateOutcome::Applied(_)));

    let requests = stub.requests();
    assert_eq!(4, requests.len());
    assert!(requests[1].body.contains("\"resourceVersion\":\"1\""));
    assert!(requests[3].body.contains("\"resourceVersion\":\"2\""));
}

#[tokio::test]
async fn second_stale_rejection_is_reported_not_retried() {
    let stub = StubApi::start(vec![
        CannedResponse::ok(fleet_doc("1", None)),
        CannedResponse::conflict(),
        CannedResponse::ok(fleet_doc("2", None)),
        CannedResponse::conflict(),
    ]);

    let client = ResourceClient::new(stub.base_url()).unwrap();
    let fleet = ResourceRef::new(FLEET_PATH);

    let outcome = client
        .update_with_retry(&fleet, |version| {
            fleet_update_payload("default", "f1", version, 100)
        })
        .await
        .unwrap();

    assert!(matches!(outcome, UpdateOutcome::Stale));
    assert_eq!(4, stub.requests().len());
}

#[tokio::test]
async fn lifecycle_skips_a_doubly_stale_step_and_carries_on() {
    let stub = StubApi::start(vec![
        // Create and converge.
        CannedResponse::ok(fleet_doc("1", None)),
        CannedResponse::ok(fleet_doc("2", Some(1))),
        // Scale up is rejected as stale both times; the step is abandoned with no event.
        CannedResponse::ok(fleet_doc("2", Some(1))),
        CannedResponse::conflict(),
        CannedResponse::ok(fleet_doc("3", Some(1))),
        CannedResponse::conflict(),
        // Scale down still runs.
        CannedResponse::ok(fleet_doc("4", Some(1))),
        CannedResponse::ok(fleet_doc("5", Some(1))),
        CannedResponse::ok(fleet_doc("6", Some(0))),
        // Delete.
        CannedResponse::ok(json!({})),
    ]);

    let client = ResourceClient::new(stub.base_url()).unwrap();
    let (reporter, metrics) = common::recording_reporter();

    let cfg = LifecycleConfig {
        namespace: "default".to_string(),
        fleet_size: 100,
        deadline: Duration::from_secs(5),
    };
    run_fleet_lifecycle(&client, &reporter, &cfg).await.unwrap();

    assert_eq!(
        vec!["fleet_spawn_up", "fleet_scaling_down"],
        common::event_names(&metrics)
    );
    assert_eq!(10, stub.requests().len());
}
