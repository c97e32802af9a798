use broker_core::{Resource, ResourceDefinition, ResourceManager};
use resource_broker::client::{BrokerApi, ClientError, LocalBroker};
use resource_broker::protocol::{Answer, Command};
use serde_json::json;
use std::time::Duration;

fn broker() -> LocalBroker {
    let mut parameters = serde_json::Map::new();
    parameters.insert("host".into(), json!("b1.example.com"));

    let build1 = Resource::from_definition(
        ResourceDefinition::new("Build1", 2)
            .with_keywords(["build"])
            .with_parameters(parameters),
    )
    .unwrap();
    let build2 = Resource::from_definition(ResourceDefinition::new("Build2", 1).with_keywords(["build"])).unwrap();
    let device = Resource::new("Device", 1).unwrap();

    LocalBroker::new(ResourceManager::new([build1, build2, device]))
}

/// Full command-layer walk-through with an in-process broker.
#[tokio::test]
async fn test_lease_cycle_through_command_layer() {
    let broker = broker();

    let granted = broker.acquire("alice", "build", false).await.expect("acquire failed");
    assert_eq!(granted, "Build1");

    let status = broker.status_list().await.expect("status failed");
    let names: Vec<_> = status.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["Build1", "Build2", "Device"]);
    assert_eq!(status[0].free, 1);
    assert_eq!(status[0].users, ["alice"]);
    assert!(status.iter().all(|s| s.parameters.is_none()));

    let details = broker.resource_details("Build1").await.expect("details failed");
    assert_eq!(details.keywords, ["build1", "build"]);
    assert_eq!(details.parameters.unwrap()["host"], json!("b1.example.com"));

    let released = broker.release("alice", "Build1", false).await.expect("release failed");
    assert_eq!(released, "Build1");
    assert_eq!(broker.manager().resource("Build1").unwrap().current_count(), 2);
}

/// Two resources share a keyword; when the first is exhausted the second is granted.
#[tokio::test]
async fn test_keyword_falls_through_to_free_resource() {
    let broker = broker();

    assert_eq!(broker.acquire("a", "build", false).await.unwrap(), "Build1");
    assert_eq!(broker.acquire("b", "build", false).await.unwrap(), "Build1");
    assert_eq!(broker.acquire("c", "build", false).await.unwrap(), "Build2");

    let waiting = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.acquire("d", "build", false).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiting.is_finished());

    broker.release("c", "Build2", false).await.unwrap();
    let granted = tokio::time::timeout(Duration::from_secs(5), waiting)
        .await
        .expect("waiter was not woken")
        .unwrap()
        .unwrap();
    assert_eq!(granted, "Build2");
}

#[tokio::test]
async fn test_errors_are_reported_as_remote_errors() {
    let broker = broker();

    let err = broker.acquire("alice", "nothing", false).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Remote(ref msg) if msg == "No resource with the given tag (nothing) could be acquired."
    ));

    let err = broker.resource_details("Missing").await.unwrap_err();
    assert_eq!(err.to_string(), "The resource does not exist: Missing");

    let err = broker.release("alice", "Missing", false).await.unwrap_err();
    assert_eq!(err.to_string(), "The resource does not exist: Missing");

    broker.acquire("alice", "device", false).await.unwrap();
    let err = broker.release("alice", "Device", true).await.unwrap_err();
    assert_eq!(err.to_string(), "The resource Device is not locked exclusively");
    let err = broker.release("bob", "Device", false).await.unwrap_err();
    assert_eq!(err.to_string(), "The resource Device is not held by user bob");
    assert_eq!(broker.manager().resource("Device").unwrap().users(), ["alice"]);
}

#[tokio::test]
async fn test_exclusive_lease_blocks_shared_requests() {
    let broker = broker();

    assert_eq!(broker.acquire("admin", "build1", true).await.unwrap(), "Build1");
    let resource = broker.manager().resource("Build1").unwrap();
    assert!(resource.is_exclusive());
    assert_eq!(resource.current_count(), 0);

    // Build2 is still free, so a shared "build" request skips the locked resource.
    assert_eq!(broker.acquire("alice", "build", false).await.unwrap(), "Build2");

    broker.release("admin", "Build1", true).await.unwrap();
    let resource = broker.manager().resource("Build1").unwrap();
    assert!(!resource.is_exclusive());
    assert_eq!(resource.users(), ["admin"]);
    assert_eq!(resource.current_count(), 1);
}

#[tokio::test]
async fn test_shutdown_wakes_blocked_acquire() {
    let broker = broker();
    broker.acquire("alice", "device", false).await.unwrap();

    let waiting = {
        let broker = broker.clone();
        tokio::spawn(async move { broker.acquire("bob", "device", false).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    broker.shutdown().await.expect("shutdown failed");
    assert!(broker.is_stopped());

    let result = tokio::time::timeout(Duration::from_secs(5), waiting)
        .await
        .expect("blocked acquire did not return")
        .unwrap();
    assert!(matches!(result, Err(ClientError::Remote(_))));

    assert!(broker.acquire("carol", "build", false).await.is_err());
}

#[tokio::test]
async fn test_raw_answers() {
    let broker = broker();
    let answer = broker
        .call(Command::ResourceDetails { name: "Device".into() })
        .await
        .unwrap();
    assert!(answer.is_ok());
    assert_eq!(
        serde_json::to_value(&answer).unwrap(),
        json!({
            "status": "ok",
            "resource": {
                "name": "Device",
                "keywords": ["device"],
                "slots": 1,
                "free": 1,
                "users": [],
                "parameters": {}
            }
        })
    );

    let answer = broker.call(Command::Shutdown).await.unwrap();
    assert_eq!(answer, Answer::ok());
}
