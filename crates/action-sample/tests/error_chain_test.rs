use action_framework::{Config, ErrorKind};
use action_sample::lifecycle::ChainSystem;
use action_sample::scenario::Scenario;
use serde_json::json;
use std::time::{Duration, Instant};

fn config() -> Config {
    Config::default().with_timeout(Duration::from_millis(200)).undead()
}

async fn start(scenario: Scenario) -> ChainSystem {
    ChainSystem::start(scenario, config()).await.unwrap()
}

/// Hooks run after the caller's callback; give them a moment to land.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn error_propagates_to_first_caller() {
    let system = start(Scenario::ForwardedError).await;

    let err = system.run().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Handler);
    assert_eq!(err.message, "test");
    assert_eq!(err.chain_labels(), vec!["C", "B", "A"]);

    settle().await;
    assert_eq!(system.log.links(), vec!["cmd:B", "cmd:A"]);
    assert_eq!(system.log.hooks("server"), vec!["cmd:A", "cmd:B", "cmd:C"]);
    assert_eq!(system.log.hooks("client"), vec!["cmd:A"]);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_handler_fails_fast_instead_of_timing_out() {
    let system = start(Scenario::MissingHandler).await;

    let started = Instant::now();
    let err = system.run().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.chain_labels(), vec!["C", "B", "A"]);
    assert!(started.elapsed() < Duration::from_millis(200));

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn timeout_propagates_to_first_caller() {
    let system = start(Scenario::SilentHandler).await;

    let started = Instant::now();
    let err = system.run().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert!(err.message.starts_with("cmd:C"), "{}", err.message);
    assert_eq!(err.chain_labels(), vec!["C", "B", "A"]);
    // Raised on the server inside the client's 200ms window.
    assert!(started.elapsed() < Duration::from_millis(200));

    settle().await;
    assert_eq!(system.log.links(), vec!["cmd:B", "cmd:A"]);
    assert_eq!(system.log.hooks("client"), vec!["cmd:A"]);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn error_is_visible_to_previous_caller_and_extinguished_above() {
    let system = start(Scenario::ObservedAtIntermediate).await;

    let result = system.run().await.unwrap();
    assert_eq!(result, json!({ "chain": "A->B->error" }));

    settle().await;
    let observations = system.log.all();
    let at_b = observations
        .iter()
        .find(|o| o.site == action_sample::observe::Site::Link { pattern: "cmd:B".into() })
        .expect("B saw the failure");
    assert_eq!(at_b.message, "test");
    assert_eq!(at_b.chain, vec!["C"]);

    assert_eq!(system.log.hooks("server"), vec!["cmd:B", "cmd:C"]);
    assert!(system.log.hooks("client").is_empty());

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn error_carried_in_result_is_not_an_error() {
    let system = start(Scenario::ErrorInResult).await;

    let result = system.run().await.unwrap();
    assert_eq!(result, json!({ "chain": "A->B->C->error" }));

    settle().await;
    assert!(system.log.all().is_empty());

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn scenarios_match_their_expectations() {
    for scenario in Scenario::ALL {
        let system = start(scenario).await;
        let completion = system.run().await;
        assert_eq!(completion.is_err(), scenario.expects_error(), "{scenario}");
        system.shutdown().await.unwrap();
    }
}
