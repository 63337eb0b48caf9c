//! Integration tests for the async resource manager
//!
//! Uses scripted sources with a paused tokio clock so completion order is
//! fully controlled by the scripted latencies.

use cadence_harness::{MockSource, MockTransport, Scripted};
use cadence_runtime::{
    AsyncResource, CadenceError, Epoch, FetchConfig, FetchError, FetchErrorKind, FetchState,
    JsonSource, RawResponse, RequestDescriptor, RetainPolicy,
};
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tokio_test::{assert_err, assert_ok};

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

type Source = MockSource<&'static str, String>;

fn resource(source: &Arc<Source>, config: FetchConfig) -> AsyncResource<&'static str, Source> {
    AsyncResource::new(Arc::clone(source), config).expect("test runs inside a runtime")
}

fn gate_only() -> FetchConfig {
    FetchConfig {
        abort_superseded: false,
        ..FetchConfig::default()
    }
}

// ----------------------------------------------------------------------------
// Lifecycle
// ----------------------------------------------------------------------------

#[test]
fn test_requires_runtime() {
    let source = Arc::new(Source::new());
    let result = AsyncResource::<&'static str, Source>::new(source, FetchConfig::default());
    assert!(matches!(result, Err(CadenceError::RuntimeUnavailable { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_idle_until_first_descriptor() {
    let source = Arc::new(Source::new());
    let resource = resource(&source, FetchConfig::default());

    let snapshot = resource.snapshot();
    assert_eq!(snapshot.state, FetchState::Idle);
    assert_eq!(snapshot.epoch, Epoch::INITIAL);
    assert!(matches!(resource.refetch(), Err(CadenceError::NoDescriptor)));
}

#[tokio::test(start_paused = true)]
async fn test_loading_then_success() {
    let source = Arc::new(Source::new().respond("a", Scripted::ok("data-a".to_string(), 100)));
    let resource = resource(&source, FetchConfig::default());

    let snapshot = resource.observe("a");
    assert!(snapshot.is_loading());
    assert!(snapshot.error().is_none());
    assert_eq!(snapshot.epoch, Epoch::new(1));

    let settled = resource.settled().await;
    assert_eq!(settled.data().map(String::as_str), Some("data-a"));
    assert!(!settled.is_loading());

    // Same descriptor on a later tick is not a trigger.
    let again = resource.observe("a");
    assert_eq!(again.epoch, Epoch::new(1));
    assert_eq!(source.started(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_epoch_monotonicity() {
    let source = Arc::new(
        Source::new()
            .respond("a", Scripted::ok("data-a".to_string(), 300))
            .respond("b", Scripted::ok("data-b".to_string(), 50)),
    );
    let resource = resource(&source, gate_only());

    resource.observe("a");
    sleep(Duration::from_millis(10)).await;
    resource.observe("b");

    let settled = resource.settled().await;
    assert_eq!(settled.data().map(String::as_str), Some("data-b"));
    assert_eq!(settled.epoch, Epoch::new(2));

    // The slow request for "a" completes later and must not land.
    sleep(Duration::from_millis(400)).await;
    assert_eq!(source.completed(), 2);
    let snapshot = resource.snapshot();
    assert_eq!(snapshot.data().map(String::as_str), Some("data-b"));
    assert_eq!(snapshot.epoch, Epoch::new(2));
}

#[tokio::test(start_paused = true)]
async fn test_superseded_task_is_aborted() {
    let source = Arc::new(
        Source::new()
            .respond("a", Scripted::ok("data-a".to_string(), 300))
            .respond("b", Scripted::ok("data-b".to_string(), 50)),
    );
    let resource = resource(&source, FetchConfig::default());

    resource.observe("a");
    sleep(Duration::from_millis(10)).await;
    resource.observe("b");
    sleep(Duration::from_millis(400)).await;

    assert_eq!(source.started(), 2);
    assert_eq!(source.completed(), 1);
    assert_eq!(
        resource.snapshot().data().map(String::as_str),
        Some("data-b")
    );
}

#[tokio::test(start_paused = true)]
async fn test_refetch_restarts_loading() {
    let source = Arc::new(
        Source::new()
            .respond("a", Scripted::ok("v1".to_string(), 20))
            .respond("a", Scripted::ok("v2".to_string(), 20)),
    );
    let resource = resource(&source, FetchConfig::default());

    resource.observe("a");
    assert_eq!(resource.settled().await.state, FetchState::Succeeded("v1".to_string()));

    let epoch = assert_ok!(resource.refetch());
    assert_eq!(epoch, Epoch::new(2));
    let snapshot = resource.snapshot();
    assert!(snapshot.is_loading());
    assert!(snapshot.data().is_none());

    assert_eq!(resource.settled().await.state, FetchState::Succeeded("v2".to_string()));
    assert_eq!(source.calls(), vec!["a", "a"]);
}

#[tokio::test(start_paused = true)]
async fn test_refetch_while_in_flight_keeps_latest() {
    let source = Arc::new(
        Source::new()
            .respond("a", Scripted::ok("v1".to_string(), 300))
            .respond("a", Scripted::ok("v2".to_string(), 20)),
    );
    let resource = resource(&source, gate_only());

    resource.observe("a");
    sleep(Duration::from_millis(10)).await;
    assert_eq!(assert_ok!(resource.refetch()), Epoch::new(2));
    assert_eq!(resource.settled().await.state, FetchState::Succeeded("v2".to_string()));

    // The first request still completes but lands on a stale epoch.
    sleep(Duration::from_millis(400)).await;
    assert_eq!(source.completed(), 2);
    let snapshot = resource.snapshot();
    assert_eq!(snapshot.state, FetchState::Succeeded("v2".to_string()));
    assert_eq!(snapshot.epoch, Epoch::new(2));
}

#[tokio::test(start_paused = true)]
async fn test_failure_then_recovery() {
    let source = Arc::new(
        Source::new()
            .respond("a", Scripted::err(FetchError::unsuccessful(503, "unavailable"), 10))
            .respond("a", Scripted::ok("recovered".to_string(), 10)),
    );
    let resource = resource(&source, FetchConfig::default());

    resource.observe("a");
    let failed = resource.settled().await;
    assert_eq!(failed.error().map(FetchError::kind), Some(FetchErrorKind::Unsuccessful));
    assert!(failed.data().is_none());

    resource.refetch().unwrap();
    let recovering = resource.snapshot();
    assert!(recovering.error().is_none());

    let recovered = resource.settled().await;
    assert_eq!(recovered.data().map(String::as_str), Some("recovered"));
}

#[tokio::test(start_paused = true)]
async fn test_keep_previous_data_while_reloading() {
    let source = Arc::new(
        Source::new()
            .respond("a", Scripted::ok("data-a".to_string(), 10))
            .respond("b", Scripted::ok("data-b".to_string(), 10)),
    );
    let config = FetchConfig::stale_while_revalidate();
    assert_eq!(config.retain, RetainPolicy::KeepPrevious);
    let resource = resource(&source, config);

    resource.observe("a");
    resource.settled().await;

    let reloading = resource.observe("b");
    assert!(reloading.is_loading());
    assert_eq!(reloading.data().map(String::as_str), Some("data-a"));

    let settled = resource.settled().await;
    assert_eq!(settled.data().map(String::as_str), Some("data-b"));
}

#[tokio::test(start_paused = true)]
async fn test_subscriber_sees_transitions() {
    let source = Arc::new(Source::new().respond("a", Scripted::ok("data-a".to_string(), 10)));
    let resource = resource(&source, FetchConfig::default());
    let mut snapshots = resource.subscribe();

    resource.observe("a");
    assert!(snapshots.borrow_and_update().is_loading());

    snapshots.changed().await.unwrap();
    let settled = snapshots.borrow_and_update().clone();
    assert_eq!(settled.state, FetchState::Succeeded("data-a".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_independent_resources_settle_concurrently() {
    let mut source = Source::new();
    let names = ["a", "b", "c", "d", "e"];
    for (index, name) in names.into_iter().enumerate() {
        let latency = 10 * index as u64 + 10;
        source = source.respond(name, Scripted::ok(name.to_uppercase(), latency));
    }
    let source = Arc::new(source);

    let resources: Vec<_> = names
        .into_iter()
        .map(|name| {
            let resource = resource(&source, FetchConfig::default());
            resource.observe(name);
            resource
        })
        .collect();

    let settled = join_all(resources.iter().map(|resource| resource.settled())).await;
    let data: Vec<_> = settled
        .iter()
        .filter_map(|snapshot| snapshot.data().cloned())
        .collect();
    assert_eq!(data, vec!["A", "B", "C", "D", "E"]);
    assert_eq!(source.completed(), 5);
}

// ----------------------------------------------------------------------------
// Teardown
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_detach_ignores_settlement() {
    let source = Arc::new(Source::new().respond("a", Scripted::ok("data-a".to_string(), 100)));
    let resource = resource(&source, gate_only());

    resource.observe("a");
    resource.detach();
    assert!(resource.settled().await.detached);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(source.completed(), 1);
    let snapshot = resource.snapshot();
    assert!(snapshot.detached);
    assert!(snapshot.data().is_none());

    let error = assert_err!(resource.refetch());
    assert!(matches!(error, CadenceError::Detached));
    assert_eq!(resource.observe("b").epoch, Epoch::new(1));
    assert_eq!(source.started(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_aborts_in_flight() {
    let source = Arc::new(Source::new().respond("a", Scripted::ok("data-a".to_string(), 100)));
    let resource = resource(&source, FetchConfig::default());

    resource.observe("a");
    tokio::task::yield_now().await;
    drop(resource);

    sleep(Duration::from_millis(200)).await;
    assert_eq!(source.started(), 1);
    assert_eq!(source.completed(), 0);
}

// ----------------------------------------------------------------------------
// JSON Source
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Profile {
    name: String,
    age: u32,
}

#[tokio::test(start_paused = true)]
async fn test_json_source_through_resource() {
    let transport = MockTransport::new()
        .respond(
            "/profile",
            RawResponse::ok(r#"{"name":"ada","age":36}"#),
            20,
        )
        .respond("/missing", RawResponse::new(404, "no such profile"), 20)
        .respond("/garbled", RawResponse::ok("not json"), 20)
        .fail("/offline", "connection reset", 20);

    let config = FetchConfig::default();
    let source = Arc::new(JsonSource::<_, Profile>::new(transport, &config));
    let resource = AsyncResource::new(source, config).unwrap();

    resource.observe(RequestDescriptor::new("/profile"));
    let profile = resource.settled().await;
    assert_eq!(
        profile.data(),
        Some(&Profile {
            name: "ada".to_string(),
            age: 36
        })
    );

    let cases = [
        ("/missing", FetchErrorKind::Unsuccessful),
        ("/garbled", FetchErrorKind::Decode),
        ("/offline", FetchErrorKind::Transport),
    ];
    for (resource_name, kind) in cases {
        resource.observe(RequestDescriptor::new(resource_name));
        let settled = resource.settled().await;
        assert_eq!(settled.error().map(FetchError::kind), Some(kind));
    }
}
