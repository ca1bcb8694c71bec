//! Session lifecycle tests: completion modes, consumers and teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::thread;
use std::time::Duration;

use crate::test_helpers::{
    Description, Grid, RESOURCE_INTERFACE, TestOrchestrator, TestPlugin, WAIT, eventually, index,
    init_tracing, resource,
};
use gridscout::discovery::{
    adapters::memory::EntityContainer,
    domain::{Endpoint, QueryResponse, QueryState, QueryStatus},
    ports::EntityConsumer,
    services::{DiscoveryConfig, DiscoveryOrchestrator, QueryPluginRegistry},
};
use mockable::{Clock, DefaultClock};
use rstest::rstest;
use tokio::sync::Semaphore;

const SLOW_INTERFACE: &str = "org.example.slowinfo";

/// Consumer that calls back into its orchestrator once the session starts
/// closing, recording whether its follow-up endpoint was accepted.
struct ReenteringConsumer {
    orchestrator: Weak<TestOrchestrator>,
    follow_up: Endpoint,
    entered: AtomicBool,
    follow_up_accepted: Mutex<Option<bool>>,
}

impl ReenteringConsumer {
    fn new(orchestrator: Weak<TestOrchestrator>, follow_up: Endpoint) -> Self {
        Self {
            orchestrator,
            follow_up,
            entered: AtomicBool::new(false),
            follow_up_accepted: Mutex::new(None),
        }
    }

    fn entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }

    fn follow_up_accepted(&self) -> Option<bool> {
        *self
            .follow_up_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl EntityConsumer<Description> for ReenteringConsumer {
    fn on_resource_description(&self, _entity: &Description) {
        self.entered.store(true, Ordering::Release);
        let Some(orchestrator) = self.orchestrator.upgrade() else {
            return;
        };
        for _ in 0..500 {
            if orchestrator.is_closed() {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        let accepted = orchestrator.add_endpoint(self.follow_up.clone());
        *self
            .follow_up_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(accepted);
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn first_success_unblocks_waiters_while_siblings_run() {
    init_tracing();
    let gate = Arc::new(Semaphore::new(0));
    let slow = TestPlugin::new("slow_info", [SLOW_INTERFACE])
        .expect("valid plugin")
        .with_fallback(QueryResponse::successful([Description::Service("slow".to_owned())]))
        .with_gate(Arc::clone(&gate));
    let fast = TestPlugin::new("fast_info", [RESOURCE_INTERFACE])
        .expect("valid plugin")
        .with_fallback(QueryResponse::successful([Description::Service("fast".to_owned())]));
    let mut registry = QueryPluginRegistry::<Description>::new();
    registry.register(Arc::new(slow));
    registry.register(Arc::new(fast));
    let orchestrator = DiscoveryOrchestrator::new(
        DiscoveryConfig::default().with_one_success_suffices(true),
        registry,
        Arc::new(DefaultClock),
    )
    .expect("session should start");

    let slow_endpoint = Endpoint::new("https://slow.example.org", SLOW_INTERFACE).expect("valid endpoint");
    assert!(orchestrator.add_endpoint(slow_endpoint.clone()));
    assert!(orchestrator.add_endpoint(resource("https://fast.example.org")));

    assert!(orchestrator.wait(WAIT).await);
    assert!(orchestrator.is_done());
    assert_eq!(
        orchestrator.status(&slow_endpoint).state(),
        QueryState::InProgress
    );

    gate.add_permits(1);
    assert!(
        eventually(|| orchestrator.status(&slow_endpoint).state() == QueryState::Successful).await
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn wait_reports_timeout_while_queries_are_held() {
    let gate = Arc::new(Semaphore::new(0));
    let b = resource("https://b.example.org");
    let grid = Grid::new()
        .service(b.url(), &["b_ce"])
        .gated(Arc::clone(&gate))
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(b.clone()));
    assert!(!orchestrator.wait(Some(Duration::from_millis(100))).await);
    assert!(!orchestrator.is_done());

    gate.add_permits(1);
    assert!(orchestrator.wait(WAIT).await);
    assert_eq!(container.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn closing_during_a_query_stops_all_mutation() {
    let gate = Arc::new(Semaphore::new(0));
    let (a, b) = (index("ldap://a.example.org"), resource("https://b.example.org"));
    let grid = Grid::new()
        .index(a.url(), [b.clone()])
        .gated(Arc::clone(&gate))
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(a.clone()));
    assert!(eventually(|| grid.calls_to(a.url()) == 1).await);
    assert!(orchestrator.close());

    gate.add_permits(1);
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(orchestrator.status(&a).state(), QueryState::InProgress);
    assert_eq!(orchestrator.status(&b).state(), QueryState::Unknown);
    assert_eq!(grid.calls_to(b.url()), 0);
    assert!(container.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn completion_outlives_a_dropped_orchestrator() {
    let gate = Arc::new(Semaphore::new(0));
    let b = resource("https://b.example.org");
    let grid = Grid::new()
        .service(b.url(), &["b_ce"])
        .gated(Arc::clone(&gate))
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(b.clone()));
    let completion = orchestrator.completion();
    assert!(eventually(|| grid.calls_to(b.url()) == 1).await);
    drop(orchestrator);

    assert!(!completion.is_done());
    gate.add_permits(1);
    assert!(completion.wait(WAIT).await);
    assert!(container.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn removed_consumer_keeps_past_deliveries_only() {
    let (b, d) = (resource("https://b.example.org"), resource("https://d.example.org"));
    let grid = Grid::new()
        .service(b.url(), &["b_ce"])
        .service(d.url(), &["d_ce"])
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");
    let second = Arc::new(EntityContainer::<Description>::new());
    let second_consumer: Arc<dyn EntityConsumer<Description>> = second.clone();
    orchestrator.add_consumer(Arc::clone(&second_consumer));

    assert!(orchestrator.add_endpoint(b));
    assert!(orchestrator.wait(WAIT).await);
    assert!(orchestrator.remove_consumer(&second_consumer));

    assert!(orchestrator.add_endpoint(d));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(second.entities(), [Description::Service("b_ce".to_owned())]);
    assert_eq!(container.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn late_consumer_sees_no_replay() {
    let (b, d) = (resource("https://b.example.org"), resource("https://d.example.org"));
    let grid = Grid::new()
        .service(b.url(), &["b_ce"])
        .service(d.url(), &["d_ce"])
        .build();
    let (orchestrator, _container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(b));
    assert!(orchestrator.wait(WAIT).await);

    let late = Arc::new(EntityContainer::<Description>::new());
    orchestrator.add_consumer(late.clone());
    assert!(orchestrator.add_endpoint(d));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(late.entities(), [Description::Service("d_ce".to_owned())]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn forgotten_endpoint_can_be_queried_again() {
    let b = resource("https://b.example.org");
    let grid = Grid::new().failing(b.url(), "service unavailable").build();
    let (orchestrator, _container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(b.clone()));
    assert!(orchestrator.wait(WAIT).await);
    assert_eq!(orchestrator.status(&b).state(), QueryState::Failed);
    assert!(!orchestrator.add_endpoint(b.clone()));

    assert!(orchestrator.forget_endpoint(&b));
    assert_eq!(orchestrator.status(&b).state(), QueryState::Unknown);
    assert!(orchestrator.add_endpoint(b.clone()));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(grid.calls_to(b.url()), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn clearing_finished_statuses_keeps_running_queries() {
    let gate = Arc::new(Semaphore::new(0));
    let (b, c) = (resource("https://b.example.org"), resource("https://c.example.org"));
    let grid = Grid::new()
        .service(b.url(), &["b_ce"])
        .service(c.url(), &["c_ce"])
        .gated(Arc::clone(&gate))
        .build();
    let (orchestrator, _container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(b.clone()));
    gate.add_permits(1);
    assert!(orchestrator.wait(WAIT).await);
    assert!(orchestrator.add_endpoint(c.clone()));

    assert_eq!(orchestrator.clear_finished_statuses(), 1);
    assert!(!orchestrator.forget_endpoint(&c));
    assert_eq!(orchestrator.statuses().keys().collect::<Vec<_>>(), [&c]);

    gate.add_permits(1);
    assert!(orchestrator.wait(WAIT).await);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn externally_recorded_status_blocks_dispatch() {
    let b = resource("https://b.example.org");
    let grid = Grid::new().service(b.url(), &["b_ce"]).build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");
    let now = DefaultClock.utc();

    assert!(orchestrator.set_status(&b, QueryStatus::successful(now), false));
    assert!(!orchestrator.set_status(&b, QueryStatus::failed(now, "ignored"), false));
    assert!(!orchestrator.add_endpoint(b.clone()));
    assert!(orchestrator.set_status(&b, QueryStatus::failed(now, "re-polled"), true));

    assert_eq!(orchestrator.status(&b).detail(), Some("re-polled"));
    assert_eq!(grid.calls_to(b.url()), 0);
    assert!(container.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn consumer_calling_back_does_not_block_close() {
    let (b, late) = (resource("https://b.example.org"), resource("https://late.example.org"));
    let grid = Grid::new().service(b.url(), &["b_ce"]).build();
    let (session, container) = grid.start(DiscoveryConfig::default()).expect("session should start");
    let orchestrator = Arc::new(session);
    let consumer = Arc::new(ReenteringConsumer::new(
        Arc::downgrade(&orchestrator),
        late.clone(),
    ));
    orchestrator.add_consumer(consumer.clone());

    assert!(orchestrator.add_endpoint(b));
    assert!(eventually(|| consumer.entered()).await);

    let closer = Arc::clone(&orchestrator);
    let closed = tokio::time::timeout(
        Duration::from_secs(5),
        tokio::task::spawn_blocking(move || closer.close()),
    )
    .await
    .expect("close should return while the consumer calls back")
    .expect("close task should complete");

    assert!(closed);
    assert_eq!(consumer.follow_up_accepted(), Some(false));
    assert_eq!(orchestrator.status(&late).state(), QueryState::Unknown);
    assert_eq!(container.len(), 1);
}
