//! Index graph traversal tests.

use crate::test_helpers::{Grid, WAIT, index, resource, service_names};
use gridscout::discovery::domain::{Endpoint, QueryState};
use gridscout::discovery::services::DiscoveryConfig;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn two_level_index_delivers_only_resource_descriptions() {
    let (a, b, c, d) = (
        index("ldap://a.example.org"),
        resource("https://b.example.org"),
        index("ldap://c.example.org"),
        resource("https://d.example.org"),
    );
    let grid = Grid::new()
        .index(a.url(), [b.clone(), c.clone()])
        .index(c.url(), [d.clone()])
        .service(b.url(), &["b_ce"])
        .service(d.url(), &["d_ce"])
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(a.clone()));
    assert!(orchestrator.wait(WAIT).await);

    for endpoint in [&a, &b, &c, &d] {
        assert_eq!(
            orchestrator.status(endpoint).state(),
            QueryState::Successful,
            "{endpoint} should be successful"
        );
    }
    assert_eq!(container.len(), 2);
    assert_eq!(service_names(&container.entities()), ["b_ce", "d_ce"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cyclic_indices_terminate_with_one_query_each() {
    let (a, b, c) = (
        index("ldap://a.example.org"),
        index("ldap://b.example.org"),
        resource("https://c.example.org"),
    );
    let grid = Grid::new()
        .index(a.url(), [b.clone(), c.clone()])
        .index(b.url(), [a.clone()])
        .service(c.url(), &["c_ce"])
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(a.clone()));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(grid.calls_to(a.url()), 1);
    assert_eq!(grid.calls_to(b.url()), 1);
    assert_eq!(grid.calls_to(c.url()), 1);
    assert_eq!(orchestrator.endpoints_with_state(QueryState::Successful).len(), 3);
    assert_eq!(container.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn self_referencing_index_is_queried_once() {
    let a = index("ldap://a.example.org");
    let grid = Grid::new().index(a.url(), [a.clone()]).build();
    let (orchestrator, _container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(a.clone()));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(grid.calls_to(a.url()), 1);
    assert_eq!(orchestrator.status(&a).state(), QueryState::Successful);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shared_descendant_is_queried_once() {
    let (a, b, c, d) = (
        index("ldap://a.example.org"),
        index("ldap://b.example.org"),
        index("ldap://c.example.org"),
        resource("https://d.example.org"),
    );
    let grid = Grid::new()
        .index(a.url(), [b.clone(), c.clone()])
        .index(b.url(), [d.clone()])
        .index(c.url(), [d.clone()])
        .service(d.url(), &["d_ce"])
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(a));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(grid.calls_to(d.url()), 1);
    assert_eq!(service_names(&container.entities()), ["d_ce"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failing_endpoint_does_not_abort_siblings() {
    let (a, b, c) = (
        index("ldap://a.example.org"),
        resource("https://b.example.org"),
        resource("https://c.example.org"),
    );
    let grid = Grid::new()
        .index(a.url(), [b.clone(), c.clone()])
        .failing(b.url(), "connection timed out")
        .service(c.url(), &["c_ce"])
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(a.clone()));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(orchestrator.status(&a).state(), QueryState::Successful);
    assert_eq!(orchestrator.status(&c).state(), QueryState::Successful);
    let failed = orchestrator.status(&b);
    assert_eq!(failed.state(), QueryState::Failed);
    assert!(
        failed
            .detail()
            .is_some_and(|detail| detail.contains("connection timed out"))
    );
    assert_eq!(service_names(&container.entities()), ["c_ce"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn nested_endpoint_with_unknown_interface_fails_alone() {
    let a = index("ldap://a.example.org");
    let odd = Endpoint::new("gsiftp://odd.example.org", "org.example.unknown").expect("valid endpoint");
    let grid = Grid::new().index(a.url(), [odd.clone()]).build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    assert!(orchestrator.add_endpoint(a.clone()));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(orchestrator.status(&a).state(), QueryState::Successful);
    let status = orchestrator.status(&odd);
    assert_eq!(status.state(), QueryState::Failed);
    assert!(
        status
            .detail()
            .is_some_and(|detail| detail.contains("plugin not found"))
    );
    assert!(container.is_empty());
}

#[rstest]
#[case(1)]
#[case(4)]
#[tokio::test(flavor = "multi_thread")]
async fn concurrency_limit_does_not_change_the_outcome(#[case] limit: usize) {
    let root = index("ldap://root.example.org");
    let leaves: Vec<Endpoint> = (0..6)
        .map(|n| resource(&format!("https://ce{n}.example.org")))
        .collect();
    let grid = leaves
        .iter()
        .enumerate()
        .fold(Grid::new().index(root.url(), leaves.clone()), |topology, (n, leaf)| {
            topology.service(leaf.url(), &[format!("ce{n}").as_str()])
        })
        .build();
    let (orchestrator, container) =
        grid
        .start(DiscoveryConfig::default().with_max_concurrent_queries(limit))
        .expect("session should start");

    assert!(orchestrator.add_endpoint(root));
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(container.len(), leaves.len());
    assert_eq!(
        orchestrator.endpoints_with_state(QueryState::Successful).len(),
        leaves.len() + 1
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn seeds_are_deduplicated_against_discovered_endpoints() {
    let (a, b) = (index("ldap://a.example.org"), resource("https://b.example.org"));
    let grid = Grid::new()
        .index(a.url(), [b.clone()])
        .service(b.url(), &["b_ce"])
        .build();
    let (orchestrator, container) = grid.start(DiscoveryConfig::default()).expect("session should start");

    let accepted = orchestrator.add_endpoints([a.clone(), b.clone(), a.clone()]);
    assert_eq!(accepted, 2);
    assert!(orchestrator.wait(WAIT).await);

    assert_eq!(grid.calls_to(b.url()), 1);
    assert_eq!(container.len(), 1);
}
