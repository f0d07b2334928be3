//! Bully election over an in-memory network.
//!
//! These tests verify takeover by the highest live node, agreement after
//! leader failure, and the message pattern of the highest node's election.


use std::time::Duration;

use leader_lite::codec::Message;
use leader_lite::config::ElectionStrategy;
use test_harness::{ClusterView, TestCluster};

/// Test 1: The highest node elects itself without sending ELECTION
#[tokio::test]
async fn test_highest_node_elects_itself_directly() {
    let cluster = TestCluster::new(&[1, 2, 3, 4, 5], ElectionStrategy::Bully, false);

    cluster.trigger_election(5).await;

    assert!(
        cluster
            .wait_for_agreement(5, Duration::from_secs(2))
            .await,
        "All nodes should adopt node 5"
    );

    let deliveries = cluster.deliveries();
    assert!(
        deliveries
            .iter()
            .all(|d| !matches!(d.message, Message::Election { .. })),
        "No ELECTION should be sent"
    );
    let announcements = cluster.coordinator_deliveries();
    for id in 1..=4 {
        assert_eq!(announcements.get(&id), Some(&1), "node {} announcements", id);
    }
    assert_eq!(announcements.get(&5), None);
}

/// Test 2: A low node's election ends with the highest node in charge
#[tokio::test]
async fn test_low_node_election_promotes_highest() {
    let cluster = TestCluster::new(&[1, 2, 3, 4, 5], ElectionStrategy::Bully, false);

    cluster.trigger_election(1).await;

    assert!(
        cluster
            .wait_for_agreement(5, Duration::from_secs(2))
            .await,
        "All nodes should adopt node 5"
    );
    assert_eq!(cluster.count_leaders().await, 1);

    // Every higher node was challenged by node 1 and answered it
    let deliveries = cluster.deliveries();
    for higher in 2..=5 {
        assert!(deliveries.iter().any(|d| d.from == 1
            && d.to == higher
            && matches!(d.message, Message::Election { .. })));
        assert!(deliveries
            .iter()
            .any(|d| d.from == higher && d.to == 1 && matches!(d.message, Message::Ok { .. })));
    }
}

/// Test 3: Detectors elect the highest node from a cold start
#[tokio::test]
async fn test_cold_start_converges_on_highest() {
    let cluster = TestCluster::new(&[1, 2, 3, 4, 5], ElectionStrategy::Bully, true);

    assert!(
        cluster
            .wait_for_agreement(5, Duration::from_secs(5))
            .await,
        "Cluster should agree on node 5"
    );
    assert_eq!(cluster.count_leaders().await, 1, "Exactly one leader");
}

/// Test 4: Killing the leader hands leadership to the next highest
#[tokio::test]
async fn test_leader_failure_converges_on_next_highest() {
    let mut cluster = TestCluster::new(&[1, 2, 3, 4, 5], ElectionStrategy::Bully, true);

    assert!(
        cluster
            .wait_for_agreement(5, Duration::from_secs(5))
            .await
    );

    assert!(cluster.kill(5), "Should kill node 5");

    assert!(
        cluster
            .wait_for_agreement(4, Duration::from_secs(10))
            .await,
        "Remaining nodes should agree on node 4"
    );
    assert_eq!(cluster.count_leaders().await, 1, "Exactly one leader");

    assert!(cluster.get_node(4).unwrap().is_leader().await);
}

/// Test 5: Leadership survives repeated failures down to a single node
#[tokio::test]
async fn test_successive_failures() {
    let mut cluster = TestCluster::new(&[1, 2, 3], ElectionStrategy::Bully, true);
    assert!(
        cluster
            .wait_for_agreement(3, Duration::from_secs(5))
            .await
    );

    cluster.kill(3);
    assert!(
        cluster
            .wait_for_agreement(2, Duration::from_secs(10))
            .await
    );

    cluster.kill(2);
    assert!(
        cluster
            .wait_for_agreement(1, Duration::from_secs(10))
            .await
    );
    assert!(cluster.get_node(1).unwrap().is_leader().await);
}

/// Test 6: A quiet cluster keeps a single leader
#[tokio::test]
async fn test_leader_is_stable_under_quiescence() {
    let cluster = TestCluster::new(&[1, 2, 3, 4], ElectionStrategy::Bully, true);
    assert!(
        cluster
            .wait_for_agreement(4, Duration::from_secs(5))
            .await
    );

    // Let challenges from the cold start drain
    tokio::time::sleep(Duration::from_millis(300)).await;
    let round = cluster.get_node(4).unwrap().election.snapshot().await.round;
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(cluster.all_agree_on(4).await);
    assert_eq!(cluster.count_leaders().await, 1);
    assert_eq!(
        cluster.get_node(4).unwrap().election.snapshot().await.round,
        round,
        "No further rounds while the leader is healthy"
    );
}
