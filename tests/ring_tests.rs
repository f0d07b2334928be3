//! Ring election over an in-memory network.
//!
//! These tests verify the traversal order, single-pass announcement,
//! skipping of dead members, and convergence with failure detectors.


use std::time::Duration;

use leader_lite::codec::Message;
use leader_lite::config::ElectionStrategy;
use test_harness::{ClusterView, TestCluster};

const RING: [u64; 5] = [0, 1, 2, 3, 4];

/// Test 1: An election from node 1 visits every member in ring order
#[tokio::test]
async fn test_ring_completion_order() {
    let cluster = TestCluster::new(&RING, ElectionStrategy::Ring, false);

    cluster.trigger_election(1).await;
    assert!(
        cluster
            .wait_for_agreement(4, Duration::from_secs(2))
            .await,
        "All members should adopt node 4"
    );
    assert!(cluster.wait_for_quiescence(Duration::from_secs(2)).await);

    let returned = cluster
        .deliveries()
        .into_iter()
        .find_map(|d| match d.message {
            Message::Election { ids, .. } if d.to == 1 => Some(ids),
            _ => None,
        })
        .expect("ELECTION should return to its originator");
    assert_eq!(returned, vec![1, 2, 3, 4, 0]);
}

/// Test 2: The announcement reaches every member exactly once
#[tokio::test]
async fn test_coordinator_delivered_once_per_member() {
    let cluster = TestCluster::new(&RING, ElectionStrategy::Ring, false);

    cluster.trigger_election(1).await;
    assert!(
        cluster
            .wait_for_agreement(4, Duration::from_secs(2))
            .await
    );
    assert!(cluster.wait_for_quiescence(Duration::from_secs(2)).await);

    let announcements = cluster.coordinator_deliveries();
    for id in RING {
        assert_eq!(
            announcements.get(&id),
            Some(&1),
            "node {} should see COORDINATOR exactly once",
            id
        );
    }
    assert_eq!(cluster.count_leaders().await, 1);
}

/// Test 3: A dead member is skipped and never receives anything
#[tokio::test]
async fn test_dead_member_is_skipped() {
    let mut cluster = TestCluster::new(&RING, ElectionStrategy::Ring, false);
    cluster.kill(2);

    cluster.trigger_election(1).await;
    assert!(
        cluster
            .wait_for_agreement(4, Duration::from_secs(2))
            .await,
        "Live members should adopt node 4"
    );
    assert!(cluster.wait_for_quiescence(Duration::from_secs(2)).await);

    let deliveries = cluster.deliveries();
    assert!(
        deliveries.iter().all(|d| d.to != 2),
        "Nothing should be delivered to the dead member"
    );

    // Node 1's ELECTION went straight to node 3
    let first = deliveries
        .iter()
        .find(|d| d.from == 1)
        .expect("node 1 should have sent");
    assert_eq!(first.to, 3);
    assert!(matches!(
        &first.message,
        Message::Election { ids, .. } if ids == &vec![1]
    ));

    let returned = deliveries
        .iter()
        .find_map(|d| match &d.message {
            Message::Election { ids, .. } if d.to == 1 => Some(ids.clone()),
            _ => None,
        })
        .expect("ELECTION should return to its originator");
    assert_eq!(returned, vec![1, 3, 4, 0]);
}

/// Test 4: Dead leader candidate: the highest live member wins
#[tokio::test]
async fn test_dead_highest_member_excluded() {
    let mut cluster = TestCluster::new(&RING, ElectionStrategy::Ring, false);
    cluster.kill(4);

    cluster.trigger_election(0).await;
    assert!(
        cluster
            .wait_for_agreement(3, Duration::from_secs(2))
            .await,
        "Live members should adopt node 3"
    );
}

/// Test 5: Detectors elect the highest member from a cold start
#[tokio::test]
async fn test_cold_start_converges() {
    let cluster = TestCluster::new(&RING, ElectionStrategy::Ring, true);

    assert!(
        cluster
            .wait_for_agreement(4, Duration::from_secs(5))
            .await,
        "Ring should agree on node 4"
    );
    assert_eq!(cluster.count_leaders().await, 1);
}

/// Test 6: Killing the leader moves leadership to the next highest
#[tokio::test]
async fn test_leader_failure_converges() {
    let mut cluster = TestCluster::new(&RING, ElectionStrategy::Ring, true);
    assert!(
        cluster
            .wait_for_agreement(4, Duration::from_secs(5))
            .await
    );

    assert!(cluster.kill(4));
    assert!(
        cluster
            .wait_for_agreement(3, Duration::from_secs(10))
            .await,
        "Remaining members should agree on node 3"
    );
    assert_eq!(cluster.count_leaders().await, 1);
}
