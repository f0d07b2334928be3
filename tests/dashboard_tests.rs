use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use leader_lite::codec::Message;
use leader_lite::config::{ElectionStrategy, NodeConfig};
use leader_lite::dashboard::{router, DashboardState};
use leader_lite::election::ElectionNode;
use leader_lite::transport::{MemoryNetwork, MemoryTransport};

/// Node 2 of a three node bully cluster where nobody else is running
fn create_test_node() -> Arc<ElectionNode<MemoryTransport>> {
    let network = MemoryNetwork::new();
    let mut config = NodeConfig::default().with_strategy(ElectionStrategy::Bully);
    for id in 1..=3 {
        config = config.with_member(id, format!("mem:{}", id));
    }
    config.node_id = 2;

    Arc::new(ElectionNode::new(&config, network.transport(2)).unwrap())
}

fn create_test_app(node: Arc<ElectionNode<MemoryTransport>>) -> Router {
    router(DashboardState { node })
}

async fn get_status(app: Router) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_status_endpoint_before_election() {
    let app = create_test_app(create_test_node());
    let (status, json) = get_status(app).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["node_id"], 2);
    assert_eq!(json["strategy"], "bully");
    assert_eq!(json["phase"], "idle");
    assert!(json["leader_id"].is_null());
    assert_eq!(json["is_leader"], false);
    assert_eq!(json["round"], 0);
    assert!(json["leader_since"].is_null());
}

#[tokio::test]
async fn test_status_reports_adopted_leader() {
    let node = create_test_node();
    node.handle_message(Message::Coordinator {
        sender_id: 3,
        leader_id: 3,
        origin_id: None,
        round: 7,
    })
    .await;

    let (status, json) = get_status(create_test_app(node)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["phase"], "leader_known");
    assert_eq!(json["leader_id"], 3);
    assert_eq!(json["round"], 7);
    assert_eq!(json["epoch"], 7);
    assert!(json["leader_since"].is_string());
}

#[tokio::test]
async fn test_trigger_election_endpoint() {
    let node = create_test_node();
    let app = create_test_app(node.clone());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/election")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["accepted"], true);

    // Node 3 is unreachable, so node 2 takes over in the background
    let mut leader = None;
    for _ in 0..100 {
        leader = node.current_leader().await;
        if leader.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(leader, Some(2));
}

#[tokio::test]
async fn test_status_returns_json() {
    let app = create_test_app(create_test_node());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    assert!(content_type.contains("application/json"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_app(create_test_node());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/jobs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
