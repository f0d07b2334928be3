use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::election::ElectionNode;
use crate::transport::Transport;

pub struct DashboardState<T: Transport> {
    pub node: Arc<ElectionNode<T>>,
}

// Derived Clone would require `T: Clone`
impl<T: Transport> Clone for DashboardState<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

#[derive(Serialize)]
struct TriggerElectionResponse {
    node_id: u64,
    accepted: bool,
}

/// Status API routes without binding a socket.
pub fn router<T: Transport>(state: DashboardState<T>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(status_handler::<T>))
        .route("/api/election", post(trigger_election_handler::<T>))
        .layer(cors)
        .with_state(state)
}

pub async fn run_dashboard<T: Transport>(
    addr: SocketAddr,
    state: DashboardState<T>,
    shutdown: CancellationToken,
) {
    let app = router(state);

    tracing::info!(addr = %addr, "Starting status API");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind status API");
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
    {
        tracing::error!(error = %e, "Status API failed");
    }
}

async fn status_handler<T: Transport>(State(state): State<DashboardState<T>>) -> impl IntoResponse {
    Json(state.node.snapshot().await)
}

async fn trigger_election_handler<T: Transport>(
    State(state): State<DashboardState<T>>,
) -> impl IntoResponse {
    let node = state.node.clone();
    tracing::info!(node_id = node.id, "Election requested through status API");

    tokio::spawn(async move {
        node.trigger_election().await;
    });

    (
        StatusCode::ACCEPTED,
        Json(TriggerElectionResponse {
            node_id: state.node.id,
            accepted: true,
        }),
    )
}
