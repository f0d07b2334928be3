use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::NodeConfig;
use crate::dashboard::{run_dashboard, DashboardState};
use crate::detector::FailureDetector;
use crate::election::ElectionNode;
use crate::error::Result;
use crate::server::ElectionServer;
use crate::transport::TcpTransport;

/// Main node that wires the election runtime to the network.
pub struct Node {
    pub config: NodeConfig,
    pub election: Arc<ElectionNode<TcpTransport>>,
    pub dashboard_addr: Option<SocketAddr>,
}

impl Node {
    /// Fails on an ill-formed membership; the process should not start.
    pub fn new(config: NodeConfig, dashboard_addr: Option<SocketAddr>) -> Result<Self> {
        let transport = TcpTransport::new(Duration::from_millis(config.connect_timeout_ms));
        let election = Arc::new(ElectionNode::new(&config, transport)?);

        Ok(Self {
            config,
            election,
            dashboard_addr,
        })
    }

    /// Run the node until `shutdown` is cancelled.
    ///
    /// 1. Binds the election listener (fails fast if the port is taken)
    /// 2. Spawns the failure detector
    /// 3. Optionally spawns the status API
    /// 4. Serves election traffic (blocking)
    ///
    /// No election is started eagerly: the first detector tick finds no
    /// leader and starts one.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let server = ElectionServer::bind(&self.config, self.election.clone()).await?;

        let detector = FailureDetector::from_config(&self.config);
        let detector_node = self.election.clone();
        let detector_shutdown = shutdown.clone();
        let detector_handle = tokio::spawn(async move {
            detector.run(detector_node, detector_shutdown).await;
        });

        if let Some(dashboard_addr) = self.dashboard_addr {
            let dashboard_state = DashboardState {
                node: self.election.clone(),
            };
            let dashboard_shutdown = shutdown.clone();
            tokio::spawn(async move {
                run_dashboard(dashboard_addr, dashboard_state, dashboard_shutdown).await;
            });
        }

        server.run(shutdown).await?;

        if let Err(e) = detector_handle.await {
            tracing::warn!(node_id = self.config.node_id, error = %e, "Failure detector task failed");
        }

        let leader_id = self.election.current_leader().await;
        tracing::info!(node_id = self.config.node_id, leader_id = ?leader_id, "Node stopped");
        Ok(())
    }
}
