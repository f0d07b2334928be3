use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::NodeConfig;
use crate::election::ElectionNode;
use crate::transport::tcp::{read_message, ReadError};
use crate::transport::Transport;

/// Accepts election traffic: one message per connection, dispatched to the
/// node and then closed. At most `max_inbound_connections` are handled at
/// once; further connections wait in the accept backlog.
pub struct ElectionServer<T: Transport> {
    listener: TcpListener,
    node: Arc<ElectionNode<T>>,
    permits: Arc<Semaphore>,
    read_timeout: Duration,
}

impl<T: Transport> ElectionServer<T> {
    pub async fn bind(config: &NodeConfig, node: Arc<ElectionNode<T>>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        Ok(Self::from_listener(listener, config, node))
    }

    /// Serve on an already bound listener.
    pub fn from_listener(
        listener: TcpListener,
        config: &NodeConfig,
        node: Arc<ElectionNode<T>>,
    ) -> Self {
        Self {
            listener,
            node,
            permits: Arc::new(Semaphore::new(config.max_inbound_connections.max(1))),
            read_timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> std::io::Result<()> {
        tracing::info!(
            node_id = self.node.id,
            addr = %self.listener.local_addr()?,
            "Election listener started"
        );

        loop {
            let permit = tokio::select! {
                _ = shutdown.cancelled() => break,
                permit = self.permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, remote) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(node_id = self.node.id, error = %e, "Accept failed");
                        continue;
                    }
                },
            };

            let node = self.node.clone();
            let read_timeout = self.read_timeout;
            tokio::spawn(async move {
                handle_connection(node, stream, remote, read_timeout).await;
                drop(permit);
            });
        }

        tracing::info!(node_id = self.node.id, "Election listener stopped");
        Ok(())
    }
}

async fn handle_connection<T: Transport>(
    node: Arc<ElectionNode<T>>,
    mut stream: TcpStream,
    remote: SocketAddr,
    read_timeout: Duration,
) {
    match read_message(&mut stream, read_timeout).await {
        Ok(message) => {
            // Close before dispatch so the sender is not held up by our
            // outbound traffic
            drop(stream);
            node.handle_message(message).await;
        }
        Err(ReadError::Codec(e)) => {
            tracing::warn!(node_id = node.id, remote = %remote, error = %e, "Malformed message");
        }
        Err(e) => {
            tracing::debug!(node_id = node.id, remote = %remote, error = %e, "Failed to read message");
        }
    }
}
