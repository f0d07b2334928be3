use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::codec::{self, CodecError, Message, MAX_MESSAGE_BYTES};
use crate::config::PeerConfig;
use crate::transport::{Transport, TransportError};

/// Opens a fresh connection per message, writes one encoded record and
/// closes the write half. Connect and write each get `connect_timeout`.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl Transport for TcpTransport {
    async fn send(&self, peer: &PeerConfig, message: &Message) -> Result<(), TransportError> {
        let bytes = codec::encode(message)?;

        let mut stream = timeout(self.connect_timeout, TcpStream::connect(peer.addr.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(peer.node_id))?
            .map_err(|e| TransportError::Unreachable {
                node_id: peer.node_id,
                reason: e.to_string(),
            })?;

        timeout(self.connect_timeout, async {
            stream.write_all(&bytes).await?;
            stream.shutdown().await
        })
        .await
        .map_err(|_| TransportError::Timeout(peer.node_id))?
        .map_err(|e| TransportError::Unreachable {
            node_id: peer.node_id,
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Read timed out")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Read exactly one message from an accepted connection: everything up to
/// EOF, capped at [`MAX_MESSAGE_BYTES`].
pub async fn read_message(
    stream: &mut TcpStream,
    read_timeout: Duration,
) -> Result<Message, ReadError> {
    let mut buf = Vec::with_capacity(512);
    let limit = (MAX_MESSAGE_BYTES + 1) as u64;

    let mut limited = (&mut *stream).take(limit);
    timeout(read_timeout, limited.read_to_end(&mut buf))
        .await
        .map_err(|_| ReadError::Timeout)??;

    Ok(codec::decode(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn send_and_read_one_message() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_message(&mut stream, Duration::from_secs(1)).await
        });

        let peer = PeerConfig {
            node_id: 2,
            addr: addr.to_string(),
        };
        let message = Message::Coordinator {
            sender_id: 1,
            leader_id: 3,
            origin_id: None,
            round: 4,
        };
        TcpTransport::default().send(&peer, &message).await.unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), message);
    }

    #[tokio::test]
    async fn send_to_closed_port_is_unreachable() {
        // Bind then drop to obtain a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();

        let peer = PeerConfig {
            node_id: 9,
            addr: addr.to_string(),
        };
        let err = TcpTransport::new(Duration::from_millis(500))
            .send(&peer, &Message::Ping { sender_id: 1 })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Unreachable { node_id: 9, .. } | TransportError::Timeout(9)
        ));
    }

    #[tokio::test]
    async fn read_reports_garbage_as_codec_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_message(&mut stream, Duration::from_secs(1)).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"COORDINATOR|4").await.unwrap();
        client.shutdown().await.unwrap();

        assert!(matches!(reader.await.unwrap(), Err(ReadError::Codec(_))));
    }

    #[tokio::test]
    async fn read_times_out_on_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            read_message(&mut stream, Duration::from_millis(100)).await
        });

        let _client = TcpStream::connect(addr).await.unwrap();
        assert!(matches!(reader.await.unwrap(), Err(ReadError::Timeout)));
    }
}
