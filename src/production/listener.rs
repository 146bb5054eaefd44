use super::line_protocol::{parse_datagram, StatsdEvent};
use crate::aggregator::AggregatorHandle;
use crate::observability::spans::listener_span;
use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, Instrument};

const MAX_DATAGRAM: usize = 65_535;

/// UDP statsd listener feeding the aggregator
pub struct StatsdListener {
    socket: UdpSocket,
    aggregator: AggregatorHandle,
}

impl StatsdListener {
    pub async fn bind(addr: &str, aggregator: AggregatorHandle) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(StatsdListener { socket, aggregator })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive datagrams until the aggregator goes away
    pub async fn run(self) {
        let addr = self
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        let span = listener_span(&addr);

        async move {
            info!("statsd listener ready");
            let mut buf = BytesMut::zeroed(MAX_DATAGRAM);

            loop {
                match self.socket.recv_from(&mut buf[..]).await {
                    Ok((n, peer)) => {
                        self.apply(&buf[..n], peer);
                        if self.aggregator.is_closed() {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to receive datagram: {}", e);
                    }
                }
            }

            info!("statsd listener stopped");
        }
        .instrument(span)
        .await
    }

    fn apply(&self, datagram: &[u8], peer: SocketAddr) {
        for parsed in parse_datagram(datagram) {
            match parsed {
                Ok(StatsdEvent::Increment {
                    key,
                    delta,
                    sample_rate,
                }) => self.aggregator.increment(key, delta, sample_rate),
                Ok(StatsdEvent::Timing { key, duration }) => {
                    self.aggregator.timing(key, duration)
                }
                Err(e) => debug!(%peer, "skipping malformed line: {}", e),
            }
        }
    }
}
