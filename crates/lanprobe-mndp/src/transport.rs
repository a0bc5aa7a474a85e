//! Async UDP transport for MNDP probes and responses

use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing::{debug, trace, warn};

use crate::codec::encode_probe;

/// UDP port neighbor discovery runs on
pub const MNDP_PORT: u16 = 5678;

/// Largest datagram the transport will accept
const MAX_DATAGRAM_LEN: usize = 2048;

/// A datagram captured during the listen window, not yet decoded
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub payload: Vec<u8>,
    pub source: SocketAddr,
}

/// Socket owner for one discovery run
///
/// The socket is bound on construction and released when the transport
/// drops, on every exit path.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a broadcast-capable socket on the given port
    ///
    /// SO_REUSEADDR (and SO_REUSEPORT on unix) let the transport share the
    /// discovery port with other listeners on the host. Port 0 binds an
    /// ephemeral port, which unicast-only callers and tests use.
    pub async fn bind(port: u16) -> io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_reuse_address(true)?;

        #[cfg(unix)]
        socket.set_reuse_port(true)?;

        socket.set_broadcast(true)?;

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        socket.bind(&addr.into())?;

        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        let local = socket.local_addr()?;
        debug!(local = %local, "Discovery socket bound");

        Ok(Self { socket })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Send the four-byte discovery probe to a target
    pub async fn send_probe(&self, target: SocketAddr) -> io::Result<()> {
        let probe = encode_probe();
        let sent = self.socket.send_to(&probe, target).await?;
        trace!(target = %target, bytes = sent, "Probe sent");
        Ok(())
    }

    /// Collect datagrams until the window elapses or shutdown is signalled
    ///
    /// Each datagram is captured as it arrives. Receive errors are logged
    /// and skipped; an empty result is a valid outcome.
    pub async fn receive_within(
        &self,
        window: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> Vec<RawResponse> {
        let deadline = Instant::now() + window;
        let mut responses = Vec::new();
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            tokio::select! {
                recv = timeout(remaining, self.socket.recv_from(&mut buf)) => {
                    match recv {
                        Ok(Ok((len, source))) => {
                            trace!(source = %source, bytes = len, "Datagram received");
                            responses.push(RawResponse {
                                payload: buf[..len].to_vec(),
                                source,
                            });
                        }
                        Ok(Err(e)) => {
                            warn!(error = %e, "UDP receive error");
                        }
                        // Window elapsed
                        Err(_) => break,
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Listen window cancelled");
                        break;
                    }
                }
            }
        }

        responses
    }
}
