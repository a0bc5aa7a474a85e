//! Discovery engine combining transport, codec, and field mapping

use lanprobe_core::DeviceRecord;
use lanprobe_mndp::{apply_fields, decode_response, FieldStats, UdpTransport, MNDP_PORT};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default listen window for a discovery run
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Socket creation or bind failed; the run never reached the network
    #[error("discovery socket error: {0}")]
    Socket(#[from] std::io::Error),
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// UDP port probes are sent to and responses arrive on
    pub port: u16,
    /// Broadcast address used when no explicit targets are given
    pub broadcast_addr: Ipv4Addr,
    /// Explicit probe targets (unicast or directed broadcast)
    pub targets: Vec<SocketAddr>,
    /// Also probe the broadcast address of every usable IPv4 interface
    pub all_interfaces: bool,
    /// Listen window in milliseconds
    pub timeout_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: MNDP_PORT,
            broadcast_addr: Ipv4Addr::BROADCAST,
            targets: Vec::new(),
            all_interfaces: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl DiscoveryConfig {
    /// Listen window as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One-shot neighbor discovery engine
///
/// Each `discover()` call binds its own socket, probes, listens, decodes,
/// and releases the socket. There is no retry loop and no state carried
/// between runs; callers compose retries and reconciliation externally.
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
}

impl DiscoveryEngine {
    /// Create an engine with the given configuration
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Run one discovery pass bounded by the configured window
    pub async fn discover(&self) -> Result<Vec<DeviceRecord>, DiscoveryError> {
        // Sender held for the whole run so the listen window runs to its
        // deadline instead of observing a closed channel.
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.discover_with_shutdown(cancel_rx).await
    }

    /// Run one discovery pass that can also be cancelled through `shutdown`
    pub async fn discover_with_shutdown(
        &self,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Vec<DeviceRecord>, DiscoveryError> {
        let transport = UdpTransport::bind(self.config.port).await?;

        let targets = self.probe_targets();
        info!(
            port = self.config.port,
            targets = targets.len(),
            timeout_ms = self.config.timeout_ms,
            "Starting discovery run"
        );

        for target in &targets {
            if let Err(e) = transport.send_probe(*target).await {
                warn!(target = %target, error = %e, "Probe send failed");
            }
        }

        let responses = transport
            .receive_within(self.config.timeout(), shutdown)
            .await;

        let mut records = Vec::new();
        let mut malformed = 0usize;
        let mut stats = FieldStats::default();

        for response in &responses {
            let decoded = match decode_response(&response.payload) {
                Ok(d) => d,
                Err(e) => {
                    debug!(
                        source = %response.source,
                        error = %e,
                        "Dropping malformed response"
                    );
                    malformed += 1;
                    continue;
                }
            };

            let mut record = DeviceRecord::new(response.source.ip(), decoded.version);
            stats.merge(apply_fields(&mut record, &decoded.fields));
            records.push(record);
        }

        info!(
            records = records.len(),
            datagrams = responses.len(),
            malformed = malformed,
            mapped = stats.mapped,
            invalid = stats.invalid,
            unknown = stats.unknown,
            "Discovery run complete"
        );

        Ok(records)
    }

    /// Resolve the probe target list for this run
    ///
    /// The configured broadcast address is used only when neither explicit
    /// targets nor interface enumeration produced anything.
    fn probe_targets(&self) -> Vec<SocketAddr> {
        let mut targets = self.config.targets.clone();

        if self.config.all_interfaces {
            targets.extend(interface_broadcast_targets(self.config.port));
        }

        if targets.is_empty() {
            targets.push(SocketAddr::from((
                self.config.broadcast_addr,
                self.config.port,
            )));
        }

        targets.sort();
        targets.dedup();
        targets
    }
}

/// Broadcast addresses of usable IPv4 interfaces, as probe targets
fn interface_broadcast_targets(port: u16) -> Vec<SocketAddr> {
    use network_interface::{Addr, NetworkInterface, NetworkInterfaceConfig};

    let interfaces = match NetworkInterface::show() {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "Interface enumeration failed");
            return Vec::new();
        }
    };

    interfaces
        .into_iter()
        .filter(|iface| {
            // Skip loopback and container plumbing
            !iface.name.starts_with("lo")
                && !iface.name.starts_with("docker")
                && !iface.name.starts_with("br-")
                && !iface.name.starts_with("veth")
        })
        .flat_map(|iface| iface.addr.into_iter())
        .filter_map(|addr| match addr {
            Addr::V4(v4) => v4.broadcast.map(|b| SocketAddr::from((b, port))),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanprobe_mndp::{encode_probe, encode_response, TlvField};
    use std::net::IpAddr;
    use tokio::net::UdpSocket;

    fn identity_field(name: &str) -> TlvField {
        TlvField {
            tlv_type: 2,
            value: name.as_bytes().to_vec(),
        }
    }

    fn test_config(targets: Vec<SocketAddr>, timeout_ms: u64) -> DiscoveryConfig {
        DiscoveryConfig {
            // Ephemeral port so runs cannot collide with a real listener
            port: 0,
            targets,
            timeout_ms,
            ..DiscoveryConfig::default()
        }
    }

    /// Answer the first valid probe with the given response packet
    async fn spawn_responder(bind: Ipv4Addr, version: u32, fields: Vec<TlvField>) -> SocketAddr {
        let socket = UdpSocket::bind(SocketAddr::from((bind, 0))).await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            if let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                if buf[..len] == encode_probe() {
                    let packet = encode_response(version, &fields);
                    let _ = socket.send_to(&packet, peer).await;
                }
            }
        });
        addr
    }

    /// Answer any datagram with a fixed raw packet
    async fn spawn_raw_responder(packet: Vec<u8>) -> SocketAddr {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            if let Ok((_, peer)) = socket.recv_from(&mut buf).await {
                let _ = socket.send_to(&packet, peer).await;
            }
        });
        addr
    }

    #[test]
    fn test_default_target_is_limited_broadcast() {
        let engine = DiscoveryEngine::new(DiscoveryConfig::default());
        let targets = engine.probe_targets();
        assert_eq!(
            targets,
            vec![SocketAddr::from((Ipv4Addr::BROADCAST, MNDP_PORT))]
        );
    }

    #[test]
    fn test_explicit_targets_replace_broadcast() {
        let target: SocketAddr = "192.168.88.255:5678".parse().unwrap();
        let engine = DiscoveryEngine::new(test_config(vec![target], 100));
        assert_eq!(engine.probe_targets(), vec![target]);
    }

    #[test]
    fn test_duplicate_targets_collapse() {
        let target: SocketAddr = "192.168.88.255:5678".parse().unwrap();
        let engine = DiscoveryEngine::new(test_config(vec![target, target], 100));
        assert_eq!(engine.probe_targets(), vec![target]);
    }

    #[test]
    fn test_engine_exposes_effective_config() {
        let target: SocketAddr = "192.168.88.255:5678".parse().unwrap();
        let engine = DiscoveryEngine::new(test_config(vec![target], 750));

        let effective = engine.config();
        assert_eq!(effective.targets, vec![target]);
        assert_eq!(effective.timeout_ms, 750);
        assert_eq!(effective.timeout(), Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_discover_collects_each_response() {
        let first = spawn_responder(Ipv4Addr::LOCALHOST, 1, vec![identity_field("alpha")]).await;
        let second = spawn_responder(Ipv4Addr::LOCALHOST, 1, vec![identity_field("beta")]).await;

        let engine = DiscoveryEngine::new(test_config(vec![first, second], 400));
        let records = engine.discover().await.unwrap();

        assert_eq!(records.len(), 2);
        let mut identities: Vec<_> = records
            .iter()
            .filter_map(|r| r.identity.as_deref())
            .collect();
        identities.sort();
        assert_eq!(identities, vec!["alpha", "beta"]);

        // Both replies came over loopback: same source IP, still two
        // records, because responses are never merged.
        for record in &records {
            assert_eq!(record.source_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
            assert_eq!(record.protocol_version, 1);
        }
    }

    #[tokio::test]
    async fn test_discover_tags_records_with_responder_address() {
        // Responders on two distinct loopback addresses; each record must
        // carry the address of the responder that produced it.
        let first = spawn_responder(Ipv4Addr::LOCALHOST, 1, vec![identity_field("alpha")]).await;
        let second =
            spawn_responder(Ipv4Addr::new(127, 0, 0, 2), 1, vec![identity_field("beta")]).await;

        let engine = DiscoveryEngine::new(test_config(vec![first, second], 400));
        let records = engine.discover().await.unwrap();

        assert_eq!(records.len(), 2);
        for record in &records {
            let expected = match record.identity.as_deref() {
                Some("alpha") => IpAddr::V4(Ipv4Addr::LOCALHOST),
                Some("beta") => IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)),
                other => panic!("unexpected identity: {:?}", other),
            };
            assert_eq!(record.source_address, expected);
        }
    }

    #[tokio::test]
    async fn test_malformed_response_dropped_others_kept() {
        let good = spawn_responder(Ipv4Addr::LOCALHOST, 1, vec![identity_field("good")]).await;
        // Two bytes cannot hold the version header
        let bad = spawn_raw_responder(vec![0x00, 0x01]).await;

        let engine = DiscoveryEngine::new(test_config(vec![good, bad], 400));
        let records = engine.discover().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity.as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_discover_without_responders_returns_empty() {
        // Discard port: nothing answers there
        let silent: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let engine = DiscoveryEngine::new(test_config(vec![silent], 250));

        let started = std::time::Instant::now();
        let records = engine.discover().await.unwrap();
        let elapsed = started.elapsed();

        assert!(records.is_empty());
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_shutdown_ends_run_early() {
        let silent: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let engine = DiscoveryEngine::new(test_config(vec![silent], 10_000));

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = tx.send(true);
        });

        let started = std::time::Instant::now();
        let records = engine.discover_with_shutdown(rx).await.unwrap();

        assert!(records.is_empty());
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
