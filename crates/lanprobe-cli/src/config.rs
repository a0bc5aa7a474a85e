//! Configuration loading and validation

use anyhow::Result;
use lanprobe_discovery::{DiscoveryConfig, DEFAULT_TIMEOUT_MS, MNDP_PORT};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverySection {
    /// UDP port to probe and listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Broadcast address used when no targets are configured
    #[serde(default = "default_broadcast")]
    pub broadcast_addr: Ipv4Addr,
    /// Explicit probe targets (unicast or directed broadcast, addr:port)
    #[serde(default)]
    pub targets: Vec<SocketAddr>,
    /// Probe the broadcast address of every usable interface
    #[serde(default)]
    pub all_interfaces: bool,
    /// Listen window in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            port: default_port(),
            broadcast_addr: default_broadcast(),
            targets: Vec::new(),
            all_interfaces: false,
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_port() -> u16 {
    MNDP_PORT
}

fn default_broadcast() -> Ipv4Addr {
    Ipv4Addr::BROADCAST
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    /// Emit records as JSON instead of a listing
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Convert to the engine configuration
    pub fn to_discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            port: self.discovery.port,
            broadcast_addr: self.discovery.broadcast_addr,
            targets: self.discovery.targets.clone(),
            all_interfaces: self.discovery.all_interfaces,
            timeout_ms: self.discovery.timeout_ms,
        }
    }
}

/// Load configuration from file, falling back to defaults if absent
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config {
            discovery: DiscoverySection::default(),
            output: OutputSection::default(),
        })
    }
}
