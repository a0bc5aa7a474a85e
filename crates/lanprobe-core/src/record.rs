//! Device records produced by a discovery run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A device that answered a discovery probe
///
/// One record is produced per accepted response. Records are never merged:
/// two responses sharing a MAC or source address yield two records, and
/// reconciling them against an inventory is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Address the response arrived from
    pub source_address: IpAddr,
    /// Protocol version from the response header
    pub protocol_version: u32,
    /// When the response was captured
    pub discovered_at: DateTime<Utc>,
    /// MAC address formatted as colon-separated uppercase hex octets
    pub mac_address: Option<String>,
    /// Administratively assigned device name
    pub identity: Option<String>,
    /// Platform / product family
    pub platform: Option<String>,
    /// Hardware board name
    pub board_name: Option<String>,
    /// Software version string
    pub version_info: Option<String>,
    /// Uptime as reported on the wire (vendor-specific encoding, kept opaque)
    pub uptime: Option<String>,
    /// Software license / installation identifier
    pub software_id: Option<String>,
    /// Name of the interface the device answered on
    pub interface_name: Option<String>,
}

impl DeviceRecord {
    /// Create a record with the always-present fields, everything else unset
    pub fn new(source_address: IpAddr, protocol_version: u32) -> Self {
        Self {
            source_address,
            protocol_version,
            discovered_at: Utc::now(),
            mac_address: None,
            identity: None,
            platform: None,
            board_name: None,
            version_info: None,
            uptime: None,
            software_id: None,
            interface_name: None,
        }
    }

    /// Best human-readable name for the device
    pub fn display_name(&self) -> String {
        self.identity
            .clone()
            .or_else(|| self.board_name.clone())
            .or_else(|| self.mac_address.clone())
            .unwrap_or_else(|| format!("device-{}", self.source_address))
    }
}
