//! Mapping of raw TLV entries onto device record attributes

use lanprobe_core::DeviceRecord;
use tracing::{debug, trace};

use crate::codec::TlvField;

/// TLV type codes carried in responses
///
/// Codes outside this table are reserved by the protocol and skipped.
pub mod tlv_type {
    pub const MAC_ADDRESS: u16 = 1;
    pub const IDENTITY: u16 = 2;
    pub const PLATFORM: u16 = 3;
    pub const BOARD_NAME: u16 = 4;
    pub const VERSION: u16 = 5;
    pub const UPTIME: u16 = 6;
    pub const SOFTWARE_ID: u16 = 7;
    pub const INTERFACE_NAME: u16 = 8;
}

/// Wire length of a MAC address value
const MAC_LEN: usize = 6;

/// How the entries of one response were handled
///
/// Skipping stays tolerant on the wire but is counted here so a quiet
/// network and a misbehaving responder look different in the logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldStats {
    /// Entries mapped onto a record attribute
    pub mapped: usize,
    /// Entries of a known type with an unusable value
    pub invalid: usize,
    /// Entries with an unrecognized type code
    pub unknown: usize,
}

impl FieldStats {
    /// Fold another response's counters into this one
    pub fn merge(&mut self, other: FieldStats) {
        self.mapped += other.mapped;
        self.invalid += other.invalid;
        self.unknown += other.unknown;
    }
}

/// Apply decoded TLV entries to a device record
///
/// Entries are applied in wire order, so a repeated type ends up with its
/// last value. Unusable entries are skipped and counted, never fatal.
pub fn apply_fields(record: &mut DeviceRecord, fields: &[TlvField]) -> FieldStats {
    let mut stats = FieldStats::default();

    for field in fields {
        match field.tlv_type {
            tlv_type::MAC_ADDRESS => {
                if field.value.len() == MAC_LEN {
                    record.mac_address = Some(format_mac(&field.value));
                    stats.mapped += 1;
                } else {
                    debug!(
                        len = field.value.len(),
                        "Ignoring MAC entry with bad length"
                    );
                    stats.invalid += 1;
                }
            }
            tlv_type::IDENTITY => {
                record.identity = Some(decode_text(&field.value));
                stats.mapped += 1;
            }
            tlv_type::PLATFORM => {
                record.platform = Some(decode_text(&field.value));
                stats.mapped += 1;
            }
            tlv_type::BOARD_NAME => {
                record.board_name = Some(decode_text(&field.value));
                stats.mapped += 1;
            }
            tlv_type::VERSION => {
                record.version_info = Some(decode_text(&field.value));
                stats.mapped += 1;
            }
            tlv_type::UPTIME => {
                // Vendor-specific encoding; stored opaque, never interpreted
                record.uptime = Some(decode_text(&field.value));
                stats.mapped += 1;
            }
            tlv_type::SOFTWARE_ID => {
                record.software_id = Some(decode_text(&field.value));
                stats.mapped += 1;
            }
            tlv_type::INTERFACE_NAME => {
                record.interface_name = Some(decode_text(&field.value));
                stats.mapped += 1;
            }
            other => {
                trace!(
                    tlv_type = other,
                    len = field.value.len(),
                    "Skipping unknown TLV type"
                );
                stats.unknown += 1;
            }
        }
    }

    stats
}

/// Format six raw bytes as colon-separated uppercase hex octets
fn format_mac(bytes: &[u8]) -> String {
    format!(
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]
    )
}

/// Best-effort text decode; invalid UTF-8 is substituted, never a panic
fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
