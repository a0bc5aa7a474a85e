//! Lanprobe MNDP - wire protocol support for neighbor discovery
//!
//! This crate implements the MikroTik Neighbor Discovery Protocol as seen
//! on the wire: the zeroed probe packet, the versioned TLV response format,
//! the mapping from TLV entries to device attributes, and the UDP transport
//! that carries both.

pub mod codec;
pub mod fields;
pub mod transport;

pub use codec::{decode_response, encode_probe, encode_response, DecodeError, Response, TlvField};
pub use fields::{apply_fields, tlv_type, FieldStats};
pub use transport::{RawResponse, UdpTransport, MNDP_PORT};
