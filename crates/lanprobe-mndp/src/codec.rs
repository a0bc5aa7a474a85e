//! MNDP packet encoding and decoding
//!
//! A probe is a single zeroed big-endian u32. A response starts with a
//! 4-byte big-endian version header followed by TLV entries: type (u16 BE),
//! length (u16 BE), then `length` value bytes. Response buffers come off
//! the open network and are never trusted to be well formed.

use thiserror::Error;

/// Length of the probe packet and of the response version header
pub const HEADER_LEN: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("packet too short for version header: {len} bytes")]
    ShortHeader { len: usize },
}

/// One raw type-length-value entry from a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlvField {
    pub tlv_type: u16,
    pub value: Vec<u8>,
}

/// A decoded response packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Protocol version from the header
    pub version: u32,
    /// TLV entries in wire order, repeats included
    pub fields: Vec<TlvField>,
}

/// Bounds-checked reader over a received buffer
///
/// Every read either returns the requested bytes or `None`, so the decode
/// loop below can never index past the end of the packet.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Some(bytes)
    }

    fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.take(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.take(4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Encode the discovery probe: a zeroed version field, nothing else
pub fn encode_probe() -> [u8; HEADER_LEN] {
    0u32.to_be_bytes()
}

/// Decode a response packet into its version and TLV entries
///
/// Anything shorter than the version header is malformed. A truncated
/// trailing entry is tolerated: entries decoded before the truncation
/// point are returned and the tail is ignored. A header with no entries
/// is a valid response.
pub fn decode_response(buf: &[u8]) -> Result<Response, DecodeError> {
    let mut cursor = Cursor::new(buf);

    let version = cursor
        .read_u32()
        .ok_or(DecodeError::ShortHeader { len: buf.len() })?;

    let mut fields = Vec::new();
    loop {
        let tlv_type = match cursor.read_u16() {
            Some(t) => t,
            None => break,
        };
        let len = match cursor.read_u16() {
            Some(l) => l as usize,
            None => break,
        };
        let value = match cursor.take(len) {
            Some(v) => v.to_vec(),
            None => break,
        };
        fields.push(TlvField { tlv_type, value });
    }

    Ok(Response { version, fields })
}

/// Encode a response packet from a version and TLV entries
///
/// Inverse of [`decode_response`] for well-formed input; used by test
/// responders and anything emulating the device side of the protocol.
/// Values must fit the 16 bit length field; a longer value cannot be
/// represented on the wire and trips a debug assertion.
pub fn encode_response(version: u32, fields: &[TlvField]) -> Vec<u8> {
    let body_len: usize = fields.iter().map(|f| 4 + f.value.len()).sum();
    let mut packet = Vec::with_capacity(HEADER_LEN + body_len);

    packet.extend_from_slice(&version.to_be_bytes());
    for field in fields {
        debug_assert!(
            field.value.len() <= usize::from(u16::MAX),
            "TLV value exceeds the u16 length field"
        );
        packet.extend_from_slice(&field.tlv_type.to_be_bytes());
        packet.extend_from_slice(&(field.value.len() as u16).to_be_bytes());
        packet.extend_from_slice(&field.value);
    }

    packet
}
