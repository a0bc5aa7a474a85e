//! Lanprobe Core - Record types for discovered neighbors
//!
//! This crate provides the foundational types for the lanprobe system:
//! - Device records produced by a discovery run
//! - Shared conventions for attribute formatting

pub mod record;

pub use record::DeviceRecord;
