//! Lanprobe Discovery - orchestration of neighbor discovery runs
//!
//! This crate drives the MNDP transport and codec: one `discover()` call
//! binds a socket, probes the configured targets, collects replies for the
//! configured window, and decodes them into device records.

pub mod engine;

pub use engine::{DiscoveryConfig, DiscoveryEngine, DiscoveryError, DEFAULT_TIMEOUT_MS};
pub use lanprobe_mndp::MNDP_PORT;
