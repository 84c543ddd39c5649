//! Snapshot persistence
//!
//! Features:
//! - Versioned, environment-tagged binary envelope
//! - Fixed-width little-endian encoding
//! - All-or-nothing restore (decode fully, then install)

pub mod snapshot;

pub use snapshot::SNAPSHOT_VERSION;
