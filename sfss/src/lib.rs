// =============================================================================
// SFSS SERVER LIBRARY - sfss/src/lib.rs
// Simple File Storage Service over UDP datagrams
// =============================================================================

//! The Simple File Storage Service.
//!
//! A stateless, single-task datagram server. Every incoming SFP request is
//! authorized against the owner-prefix rule, dispatched to one of the five
//! file/directory operations, and answered with the mirrored reply variant
//! on the same socket. Failures travel in-band as negative status fields;
//! the server itself only terminates on startup errors.

// Module declarations
pub mod ops;
pub mod permission;
pub mod server;

// Server exports
pub use server::SfssServer;
