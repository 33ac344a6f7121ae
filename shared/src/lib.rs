// =============================================================================
// KERNELSIM SHARED FOUNDATION - shared/src/lib.rs
// Protocol, configuration, and error types shared by the kernel and SFSS
// =============================================================================

//! Shared foundation for the kernelsim workspace.
//!
//! Everything the kernel supervisor, its child processes, and the SFSS
//! server must agree on lives here: the SFP wire protocol, the global
//! sizing constants, the configuration structures, and the error taxonomy.

// Module declarations
pub mod protocol;
pub mod types;

// =============================================================================
// GLOBAL PROTOCOL CONSTANTS
// =============================================================================

/// File reads and writes always move one 16-byte block.
pub const SFP_PAYLOAD_SIZE: usize = 16;

/// A directory listing carries at most this many entries.
pub const SFP_MAX_NAMES_IN_DIR: usize = 40;

/// Upper bound on any path carried in an SFP message.
pub const SFP_MAX_PATH_LEN: usize = 512;

/// Upper bound on the concatenated name buffer of a listing reply.
pub const SFP_MAX_ALLFILENAMES_LEN: usize = 2048;

/// Static bound on the encoded size of one SFP record. Sized from the
/// field maxima above plus bincode framing; receive buffers and reply
/// slots are allocated at this capacity.
pub const SFP_WIRE_CAPACITY: usize = 4096;

/// Well-known directory holding the per-application reply slot files.
/// The moral equivalent of a fixed shared-memory key base: apps locate
/// their mailbox by convention, not by environment.
pub const DEFAULT_SLOT_DIR: &str = "/tmp/kernelsim";

// Protocol re-exports
pub use protocol::{FstEntry, SfpMessage, SfpMsgType, SfpStatus};

// Configuration re-exports
pub use types::config::{AppConfiguration, InterruptConfiguration, KernelConfiguration, SfssConfiguration};

// Error re-exports
pub use types::error::{ProtocolError, SlotError};
