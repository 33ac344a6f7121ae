// =============================================================================
// KERNELSIM SHARED FOUNDATION - ERROR TAXONOMY - shared/src/types/error.rs
// Typed failures for the protocol codec and the reply-slot mailboxes
// =============================================================================

// External dependencies
use thiserror::Error;

/// Failures at the SFP wire boundary. Everything past the boundary travels
/// in-band as a negative status field instead.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to encode SFP record: {0}")]
    Encode(String),

    #[error("failed to decode SFP record: {0}")]
    Decode(String),

    #[error("SFP field `{0}` exceeds its protocol bound ({1} bytes/entries)")]
    FieldTooLong(&'static str, usize),

    #[error("encoded SFP record is {0} bytes, beyond the wire capacity")]
    RecordTooLarge(usize),
}

/// Failures of the per-application reply slot files.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("slot file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("slot for A{0} holds no message")]
    Empty(usize),

    #[error("no slot exists for A{0}")]
    OutOfRange(usize),

    #[error("slot record is malformed: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("encoded reply ({0} bytes) exceeds the slot capacity")]
    Oversize(usize),
}
