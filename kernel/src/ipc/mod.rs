// =============================================================================
// KERNELSIM KERNEL IPC - kernel/src/ipc/mod.rs
// =============================================================================

//! Channel plumbing between the kernel and its children: the line framer
//! for the stdout pipes, the syscall line grammar, and the per-application
//! reply slot mailboxes.

// Module declarations for IPC components
pub mod lines;
pub mod slots;
pub mod syscall;

// IPC exports
pub use lines::LineFramer;
pub use slots::{ReplySlot, SlotDirectory};
pub use syscall::{parse_app_line, AppLine};
