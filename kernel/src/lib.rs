// =============================================================================
// KERNELSIM KERNEL LIBRARY - kernel/src/lib.rs
// Micro-kernel simulator: scheduler core, IPC plumbing, and child mains
// =============================================================================

//! The kernelsim library.
//!
//! One binary, three roles: the kernel supervisor owns the PCB table and
//! the round-robin scheduler and multiplexes replies, IRQ lines, and
//! application lines; the interrupt controller child paces the quantum;
//! the application children run bounded instruction loops that block on
//! remote SFSS syscalls. The scheduler core is plain synchronous state
//! behind trait seams; all I/O lives in the supervisor and child mains.

// Module declarations for kernel components
pub mod app;
pub mod core;
pub mod inter;
pub mod ipc;
pub mod proc;
pub mod supervisor;

// Core scheduling exports
pub use crate::core::{KernelState, Pcb, PcbTable, ProcState, ProcessControl, ReplyKind, ReplySlots};

// IPC exports
pub use crate::ipc::{parse_app_line, AppLine, LineFramer, ReplySlot, SlotDirectory};
