// =============================================================================
// KERNELSIM KERNEL MODULE ORGANIZATION - kernel/src/core/mod.rs
// =============================================================================

//! Core kernel functionality: the PCB table, the bounded scheduling
//! queues, and the round-robin state machine that ties them together.

// Module declarations for core components
pub mod pcb;
pub mod queue;
pub mod scheduler;

// Core exports
pub use pcb::{Pcb, PcbTable, ProcState};
pub use queue::{ReadyQueue, ReplyQueue};
pub use scheduler::{KernelState, ProcessControl, ReplyKind, ReplySlots};
