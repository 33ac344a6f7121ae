// =============================================================================
// KERNELSIM KERNEL CORE - PROCESS CONTROL BLOCKS - kernel/src/core/pcb.rs
// Per-application records and the PCB table
// =============================================================================

//! Process control blocks.
//!
//! One PCB per logical application A1..A{N}, created once at kernel start
//! and never recycled. `Terminated` is absorbing: the table refuses every
//! transition out of it.

// External dependencies
use std::fmt;

// Internal imports
use shared::SfpMessage;

/// Scheduling state of one application process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

impl fmt::Display for ProcState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcState::Ready => "READY",
            ProcState::Running => "RUNNING",
            ProcState::Blocked => "BLOCKED",
            ProcState::Terminated => "TERMINATED",
        };
        f.write_str(s)
    }
}

/// One process control block.
#[derive(Debug, Clone)]
pub struct Pcb {
    /// OS pid of the child process; 0 until the child is registered.
    pub pid: u32,
    /// Logical id, 1..=N.
    pub id: usize,
    pub state: ProcState,
    /// Last program counter the app reported in a TICK or DONE line.
    pub pc: u32,
    /// The in-flight syscall; `Some` exactly while the PCB is Blocked.
    pub pending_syscall: Option<SfpMessage>,
}

/// The fixed table of PCBs, indexed 0..N for apps A1..A{N}.
#[derive(Debug)]
pub struct PcbTable {
    pcbs: Vec<Pcb>,
}

impl PcbTable {
    /// Build the table with every PCB Ready and unregistered.
    pub fn new(n_apps: usize) -> PcbTable {
        let pcbs = (0..n_apps)
            .map(|i| Pcb {
                pid: 0,
                id: i + 1,
                state: ProcState::Ready,
                pc: 0,
                pending_syscall: None,
            })
            .collect();
        PcbTable { pcbs }
    }

    pub fn len(&self) -> usize {
        self.pcbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pcbs.is_empty()
    }

    pub fn get(&self, idx: usize) -> &Pcb {
        &self.pcbs[idx]
    }

    /// Record the spawned child's OS pid.
    pub fn register_pid(&mut self, idx: usize, pid: u32) {
        self.pcbs[idx].pid = pid;
    }

    pub fn state(&self, idx: usize) -> ProcState {
        self.pcbs[idx].state
    }

    pub fn pid(&self, idx: usize) -> u32 {
        self.pcbs[idx].pid
    }

    /// Transition `idx` to `state`. Terminated is absorbing: a transition
    /// out of it is refused and reported as `false`.
    pub fn set_state(&mut self, idx: usize, state: ProcState) -> bool {
        if self.pcbs[idx].state == ProcState::Terminated && state != ProcState::Terminated {
            return false;
        }
        self.pcbs[idx].state = state;
        if state != ProcState::Blocked {
            self.pcbs[idx].pending_syscall = None;
        }
        true
    }

    /// Block `idx` and save the syscall snapshot the reply will answer.
    pub fn block_on(&mut self, idx: usize, request: SfpMessage) -> bool {
        if self.pcbs[idx].state == ProcState::Terminated {
            return false;
        }
        self.pcbs[idx].state = ProcState::Blocked;
        self.pcbs[idx].pending_syscall = Some(request);
        true
    }

    pub fn set_pc(&mut self, idx: usize, pc: u32) {
        self.pcbs[idx].pc = pc;
    }

    /// Resolve a child's OS pid to its table index.
    pub fn index_of_pid(&self, pid: u32) -> Option<usize> {
        self.pcbs.iter().position(|p| p.pid == pid)
    }

    /// Resolve a protocol owner id (1..=N) to its table index.
    pub fn index_of_owner(&self, owner: i32) -> Option<usize> {
        if owner >= 1 && (owner as usize) <= self.pcbs.len() {
            Some(owner as usize - 1)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pcb> {
        self.pcbs.iter()
    }

    pub fn indices_in_state(&self, state: ProcState) -> Vec<usize> {
        self.pcbs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.state == state)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn any_in_state(&self, state: ProcState) -> bool {
        self.pcbs.iter().any(|p| p.state == state)
    }

    pub fn all_terminated(&self) -> bool {
        self.pcbs.iter().all(|p| p.state == ProcState::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SfpMessage;

    #[test]
    fn terminated_is_absorbing() {
        let mut table = PcbTable::new(2);
        assert!(table.set_state(0, ProcState::Terminated));
        assert!(!table.set_state(0, ProcState::Ready));
        assert!(!table.block_on(0, SfpMessage::list_request(1, "/A1")));
        assert_eq!(table.state(0), ProcState::Terminated);
    }

    #[test]
    fn blocking_saves_and_unblocking_clears_the_snapshot() {
        let mut table = PcbTable::new(1);
        let req = SfpMessage::read_request(1, "/A1/file.txt", 16);
        assert!(table.block_on(0, req.clone()));
        assert_eq!(table.get(0).pending_syscall.as_ref(), Some(&req));

        assert!(table.set_state(0, ProcState::Ready));
        assert!(table.get(0).pending_syscall.is_none());
    }

    #[test]
    fn pid_and_owner_resolution() {
        let mut table = PcbTable::new(3);
        table.register_pid(0, 100);
        table.register_pid(1, 101);
        table.register_pid(2, 102);
        assert_eq!(table.index_of_pid(101), Some(1));
        assert_eq!(table.index_of_pid(999), None);
        assert_eq!(table.index_of_owner(1), Some(0));
        assert_eq!(table.index_of_owner(3), Some(2));
        assert_eq!(table.index_of_owner(0), None);
        assert_eq!(table.index_of_owner(4), None);
    }
}
