// =============================================================================
// KERNELSIM KERNEL CORE - ROUND-ROBIN SCHEDULER - kernel/src/core/scheduler.rs
// PCB state machine, ready queue rotation, and reply dispatch
// =============================================================================

//! The kernel state machine.
//!
//! Every mutable scheduling structure lives in one owned [`KernelState`]
//! value: the PCB table, the ready queue, the two reply FIFOs and the
//! running index. The supervisor task is the only mutator; signal handlers
//! and reader tasks merely feed it events. Child stop/continue and reply
//! delivery cross the [`ProcessControl`] and [`ReplySlots`] trait seams so
//! the whole machine runs under test against mocks.

// External dependencies
use log::{debug, info, warn};
use std::fmt::Write as _;

// Internal imports
use crate::core::pcb::{PcbTable, ProcState};
use crate::core::queue::{ReadyQueue, ReplyQueue};
use shared::{SfpMessage, SlotError};

/// Stop/continue control over the scheduled children. The production
/// implementation signals SIGSTOP/SIGCONT; tests record the calls.
pub trait ProcessControl {
    fn stop(&mut self, pid: u32);
    fn resume(&mut self, pid: u32);
}

/// Delivery of one reply into an application's shared slot, performed
/// immediately before the Blocked -> Ready transition.
pub trait ReplySlots {
    fn deliver(&mut self, app_id: usize, msg: &SfpMessage) -> Result<(), SlotError>;
}

/// Which reply FIFO an IRQ line drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    File,
    Directory,
}

/// The owned kernel scheduling state.
#[derive(Debug)]
pub struct KernelState {
    pcbs: PcbTable,
    ready: ReadyQueue,
    file_replies: ReplyQueue,
    dir_replies: ReplyQueue,
    running: Option<usize>,
}

impl KernelState {
    /// Build the state for `n_apps` applications: every PCB Ready, both
    /// FIFOs empty, nothing running. Call [`enqueue_initial`] once the
    /// children are registered.
    ///
    /// [`enqueue_initial`]: KernelState::enqueue_initial
    pub fn new(n_apps: usize) -> KernelState {
        KernelState {
            pcbs: PcbTable::new(n_apps),
            ready: ReadyQueue::new(n_apps),
            file_replies: ReplyQueue::new(n_apps),
            dir_replies: ReplyQueue::new(n_apps),
            running: None,
        }
    }

    pub fn register_pid(&mut self, idx: usize, pid: u32) {
        self.pcbs.register_pid(idx, pid);
    }

    /// Seed the ready queue with every application, A1 first.
    pub fn enqueue_initial(&mut self) {
        for idx in 0..self.pcbs.len() {
            self.ready.push_tail(idx);
        }
    }

    pub fn running_index(&self) -> Option<usize> {
        self.running
    }

    /// OS pid of the currently running child, if any is still Running.
    pub fn running_pid(&self) -> Option<u32> {
        self.running
            .filter(|&idx| self.pcbs.state(idx) == ProcState::Running)
            .map(|idx| self.pcbs.pid(idx))
    }

    pub fn all_terminated(&self) -> bool {
        self.pcbs.all_terminated()
    }

    /// Scheduling state of one PCB by table index.
    pub fn pcb_state(&self, idx: usize) -> ProcState {
        self.pcbs.state(idx)
    }

    /// Pick the next Ready PCB and hand it the CPU.
    ///
    /// Pops the head up to |Q| times: the first Ready index becomes
    /// Running (demoting any still-Running predecessor to the tail),
    /// Blocked indices rotate to the tail, Terminated indices are
    /// discarded. When the pass finds nothing but Ready PCBs exist
    /// outside the queue, the queue is reconciled from the PCB states and
    /// the pass retried; with nothing Ready at all the CPU goes idle.
    pub fn schedule_next(&mut self, ctl: &mut impl ProcessControl) {
        let mut tries = self.ready.len();
        while tries > 0 {
            tries -= 1;
            let Some(next) = self.ready.pop_head() else {
                break;
            };
            match self.pcbs.state(next) {
                ProcState::Ready => {
                    self.demote_running(ctl);
                    ctl.resume(self.pcbs.pid(next));
                    self.pcbs.set_state(next, ProcState::Running);
                    self.running = Some(next);
                    info!("now running A{} (pid {})", next + 1, self.pcbs.pid(next));
                    return;
                }
                ProcState::Terminated => {} // drop from the queue
                _ => {
                    // Blocked stays queued but is skipped until unblocked.
                    self.ready.push_tail(next);
                }
            }
        }

        // No Ready index surfaced in the pass.
        self.demote_running(ctl);

        if self.ready.is_empty() {
            let stranded = self.pcbs.indices_in_state(ProcState::Ready);
            if !stranded.is_empty() {
                // Ready PCBs exist outside the queue; rebuild and retry.
                warn!("ready queue lost {} Ready PCBs, reconciling", stranded.len());
                for idx in stranded {
                    self.ready.push_tail(idx);
                }
                return self.schedule_next(ctl);
            }
            self.running = None;
            if !self.pcbs.any_in_state(ProcState::Blocked) {
                info!("IDLE (no READY processes)");
            }
        } else {
            self.running = None;
        }
    }

    /// Demote a still-Running current PCB: stop the child, mark it Ready,
    /// rotate it to the tail.
    fn demote_running(&mut self, ctl: &mut impl ProcessControl) {
        if let Some(cur) = self.running {
            if self.pcbs.state(cur) == ProcState::Running {
                ctl.stop(self.pcbs.pid(cur));
                self.pcbs.set_state(cur, ProcState::Ready);
                self.ready.push_tail(cur);
            }
            self.running = None;
        }
    }

    /// IRQ0: the quantum expired. Rotate the running PCB to the tail and
    /// pick the next one.
    pub fn on_quantum_tick(&mut self, ctl: &mut impl ProcessControl) {
        self.demote_running(ctl);
        self.schedule_next(ctl);
    }

    /// An application line was classified as a syscall. Blocks the PCB,
    /// saves the request snapshot, and returns the request for transmission
    /// to SFSS; `None` when the pid is unknown or already Terminated.
    pub fn on_syscall(
        &mut self,
        pid: u32,
        request: SfpMessage,
        ctl: &mut impl ProcessControl,
    ) -> Option<SfpMessage> {
        let idx = match self.pcbs.index_of_pid(pid) {
            Some(idx) => idx,
            None => {
                warn!("syscall from unknown pid {}", pid);
                return None;
            }
        };
        if !self.pcbs.block_on(idx, request.clone()) {
            warn!("syscall from terminated A{}", idx + 1);
            return None;
        }
        info!(
            "SYSCALL A{} (pid {}): {:?} -> BLOCKED",
            idx + 1,
            pid,
            request.msg_type
        );
        ctl.stop(pid);

        if self.running == Some(idx) {
            self.running = None;
            self.schedule_next(ctl);
        } else if self.running.is_none() {
            self.schedule_next(ctl);
        }
        Some(request)
    }

    /// A TICK line: record the reported program counter.
    pub fn on_tick(&mut self, pid: u32, pc: u32) {
        if let Some(idx) = self.pcbs.index_of_pid(pid) {
            if self.pcbs.state(idx) != ProcState::Terminated {
                self.pcbs.set_pc(idx, pc);
            }
        }
    }

    /// A DONE line: the app finished its instruction budget.
    pub fn on_done(&mut self, pid: u32, pc: u32, ctl: &mut impl ProcessControl) {
        let Some(idx) = self.pcbs.index_of_pid(pid) else {
            return;
        };
        if self.pcbs.state(idx) == ProcState::Terminated {
            return;
        }
        self.pcbs.set_pc(idx, pc);
        self.pcbs.set_state(idx, ProcState::Terminated);
        info!("A{} (pid {}) finished", idx + 1, pid);
        if self.running == Some(idx) {
            self.running = None;
            self.schedule_next(ctl);
        }
    }

    /// A child was reaped. Terminal regardless of prior state; the
    /// scheduler re-picks if it held the CPU.
    pub fn on_child_exit(&mut self, pid: u32, ctl: &mut impl ProcessControl) {
        let Some(idx) = self.pcbs.index_of_pid(pid) else {
            return;
        };
        if self.pcbs.state(idx) == ProcState::Terminated {
            return;
        }
        self.pcbs.set_state(idx, ProcState::Terminated);
        info!("(reap) A{} (pid {}) TERMINATED", idx + 1, pid);
        if self.running == Some(idx) {
            self.running = None;
            self.schedule_next(ctl);
        }
    }

    /// A reply datagram arrived from SFSS: append it to the FIFO of its
    /// kind. Overflow drops the reply; an overflow can only concern a PCB
    /// that is no longer Blocked on it.
    pub fn enqueue_reply(&mut self, msg: SfpMessage) {
        let queue = if msg.msg_type.is_file_reply() {
            &mut self.file_replies
        } else if msg.msg_type.is_dir_reply() {
            &mut self.dir_replies
        } else {
            warn!("unknown reply type {:?} from SFSS", msg.msg_type);
            return;
        };
        debug!("queued {:?} for owner {}", msg.msg_type, msg.owner);
        if let Err(dropped) = queue.push(msg) {
            warn!(
                "reply queue full, dropping {:?} for owner {}",
                dropped.msg_type, dropped.owner
            );
        }
    }

    /// IRQ1/IRQ2: pop the head of the file or directory FIFO, copy it into
    /// the owner's shared slot, and unblock the owner. A reply whose owner
    /// is out of range or not Blocked is logged and dropped; an empty FIFO
    /// makes the IRQ spurious.
    pub fn on_reply_irq(
        &mut self,
        kind: ReplyKind,
        ctl: &mut impl ProcessControl,
        slots: &mut impl ReplySlots,
    ) {
        let queue = match kind {
            ReplyKind::File => &mut self.file_replies,
            ReplyKind::Directory => &mut self.dir_replies,
        };
        let Some(msg) = queue.pop() else {
            debug!("spurious {:?} IRQ with empty reply queue", kind);
            return;
        };

        let Some(idx) = self.pcbs.index_of_owner(msg.owner) else {
            warn!("reply for out-of-range owner {} dropped", msg.owner);
            return;
        };
        if self.pcbs.state(idx) != ProcState::Blocked {
            warn!(
                "reply {:?} for A{} dropped: not BLOCKED",
                msg.msg_type,
                idx + 1
            );
            return;
        }

        if let Err(e) = slots.deliver(idx + 1, &msg) {
            warn!("slot delivery to A{} failed: {}", idx + 1, e);
            return;
        }
        self.pcbs.set_state(idx, ProcState::Ready);
        self.ready.push_tail(idx);
        info!(
            "{:?} -> unblocked A{} (pid {})",
            msg.msg_type,
            idx + 1,
            self.pcbs.pid(idx)
        );
        if self.running.is_none() {
            self.schedule_next(ctl);
        }
    }

    /// Render the paused-state snapshot: every PCB, the ready queue head
    /// to tail, the running id, and both FIFO depths. Read-only.
    pub fn snapshot_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "================ SNAPSHOT (paused) =================");
        for pcb in self.pcbs.iter() {
            let _ = write!(
                out,
                "A{} (PID {}): PC={}, state={}",
                pcb.id, pcb.pid, pcb.pc, pcb.state
            );
            if pcb.state == ProcState::Blocked {
                if let Some(pending) = &pcb.pending_syscall {
                    let _ = write!(out, ", waiting SFP_MSG {:?}", pending.msg_type);
                }
            }
            if pcb.state == ProcState::Terminated {
                let _ = write!(out, " (TERMINATED)");
            }
            let _ = writeln!(out);
        }
        if self.ready.is_empty() {
            let _ = writeln!(out, "READY Q: (empty)");
        } else {
            let ids: Vec<String> = self.ready.iter().map(|idx| format!("A{}", idx + 1)).collect();
            let _ = writeln!(out, "READY Q: {}", ids.join(" "));
        }
        match self.running {
            Some(idx) => {
                let _ = writeln!(out, "RUNNING: A{}", idx + 1);
            }
            None => {
                let _ = writeln!(out, "RUNNING: (none)");
            }
        }
        let _ = writeln!(
            out,
            "File-Q: {} waiting / Dir-Q: {} waiting",
            self.file_replies.len(),
            self.dir_replies.len()
        );
        let _ = writeln!(out, "====================================================");
        out
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SfpMsgType;

    /// Records every stop/resume call for assertion.
    #[derive(Default)]
    struct MockControl {
        stopped: Vec<u32>,
        resumed: Vec<u32>,
    }

    impl ProcessControl for MockControl {
        fn stop(&mut self, pid: u32) {
            self.stopped.push(pid);
        }
        fn resume(&mut self, pid: u32) {
            self.resumed.push(pid);
        }
    }

    /// Captures delivered replies per app id.
    #[derive(Default)]
    struct MockSlots {
        delivered: Vec<(usize, SfpMessage)>,
    }

    impl ReplySlots for MockSlots {
        fn deliver(&mut self, app_id: usize, msg: &SfpMessage) -> Result<(), SlotError> {
            self.delivered.push((app_id, msg.clone()));
            Ok(())
        }
    }

    fn state_with_children(n: usize) -> KernelState {
        let mut state = KernelState::new(n);
        for idx in 0..n {
            state.register_pid(idx, 100 + idx as u32);
        }
        state.enqueue_initial();
        state
    }

    #[test]
    fn round_robin_rotates_in_order() {
        let mut state = state_with_children(3);
        let mut ctl = MockControl::default();

        state.schedule_next(&mut ctl);
        assert_eq!(state.running_index(), Some(0));

        state.on_quantum_tick(&mut ctl);
        assert_eq!(state.running_index(), Some(1));

        state.on_quantum_tick(&mut ctl);
        assert_eq!(state.running_index(), Some(2));

        state.on_quantum_tick(&mut ctl);
        assert_eq!(state.running_index(), Some(0));

        assert_eq!(ctl.resumed, vec![100, 101, 102, 100]);
        assert_eq!(ctl.stopped, vec![100, 101, 102]);
    }

    #[test]
    fn at_most_one_pcb_is_running() {
        let mut state = state_with_children(5);
        let mut ctl = MockControl::default();
        state.schedule_next(&mut ctl);
        for _ in 0..7 {
            state.on_quantum_tick(&mut ctl);
            let running = (0..5)
                .filter(|&i| state.pcb_state(i) == ProcState::Running)
                .count();
            assert_eq!(running, 1);
        }
    }

    #[test]
    fn syscall_blocks_and_reschedules() {
        let mut state = state_with_children(2);
        let mut ctl = MockControl::default();
        state.schedule_next(&mut ctl);
        assert_eq!(state.running_index(), Some(0));

        let req = SfpMessage::read_request(1, "/A1/file.txt", 0);
        let sent = state.on_syscall(100, req.clone(), &mut ctl);
        assert_eq!(sent, Some(req));
        assert_eq!(state.pcb_state(0), ProcState::Blocked);
        // The CPU moved on to A2.
        assert_eq!(state.running_index(), Some(1));
    }

    #[test]
    fn blocked_pcbs_rotate_but_are_skipped() {
        let mut state = state_with_children(2);
        let mut ctl = MockControl::default();
        state.schedule_next(&mut ctl);
        state.on_syscall(100, SfpMessage::list_request(1, "/A1"), &mut ctl);
        assert_eq!(state.running_index(), Some(1));

        // A1 stays Blocked outside the queue; ticks keep the CPU on A2.
        state.on_quantum_tick(&mut ctl);
        assert_eq!(state.running_index(), Some(1));
        state.on_quantum_tick(&mut ctl);
        assert_eq!(state.running_index(), Some(1));
    }

    #[test]
    fn reply_unblocks_owner_through_the_slot() {
        let mut state = state_with_children(2);
        let mut ctl = MockControl::default();
        let mut slots = MockSlots::default();
        state.schedule_next(&mut ctl);
        state.on_syscall(100, SfpMessage::read_request(1, "/A1/f", 0), &mut ctl);

        let mut reply = SfpMessage::new(SfpMsgType::RdRep, 1);
        reply.offset = 0;
        state.enqueue_reply(reply.clone());
        state.on_reply_irq(ReplyKind::File, &mut ctl, &mut slots);

        assert_eq!(state.pcb_state(0), ProcState::Ready);
        assert_eq!(slots.delivered, vec![(1, reply)]);
    }

    #[test]
    fn reply_for_non_blocked_owner_is_dropped() {
        let mut state = state_with_children(2);
        let mut ctl = MockControl::default();
        let mut slots = MockSlots::default();
        state.schedule_next(&mut ctl);

        // A1 is Running, not Blocked: the reply must be dropped.
        state.enqueue_reply(SfpMessage::new(SfpMsgType::WrRep, 1));
        state.on_reply_irq(ReplyKind::File, &mut ctl, &mut slots);
        assert!(slots.delivered.is_empty());
        assert_eq!(state.pcb_state(0), ProcState::Running);

        // Out-of-range owner likewise.
        state.enqueue_reply(SfpMessage::new(SfpMsgType::WrRep, 9));
        state.on_reply_irq(ReplyKind::File, &mut ctl, &mut slots);
        assert!(slots.delivered.is_empty());
    }

    #[test]
    fn spurious_irq_with_empty_queue_is_ignored() {
        let mut state = state_with_children(1);
        let mut ctl = MockControl::default();
        let mut slots = MockSlots::default();
        state.schedule_next(&mut ctl);
        state.on_reply_irq(ReplyKind::Directory, &mut ctl, &mut slots);
        assert!(slots.delivered.is_empty());
        assert_eq!(state.running_index(), Some(0));
    }

    #[test]
    fn file_and_dir_replies_dispatch_in_arrival_order() {
        let mut state = state_with_children(3);
        let mut ctl = MockControl::default();
        let mut slots = MockSlots::default();
        state.schedule_next(&mut ctl);

        state.on_syscall(100, SfpMessage::read_request(1, "/A1/f", 0), &mut ctl);
        state.on_syscall(101, SfpMessage::read_request(2, "/A2/f", 0), &mut ctl);

        state.enqueue_reply(SfpMessage::new(SfpMsgType::RdRep, 1));
        state.enqueue_reply(SfpMessage::new(SfpMsgType::RdRep, 2));

        state.on_reply_irq(ReplyKind::File, &mut ctl, &mut slots);
        state.on_reply_irq(ReplyKind::File, &mut ctl, &mut slots);
        let owners: Vec<usize> = slots.delivered.iter().map(|(id, _)| *id).collect();
        assert_eq!(owners, vec![1, 2]);
    }

    #[test]
    fn done_terminates_and_hands_off_the_cpu() {
        let mut state = state_with_children(2);
        let mut ctl = MockControl::default();
        state.schedule_next(&mut ctl);
        state.on_done(100, 20, &mut ctl);
        assert_eq!(state.pcb_state(0), ProcState::Terminated);
        assert_eq!(state.running_index(), Some(1));

        state.on_done(101, 20, &mut ctl);
        assert!(state.all_terminated());
        assert_eq!(state.running_index(), None);
    }

    #[test]
    fn terminated_indices_drop_out_of_the_queue() {
        let mut state = state_with_children(3);
        let mut ctl = MockControl::default();
        state.schedule_next(&mut ctl);
        // A2 dies while still queued.
        state.on_child_exit(101, &mut ctl);
        state.on_quantum_tick(&mut ctl);
        // The scheduler skipped the corpse and picked A3.
        assert_eq!(state.running_index(), Some(2));
        state.on_quantum_tick(&mut ctl);
        assert_eq!(state.running_index(), Some(0));
    }

    #[test]
    fn queue_is_reconciled_from_pcb_states() {
        let mut state = KernelState::new(2);
        state.register_pid(0, 100);
        state.register_pid(1, 101);
        // Both PCBs Ready but nothing was ever enqueued.
        let mut ctl = MockControl::default();
        state.schedule_next(&mut ctl);
        assert_eq!(state.running_index(), Some(0));
        // The other Ready PCB was recovered into the queue.
        state.on_quantum_tick(&mut ctl);
        assert_eq!(state.running_index(), Some(1));
    }

    #[test]
    fn snapshot_reports_states_queue_and_depths() {
        let mut state = state_with_children(2);
        let mut ctl = MockControl::default();
        state.schedule_next(&mut ctl);
        state.on_syscall(101, SfpMessage::list_request(2, "/A2"), &mut ctl);
        state.enqueue_reply(SfpMessage::new(SfpMsgType::DlRep, 2));

        let report = state.snapshot_report();
        assert!(report.contains("A1 (PID 100)"));
        assert!(report.contains("state=BLOCKED, waiting SFP_MSG DlReq"));
        assert!(report.contains("RUNNING: A1"));
        assert!(report.contains("File-Q: 0 waiting / Dir-Q: 1 waiting"));
    }
}
