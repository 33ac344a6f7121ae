// =============================================================================
// KERNELSIM KERNEL CORE - BOUNDED QUEUES - kernel/src/core/queue.rs
// Ready queue of PCB indices and the two SFSS reply FIFOs
// =============================================================================

// External dependencies
use std::collections::VecDeque;

// Internal imports
use shared::SfpMessage;

/// FIFO of PCB indices awaiting the CPU, bounded to the number of apps.
/// An index is held at most once; duplicates and overflow are refused.
#[derive(Debug)]
pub struct ReadyQueue {
    queue: VecDeque<usize>,
    capacity: usize,
}

impl ReadyQueue {
    pub fn new(capacity: usize) -> ReadyQueue {
        ReadyQueue {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push to the tail. Returns `false` when the queue is full or the
    /// index is already enqueued.
    pub fn push_tail(&mut self, idx: usize) -> bool {
        if self.queue.len() >= self.capacity || self.queue.contains(&idx) {
            return false;
        }
        self.queue.push_back(idx);
        true
    }

    pub fn pop_head(&mut self) -> Option<usize> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.queue.contains(&idx)
    }

    /// Head-to-tail view, as printed by the snapshot.
    pub fn iter(&self) -> impl Iterator<Item = &usize> {
        self.queue.iter()
    }
}

/// Bounded FIFO of SFSS replies awaiting an IRQ1/IRQ2 dispatch.
#[derive(Debug)]
pub struct ReplyQueue {
    queue: VecDeque<SfpMessage>,
    capacity: usize,
}

impl ReplyQueue {
    pub fn new(capacity: usize) -> ReplyQueue {
        ReplyQueue {
            queue: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueue a reply in arrival order. On overflow the reply is handed
    /// back so the caller can log the drop.
    pub fn push(&mut self, msg: SfpMessage) -> Result<(), SfpMessage> {
        if self.queue.len() >= self.capacity {
            return Err(msg);
        }
        self.queue.push_back(msg);
        Ok(())
    }

    pub fn pop(&mut self) -> Option<SfpMessage> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
