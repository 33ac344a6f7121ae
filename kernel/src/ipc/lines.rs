// =============================================================================
// KERNELSIM KERNEL IPC - LINE FRAMER - kernel/src/ipc/lines.rs
// Newline-delimited frame parser holding the partial remainder
// =============================================================================

// External dependencies
use log::warn;

/// Splits a byte stream into complete newline-terminated lines.
///
/// Bytes are fed in arbitrary chunks; only complete lines are surfaced and
/// the partial remainder is retained for the next push. A remainder that
/// outgrows the capacity without ever seeing a newline is discarded, so a
/// misbehaving writer cannot grow the buffer without bound.
#[derive(Debug)]
pub struct LineFramer {
    buf: Vec<u8>,
    capacity: usize,
}

impl LineFramer {
    pub fn new(capacity: usize) -> LineFramer {
        LineFramer {
            buf: Vec::new(),
            capacity,
        }
    }

    /// Append a chunk and drain every complete line it finishes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..line.len() - 1]).into_owned());
        }

        if self.buf.len() > self.capacity {
            warn!(
                "discarding {} unterminated buffered bytes",
                self.buf.len()
            );
            self.buf.clear();
        }
        lines
    }

    /// Bytes currently buffered awaiting their newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
