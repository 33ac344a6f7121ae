// =============================================================================
// KERNELSIM SHARED FOUNDATION - CONFIGURATION - shared/src/types/config.rs
// Tunable parameters for the kernel, its children, and the SFSS server
// =============================================================================

//! Configuration structures with defaults matching the reference workload:
//! five applications, a 500 ms quantum, twenty instructions per app, and a
//! one-in-ten syscall chance per tick.

// External dependencies
use serde::{Deserialize, Serialize};

// Internal imports
use crate::DEFAULT_SLOT_DIR;

/// Kernel supervisor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfiguration {
    /// Number of application children A1..A{n}.
    pub n_apps: usize,
    /// Scheduling quantum in milliseconds; also the app/IC pacing interval.
    pub quantum_ms: u64,
    /// SFSS endpoint the kernel sends requests to.
    pub sfss_host: String,
    pub sfss_port: u16,
    /// Directory holding the per-app reply slot files.
    pub slot_dir: String,
}

impl Default for KernelConfiguration {
    fn default() -> KernelConfiguration {
        KernelConfiguration {
            n_apps: 5,
            quantum_ms: 500,
            sfss_host: "127.0.0.1".to_string(),
            sfss_port: 8888,
            slot_dir: DEFAULT_SLOT_DIR.to_string(),
        }
    }
}

impl KernelConfiguration {
    /// The SFSS endpoint in `host:port` form.
    pub fn sfss_endpoint(&self) -> String {
        format!("{}:{}", self.sfss_host, self.sfss_port)
    }
}

/// Interrupt controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptConfiguration {
    /// Tick interval in milliseconds (one IRQ0 per tick).
    pub quantum_ms: u64,
    /// Emit IRQ1 with probability 1/irq1_prob per tick.
    pub irq1_prob: u32,
    /// Emit IRQ2 with probability 1/irq2_prob per tick.
    pub irq2_prob: u32,
}

impl Default for InterruptConfiguration {
    fn default() -> InterruptConfiguration {
        InterruptConfiguration {
            quantum_ms: 500,
            irq1_prob: 3,
            irq2_prob: 5,
        }
    }
}

/// Application child configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfiguration {
    /// Instruction budget; the app emits DONE after this many ticks.
    pub max_pc: u32,
    /// Issue a syscall with probability 1/syscall_prob per tick.
    pub syscall_prob: u32,
    /// Sleep interval per simulated instruction, in milliseconds.
    pub quantum_ms: u64,
    /// Directory holding this app's reply slot file.
    pub slot_dir: String,
}

impl Default for AppConfiguration {
    fn default() -> AppConfiguration {
        AppConfiguration {
            max_pc: 20,
            syscall_prob: 10,
            quantum_ms: 500,
            slot_dir: DEFAULT_SLOT_DIR.to_string(),
        }
    }
}

/// SFSS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SfssConfiguration {
    /// Address the datagram socket binds to.
    pub bind_addr: String,
    /// Root directory served; must contain the A0..A{n} subtree.
    pub root_dir: String,
    /// Owner directories A0..A{n} precreated at startup.
    pub n_apps: usize,
}

impl Default for SfssConfiguration {
    fn default() -> SfssConfiguration {
        SfssConfiguration {
            bind_addr: "0.0.0.0:8888".to_string(),
            root_dir: ".".to_string(),
            n_apps: 5,
        }
    }
}
