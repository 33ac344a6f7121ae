// =============================================================================
// KERNELSIM KERNEL - INTERRUPT CONTROLLER - kernel/src/inter.rs
// Paced IRQ0 tick with probabilistic IRQ1/IRQ2 lines
// =============================================================================

//! The interrupt controller child.
//!
//! One paced loop: every quantum it emits the literal `IRQ0` line on its
//! stdout pipe, plus `IRQ1` with probability 1/irq1_prob and `IRQ2` with
//! probability 1/irq2_prob. The controller has no view of the kernel's
//! reply queues; spurious completion lines are the kernel's problem.
//! SIGINT suspends emission, SIGCONT reactivates it.

// External dependencies
use anyhow::{Context, Result as AnyhowResult};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::signal::unix::{signal, SignalKind};

// Internal imports
use shared::InterruptConfiguration;

/// Poll interval while emission is paused.
const PAUSE_POLL_MS: u64 = 100;

/// Run the interrupt controller until the kernel terminates it.
pub async fn run(config: InterruptConfiguration) -> AnyhowResult<()> {
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to install IC pause handler")?;
    let mut sigcont = signal(SignalKind::from_raw(nix::libc::SIGCONT))
        .context("failed to install IC resume handler")?;

    let mut rng = StdRng::from_entropy();
    let mut stdout = tokio::io::stdout();
    let mut paused = false;

    loop {
        let nap = Duration::from_millis(if paused { PAUSE_POLL_MS } else { config.quantum_ms });
        tokio::select! {
            _ = sigint.recv() => {
                paused = true;
            }
            _ = sigcont.recv() => {
                paused = false;
            }
            _ = tokio::time::sleep(nap) => {
                if paused {
                    continue;
                }
                emit(&mut stdout, "IRQ0\n").await?;
                if rng.gen_range(0..config.irq1_prob) == 0 {
                    emit(&mut stdout, "IRQ1\n").await?;
                }
                if rng.gen_range(0..config.irq2_prob) == 0 {
                    emit(&mut stdout, "IRQ2\n").await?;
                }
            }
        }
    }
}

async fn emit(out: &mut Stdout, line: &str) -> AnyhowResult<()> {
    out.write_all(line.as_bytes())
        .await
        .context("IRQ line write failed")?;
    out.flush().await.context("IRQ line flush failed")?;
    Ok(())
}
