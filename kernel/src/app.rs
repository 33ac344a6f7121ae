// =============================================================================
// KERNELSIM KERNEL - APPLICATION CHILD - kernel/src/app.rs
// Bounded instruction loop with randomized syscalls against SFSS
// =============================================================================

//! The application child.
//!
//! Stops itself before the first instruction so the kernel schedules its
//! start. Each simulated instruction sleeps one quantum, reports a TICK
//! line, and with probability 1/syscall_prob emits one of the five
//! syscall lines and stops itself again; the kernel resumes it once the
//! SFSS reply sits in its slot. After the instruction budget it reports
//! DONE and exits.

// External dependencies
use anyhow::{Context, Result as AnyhowResult};
use log::{info, warn};
use nix::sys::signal::{raise, Signal};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::sleep;

// Internal imports
use crate::ipc::slots::ReplySlot;
use shared::{AppConfiguration, SfpMessage, SfpMsgType};

/// Run application child A{id} to completion.
pub async fn run(id: usize, config: AppConfiguration) -> AnyhowResult<()> {
    // Ctrl-C belongs to the kernel's snapshot flow; the app swallows it.
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to install app SIGINT handler")?;
    tokio::spawn(async move {
        loop {
            sigint.recv().await;
        }
    });

    // Start stopped; the kernel's first SIGCONT begins execution.
    raise(Signal::SIGSTOP).context("initial self-stop failed")?;

    let slot = ReplySlot::open(Path::new(&config.slot_dir), id)
        .with_context(|| format!("A{} cannot map its reply slot", id))?;
    let pid = std::process::id();
    info!("[A{}] started (pid {}), reply slot mapped", id, pid);

    let mut rng = StdRng::from_entropy();
    let mut stdout = tokio::io::stdout();
    let quantum = Duration::from_millis(config.quantum_ms);

    let mut pc = 0u32;
    while pc < config.max_pc {
        sleep(quantum).await;
        pc += 1;
        emit(&mut stdout, &format!("TICK A{} {} {}\n", id, pid, pc)).await?;

        if rng.gen_range(0..config.syscall_prob) == 0 {
            let op = rng.gen_range(0..5);
            let target = if rng.gen_range(0..2) == 0 { id } else { 0 };
            let offset = rng.gen_range(0..4) * 16;
            let line = syscall_line(op, target, id, pid, pc, offset);
            emit(&mut stdout, &line).await?;

            // Block until the kernel delivers the reply and resumes us.
            raise(Signal::SIGSTOP).context("post-syscall self-stop failed")?;

            match slot.read() {
                Ok(reply) => classify_reply(id, &reply),
                Err(e) => warn!("[A{}] reply slot read failed: {}", id, e),
            }
        }
        sleep(quantum).await;
    }

    emit(&mut stdout, &format!("DONE A{} {} {}\n", id, pid, pc)).await?;
    info!("[A{}] done after {} instructions", id, pc);
    Ok(())
}

/// Build one of the five syscall lines. `op` selects READ, WRITE, ADD,
/// REM, LISTDIR in that order; `target` is the owner subtree (the app's
/// own id or 0 for the shared tree).
fn syscall_line(op: usize, target: usize, id: usize, pid: u32, pc: u32, offset: i32) -> String {
    match op {
        0 => format!("READ A{} {} /A{}/file.txt {}\n", id, pid, target, offset),
        1 => format!(
            "WRITE A{} {} /A{}/file.txt {} HelloA{}PC{}\n",
            id, pid, target, offset, id, pc
        ),
        2 => format!("ADD A{} {} /A{} newDir_A{}_{}\n", id, pid, target, id, pc),
        3 => format!(
            "REM A{} {} /A{} newDir_A{}_{}\n",
            id,
            pid,
            target,
            id,
            pc.saturating_sub(1)
        ),
        _ => format!("LISTDIR A{} {} /A{}\n", id, pid, target),
    }
}

/// Log the syscall outcome found in the reply slot.
fn classify_reply(id: usize, reply: &SfpMessage) {
    match reply.msg_type {
        SfpMsgType::RdRep => {
            if reply.offset >= 0 {
                info!(
                    "[A{}] READ OK @ offset={} payload='{}'",
                    id,
                    reply.offset,
                    String::from_utf8_lossy(&reply.payload)
                );
            } else {
                warn!("[A{}] READ ERROR code={}", id, reply.offset);
            }
        }
        SfpMsgType::WrRep => {
            if reply.offset >= 0 {
                info!("[A{}] WRITE OK @ offset={}", id, reply.offset);
            } else {
                warn!("[A{}] WRITE ERROR code={}", id, reply.offset);
            }
        }
        SfpMsgType::DcRep => {
            if reply.path_len >= 0 {
                info!("[A{}] DIR CREATE OK -> {}", id, reply.path);
            } else {
                warn!("[A{}] DIR CREATE ERROR code={}", id, reply.path_len);
            }
        }
        SfpMsgType::DrRep => {
            if reply.path_len >= 0 {
                info!("[A{}] DIR REMOVE OK -> {}", id, reply.path);
            } else {
                warn!("[A{}] DIR REMOVE ERROR code={}", id, reply.path_len);
            }
        }
        SfpMsgType::DlRep => {
            if reply.nrnames >= 0 {
                info!("[A{}] LISTDIR OK -> {} entries", id, reply.nrnames);
            } else {
                warn!("[A{}] LISTDIR ERROR code={}", id, reply.nrnames);
            }
        }
        other => warn!("[A{}] unexpected SFP message in slot: {:?}", id, other),
    }
}

async fn emit(out: &mut Stdout, line: &str) -> AnyhowResult<()> {
    out.write_all(line.as_bytes())
        .await
        .context("app line write failed")?;
    out.flush().await.context("app line flush failed")?;
    Ok(())
}
