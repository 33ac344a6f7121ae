// =============================================================================
// KERNELSIM KERNEL - CHILD PROCESS PLUMBING - kernel/src/proc.rs
// Spawning, signalling, and line-pumping the IC and application children
// =============================================================================

//! Child lifecycle plumbing.
//!
//! The supervisor re-executes its own binary for every child (`inter`,
//! `app <k>`) with stdout piped back to the kernel. A pump task per child
//! feeds complete lines into the supervisor's event channel through a
//! [`LineFramer`]; a waiter task reports the child's exit. Scheduling
//! control is plain job control: SIGSTOP to preempt, SIGCONT to resume.

// External dependencies
use anyhow::{Context, Result as AnyhowResult};
use log::{debug, warn};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;

// Internal imports
use crate::ipc::lines::LineFramer;

/// Line-buffer capacity per child pipe; a single line never legitimately
/// approaches this.
const PIPE_FRAME_CAPACITY: usize = 4096;

/// Production [`ProcessControl`]: SIGSTOP/SIGCONT over the child pids.
/// Signal failures are transient operational errors, logged and ignored
/// (the child may have exited just before the signal).
///
/// [`ProcessControl`]: crate::core::scheduler::ProcessControl
#[derive(Debug, Default)]
pub struct SignalControl;

impl crate::core::scheduler::ProcessControl for SignalControl {
    fn stop(&mut self, pid: u32) {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGSTOP) {
            warn!("SIGSTOP to pid {} failed: {}", pid, e);
        }
    }

    fn resume(&mut self, pid: u32) {
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGCONT) {
            warn!("SIGCONT to pid {} failed: {}", pid, e);
        }
    }
}

/// Send an arbitrary signal to a child, logging failure.
pub fn signal_child(pid: u32, signal: Signal) {
    if let Err(e) = kill(Pid::from_raw(pid as i32), signal) {
        warn!("{:?} to pid {} failed: {}", signal, pid, e);
    }
}

/// A spawned child with its pid and captured stdout.
pub struct SpawnedChild {
    pub child: Child,
    pub pid: u32,
    pub stdout: ChildStdout,
}

/// Re-exec this binary with `args`, stdout piped, stderr inherited.
pub fn spawn_child(args: &[String]) -> AnyhowResult<SpawnedChild> {
    let exe = std::env::current_exe().context("cannot resolve own executable path")?;
    let mut child = Command::new(&exe)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("failed to spawn child {:?} {:?}", exe, args))?;

    let pid = child.id().context("spawned child has no pid")?;
    let stdout = child
        .stdout
        .take()
        .context("spawned child has no piped stdout")?;
    debug!("spawned child pid {} with args {:?}", pid, args);
    Ok(SpawnedChild { child, pid, stdout })
}

/// Pump a child's stdout into the shared line channel. Runs until the
/// pipe closes or the receiver goes away.
pub fn pump_lines(mut stdout: ChildStdout, tx: mpsc::Sender<String>) {
    tokio::spawn(async move {
        let mut framer = LineFramer::new(PIPE_FRAME_CAPACITY);
        let mut chunk = [0u8; 512];
        loop {
            match stdout.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    for line in framer.push(&chunk[..n]) {
                        if tx.send(line).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!("child pipe read failed: {}", e);
                    break;
                }
            }
        }
    });
}

/// Await the child's exit and report its pid on the exit channel.
pub fn watch_exit(mut child: Child, pid: u32, tx: mpsc::Sender<u32>) {
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!("child pid {} exited with {}", pid, status),
            Err(e) => warn!("wait on child pid {} failed: {}", pid, e),
        }
        let _ = tx.send(pid).await;
    });
}
