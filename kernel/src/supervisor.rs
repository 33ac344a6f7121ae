// =============================================================================
// KERNELSIM KERNEL - SUPERVISOR EVENT LOOP - kernel/src/supervisor.rs
// Uniform multi-way wait over replies, IRQ lines, app lines, and signals
// =============================================================================

//! The kernel supervisor.
//!
//! Startup is lifecycle-fatal: socket, slot files, and child spawns must
//! all succeed. Afterwards the supervisor owns every piece of scheduling
//! state and suspends only inside the `select!`: SFSS replies arrive on
//! the UDP socket, IRQ lines and application lines arrive on one shared
//! line channel in arrival order, child exits on the reap channel, and
//! SIGINT/SIGCONT drive snapshot and resume. While paused, line
//! processing is deferred but replies keep accumulating in the bounded
//! FIFOs.

// External dependencies
use anyhow::{Context, Result as AnyhowResult};
use log::{info, warn};
use nix::sys::signal::Signal;
use std::path::Path;
use tokio::net::{lookup_host, UdpSocket};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

// Internal imports
use crate::core::scheduler::{KernelState, ProcessControl, ReplyKind};
use crate::ipc::slots::SlotDirectory;
use crate::ipc::syscall::{parse_app_line, AppLine};
use crate::proc::{pump_lines, signal_child, spawn_child, watch_exit, SignalControl};
use shared::{KernelConfiguration, SfpMessage, DEFAULT_SLOT_DIR, SFP_WIRE_CAPACITY};

/// Run the kernel supervisor until every application has terminated.
pub async fn run(config: KernelConfiguration) -> AnyhowResult<()> {
    info!("kernel supervisor pid {}", std::process::id());

    // Bind an ephemeral local port so SFSS replies have a stable return
    // address for this kernel instance.
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("failed to bind the kernel UDP socket")?;
    let sfss_addr = lookup_host(config.sfss_endpoint())
        .await
        .with_context(|| format!("cannot resolve SFSS endpoint {}", config.sfss_endpoint()))?
        .next()
        .context("SFSS endpoint resolved to no address")?;

    let mut slots = SlotDirectory::create(Path::new(&config.slot_dir), config.n_apps)
        .context("failed to create the reply slot files")?;

    // IRQ lines and application lines share one channel so the kernel
    // observes them in arrival order: an IRQ0 is always processed after
    // any syscall line that reached the kernel before it.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(256);
    let (exit_tx, mut exit_rx) = mpsc::channel::<u32>(config.n_apps);

    // Interrupt controller child. Its exit is only awaited at shutdown.
    let ic = spawn_child(&["inter".to_string()]).context("failed to spawn the interrupt controller")?;
    let ic_pid = ic.pid;
    let mut ic_child = ic.child;
    pump_lines(ic.stdout, line_tx.clone());
    info!("interrupt controller pid {}", ic_pid);

    // Application children, A1 first so the initial rotation starts there.
    let mut state = KernelState::new(config.n_apps);
    for idx in 0..config.n_apps {
        let mut args = vec!["app".to_string(), (idx + 1).to_string()];
        if config.slot_dir != DEFAULT_SLOT_DIR {
            args.push("--slot-dir".to_string());
            args.push(config.slot_dir.clone());
        }
        let spawned =
            spawn_child(&args).with_context(|| format!("failed to spawn application A{}", idx + 1))?;
        state.register_pid(idx, spawned.pid);
        pump_lines(spawned.stdout, line_tx.clone());
        watch_exit(spawned.child, spawned.pid, exit_tx.clone());
        info!("application A{} pid {}", idx + 1, spawned.pid);
    }
    drop(line_tx);
    drop(exit_tx);

    let mut ctl = SignalControl;
    state.enqueue_initial();
    state.schedule_next(&mut ctl);

    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let mut sigcont = signal(SignalKind::from_raw(nix::libc::SIGCONT))
        .context("failed to install SIGCONT handler")?;

    let mut paused = false;
    let mut buf = [0u8; SFP_WIRE_CAPACITY];

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => match received {
                Ok((n, _src)) => match SfpMessage::decode(&buf[..n]) {
                    Ok(msg) => {
                        info!("received {:?} from SFSS for owner {}", msg.msg_type, msg.owner);
                        state.enqueue_reply(msg);
                    }
                    Err(e) => warn!("dropping undecodable SFSS datagram: {}", e),
                },
                Err(e) => warn!("kernel UDP receive failed: {}", e),
            },

            Some(line) = line_rx.recv(), if !paused => {
                if line.starts_with("IRQ") {
                    handle_irq_line(&mut state, &mut ctl, &mut slots, &line);
                } else if let Some(request) = handle_app_line(&mut state, &mut ctl, &line) {
                    // Best-effort datagram to SFSS; a send failure never
                    // blocks the kernel.
                    match request.encode() {
                        Ok(bytes) => {
                            if let Err(e) = socket.send_to(&bytes, sfss_addr).await {
                                warn!("request send to SFSS failed: {}", e);
                            }
                        }
                        Err(e) => warn!("request for owner {} failed to encode: {}", request.owner, e),
                    }
                }
            },

            Some(pid) = exit_rx.recv() => {
                state.on_child_exit(pid, &mut ctl);
            },

            _ = sigint.recv() => {
                paused = true;
                signal_child(ic_pid, Signal::SIGINT);
                if let Some(pid) = state.running_pid() {
                    ctl.stop(pid);
                }
                eprint!("{}", state.snapshot_report());
            },

            _ = sigcont.recv() => {
                if paused {
                    paused = false;
                    signal_child(ic_pid, Signal::SIGCONT);
                    if let Some(pid) = state.running_pid() {
                        ctl.resume(pid);
                    }
                    info!("resumed");
                }
            },
        }

        if state.all_terminated() {
            break;
        }
    }

    info!("all applications terminated, shutting down");
    signal_child(ic_pid, Signal::SIGTERM);
    let _ = ic_child.wait().await;
    slots.cleanup();
    info!("kernel exit");
    Ok(())
}

/// Dispatch one line from the interrupt controller channel.
fn handle_irq_line(
    state: &mut KernelState,
    ctl: &mut SignalControl,
    slots: &mut SlotDirectory,
    line: &str,
) {
    match line {
        "IRQ0" => state.on_quantum_tick(ctl),
        "IRQ1" => state.on_reply_irq(ReplyKind::File, ctl, slots),
        "IRQ2" => state.on_reply_irq(ReplyKind::Directory, ctl, slots),
        other => warn!("unknown IRQ line: '{}'", other),
    }
}

/// Dispatch one line from the application channel; returns the SFP
/// request to transmit when the line was an accepted syscall.
fn handle_app_line(
    state: &mut KernelState,
    ctl: &mut SignalControl,
    line: &str,
) -> Option<SfpMessage> {
    match parse_app_line(line) {
        Some(AppLine::Tick { pid, pc, .. }) => {
            state.on_tick(pid, pc);
            None
        }
        Some(AppLine::Done { pid, pc, .. }) => {
            state.on_done(pid, pc, ctl);
            None
        }
        Some(AppLine::Syscall { pid, request }) => state.on_syscall(pid, request, ctl),
        None => {
            warn!("unknown app line: '{}'", line);
            None
        }
    }
}
