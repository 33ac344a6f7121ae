// =============================================================================
// SFSS SERVER - DATAGRAM LOOP - sfss/src/server.rs
// Single-task UDP service dispatching SFP requests to the operations
// =============================================================================

// External dependencies
use anyhow::{Context, Result as AnyhowResult};
use log::{info, warn};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::UdpSocket;

// Internal imports
use crate::ops;
use shared::{SfpMessage, SfpStatus, SfssConfiguration, SFP_WIRE_CAPACITY};

/// The Simple File Storage Service: one UDP socket, one root tree.
pub struct SfssServer {
    socket: UdpSocket,
    root: PathBuf,
}

impl SfssServer {
    /// Bind the service socket and precreate the owner subtree A0..A{n}.
    /// Bind failure is the one fatal startup error.
    pub async fn initialize(config: &SfssConfiguration) -> AnyhowResult<SfssServer> {
        let socket = UdpSocket::bind(&config.bind_addr)
            .await
            .with_context(|| format!("failed to bind SFSS socket on {}", config.bind_addr))?;

        let root = PathBuf::from(&config.root_dir);
        for k in 0..=config.n_apps {
            let owner_dir = root.join(format!("A{}", k));
            tokio::fs::create_dir_all(&owner_dir)
                .await
                .with_context(|| format!("failed to create owner directory {:?}", owner_dir))?;
        }

        info!(
            "SFSS serving {:?} on {}",
            root,
            socket.local_addr().context("socket has no local address")?
        );
        Ok(SfssServer { socket, root })
    }

    /// The bound address, useful when the configuration requested port 0.
    pub fn local_addr(&self) -> AnyhowResult<SocketAddr> {
        self.socket.local_addr().context("socket has no local address")
    }

    /// Receive-dispatch-reply forever. Malformed datagrams and send
    /// failures are logged and the loop continues.
    pub async fn run(&self) -> AnyhowResult<()> {
        let mut buf = [0u8; SFP_WIRE_CAPACITY];
        loop {
            let (n, src) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) => {
                    warn!("SFSS receive failed: {}", e);
                    continue;
                }
            };

            let req = match SfpMessage::decode(&buf[..n]) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!("dropping undecodable {}-byte datagram from {}: {}", n, src, e);
                    continue;
                }
            };

            let res = self.dispatch(&req).await;
            match res.encode() {
                Ok(bytes) => {
                    if let Err(e) = self.socket.send_to(&bytes, src).await {
                        warn!("reply to {} failed: {}", src, e);
                    }
                }
                Err(e) => warn!("reply for owner {} failed to encode: {}", res.owner, e),
            }
        }
    }

    async fn dispatch(&self, req: &SfpMessage) -> SfpMessage {
        use shared::SfpMsgType::*;
        match req.msg_type {
            RdReq => ops::handle_read(&self.root, req).await,
            WrReq => ops::handle_write(&self.root, req).await,
            DcReq => ops::handle_mkdir(&self.root, req).await,
            DrReq => ops::handle_remove(&self.root, req).await,
            DlReq => ops::handle_list(&self.root, req).await,
            other => {
                warn!("unknown request type {:?} from owner {}", other, req.owner);
                let mut res = SfpMessage::new(other.reply_type().unwrap_or(other), req.owner);
                res.path_len = SfpStatus::UnknownRequest.code();
                res
            }
        }
    }
}
