// =============================================================================
// SFSS SERVER - FILE AND DIRECTORY OPERATIONS - sfss/src/ops.rs
// Block read/write, directory create/remove/list against the root tree
// =============================================================================

//! The five SFP operations.
//!
//! Each handler authorizes the request, performs the filesystem work under
//! the server root, and builds the mirrored reply. Outcomes are computed as
//! `Result<_, SfpStatus>` and folded into the per-kind overloaded status
//! field only when the reply record is assembled.

// External dependencies
use log::{info, warn};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::{DirBuilder, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

// Internal imports
use crate::permission::check_permission;
use shared::{
    FstEntry, SfpMessage, SfpMsgType, SfpStatus, SFP_MAX_ALLFILENAMES_LEN, SFP_MAX_NAMES_IN_DIR,
    SFP_PAYLOAD_SIZE,
};

/// Resolve a request path below the server root. Request paths are
/// absolute within the SFSS namespace (`/A3/file.txt`), so they are
/// appended to the root textually.
fn full_path(root: &Path, path: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", root.display(), path))
}

/// RD_REQ -> RD_REP: read one 16-byte block. A short read leaves the
/// remainder of the payload zero-filled; the empty-file/zero-offset case
/// succeeds with an all-zero payload.
pub async fn handle_read(root: &Path, req: &SfpMessage) -> SfpMessage {
    let mut res = SfpMessage::new(SfpMsgType::RdRep, req.owner);
    res.path = req.path.clone();
    res.path_len = req.path_len;
    res.offset = req.offset;

    if !check_permission(req.owner, &req.path) {
        warn!("RD: permission denied, owner {} path {}", req.owner, req.path);
        res.offset = SfpStatus::Permission.code();
        return res;
    }

    match read_block(root, &req.path, req.offset).await {
        Ok(block) => {
            res.payload = block;
            info!("RD: {} @ {} ok", req.path, req.offset);
        }
        Err(status) => {
            warn!("RD: {} @ {} failed: {:?}", req.path, req.offset, status);
            res.offset = status.code();
        }
    }
    res
}

async fn read_block(root: &Path, path: &str, offset: i32) -> Result<[u8; SFP_PAYLOAD_SIZE], SfpStatus> {
    if offset < 0 {
        return Err(SfpStatus::OffsetOutOfBounds);
    }
    let full = full_path(root, path);
    let mut file = File::open(&full).await.map_err(|_| SfpStatus::NotFound)?;
    let size = file.metadata().await.map_err(|_| SfpStatus::Io)?.len();
    if offset as u64 >= size && !(size == 0 && offset == 0) {
        return Err(SfpStatus::OffsetOutOfBounds);
    }

    file.seek(SeekFrom::Start(offset as u64))
        .await
        .map_err(|_| SfpStatus::Io)?;
    let mut block = [0u8; SFP_PAYLOAD_SIZE];
    let mut filled = 0;
    while filled < block.len() {
        let n = file
            .read(&mut block[filled..])
            .await
            .map_err(|_| SfpStatus::Io)?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(block)
}

/// WR_REQ -> WR_REP: write one 16-byte block, creating the file on demand
/// and filling any hole between the old size and the offset with 0x20.
/// A request with offset 0 whose payload starts with NUL is the in-band
/// file-remove signal.
pub async fn handle_write(root: &Path, req: &SfpMessage) -> SfpMessage {
    let mut res = SfpMessage::new(SfpMsgType::WrRep, req.owner);
    res.path = req.path.clone();
    res.path_len = req.path_len;
    res.offset = req.offset;

    if !check_permission(req.owner, &req.path) {
        warn!("WR: permission denied, owner {} path {}", req.owner, req.path);
        res.offset = SfpStatus::Permission.code();
        return res;
    }

    let full = full_path(root, &req.path);

    if req.offset == 0 && req.payload[0] == 0 {
        // Remove signal overloaded onto WRITE.
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                info!("WR: removed {}", req.path);
                res.offset = 0;
            }
            Err(e) => {
                warn!("WR: remove of {} failed: {}", req.path, e);
                res.offset = SfpStatus::Io.code();
            }
        }
        return res;
    }

    match write_block(&full, req.offset, &req.payload).await {
        Ok(()) => info!("WR: {} @ {} ok", req.path, req.offset),
        Err(status) => {
            warn!("WR: {} @ {} failed: {:?}", req.path, req.offset, status);
            res.offset = status.code();
        }
    }
    res
}

async fn write_block(full: &Path, offset: i32, payload: &[u8; SFP_PAYLOAD_SIZE]) -> Result<(), SfpStatus> {
    if offset < 0 {
        return Err(SfpStatus::Io);
    }

    let mut file = match OpenOptions::new().read(true).write(true).open(full).await {
        Ok(f) => f,
        // Create on demand; a creation failure reports NotFound.
        Err(_) => OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(full)
            .await
            .map_err(|_| SfpStatus::NotFound)?,
    };

    let size = file.metadata().await.map_err(|_| SfpStatus::Io)?.len();
    if offset as u64 > size {
        file.seek(SeekFrom::Start(size)).await.map_err(|_| SfpStatus::Io)?;
        let hole = vec![0x20u8; offset as usize - size as usize];
        file.write_all(&hole).await.map_err(|_| SfpStatus::Io)?;
    }

    file.seek(SeekFrom::Start(offset as u64))
        .await
        .map_err(|_| SfpStatus::Io)?;
    file.write_all(payload).await.map_err(|_| SfpStatus::Io)?;
    file.flush().await.map_err(|_| SfpStatus::Io)?;
    Ok(())
}

/// DC_REQ -> DC_REP: create `path/name` with mode 0755. The reply path is
/// the created directory on success, the request path on failure.
pub async fn handle_mkdir(root: &Path, req: &SfpMessage) -> SfpMessage {
    let mut res = SfpMessage::new(SfpMsgType::DcRep, req.owner);

    if !check_permission(req.owner, &req.path) {
        warn!("DC: permission denied, owner {} path {}", req.owner, req.path);
        res.set_path(&req.path);
        res.path_len = SfpStatus::Permission.code();
        return res;
    }

    let created = format!("{}/{}", req.path, req.name);
    let full = full_path(root, &created);
    match DirBuilder::new().mode(0o755).create(&full).await {
        Ok(()) => {
            info!("DC: created {}", created);
            res.set_path(&created);
        }
        Err(e) => {
            warn!("DC: create of {} failed: {}", created, e);
            res.set_path(&req.path);
            res.path_len = SfpStatus::Io.code();
        }
    }
    res
}

/// DR_REQ -> DR_REP: remove `path/name`, trying a file unlink first and a
/// directory removal second. The reply echoes the request path.
pub async fn handle_remove(root: &Path, req: &SfpMessage) -> SfpMessage {
    let mut res = SfpMessage::new(SfpMsgType::DrRep, req.owner);
    res.set_path(&req.path);

    if !check_permission(req.owner, &req.path) {
        warn!("DR: permission denied, owner {} path {}", req.owner, req.path);
        res.path_len = SfpStatus::Permission.code();
        return res;
    }

    let target = full_path(root, &format!("{}/{}", req.path, req.name));
    let removed = match tokio::fs::remove_file(&target).await {
        Ok(()) => true,
        Err(_) => tokio::fs::remove_dir(&target).await.is_ok(),
    };
    if removed {
        info!("DR: removed {}/{}", req.path, req.name);
    } else {
        warn!("DR: remove of {}/{} failed", req.path, req.name);
        res.path_len = SfpStatus::Io.code();
    }
    res
}

/// DL_REQ -> DL_REP: list up to 40 entries of `path`, concatenating names
/// into the shared buffer and recording inclusive byte positions per entry.
/// Stops early when a name would overflow the buffer.
pub async fn handle_list(root: &Path, req: &SfpMessage) -> SfpMessage {
    let mut res = SfpMessage::new(SfpMsgType::DlRep, req.owner);

    if !check_permission(req.owner, &req.path) {
        warn!("DL: permission denied, owner {} path {}", req.owner, req.path);
        res.nrnames = SfpStatus::Permission.code();
        return res;
    }

    let full = full_path(root, &req.path);
    let mut dir = match tokio::fs::read_dir(&full).await {
        Ok(d) => d,
        Err(e) => {
            warn!("DL: open of {} failed: {}", req.path, e);
            res.nrnames = SfpStatus::NotFound.code();
            return res;
        }
    };

    while let Ok(Some(entry)) = dir.next_entry().await {
        if res.fstlst.len() >= SFP_MAX_NAMES_IN_DIR {
            break;
        }
        let name = entry.file_name();
        let bytes = name.to_string_lossy().into_owned().into_bytes();
        if res.allfilenames.len() + bytes.len() >= SFP_MAX_ALLFILENAMES_LEN {
            break;
        }
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);

        let start = res.allfilenames.len() as i32;
        res.fstlst.push(FstEntry {
            start,
            end: start + bytes.len() as i32 - 1,
            is_dir,
        });
        res.allfilenames.extend_from_slice(&bytes);
    }
    res.nrnames = res.fstlst.len() as i32;
    info!("DL: {} -> {} entries", req.path, res.nrnames);
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root_with_owner_dirs() -> TempDir {
        let tmp = TempDir::new().expect("tempdir");
        for k in 0..=5 {
            std::fs::create_dir(tmp.path().join(format!("A{}", k))).expect("owner dir");
        }
        tmp
    }

    #[tokio::test]
    async fn write_then_read_returns_the_block() {
        let root = root_with_owner_dirs();
        let wr = SfpMessage::write_request(1, "/A1/file.txt", 0, b"Hello");
        let wr_rep = handle_write(root.path(), &wr).await;
        assert_eq!(wr_rep.msg_type, SfpMsgType::WrRep);
        assert_eq!(wr_rep.offset, 0);

        let rd = SfpMessage::read_request(1, "/A1/file.txt", 0);
        let rd_rep = handle_read(root.path(), &rd).await;
        assert_eq!(rd_rep.offset, 0);
        assert_eq!(&rd_rep.payload[..5], b"Hello");
        assert!(rd_rep.payload[5..].iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn sparse_write_fills_the_hole_with_spaces() {
        let root = root_with_owner_dirs();
        let wr = SfpMessage::write_request(2, "/A2/sparse.bin", 48, b"0123456789abcdef");
        let rep = handle_write(root.path(), &wr).await;
        assert_eq!(rep.offset, 48);

        let on_disk = std::fs::read(root.path().join("A2/sparse.bin")).expect("file");
        assert_eq!(on_disk.len(), 64);
        assert!(on_disk[..48].iter().all(|&b| b == 0x20));
        assert_eq!(&on_disk[48..], b"0123456789abcdef");
    }

    #[tokio::test]
    async fn zero_offset_nul_payload_removes_the_file() {
        let root = root_with_owner_dirs();
        std::fs::write(root.path().join("A3/junk.txt"), b"contents").expect("seed");

        let rm = SfpMessage::write_request(3, "/A3/junk.txt", 0, &[]);
        let rm_rep = handle_write(root.path(), &rm).await;
        assert_eq!(rm_rep.offset, 0);
        assert!(!root.path().join("A3/junk.txt").exists());

        let rd = SfpMessage::read_request(3, "/A3/junk.txt", 0);
        let rd_rep = handle_read(root.path(), &rd).await;
        assert_eq!(rd_rep.offset, SfpStatus::NotFound.code());
    }

    #[tokio::test]
    async fn read_past_end_reports_offset_out_of_bounds() {
        let root = root_with_owner_dirs();
        std::fs::write(root.path().join("A1/short.txt"), b"16-bytes-exactly").expect("seed");

        let rd = SfpMessage::read_request(1, "/A1/short.txt", 16);
        let rep = handle_read(root.path(), &rd).await;
        assert_eq!(rep.offset, SfpStatus::OffsetOutOfBounds.code());

        // Empty file read at offset 0 succeeds with a zero payload.
        std::fs::write(root.path().join("A1/empty.txt"), b"").expect("seed");
        let rd = SfpMessage::read_request(1, "/A1/empty.txt", 0);
        let rep = handle_read(root.path(), &rd).await;
        assert_eq!(rep.offset, 0);
        assert!(rep.payload.iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn permission_is_enforced_per_operation() {
        let root = root_with_owner_dirs();

        let rd = SfpMessage::read_request(3, "/A2/file.txt", 0);
        assert_eq!(handle_read(root.path(), &rd).await.offset, -1);

        let wr = SfpMessage::write_request(5, "/A50/file.txt", 0, b"x");
        assert_eq!(handle_write(root.path(), &wr).await.offset, -1);

        let dc = SfpMessage::mkdir_request(2, "/A1", "dir");
        assert_eq!(handle_mkdir(root.path(), &dc).await.path_len, -1);

        let dr = SfpMessage::remove_request(2, "/A1", "dir");
        assert_eq!(handle_remove(root.path(), &dr).await.path_len, -1);

        let dl = SfpMessage::list_request(2, "/A1");
        assert_eq!(handle_list(root.path(), &dl).await.nrnames, -1);
    }

    #[tokio::test]
    async fn mkdir_then_remove_restores_the_listing() {
        let root = root_with_owner_dirs();

        let before = handle_list(root.path(), &SfpMessage::list_request(4, "/A4")).await;
        assert_eq!(before.nrnames, 0);

        let dc = SfpMessage::mkdir_request(4, "/A4", "sub");
        let dc_rep = handle_mkdir(root.path(), &dc).await;
        assert_eq!(dc_rep.path, "/A4/sub");
        assert_eq!(dc_rep.path_len, "/A4/sub".len() as i32);

        let during = handle_list(root.path(), &SfpMessage::list_request(4, "/A4")).await;
        assert_eq!(during.nrnames, 1);
        assert_eq!(during.listing_names(), vec![("sub".to_string(), true)]);

        let dr = SfpMessage::remove_request(4, "/A4", "sub");
        let dr_rep = handle_remove(root.path(), &dr).await;
        assert_eq!(dr_rep.path_len, "/A4".len() as i32);

        let after = handle_list(root.path(), &SfpMessage::list_request(4, "/A4")).await;
        assert_eq!(after.nrnames, 0);
    }

    #[tokio::test]
    async fn listing_distinguishes_files_from_directories() {
        let root = root_with_owner_dirs();
        std::fs::create_dir(root.path().join("A1/docs")).expect("dir");
        std::fs::write(root.path().join("A1/notes.txt"), b"n").expect("file");

        let rep = handle_list(root.path(), &SfpMessage::list_request(1, "/A1")).await;
        assert_eq!(rep.nrnames, 2);
        let mut names = rep.listing_names();
        names.sort();
        assert_eq!(
            names,
            vec![("docs".to_string(), true), ("notes.txt".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn listing_caps_at_the_entry_limit() {
        let root = root_with_owner_dirs();
        for i in 0..SFP_MAX_NAMES_IN_DIR + 5 {
            std::fs::write(root.path().join(format!("A1/f{:02}", i)), b"x").expect("seed");
        }
        let rep = handle_list(root.path(), &SfpMessage::list_request(1, "/A1")).await;
        assert_eq!(rep.nrnames, SFP_MAX_NAMES_IN_DIR as i32);
        assert_eq!(rep.fstlst.len(), SFP_MAX_NAMES_IN_DIR);
    }

    #[tokio::test]
    async fn listing_missing_directory_reports_not_found() {
        let root = root_with_owner_dirs();
        let rep = handle_list(root.path(), &SfpMessage::list_request(1, "/A1/absent")).await;
        assert_eq!(rep.nrnames, SfpStatus::NotFound.code());
    }

    #[tokio::test]
    async fn remove_of_missing_entry_reports_io() {
        let root = root_with_owner_dirs();
        let dr = SfpMessage::remove_request(1, "/A1", "ghost");
        let rep = handle_remove(root.path(), &dr).await;
        assert_eq!(rep.path_len, SfpStatus::Io.code());
        assert_eq!(rep.path, "/A1");
    }
}
