// =============================================================================
// KERNELSIM KERNEL IPC - REPLY SLOTS - kernel/src/ipc/slots.rs
// Per-application mailbox files mapped by the kernel and its apps
// =============================================================================

//! Shared reply slots.
//!
//! Each application owns one fixed-capacity slot file under the slot
//! directory, mapped writable by the kernel and readable by the app. The
//! layout is a little-endian `u32` length prefix followed by one encoded
//! SFP record. The kernel writes a slot only while its app is Blocked and
//! the app reads it only between resume and its next syscall, so the two
//! mappings never race.

// External dependencies
use log::debug;
use memmap2::{Mmap, MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

// Internal imports
use crate::core::scheduler::ReplySlots;
use shared::{SfpMessage, SlotError, SFP_WIRE_CAPACITY};

/// Byte capacity of one slot file: length prefix plus one wire record.
pub const SLOT_CAPACITY: usize = 4 + SFP_WIRE_CAPACITY;

fn slot_path(dir: &Path, app_id: usize) -> PathBuf {
    dir.join(format!("A{}.slot", app_id))
}

/// Kernel-side owner of every slot file. Creates the files at startup,
/// writes replies into them, and removes them at shutdown.
#[derive(Debug)]
pub struct SlotDirectory {
    dir: PathBuf,
    maps: Vec<MmapMut>,
}

impl SlotDirectory {
    /// Create (or re-create) the slot files for apps 1..=n and map them
    /// writable. Existing content is zeroed.
    pub fn create(dir: &Path, n_apps: usize) -> Result<SlotDirectory, SlotError> {
        std::fs::create_dir_all(dir)?;
        let mut maps = Vec::with_capacity(n_apps);
        for app_id in 1..=n_apps {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(slot_path(dir, app_id))?;
            file.set_len(SLOT_CAPACITY as u64)?;
            let map = unsafe { MmapOptions::new().map_mut(&file)? };
            maps.push(map);
        }
        debug!("created {} reply slots under {:?}", n_apps, dir);
        Ok(SlotDirectory {
            dir: dir.to_path_buf(),
            maps,
        })
    }

    /// Remove the slot files. Mappings die with `self`.
    pub fn cleanup(&self) {
        for app_id in 1..=self.maps.len() {
            let _ = std::fs::remove_file(slot_path(&self.dir, app_id));
        }
    }
}

impl ReplySlots for SlotDirectory {
    fn deliver(&mut self, app_id: usize, msg: &SfpMessage) -> Result<(), SlotError> {
        let map = self
            .maps
            .get_mut(app_id.wrapping_sub(1))
            .ok_or(SlotError::OutOfRange(app_id))?;
        let bytes = msg.encode()?;
        if bytes.len() > SFP_WIRE_CAPACITY {
            return Err(SlotError::Oversize(bytes.len()));
        }
        map[4..4 + bytes.len()].copy_from_slice(&bytes);
        map[..4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
        Ok(())
    }
}

/// Application-side view of one slot: a read-only mapping consumed once
/// per syscall, after the kernel resumes the app.
#[derive(Debug)]
pub struct ReplySlot {
    map: Mmap,
    app_id: usize,
}

impl ReplySlot {
    pub fn open(dir: &Path, app_id: usize) -> Result<ReplySlot, SlotError> {
        let file = OpenOptions::new().read(true).open(slot_path(dir, app_id))?;
        let map = unsafe { MmapOptions::new().map(&file)? };
        Ok(ReplySlot { map, app_id })
    }

    /// Decode the reply currently held by the slot.
    pub fn read(&self) -> Result<SfpMessage, SlotError> {
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&self.map[..4]);
        let len = u32::from_le_bytes(prefix) as usize;
        if len == 0 {
            return Err(SlotError::Empty(self.app_id));
        }
        if len > SFP_WIRE_CAPACITY {
            return Err(SlotError::Oversize(len));
        }
        Ok(SfpMessage::decode(&self.map[4..4 + len])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SfpMsgType;
    use tempfile::TempDir;

    #[test]
    fn delivered_reply_is_read_back_through_the_mapping() {
        let tmp = TempDir::new().expect("tempdir");
        let mut slots = SlotDirectory::create(tmp.path(), 3).expect("slots");

        let mut reply = SfpMessage::new(SfpMsgType::RdRep, 2);
        reply.set_path("/A2/file.txt");
        reply.offset = 16;
        reply.payload[..3].copy_from_slice(b"abc");
        slots.deliver(2, &reply).expect("deliver");

        let slot = ReplySlot::open(tmp.path(), 2).expect("open");
        assert_eq!(slot.read().expect("read"), reply);

        // The neighbours are untouched and report empty.
        let other = ReplySlot::open(tmp.path(), 1).expect("open");
        assert!(matches!(other.read(), Err(SlotError::Empty(1))));
    }

    #[test]
    fn redelivery_overwrites_the_previous_reply() {
        let tmp = TempDir::new().expect("tempdir");
        let mut slots = SlotDirectory::create(tmp.path(), 1).expect("slots");

        let mut first = SfpMessage::new(SfpMsgType::WrRep, 1);
        first.offset = 0;
        slots.deliver(1, &first).expect("deliver");

        let mut second = SfpMessage::new(SfpMsgType::DlRep, 1);
        second.nrnames = 4;
        slots.deliver(1, &second).expect("deliver");

        let slot = ReplySlot::open(tmp.path(), 1).expect("open");
        assert_eq!(slot.read().expect("read"), second);
    }

    #[test]
    fn out_of_range_app_id_is_refused() {
        let tmp = TempDir::new().expect("tempdir");
        let mut slots = SlotDirectory::create(tmp.path(), 2).expect("slots");
        let reply = SfpMessage::new(SfpMsgType::WrRep, 9);
        assert!(slots.deliver(9, &reply).is_err());
        assert!(slots.deliver(0, &reply).is_err());
    }

    #[test]
    fn cleanup_removes_the_slot_files() {
        let tmp = TempDir::new().expect("tempdir");
        let slots = SlotDirectory::create(tmp.path(), 2).expect("slots");
        assert!(tmp.path().join("A1.slot").exists());
        slots.cleanup();
        assert!(!tmp.path().join("A1.slot").exists());
        assert!(!tmp.path().join("A2.slot").exists());
    }
}
