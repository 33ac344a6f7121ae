// =============================================================================
// KERNELSIM SHARED FOUNDATION - SFP PROTOCOL - shared/src/protocol/mod.rs
// Simple File Protocol records, status codes, and the wire codec
// =============================================================================

//! The Simple File Protocol (SFP).
//!
//! A single record shape serves all ten message variants; fields a given
//! variant does not use are left zeroed. Replies overload one numeric
//! field per kind (`offset` for file replies, `path_len` for directory
//! create/remove, `nrnames` for listings) to carry either a non-negative
//! success value or a negative [`SfpStatus`] code. Inside the servers the
//! outcome travels as `Result<_, SfpStatus>`; the overloaded field is
//! written only at the wire boundary.

// External dependencies
use serde::{Deserialize, Serialize};

// Internal imports
use crate::types::error::ProtocolError;
use crate::{
    SFP_MAX_ALLFILENAMES_LEN, SFP_MAX_NAMES_IN_DIR, SFP_MAX_PATH_LEN, SFP_PAYLOAD_SIZE,
    SFP_WIRE_CAPACITY,
};

/// The ten SFP message variants. Requests and replies alternate so that a
/// request maps to its reply by taking the successor variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SfpMsgType {
    RdReq,
    RdRep,
    WrReq,
    WrRep,
    DcReq,
    DcRep,
    DrReq,
    DrRep,
    DlReq,
    DlRep,
}

impl SfpMsgType {
    /// The reply variant mirroring this request, or `None` for replies.
    pub fn reply_type(self) -> Option<SfpMsgType> {
        match self {
            SfpMsgType::RdReq => Some(SfpMsgType::RdRep),
            SfpMsgType::WrReq => Some(SfpMsgType::WrRep),
            SfpMsgType::DcReq => Some(SfpMsgType::DcRep),
            SfpMsgType::DrReq => Some(SfpMsgType::DrRep),
            SfpMsgType::DlReq => Some(SfpMsgType::DlRep),
            _ => None,
        }
    }

    /// File-I/O completion replies, consumed from the file reply queue.
    pub fn is_file_reply(self) -> bool {
        matches!(self, SfpMsgType::RdRep | SfpMsgType::WrRep)
    }

    /// Directory-I/O completion replies, consumed from the directory queue.
    pub fn is_dir_reply(self) -> bool {
        matches!(self, SfpMsgType::DcRep | SfpMsgType::DrRep | SfpMsgType::DlRep)
    }

    pub fn is_request(self) -> bool {
        self.reply_type().is_some()
    }
}

/// Negative status codes carried in the overloaded reply fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SfpStatus {
    Permission,
    NotFound,
    OffsetOutOfBounds,
    Io,
    UnknownRequest,
}

impl SfpStatus {
    /// Wire encoding of this status.
    pub fn code(self) -> i32 {
        match self {
            SfpStatus::Permission => -1,
            SfpStatus::NotFound => -2,
            SfpStatus::OffsetOutOfBounds => -3,
            SfpStatus::Io => -4,
            SfpStatus::UnknownRequest => -100,
        }
    }

    pub fn from_code(code: i32) -> Option<SfpStatus> {
        match code {
            -1 => Some(SfpStatus::Permission),
            -2 => Some(SfpStatus::NotFound),
            -3 => Some(SfpStatus::OffsetOutOfBounds),
            -4 => Some(SfpStatus::Io),
            -100 => Some(SfpStatus::UnknownRequest),
            _ => None,
        }
    }

    /// Fold an internal outcome into the overloaded numeric reply field.
    pub fn fold(result: Result<i32, SfpStatus>) -> i32 {
        match result {
            Ok(value) => value,
            Err(status) => status.code(),
        }
    }
}

/// One directory entry of a listing reply: byte positions into
/// `allfilenames` (end index inclusive) plus the entry kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FstEntry {
    pub start: i32,
    pub end: i32,
    pub is_dir: bool,
}

/// The single SFP record used for every request and reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfpMessage {
    pub msg_type: SfpMsgType,
    /// Issuing application, 1..=N.
    pub owner: i32,
    /// Path length; doubles as the status field of DC/DR replies.
    pub path_len: i32,
    pub path: String,
    pub name_len: i32,
    /// Child entry name, used by directory create/remove.
    pub name: String,
    /// Block offset; doubles as the status field of RD/WR replies.
    pub offset: i32,
    pub payload: [u8; SFP_PAYLOAD_SIZE],
    /// Listing entry count; doubles as the status field of DL replies.
    pub nrnames: i32,
    pub fstlst: Vec<FstEntry>,
    pub allfilenames: Vec<u8>,
}

impl SfpMessage {
    /// A zeroed record of the given variant, remaining fields unset.
    pub fn new(msg_type: SfpMsgType, owner: i32) -> SfpMessage {
        SfpMessage {
            msg_type,
            owner,
            path_len: 0,
            path: String::new(),
            name_len: 0,
            name: String::new(),
            offset: 0,
            payload: [0u8; SFP_PAYLOAD_SIZE],
            nrnames: 0,
            fstlst: Vec::new(),
            allfilenames: Vec::new(),
        }
    }

    /// RD_REQ for one block at `offset`.
    pub fn read_request(owner: i32, path: &str, offset: i32) -> SfpMessage {
        let mut msg = SfpMessage::new(SfpMsgType::RdReq, owner);
        msg.set_path(path);
        msg.offset = offset;
        msg
    }

    /// WR_REQ writing one block at `offset`; the payload is truncated or
    /// NUL-padded to exactly [`SFP_PAYLOAD_SIZE`] bytes.
    pub fn write_request(owner: i32, path: &str, offset: i32, payload: &[u8]) -> SfpMessage {
        let mut msg = SfpMessage::new(SfpMsgType::WrReq, owner);
        msg.set_path(path);
        msg.offset = offset;
        let n = payload.len().min(SFP_PAYLOAD_SIZE);
        msg.payload[..n].copy_from_slice(&payload[..n]);
        msg
    }

    /// DC_REQ creating `name` under `path`.
    pub fn mkdir_request(owner: i32, path: &str, name: &str) -> SfpMessage {
        let mut msg = SfpMessage::new(SfpMsgType::DcReq, owner);
        msg.set_path(path);
        msg.set_name(name);
        msg
    }

    /// DR_REQ removing `name` under `path`.
    pub fn remove_request(owner: i32, path: &str, name: &str) -> SfpMessage {
        let mut msg = SfpMessage::new(SfpMsgType::DrReq, owner);
        msg.set_path(path);
        msg.set_name(name);
        msg
    }

    /// DL_REQ listing `path`.
    pub fn list_request(owner: i32, path: &str) -> SfpMessage {
        let mut msg = SfpMessage::new(SfpMsgType::DlReq, owner);
        msg.set_path(path);
        msg
    }

    pub fn set_path(&mut self, path: &str) {
        self.path = path.to_string();
        self.path_len = path.len() as i32;
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.name_len = name.len() as i32;
    }

    /// The overloaded status field for this reply kind. Requests report 0.
    pub fn status_field(&self) -> i32 {
        match self.msg_type {
            SfpMsgType::RdRep | SfpMsgType::WrRep => self.offset,
            SfpMsgType::DcRep | SfpMsgType::DrRep => self.path_len,
            SfpMsgType::DlRep => self.nrnames,
            _ => 0,
        }
    }

    /// Decode the listing result into `(name, is_dir)` pairs. Entries with
    /// positions outside the name buffer are skipped.
    pub fn listing_names(&self) -> Vec<(String, bool)> {
        let mut names = Vec::new();
        for entry in &self.fstlst {
            if entry.start < 0 || entry.end < entry.start {
                continue;
            }
            let start = entry.start as usize;
            let end = entry.end as usize + 1;
            if end > self.allfilenames.len() {
                continue;
            }
            let name = String::from_utf8_lossy(&self.allfilenames[start..end]).into_owned();
            names.push((name, entry.is_dir));
        }
        names
    }

    /// Encode into one datagram-sized byte buffer.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        self.validate()?;
        let bytes = bincode::serialize(self).map_err(|e| ProtocolError::Encode(e.to_string()))?;
        if bytes.len() > SFP_WIRE_CAPACITY {
            return Err(ProtocolError::RecordTooLarge(bytes.len()));
        }
        Ok(bytes)
    }

    /// Decode one received datagram, enforcing the protocol field bounds.
    pub fn decode(bytes: &[u8]) -> Result<SfpMessage, ProtocolError> {
        let msg: SfpMessage =
            bincode::deserialize(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))?;
        msg.validate()?;
        Ok(msg)
    }

    fn validate(&self) -> Result<(), ProtocolError> {
        if self.path.len() > SFP_MAX_PATH_LEN {
            return Err(ProtocolError::FieldTooLong("path", self.path.len()));
        }
        if self.name.len() > SFP_MAX_PATH_LEN {
            return Err(ProtocolError::FieldTooLong("name", self.name.len()));
        }
        if self.fstlst.len() > SFP_MAX_NAMES_IN_DIR {
            return Err(ProtocolError::FieldTooLong("fstlst", self.fstlst.len()));
        }
        if self.allfilenames.len() > SFP_MAX_ALLFILENAMES_LEN {
            return Err(ProtocolError::FieldTooLong(
                "allfilenames",
                self.allfilenames.len(),
            ));
        }
        Ok(())
    }
}
