// =============================================================================
// KERNELSIM KERNEL IPC - SYSCALL LINE GRAMMAR - kernel/src/ipc/syscall.rs
// Classification of application lines into ticks, completions, and syscalls
// =============================================================================

//! The application line grammar.
//!
//! Apps speak newline-delimited text on their stdout pipe:
//!
//! ```text
//! TICK    A<id> <pid> <pc>
//! DONE    A<id> <pid> <pc>
//! READ    A<id> <pid> <path> <offset>
//! WRITE   A<id> <pid> <path> <offset> <payload>
//! ADD     A<id> <pid> <path> <name>
//! REM     A<id> <pid> <path> <name>
//! LISTDIR A<id> <pid> <path>
//! ```
//!
//! Syscall verbs map onto SFP request records; the WRITE payload is
//! truncated or NUL-padded to the 16-byte block. Malformed lines parse to
//! `None` and are dropped by the caller without blocking any PCB.

// Internal imports
use shared::{SfpMessage, SFP_MAX_PATH_LEN};

/// One classified application line.
#[derive(Debug, Clone, PartialEq)]
pub enum AppLine {
    Tick { aid: i32, pid: u32, pc: u32 },
    Done { aid: i32, pid: u32, pc: u32 },
    Syscall { pid: u32, request: SfpMessage },
}

/// Parse one complete line. `None` means malformed or unknown.
pub fn parse_app_line(line: &str) -> Option<AppLine> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.is_empty() {
        return None;
    }

    let verb = fields[0];
    let aid = parse_app_id(fields.get(1)?)?;
    let pid: u32 = fields.get(2)?.parse().ok()?;

    match verb {
        "TICK" | "DONE" => {
            if fields.len() != 4 {
                return None;
            }
            let pc: u32 = fields[3].parse().ok()?;
            if verb == "TICK" {
                Some(AppLine::Tick { aid, pid, pc })
            } else {
                Some(AppLine::Done { aid, pid, pc })
            }
        }
        "READ" => {
            if fields.len() != 5 {
                return None;
            }
            let path = valid_path(fields[3])?;
            let offset: i32 = fields[4].parse().ok()?;
            Some(AppLine::Syscall {
                pid,
                request: SfpMessage::read_request(aid, path, offset),
            })
        }
        "WRITE" => {
            if fields.len() != 6 {
                return None;
            }
            let path = valid_path(fields[3])?;
            let offset: i32 = fields[4].parse().ok()?;
            Some(AppLine::Syscall {
                pid,
                request: SfpMessage::write_request(aid, path, offset, fields[5].as_bytes()),
            })
        }
        "ADD" | "REM" => {
            if fields.len() != 5 {
                return None;
            }
            let path = valid_path(fields[3])?;
            let name = valid_path(fields[4])?;
            let request = if verb == "ADD" {
                SfpMessage::mkdir_request(aid, path, name)
            } else {
                SfpMessage::remove_request(aid, path, name)
            };
            Some(AppLine::Syscall { pid, request })
        }
        "LISTDIR" => {
            if fields.len() != 4 {
                return None;
            }
            let path = valid_path(fields[3])?;
            Some(AppLine::Syscall {
                pid,
                request: SfpMessage::list_request(aid, path),
            })
        }
        _ => None,
    }
}

/// `A<k>` -> k.
fn parse_app_id(field: &str) -> Option<i32> {
    field.strip_prefix('A')?.parse().ok()
}

fn valid_path(field: &str) -> Option<&str> {
    if field.len() <= SFP_MAX_PATH_LEN {
        Some(field)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::SfpMsgType;

    #[test]
    fn tick_and_done_lines_parse() {
        assert_eq!(
            parse_app_line("TICK A3 4242 7"),
            Some(AppLine::Tick { aid: 3, pid: 4242, pc: 7 })
        );
        assert_eq!(
            parse_app_line("DONE A5 999 20"),
            Some(AppLine::Done { aid: 5, pid: 999, pc: 20 })
        );
    }

    #[test]
    fn read_line_builds_a_read_request() {
        let parsed = parse_app_line("READ A1 4242 /A1/file.txt 32").expect("parse");
        let AppLine::Syscall { pid, request } = parsed else {
            panic!("expected syscall");
        };
        assert_eq!(pid, 4242);
        assert_eq!(request.msg_type, SfpMsgType::RdReq);
        assert_eq!(request.owner, 1);
        assert_eq!(request.path, "/A1/file.txt");
        assert_eq!(request.path_len, 12);
        assert_eq!(request.offset, 32);
    }

    #[test]
    fn write_line_pads_the_payload_to_one_block() {
        let parsed = parse_app_line("WRITE A2 17 /A0/file.txt 16 Hello").expect("parse");
        let AppLine::Syscall { request, .. } = parsed else {
            panic!("expected syscall");
        };
        assert_eq!(request.msg_type, SfpMsgType::WrReq);
        assert_eq!(&request.payload[..5], b"Hello");
        assert!(request.payload[5..].iter().all(|&b| b == 0));
    }

    #[test]
    fn add_and_rem_carry_path_and_name() {
        let parsed = parse_app_line("ADD A4 88 /A4 newDir_A4_3").expect("parse");
        let AppLine::Syscall { request, .. } = parsed else {
            panic!("expected syscall");
        };
        assert_eq!(request.msg_type, SfpMsgType::DcReq);
        assert_eq!(request.path, "/A4");
        assert_eq!(request.name, "newDir_A4_3");
        assert_eq!(request.name_len, 11);

        let parsed = parse_app_line("REM A4 88 /A4 newDir_A4_3").expect("parse");
        let AppLine::Syscall { request, .. } = parsed else {
            panic!("expected syscall");
        };
        assert_eq!(request.msg_type, SfpMsgType::DrReq);
    }

    #[test]
    fn listdir_builds_a_list_request() {
        let parsed = parse_app_line("LISTDIR A5 31 /A0").expect("parse");
        let AppLine::Syscall { request, .. } = parsed else {
            panic!("expected syscall");
        };
        assert_eq!(request.msg_type, SfpMsgType::DlReq);
        assert_eq!(request.path, "/A0");
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert_eq!(parse_app_line(""), None);
        assert_eq!(parse_app_line("NOP A1 10"), None);
        assert_eq!(parse_app_line("TICK A1 10"), None); // missing pc
        assert_eq!(parse_app_line("TICK B1 10 2"), None); // bad app token
        assert_eq!(parse_app_line("READ A1 ten /A1/f 0"), None); // bad pid
        assert_eq!(parse_app_line("READ A1 10 /A1/f zero"), None); // bad offset
        assert_eq!(parse_app_line("WRITE A1 10 /A1/f 0"), None); // missing payload
        assert_eq!(parse_app_line("LISTDIR A1 10 /A1 extra"), None);

        let long_path = format!("READ A1 10 /{} 0", "p".repeat(SFP_MAX_PATH_LEN + 1));
        assert_eq!(parse_app_line(&long_path), None);
    }
}
