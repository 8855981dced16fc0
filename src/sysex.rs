//! Sysex frame layer
//!
//! Recognizes, splits, and wraps protocol frames. Every frame is
//! `F0 <signature> <command> <body...> F7`; the signature comes from the
//! device profile, the command byte and body layout belong to the dump
//! decoder and request builder. Foreign sysex and non-sysex traffic are
//! filtered here, silently: a shared port may carry anything.

use crate::config::DeviceProfile;
use crate::error::ProtocolError;
use crate::midi::{SYSEX_END, SYSEX_START};

/// Command byte: request an object from the device
pub const CMD_REQUEST: u8 = 0x01;
/// Command byte: dump data, inbound from the device or outbound as an upload
pub const CMD_DATA: u8 = 0x02;

/// Target byte: a single preset
pub const TARGET_PRESET: u8 = 0x01;
/// Target byte: the whole preset space (full backup)
pub const TARGET_BACKUP: u8 = 0x7F;

/// Object id carrying a preset's name
pub const OBJ_NAME: u8 = 0x00;
/// Object id addressing the whole preset
pub const OBJ_ALL: u8 = 0x7F;

/// A validated frame with the framing bytes stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: u8,
    /// Everything between the command byte and the terminator
    pub body: Vec<u8>,
}

/// True iff the buffer is a well-formed frame for this device
///
/// Anything else — other manufacturers, unterminated buffers, plain channel
/// messages — is simply not ours. Never panics, never errors.
pub fn is_protocol_frame(profile: &DeviceProfile, data: &[u8]) -> bool {
    let sig = &profile.sysex_id;
    // F0 + signature + at least a command byte + F7
    if data.len() < sig.len() + 3 {
        return false;
    }
    data[0] == SYSEX_START
        && &data[1..=sig.len()] == sig.as_slice()
        && data[data.len() - 1] == SYSEX_END
}

/// Strip framing from a buffer already accepted by [`is_protocol_frame`]
pub fn split_frame(profile: &DeviceProfile, data: &[u8]) -> Result<Frame, ProtocolError> {
    let min = profile.sysex_id.len() + 3;
    if data.len() < min {
        return Err(ProtocolError::Truncated {
            expected: min,
            actual: data.len(),
        });
    }
    let command = data[profile.sysex_id.len() + 1];
    let body = data[profile.sysex_id.len() + 2..data.len() - 1].to_vec();
    Ok(Frame { command, body })
}

/// Wrap a command and body into a ready-to-send frame
///
/// Appends the checksum over `command` and `body` before the terminator.
pub fn wrap_frame(profile: &DeviceProfile, command: u8, body: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(profile.sysex_id.len() + body.len() + 4);
    frame.push(SYSEX_START);
    frame.extend_from_slice(&profile.sysex_id);
    frame.push(command);
    frame.extend_from_slice(body);
    frame.push(checksum(command, body));
    frame.push(SYSEX_END);
    frame
}

/// 7-bit two's complement checksum over the command byte and body
pub fn checksum(command: u8, body: &[u8]) -> u8 {
    let sum = body
        .iter()
        .fold(command as u32, |acc, b| acc + *b as u32);
    ((0x80 - (sum % 0x80)) & 0x7F) as u8
}

/// Split a concatenated byte stream (e.g. a .syx file) into sysex messages
///
/// Bytes outside an F0..F7 span are skipped. An unterminated trailing
/// message is dropped.
pub fn split_stream(data: &[u8]) -> Vec<&[u8]> {
    let mut frames = Vec::new();
    let mut start = None;
    for (i, b) in data.iter().enumerate() {
        match *b {
            SYSEX_START => start = Some(i),
            SYSEX_END => {
                if let Some(s) = start.take() {
                    frames.push(&data[s..=i]);
                }
            }
            _ => {}
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> DeviceProfile {
        DeviceProfile::default()
    }

    #[test]
    fn test_accepts_own_signature() {
        let p = profile();
        let frame = wrap_frame(&p, CMD_REQUEST, &[TARGET_PRESET, 5, OBJ_ALL]);
        assert!(is_protocol_frame(&p, &frame));
    }

    #[test]
    fn test_rejects_foreign_manufacturer() {
        let p = profile();
        // Korg-flavoured frame on the same port
        assert!(!is_protocol_frame(&p, &[0xF0, 0x42, 0x30, 0x00, 0x01, 0xF7]));
    }

    #[test]
    fn test_rejects_unterminated_and_short() {
        let p = profile();
        assert!(!is_protocol_frame(&p, &[0xF0, 0x00, 0x01, 0x77, 0x7F, 0x01]));
        assert!(!is_protocol_frame(&p, &[0xF0, 0x00, 0x01, 0x77, 0x7F, 0xF7]));
        assert!(!is_protocol_frame(&p, &[]));
        assert!(!is_protocol_frame(&p, &[0x90, 60, 100]));
    }

    #[test]
    fn test_accepts_any_payload_content() {
        let p = profile();
        let mut frame = vec![0xF0, 0x00, 0x01, 0x77, 0x7F];
        frame.extend_from_slice(&[0x55, 0x23, 0x00, 0x7A]);
        frame.push(0xF7);
        assert!(is_protocol_frame(&p, &frame));
    }

    #[test]
    fn test_split_roundtrip() {
        let p = profile();
        let frame = wrap_frame(&p, CMD_DATA, &[TARGET_PRESET, 2, OBJ_NAME, 0x01, 0x41]);
        let split = split_frame(&p, &frame).unwrap();
        assert_eq!(split.command, CMD_DATA);
        // body = original body + checksum byte
        assert_eq!(split.body[..5], [TARGET_PRESET, 2, OBJ_NAME, 0x01, 0x41]);
        assert_eq!(split.body.len(), 6);
    }

    #[test]
    fn test_checksum_balances_to_zero() {
        let body = [TARGET_PRESET, 5, OBJ_ALL];
        let chk = checksum(CMD_REQUEST, &body);
        let total: u32 = body.iter().fold(CMD_REQUEST as u32 + chk as u32, |a, b| a + *b as u32);
        assert_eq!(total % 0x80, 0);
        assert!(chk <= 0x7F);
    }

    #[test]
    fn test_split_stream() {
        let p = profile();
        let a = wrap_frame(&p, CMD_DATA, &[0x01]);
        let b = wrap_frame(&p, CMD_DATA, &[0x02]);
        let mut buf = Vec::new();
        buf.extend_from_slice(&a);
        buf.extend_from_slice(&[0xFE]); // active sensing between frames
        buf.extend_from_slice(&b);
        buf.extend_from_slice(&[0xF0, 0x00]); // unterminated tail
        let frames = split_stream(&buf);
        assert_eq!(frames, vec![a.as_slice(), b.as_slice()]);
    }
}
