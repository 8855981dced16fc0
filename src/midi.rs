//! MIDI byte-level utilities
//!
//! Hex formatting and a coarse classification of raw messages, used by the
//! monitor output and debug logs. The protocol layer itself only cares about
//! sysex; everything else on a shared port is just labelled and passed over.

use std::fmt;

/// Start-of-sysex status byte
pub const SYSEX_START: u8 = 0xF0;
/// End-of-sysex status byte
pub const SYSEX_END: u8 = 0xF7;

/// Coarse kind of a raw MIDI message, for logging only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    SysEx,
    NoteOff,
    NoteOn,
    PolyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
    Realtime,
    System,
    Unknown,
}

impl MessageKind {
    /// Classify a raw buffer by its status byte
    pub fn of(data: &[u8]) -> Self {
        let Some(&status) = data.first() else {
            return MessageKind::Unknown;
        };
        match status {
            0xF0 => MessageKind::SysEx,
            0x80..=0x8F => MessageKind::NoteOff,
            0x90..=0x9F => MessageKind::NoteOn,
            0xA0..=0xAF => MessageKind::PolyPressure,
            0xB0..=0xBF => MessageKind::ControlChange,
            0xC0..=0xCF => MessageKind::ProgramChange,
            0xD0..=0xDF => MessageKind::ChannelPressure,
            0xE0..=0xEF => MessageKind::PitchBend,
            0xF8..=0xFF => MessageKind::Realtime,
            0xF1..=0xF7 => MessageKind::System,
            _ => MessageKind::Unknown,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MessageKind::SysEx => "SysEx",
            MessageKind::NoteOff => "NoteOff",
            MessageKind::NoteOn => "NoteOn",
            MessageKind::PolyPressure => "PolyPressure",
            MessageKind::ControlChange => "CC",
            MessageKind::ProgramChange => "ProgramChange",
            MessageKind::ChannelPressure => "ChannelPressure",
            MessageKind::PitchBend => "PitchBend",
            MessageKind::Realtime => "Realtime",
            MessageKind::System => "System",
            MessageKind::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// True if the buffer is a complete sysex message (any manufacturer)
pub fn is_sysex(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == SYSEX_START && data[data.len() - 1] == SYSEX_END
}

/// Format MIDI bytes as a spaced hex string for logs and tables
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
