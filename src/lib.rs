//! Pacer Link - sysex preset exchange for the Nektar Pacer
//!
//! Protocol layer for talking to a Pacer-class MIDI foot controller:
//! request frames, inbound filtering, quiet-period batching, dump decoding,
//! and snapshot merging. The binary in `main.rs` is a thin CLI over this.

pub mod addressing;
pub mod batcher;
pub mod config;
pub mod decode;
pub mod error;
pub mod midi;
pub mod ports;
pub mod request;
pub mod session;
pub mod store;
pub mod sysex;

pub use config::{AppConfig, DeviceProfile, MidiConfig};
pub use error::ProtocolError;
pub use session::{DeviceSession, Transport};
pub use store::{PartialDump, PresetRecord, PresetSnapshot};
