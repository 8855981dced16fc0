//! Preset snapshot store
//!
//! Accumulates decoded partial records into the most complete known picture
//! of the device's presets. Merging is field-level: a partial naming only
//! `name` never erases a previously known `data` blob for the same index.
//! The raw byte stream is kept alongside, append-only, for verbatim
//! re-export of everything received.

use crate::addressing::PresetIndex;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Known fields of one preset, possibly incomplete
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetRecord {
    /// Preset name as shown on the device display
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    /// Full dump payload for the preset
    #[serde(with = "serde_bytes", skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Vec<u8>>,
    /// Decoded sub-objects (footswitches etc.) keyed by object id
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub objects: BTreeMap<u8, Vec<u8>>,
}

impl PresetRecord {
    /// Overlay every field present in `other` onto self
    pub fn merge_from(&mut self, other: &PresetRecord) {
        if let Some(name) = &other.name {
            self.name = Some(name.clone());
        }
        if let Some(data) = &other.data {
            self.data = Some(data.clone());
        }
        for (id, bytes) in &other.objects {
            self.objects.insert(*id, bytes.clone());
        }
    }
}

/// The result of decoding exactly one frame: zero or more preset partials
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialDump {
    pub presets: BTreeMap<PresetIndex, PresetRecord>,
}

impl PartialDump {
    /// Partial describing a single preset
    pub fn single(index: PresetIndex, record: PresetRecord) -> Self {
        let mut presets = BTreeMap::new();
        presets.insert(index, record);
        Self { presets }
    }
}

/// Accumulated view of the device's presets plus the raw bytes received
///
/// Owned by one session; mutated only by merges, reset only by an explicit
/// [`clear`](PresetSnapshot::clear).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PresetSnapshot {
    presets: BTreeMap<PresetIndex, PresetRecord>,
    #[serde(skip)]
    raw: BytesMut,
}

impl PresetSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a decoded partial into the snapshot
    ///
    /// Total and idempotent: unknown indices are added, known fields are
    /// overwritten, absent fields are left alone. Does not touch the raw
    /// accumulator.
    pub fn merge(&mut self, partial: &PartialDump) {
        for (index, record) in &partial.presets {
            self.presets.entry(*index).or_default().merge_from(record);
        }
    }

    /// Append received bytes to the raw accumulator
    pub fn append_raw(&mut self, data: &[u8]) {
        self.raw.extend_from_slice(data);
    }

    pub fn preset(&self, index: PresetIndex) -> Option<&PresetRecord> {
        self.presets.get(&index)
    }

    pub fn presets(&self) -> &BTreeMap<PresetIndex, PresetRecord> {
        &self.presets
    }

    /// Everything received so far, verbatim, for .syx export
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty() && self.raw.is_empty()
    }

    /// Drop all accumulated state for a fresh read
    pub fn clear(&mut self) {
        self.presets.clear();
        self.raw.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> PresetRecord {
        PresetRecord {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn with_data(data: &[u8]) -> PresetRecord {
        PresetRecord {
            data: Some(data.to_vec()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_adds_unknown_index() {
        let mut snapshot = PresetSnapshot::new();
        snapshot.merge(&PartialDump::single(3, named("Lead")));
        assert_eq!(snapshot.preset(3).unwrap().name.as_deref(), Some("Lead"));
    }

    #[test]
    fn test_merge_preserves_absent_fields() {
        let mut snapshot = PresetSnapshot::new();
        snapshot.merge(&PartialDump::single(3, named("Lead")));
        snapshot.merge(&PartialDump::single(3, with_data(&[0x01, 0x02])));

        let record = snapshot.preset(3).unwrap();
        assert_eq!(record.name.as_deref(), Some("Lead"));
        assert_eq!(record.data.as_deref(), Some(&[0x01, 0x02][..]));
    }

    #[test]
    fn test_merge_overwrites_present_fields() {
        let mut snapshot = PresetSnapshot::new();
        snapshot.merge(&PartialDump::single(3, named("Lead")));
        snapshot.merge(&PartialDump::single(3, named("Clean")));
        assert_eq!(snapshot.preset(3).unwrap().name.as_deref(), Some("Clean"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut once = PresetSnapshot::new();
        once.merge(&PartialDump::single(3, named("Lead")));

        let partial = PartialDump::single(3, with_data(&[0x0A]));
        let mut twice = once.clone();
        once.merge(&partial);
        twice.merge(&partial);
        twice.merge(&partial);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_objects_by_id() {
        let mut snapshot = PresetSnapshot::new();
        let mut a = PresetRecord::default();
        a.objects.insert(0x0D, vec![1, 2]);
        let mut b = PresetRecord::default();
        b.objects.insert(0x0E, vec![3]);

        snapshot.merge(&PartialDump::single(2, a));
        snapshot.merge(&PartialDump::single(2, b));

        let record = snapshot.preset(2).unwrap();
        assert_eq!(record.objects.get(&0x0D).unwrap(), &vec![1, 2]);
        assert_eq!(record.objects.get(&0x0E).unwrap(), &vec![3]);
    }

    #[test]
    fn test_raw_accumulator_appends() {
        let mut snapshot = PresetSnapshot::new();
        snapshot.append_raw(&[0xF0, 0x01]);
        snapshot.append_raw(&[0xF7]);
        assert_eq!(snapshot.raw(), &[0xF0, 0x01, 0xF7]);

        // structural merge leaves the accumulator alone
        snapshot.merge(&PartialDump::single(1, named("X")));
        assert_eq!(snapshot.raw(), &[0xF0, 0x01, 0xF7]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut snapshot = PresetSnapshot::new();
        snapshot.merge(&PartialDump::single(1, named("X")));
        snapshot.append_raw(&[0xF0]);
        snapshot.clear();
        assert!(snapshot.is_empty());
    }
}
