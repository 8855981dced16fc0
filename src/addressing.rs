//! Preset addressing
//!
//! Converts between the linear preset index used on the wire and the
//! row/column form printed on the device (A1..D6 on the Pacer). Index 0 is
//! the preset currently active on the pedal and has no row/column slot.

use crate::config::DeviceProfile;
use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linear preset index: 0 = currently active preset, 1..=N stored slots
pub type PresetIndex = u8;

/// Device-native preset address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetAddress {
    /// The preset currently loaded on the device
    Current,
    /// A stored slot: row letter from 'A', column from 1
    Slot { row: char, col: u8 },
}

/// Convert a linear index to the device's row/column address
pub fn to_address(
    profile: &DeviceProfile,
    index: PresetIndex,
) -> Result<PresetAddress, ProtocolError> {
    if index == 0 {
        return Ok(PresetAddress::Current);
    }
    if index > profile.preset_count {
        return Err(ProtocolError::InvalidArgument(format!(
            "preset index {} out of range (0-{})",
            index, profile.preset_count
        )));
    }
    let per_row = profile.presets_per_row;
    let row = (b'A' + (index - 1) / per_row) as char;
    let col = (index - 1) % per_row + 1;
    Ok(PresetAddress::Slot { row, col })
}

/// Convert a row/column address back to the linear index
pub fn to_index(
    profile: &DeviceProfile,
    address: PresetAddress,
) -> Result<PresetIndex, ProtocolError> {
    match address {
        PresetAddress::Current => Ok(0),
        PresetAddress::Slot { row, col } => {
            let rows = profile.preset_count / profile.presets_per_row;
            let last_row = (b'A' + rows - 1) as char;
            if !row.is_ascii_uppercase() || row > last_row {
                return Err(ProtocolError::InvalidArgument(format!(
                    "preset row '{}' out of range (A-{})",
                    row, last_row
                )));
            }
            if col == 0 || col > profile.presets_per_row {
                return Err(ProtocolError::InvalidArgument(format!(
                    "preset column {} out of range (1-{})",
                    col, profile.presets_per_row
                )));
            }
            Ok((row as u8 - b'A') * profile.presets_per_row + col)
        }
    }
}

impl fmt::Display for PresetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetAddress::Current => write!(f, "CUR"),
            PresetAddress::Slot { row, col } => write!(f, "{}{}", row, col),
        }
    }
}

impl FromStr for PresetAddress {
    type Err = ProtocolError;

    /// Parse "CUR", "A1".."Z99" (range checking happens in `to_index`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("CUR") {
            return Ok(PresetAddress::Current);
        }
        let mut chars = s.chars();
        let row = chars
            .next()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_uppercase())
            .ok_or_else(|| {
                ProtocolError::InvalidArgument(format!("not a preset address: '{}'", s))
            })?;
        let col: u8 = chars.as_str().parse().map_err(|_| {
            ProtocolError::InvalidArgument(format!("not a preset address: '{}'", s))
        })?;
        Ok(PresetAddress::Slot { row, col })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn profile() -> DeviceProfile {
        DeviceProfile::default()
    }

    #[test]
    fn test_index_zero_is_current() {
        assert_eq!(to_address(&profile(), 0).unwrap(), PresetAddress::Current);
        assert_eq!(to_index(&profile(), PresetAddress::Current).unwrap(), 0);
    }

    #[test]
    fn test_known_slots() {
        let p = profile();
        assert_eq!(
            to_address(&p, 1).unwrap(),
            PresetAddress::Slot { row: 'A', col: 1 }
        );
        assert_eq!(
            to_address(&p, 6).unwrap(),
            PresetAddress::Slot { row: 'A', col: 6 }
        );
        assert_eq!(
            to_address(&p, 7).unwrap(),
            PresetAddress::Slot { row: 'B', col: 1 }
        );
        assert_eq!(
            to_address(&p, 24).unwrap(),
            PresetAddress::Slot { row: 'D', col: 6 }
        );
    }

    #[test]
    fn test_out_of_range_index() {
        assert!(to_address(&profile(), 25).is_err());
    }

    #[test]
    fn test_out_of_range_address() {
        let p = profile();
        assert!(to_index(&p, PresetAddress::Slot { row: 'E', col: 1 }).is_err());
        assert!(to_index(&p, PresetAddress::Slot { row: 'A', col: 7 }).is_err());
        assert!(to_index(&p, PresetAddress::Slot { row: 'A', col: 0 }).is_err());
    }

    #[test]
    fn test_display_and_parse() {
        let addr: PresetAddress = "b3".parse().unwrap();
        assert_eq!(addr, PresetAddress::Slot { row: 'B', col: 3 });
        assert_eq!(addr.to_string(), "B3");
        assert_eq!("CUR".parse::<PresetAddress>().unwrap(), PresetAddress::Current);
        assert!("".parse::<PresetAddress>().is_err());
        assert!("12".parse::<PresetAddress>().is_err());
    }

    proptest! {
        #[test]
        fn prop_index_roundtrip(index in 0u8..=24) {
            let p = profile();
            let addr = to_address(&p, index).unwrap();
            prop_assert_eq!(to_index(&p, addr).unwrap(), index);
        }

        #[test]
        fn prop_address_roundtrip(row in 0u8..4, col in 1u8..=6) {
            let p = profile();
            let addr = PresetAddress::Slot { row: (b'A' + row) as char, col };
            let index = to_index(&p, addr).unwrap();
            prop_assert_eq!(to_address(&p, index).unwrap(), addr);
        }
    }
}
