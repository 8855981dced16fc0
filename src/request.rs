//! Request frame builders
//!
//! Pure constructors for the three outbound request shapes. Nothing here
//! touches a port or the snapshot; transmission belongs to the transport and
//! the session.
//!
//! Request body layout: `<target> <index> <object>` followed by the checksum
//! that [`crate::sysex::wrap_frame`] appends. With the default 4-byte
//! signature the preset index sits at byte offset 7 of the frame.

use crate::addressing::PresetIndex;
use crate::config::DeviceProfile;
use crate::error::ProtocolError;
use crate::sysex::{wrap_frame, CMD_REQUEST, OBJ_ALL, TARGET_BACKUP, TARGET_PRESET};

/// Request the full dump of one preset
pub fn request_preset(
    profile: &DeviceProfile,
    index: PresetIndex,
) -> Result<Vec<u8>, ProtocolError> {
    check_index(profile, index)?;
    Ok(wrap_frame(
        profile,
        CMD_REQUEST,
        &[TARGET_PRESET, index, OBJ_ALL],
    ))
}

/// Request a single named object (e.g. one footswitch) within a preset
pub fn request_preset_object(
    profile: &DeviceProfile,
    index: PresetIndex,
    object_id: u8,
) -> Result<Vec<u8>, ProtocolError> {
    check_index(profile, index)?;
    if object_id >= OBJ_ALL {
        return Err(ProtocolError::InvalidArgument(format!(
            "object id 0x{:02X} out of range (0x00-0x7E)",
            object_id
        )));
    }
    Ok(wrap_frame(
        profile,
        CMD_REQUEST,
        &[TARGET_PRESET, index, object_id],
    ))
}

/// Request every preset in one exchange
pub fn request_all_presets(profile: &DeviceProfile) -> Vec<u8> {
    wrap_frame(profile, CMD_REQUEST, &[TARGET_BACKUP, 0x7F, OBJ_ALL])
}

fn check_index(profile: &DeviceProfile, index: PresetIndex) -> Result<(), ProtocolError> {
    if index > profile.preset_count {
        return Err(ProtocolError::InvalidArgument(format!(
            "preset index {} out of range (0-{})",
            index, profile.preset_count
        )));
    }
    Ok(())
}
