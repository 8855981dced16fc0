//! Configuration for Pacer Link
//!
//! Handles loading and validating the YAML configuration file. The device
//! profile carries every constant that is specific to one device family so
//! that nothing protocol-shaped is hard-coded in the pipeline.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub device: DeviceProfile,
}

/// MIDI port configuration
///
/// Port fields are case-insensitive substring patterns matched against the
/// system port names, or a numeric index.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MidiConfig {
    #[serde(default = "default_port_pattern")]
    pub input_port: String,
    #[serde(default = "default_port_pattern")]
    pub output_port: String,
}

/// Constants of one device family
///
/// Defaults describe the Nektar Pacer: 24 stored presets in four rows of six
/// (A1..D6), plus slot 0 for the currently active preset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceProfile {
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Manufacturer + device signature, the bytes between 0xF0 and the
    /// command byte of every protocol frame
    #[serde(default = "default_sysex_id")]
    pub sysex_id: Vec<u8>,

    /// Number of stored preset slots (index 0, the active preset, is extra)
    #[serde(default = "default_preset_count")]
    pub preset_count: u8,

    /// Stored presets per row; rows are lettered from 'A'
    #[serde(default = "default_presets_per_row")]
    pub presets_per_row: u8,

    /// Quiet period inferring end-of-dump, in milliseconds
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Watchdog for a request with no reply at all, in milliseconds
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Ceiling for file intake, in bytes
    #[serde(default = "default_max_input_size")]
    pub max_input_size: usize,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        config.device.validate()?;

        Ok(config)
    }
}

impl DeviceProfile {
    /// Validate profile consistency
    pub fn validate(&self) -> Result<()> {
        if self.sysex_id.is_empty() {
            anyhow::bail!("device sysex_id cannot be empty");
        }
        if let Some(b) = self.sysex_id.iter().find(|b| **b > 0x7F) {
            anyhow::bail!("device sysex_id byte 0x{:02X} is not 7-bit clean", b);
        }
        if self.preset_count == 0 || self.preset_count > 0x7E {
            anyhow::bail!(
                "device preset_count {} out of range (1-126)",
                self.preset_count
            );
        }
        if self.presets_per_row == 0 {
            anyhow::bail!("device presets_per_row cannot be zero");
        }
        if self.preset_count % self.presets_per_row != 0 {
            anyhow::bail!(
                "device preset_count {} is not a whole number of rows of {}",
                self.preset_count,
                self.presets_per_row
            );
        }
        if self.quiet_period_ms == 0 {
            anyhow::bail!("device quiet_period_ms cannot be zero");
        }
        if self.max_input_size == 0 {
            anyhow::bail!("device max_input_size cannot be zero");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            midi: MidiConfig::default(),
            device: DeviceProfile::default(),
        }
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            input_port: default_port_pattern(),
            output_port: default_port_pattern(),
        }
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            sysex_id: default_sysex_id(),
            preset_count: default_preset_count(),
            presets_per_row: default_presets_per_row(),
            quiet_period_ms: default_quiet_period_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            max_input_size: default_max_input_size(),
        }
    }
}

// Default value functions
fn default_port_pattern() -> String { "PACER".to_string() }
fn default_device_name() -> String { "Nektar Pacer".to_string() }
fn default_sysex_id() -> Vec<u8> { vec![0x00, 0x01, 0x77, 0x7F] }
fn default_preset_count() -> u8 { 24 }
fn default_presets_per_row() -> u8 { 6 }
fn default_quiet_period_ms() -> u64 { 1000 }
fn default_response_timeout_ms() -> u64 { 20_000 }
fn default_max_input_size() -> usize { 5 * 1024 * 1024 }
