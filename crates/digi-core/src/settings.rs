//! Register settings record and the per-device orchestrator.
//!
//! [`RegisterConfig`] is the file form of a digitizer's register settings as
//! it comes out of (and goes back into) the configuration file.
//! [`RegisterSettings`] is the engine form: one `Option` per scalar field and
//! a per-channel enable vector sized to the connected device.
//!
//! [`program_settings`] runs the fixed, ordered list of field
//! synchronizations for one device in one direction. Fields are independent
//! of each other within a pass, and a failing field never stops the pass.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::device::{AcquisitionMode, Digitizer, IoLevel, TriggerMode};
use crate::error::SettingsError;
use crate::mask::{synchronize_mask, MaskRegister};
use crate::program::{synchronize_optional, Direction, FieldOutcome, Register};

// =============================================================================
// Register table
// =============================================================================

/// Software trigger mode.
pub const SW_TRIGGER_MODE: Register<TriggerMode> = Register::new(
    "sw_trigger_mode",
    |d, v| d.set_sw_trigger_mode(v),
    |d| d.sw_trigger_mode(),
);

/// External trigger mode.
pub const EXT_TRIGGER_MODE: Register<TriggerMode> = Register::new(
    "ext_trigger_mode",
    |d, v| d.set_ext_trigger_mode(v),
    |d| d.ext_trigger_mode(),
);

/// Acquisition start/stop mode.
pub const ACQUISITION_MODE: Register<AcquisitionMode> = Register::new(
    "acquisition_mode",
    |d, v| d.set_acquisition_mode(v),
    |d| d.acquisition_mode(),
);

/// Front panel I/O level.
pub const IO_LEVEL: Register<IoLevel> =
    Register::new("io_level", |d, v| d.set_io_level(v), |d| d.io_level());

/// Record length in samples.
pub const RECORD_LENGTH: Register<u32> = Register::new(
    "record_length",
    |d, v| d.set_record_length(v),
    |d| d.record_length(),
);

/// Post-trigger size in percent.
pub const POST_TRIGGER_SIZE: Register<u32> = Register::new(
    "post_trigger_size",
    |d, v| d.set_post_trigger_size(v),
    |d| d.post_trigger_size(),
);

/// Maximum events per block transfer.
pub const MAX_NUM_EVENTS_BLT: Register<u32> = Register::new(
    "max_num_events_blt",
    |d, v| d.set_max_num_events_blt(v),
    |d| d.max_num_events_blt(),
);

/// Channel enables, programmed per channel or per group.
pub const CH_ENABLE: MaskRegister = MaskRegister::new(
    "ch_enable",
    |d, v| d.set_channel_enable_mask(v),
    |d| d.channel_enable_mask(),
    |d, v| d.set_group_enable_mask(v),
    |d| d.group_enable_mask(),
);

// =============================================================================
// File form
// =============================================================================

/// Register settings as written in a configuration file.
///
/// Every key is optional. `ch_enable` is a table keyed by channel index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterConfig {
    /// Software trigger mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sw_trigger_mode: Option<TriggerMode>,
    /// External trigger mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext_trigger_mode: Option<TriggerMode>,
    /// Acquisition start/stop mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquisition_mode: Option<AcquisitionMode>,
    /// Front panel I/O level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub io_level: Option<IoLevel>,
    /// Record length in samples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_length: Option<u32>,
    /// Post-trigger size in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_trigger_size: Option<u32>,
    /// Maximum events per block transfer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_num_events_blt: Option<u32>,
    /// Channel enables keyed by channel index
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ch_enable: BTreeMap<String, bool>,
}

impl RegisterConfig {
    /// Range checks that do not depend on the connected device.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.record_length == Some(0) {
            return Err(SettingsError::OutOfRange {
                setting: RECORD_LENGTH.name(),
                value: 0,
                expected: "at least 1 sample",
            });
        }
        if let Some(percent) = self.post_trigger_size.filter(|percent| *percent > 100) {
            return Err(SettingsError::OutOfRange {
                setting: POST_TRIGGER_SIZE.name(),
                value: i64::from(percent),
                expected: "0..=100 percent",
            });
        }
        // Only canonical decimal keys, so one channel has exactly one key
        if let Some(key) = self.ch_enable.keys().find(|key| channel_index(key).is_none()) {
            return Err(SettingsError::ChannelKey {
                setting: CH_ENABLE.name(),
                key: key.clone(),
            });
        }
        Ok(())
    }
}

/// Channel index of a `ch_enable` key written as a plain decimal number.
fn channel_index(key: &str) -> Option<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|channel| channel.to_string() == key)
}

// =============================================================================
// Engine form
// =============================================================================

/// Register settings of one digitizer for one configuration cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterSettings {
    /// Software trigger mode
    pub sw_trigger_mode: Option<TriggerMode>,
    /// External trigger mode
    pub ext_trigger_mode: Option<TriggerMode>,
    /// Acquisition start/stop mode
    pub acquisition_mode: Option<AcquisitionMode>,
    /// Front panel I/O level
    pub io_level: Option<IoLevel>,
    /// Record length in samples
    pub record_length: Option<u32>,
    /// Post-trigger size in percent
    pub post_trigger_size: Option<u32>,
    /// Maximum events per block transfer
    pub max_num_events_blt: Option<u32>,
    /// Per-channel enables, one entry per device channel
    pub ch_enable: Vec<Option<bool>>,
}

impl RegisterSettings {
    /// Empty record for a device with `channels` channels.
    pub fn new(channels: u32) -> Self {
        Self {
            ch_enable: vec![None; channels as usize],
            ..Default::default()
        }
    }

    /// Build and validate the record for a device with `channels` channels.
    pub fn from_config(config: &RegisterConfig, channels: u32) -> Result<Self, SettingsError> {
        config.validate()?;

        let mut ch_enable = vec![None; channels as usize];
        for (key, &enabled) in &config.ch_enable {
            let slot = channel_index(key)
                .and_then(|channel| ch_enable.get_mut(channel))
                .ok_or_else(|| SettingsError::InvalidChannel {
                    setting: CH_ENABLE.name(),
                    channel: key.clone(),
                    channels,
                })?;
            *slot = Some(enabled);
        }

        Ok(Self {
            sw_trigger_mode: config.sw_trigger_mode,
            ext_trigger_mode: config.ext_trigger_mode,
            acquisition_mode: config.acquisition_mode,
            io_level: config.io_level,
            record_length: config.record_length,
            post_trigger_size: config.post_trigger_size,
            max_num_events_blt: config.max_num_events_blt,
            ch_enable,
        })
    }

    /// Convert back to the file form. Unset channels are omitted.
    pub fn to_config(&self) -> RegisterConfig {
        RegisterConfig {
            sw_trigger_mode: self.sw_trigger_mode,
            ext_trigger_mode: self.ext_trigger_mode,
            acquisition_mode: self.acquisition_mode,
            io_level: self.io_level,
            record_length: self.record_length,
            post_trigger_size: self.post_trigger_size,
            max_num_events_blt: self.max_num_events_blt,
            ch_enable: self
                .ch_enable
                .iter()
                .enumerate()
                .filter_map(|(channel, enabled)| enabled.map(|on| (channel.to_string(), on)))
                .collect(),
        }
    }

    /// Whether every field holds a value.
    pub fn is_complete(&self) -> bool {
        self.unset_fields().is_empty()
    }

    /// Names of the settings that hold no value, in programming order.
    ///
    /// `ch_enable` counts as unset when any channel is unset.
    pub fn unset_fields(&self) -> Vec<&'static str> {
        [
            (SW_TRIGGER_MODE.name(), self.sw_trigger_mode.is_some()),
            (EXT_TRIGGER_MODE.name(), self.ext_trigger_mode.is_some()),
            (ACQUISITION_MODE.name(), self.acquisition_mode.is_some()),
            (IO_LEVEL.name(), self.io_level.is_some()),
            (RECORD_LENGTH.name(), self.record_length.is_some()),
            (POST_TRIGGER_SIZE.name(), self.post_trigger_size.is_some()),
            (MAX_NUM_EVENTS_BLT.name(), self.max_num_events_blt.is_some()),
            (CH_ENABLE.name(), self.ch_enable.iter().all(Option::is_some)),
        ]
        .into_iter()
        .filter(|(_, set)| !set)
        .map(|(name, _)| name)
        .collect()
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Tally of one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Fields whose accessor succeeded
    pub applied: usize,
    /// Fields left alone (unset while writing)
    pub skipped: usize,
    /// Fields whose accessor failed
    pub failed: Vec<&'static str>,
}

impl PassSummary {
    fn record(&mut self, field: &'static str, outcome: FieldOutcome) {
        match outcome {
            FieldOutcome::Applied => self.applied += 1,
            FieldOutcome::Skipped => self.skipped += 1,
            FieldOutcome::Failed => self.failed.push(field),
        }
    }

    /// Whether every accessed field succeeded.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Synchronize all register settings of one device in one direction.
pub fn program_settings(
    device: &mut dyn Digitizer,
    settings: &mut RegisterSettings,
    direction: Direction,
) -> PassSummary {
    let mut summary = PassSummary::default();

    let outcome = synchronize_optional(
        device,
        &SW_TRIGGER_MODE,
        &mut settings.sw_trigger_mode,
        direction,
    );
    summary.record(SW_TRIGGER_MODE.name(), outcome);

    let outcome = synchronize_optional(
        device,
        &EXT_TRIGGER_MODE,
        &mut settings.ext_trigger_mode,
        direction,
    );
    summary.record(EXT_TRIGGER_MODE.name(), outcome);

    let outcome = synchronize_optional(
        device,
        &ACQUISITION_MODE,
        &mut settings.acquisition_mode,
        direction,
    );
    summary.record(ACQUISITION_MODE.name(), outcome);

    let outcome = synchronize_optional(device, &IO_LEVEL, &mut settings.io_level, direction);
    summary.record(IO_LEVEL.name(), outcome);

    let outcome =
        synchronize_optional(device, &RECORD_LENGTH, &mut settings.record_length, direction);
    summary.record(RECORD_LENGTH.name(), outcome);

    let outcome = synchronize_optional(
        device,
        &POST_TRIGGER_SIZE,
        &mut settings.post_trigger_size,
        direction,
    );
    summary.record(POST_TRIGGER_SIZE.name(), outcome);

    let outcome = synchronize_optional(
        device,
        &MAX_NUM_EVENTS_BLT,
        &mut settings.max_num_events_blt,
        direction,
    );
    summary.record(MAX_NUM_EVENTS_BLT.name(), outcome);

    let outcome = synchronize_mask(device, &CH_ENABLE, &mut settings.ch_enable, direction);
    summary.record(CH_ENABLE.name(), outcome);

    let info = device.info();
    if summary.is_clean() {
        info!(
            model = %info.model_name,
            serial = info.serial_number,
            %direction,
            applied = summary.applied,
            skipped = summary.skipped,
            "Register settings synchronized"
        );
    } else {
        warn!(
            model = %info.model_name,
            serial = info.serial_number,
            %direction,
            applied = summary.applied,
            skipped = summary.skipped,
            failed = ?summary.failed,
            "Register settings synchronized with failures"
        );
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_sizes_channels() {
        let mut config = RegisterConfig::default();
        config.ch_enable.insert("0".to_string(), true);
        config.ch_enable.insert("3".to_string(), false);

        let settings = RegisterSettings::from_config(&config, 4).unwrap();
        assert_eq!(
            settings.ch_enable,
            vec![Some(true), None, None, Some(false)]
        );
        assert!(!settings.is_complete());
        assert_eq!(settings.unset_fields().len(), 8);
    }

    #[test]
    fn test_unset_fields_lists_missing_settings() {
        let mut settings = RegisterSettings::new(2);
        settings.sw_trigger_mode = Some(TriggerMode::Disabled);
        settings.ext_trigger_mode = Some(TriggerMode::Disabled);
        settings.acquisition_mode = Some(AcquisitionMode::SwControlled);
        settings.record_length = Some(16);
        settings.post_trigger_size = Some(10);
        settings.max_num_events_blt = Some(1);
        settings.ch_enable = vec![Some(true), None];

        assert_eq!(settings.unset_fields(), vec!["io_level", "ch_enable"]);

        settings.io_level = Some(IoLevel::Nim);
        settings.ch_enable[1] = Some(false);
        assert!(settings.unset_fields().is_empty());
        assert!(settings.is_complete());
    }

    #[test]
    fn test_from_config_rejects_unknown_channel() {
        let mut config = RegisterConfig::default();
        config.ch_enable.insert("8".to_string(), true);
        let err = RegisterSettings::from_config(&config, 8).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidChannel { channels: 8, .. }));

        let mut config = RegisterConfig::default();
        config.ch_enable.insert("first".to_string(), true);
        assert!(RegisterSettings::from_config(&config, 8).is_err());
    }

    #[test]
    fn test_non_canonical_channel_keys_rejected() {
        for key in ["03", "+3", " 3", "3 ", "-0"] {
            let mut config = RegisterConfig::default();
            config.ch_enable.insert(key.to_string(), true);

            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, SettingsError::ChannelKey { key: ref k, .. } if k == key),
                "{:?}",
                key
            );
            assert!(RegisterSettings::from_config(&config, 8).is_err());
        }

        let mut config = RegisterConfig::default();
        config.ch_enable.insert("0".to_string(), true);
        config.ch_enable.insert("10".to_string(), false);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_conflicting_keys_for_one_channel_rejected() {
        let config: RegisterConfig =
            toml::from_str(r#"ch_enable = { 3 = true, 03 = false, "+3" = false }"#).unwrap();
        assert_eq!(config.ch_enable.len(), 3);

        let err = RegisterSettings::from_config(&config, 8).unwrap_err();
        assert!(matches!(err, SettingsError::ChannelKey { .. }));
    }

    #[test]
    fn test_from_config_range_checks() {
        let config = RegisterConfig {
            post_trigger_size: Some(101),
            ..Default::default()
        };
        assert!(matches!(
            RegisterSettings::from_config(&config, 4),
            Err(SettingsError::OutOfRange {
                setting: "post_trigger_size",
                ..
            })
        ));

        let config = RegisterConfig {
            record_length: Some(0),
            ..Default::default()
        };
        assert!(RegisterSettings::from_config(&config, 4).is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let config: RegisterConfig = toml::from_str(
            r#"
            sw_trigger_mode = "acquisition_only"
            record_length = 1024
            post_trigger_size = 50
            ch_enable = { 0 = true, 2 = true }
            "#,
        )
        .unwrap();

        assert_eq!(config.sw_trigger_mode, Some(TriggerMode::AcquisitionOnly));
        assert_eq!(config.record_length, Some(1024));
        assert_eq!(config.io_level, None);

        let settings = RegisterSettings::from_config(&config, 4).unwrap();
        assert_eq!(settings.ch_enable, vec![Some(true), None, Some(true), None]);
    }

    #[test]
    fn test_to_config_round_trip() {
        let mut settings = RegisterSettings::new(3);
        settings.io_level = Some(IoLevel::Ttl);
        settings.max_num_events_blt = Some(16);
        settings.ch_enable = vec![Some(true), Some(false), None];

        let config = settings.to_config();
        assert_eq!(config.ch_enable.len(), 2);
        assert_eq!(config.ch_enable.get("1"), Some(&false));
        assert_eq!(RegisterSettings::from_config(&config, 3).unwrap(), settings);
    }

    #[test]
    fn test_pass_summary_record() {
        let mut summary = PassSummary::default();
        summary.record("a", FieldOutcome::Applied);
        summary.record("b", FieldOutcome::Skipped);
        summary.record("c", FieldOutcome::Failed);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, vec!["c"]);
        assert!(!summary.is_clean());
    }
}
