//! Mock digitizer implementation.
//!
//! [`MockDigitizer`] keeps its registers in memory, validates written values
//! the way a board does (range checks, mask widths, channel vs group enable
//! registers), records every accessor call, and can be told to fail calls
//! through a [`FaultPlan`].

use tracing::debug;

use digi_core::{
    AcquisitionMode, DeviceError, DeviceErrorKind, DeviceInfo, DeviceResult, Digitizer, IoLevel,
    TriggerMode,
};

use crate::catalog::{ModelPreset, DT5724};
use crate::faults::FaultPlan;

/// Driver call names, as reported in [`DeviceError::accessor`].
#[allow(missing_docs)]
pub mod accessor {
    pub const SET_SW_TRIGGER_MODE: &str = "SetSWTriggerMode";
    pub const GET_SW_TRIGGER_MODE: &str = "GetSWTriggerMode";
    pub const SET_EXT_TRIGGER_MODE: &str = "SetExtTriggerInputMode";
    pub const GET_EXT_TRIGGER_MODE: &str = "GetExtTriggerInputMode";
    pub const SET_ACQUISITION_MODE: &str = "SetAcquisitionMode";
    pub const GET_ACQUISITION_MODE: &str = "GetAcquisitionMode";
    pub const SET_IO_LEVEL: &str = "SetIOLevel";
    pub const GET_IO_LEVEL: &str = "GetIOLevel";
    pub const SET_RECORD_LENGTH: &str = "SetRecordLength";
    pub const GET_RECORD_LENGTH: &str = "GetRecordLength";
    pub const SET_POST_TRIGGER_SIZE: &str = "SetPostTriggerSize";
    pub const GET_POST_TRIGGER_SIZE: &str = "GetPostTriggerSize";
    pub const SET_MAX_NUM_EVENTS_BLT: &str = "SetMaxNumEventsBLT";
    pub const GET_MAX_NUM_EVENTS_BLT: &str = "GetMaxNumEventsBLT";
    pub const SET_CHANNEL_ENABLE_MASK: &str = "SetChannelEnableMask";
    pub const GET_CHANNEL_ENABLE_MASK: &str = "GetChannelEnableMask";
    pub const SET_GROUP_ENABLE_MASK: &str = "SetGroupEnableMask";
    pub const GET_GROUP_ENABLE_MASK: &str = "GetGroupEnableMask";
}

/// Largest block transfer size the boards accept.
pub const MAX_EVENTS_PER_BLT: u32 = 1023;

/// Register contents of a mock digitizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterState {
    /// Software trigger mode
    pub sw_trigger_mode: TriggerMode,
    /// External trigger mode
    pub ext_trigger_mode: TriggerMode,
    /// Acquisition start/stop mode
    pub acquisition_mode: AcquisitionMode,
    /// Front panel I/O level
    pub io_level: IoLevel,
    /// Record length in samples
    pub record_length: u32,
    /// Post-trigger size in percent
    pub post_trigger_size: u32,
    /// Maximum events per block transfer
    pub max_num_events_blt: u32,
    /// Channel enable register (ungrouped boards)
    pub channel_enable_mask: u32,
    /// Group enable register (grouped boards)
    pub group_enable_mask: u32,
}

impl Default for RegisterState {
    /// Power-on values.
    fn default() -> Self {
        Self {
            sw_trigger_mode: TriggerMode::AcquisitionOnly,
            ext_trigger_mode: TriggerMode::AcquisitionOnly,
            acquisition_mode: AcquisitionMode::SwControlled,
            io_level: IoLevel::Nim,
            record_length: 1024,
            post_trigger_size: 50,
            max_num_events_blt: 1,
            channel_enable_mask: 0,
            group_enable_mask: 0,
        }
    }
}

/// Simulated digitizer.
#[derive(Debug)]
pub struct MockDigitizer {
    info: DeviceInfo,
    registers: RegisterState,
    faults: FaultPlan,
    calls: Vec<&'static str>,
}

impl MockDigitizer {
    /// Create a mock of the given model with power-on registers
    pub fn new(preset: &ModelPreset) -> Self {
        Self::builder().preset(preset).build()
    }

    /// Create a builder for configuring MockDigitizer
    pub fn builder() -> MockDigitizerBuilder {
        MockDigitizerBuilder::new()
    }

    /// Current register contents
    pub fn registers(&self) -> &RegisterState {
        &self.registers
    }

    /// Mutable register contents, for simulating front panel changes
    pub fn registers_mut(&mut self) -> &mut RegisterState {
        &mut self.registers
    }

    /// Replace the fault plan
    pub fn set_faults(&mut self, faults: FaultPlan) {
        self.faults = faults;
    }

    /// Every accessor call so far, in order, including failed ones
    pub fn calls(&self) -> &[&'static str] {
        &self.calls
    }

    /// Number of calls to one accessor
    pub fn call_count(&self, accessor: &str) -> usize {
        self.calls.iter().filter(|call| **call == accessor).count()
    }

    fn begin(&mut self, accessor: &'static str) -> DeviceResult<()> {
        self.calls.push(accessor);
        self.faults.check(accessor)
    }

    fn require_grouped(&self, accessor: &'static str, grouped: bool) -> DeviceResult<()> {
        if self.info.is_grouped() == grouped {
            return Ok(());
        }
        let message = if grouped {
            format!("{} has no channel groups", self.info.model_name)
        } else {
            format!(
                "{} enables channels per group ({} groups)",
                self.info.model_name, self.info.groups
            )
        };
        Err(DeviceError::new(accessor, DeviceErrorKind::NotSupported, message))
    }

    fn check_mask_width(accessor: &'static str, mask: u32, width: u32) -> DeviceResult<()> {
        let allowed = 1u32.checked_shl(width).map_or(u32::MAX, |limit| limit - 1);
        if mask & !allowed != 0 {
            return Err(DeviceError::invalid_parameter(
                accessor,
                format!("mask {:#x} exceeds {} bits", mask, width),
            ));
        }
        Ok(())
    }
}

impl Digitizer for MockDigitizer {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn set_sw_trigger_mode(&mut self, mode: TriggerMode) -> DeviceResult<()> {
        self.begin(accessor::SET_SW_TRIGGER_MODE)?;
        debug!(?mode, "MockDigitizer: software trigger mode set");
        self.registers.sw_trigger_mode = mode;
        Ok(())
    }

    fn sw_trigger_mode(&mut self) -> DeviceResult<TriggerMode> {
        self.begin(accessor::GET_SW_TRIGGER_MODE)?;
        Ok(self.registers.sw_trigger_mode)
    }

    fn set_ext_trigger_mode(&mut self, mode: TriggerMode) -> DeviceResult<()> {
        self.begin(accessor::SET_EXT_TRIGGER_MODE)?;
        debug!(?mode, "MockDigitizer: external trigger mode set");
        self.registers.ext_trigger_mode = mode;
        Ok(())
    }

    fn ext_trigger_mode(&mut self) -> DeviceResult<TriggerMode> {
        self.begin(accessor::GET_EXT_TRIGGER_MODE)?;
        Ok(self.registers.ext_trigger_mode)
    }

    fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> DeviceResult<()> {
        self.begin(accessor::SET_ACQUISITION_MODE)?;
        debug!(?mode, "MockDigitizer: acquisition mode set");
        self.registers.acquisition_mode = mode;
        Ok(())
    }

    fn acquisition_mode(&mut self) -> DeviceResult<AcquisitionMode> {
        self.begin(accessor::GET_ACQUISITION_MODE)?;
        Ok(self.registers.acquisition_mode)
    }

    fn set_io_level(&mut self, level: IoLevel) -> DeviceResult<()> {
        self.begin(accessor::SET_IO_LEVEL)?;
        debug!(?level, "MockDigitizer: I/O level set");
        self.registers.io_level = level;
        Ok(())
    }

    fn io_level(&mut self) -> DeviceResult<IoLevel> {
        self.begin(accessor::GET_IO_LEVEL)?;
        Ok(self.registers.io_level)
    }

    fn set_record_length(&mut self, samples: u32) -> DeviceResult<()> {
        self.begin(accessor::SET_RECORD_LENGTH)?;
        if samples == 0 {
            return Err(DeviceError::invalid_parameter(
                accessor::SET_RECORD_LENGTH,
                "record length must be at least 1 sample",
            ));
        }
        debug!(samples, "MockDigitizer: record length set");
        self.registers.record_length = samples;
        Ok(())
    }

    fn record_length(&mut self) -> DeviceResult<u32> {
        self.begin(accessor::GET_RECORD_LENGTH)?;
        Ok(self.registers.record_length)
    }

    fn set_post_trigger_size(&mut self, percent: u32) -> DeviceResult<()> {
        self.begin(accessor::SET_POST_TRIGGER_SIZE)?;
        if percent > 100 {
            return Err(DeviceError::invalid_parameter(
                accessor::SET_POST_TRIGGER_SIZE,
                format!("post trigger size {}% exceeds 100%", percent),
            ));
        }
        debug!(percent, "MockDigitizer: post trigger size set");
        self.registers.post_trigger_size = percent;
        Ok(())
    }

    fn post_trigger_size(&mut self) -> DeviceResult<u32> {
        self.begin(accessor::GET_POST_TRIGGER_SIZE)?;
        Ok(self.registers.post_trigger_size)
    }

    fn set_max_num_events_blt(&mut self, events: u32) -> DeviceResult<()> {
        self.begin(accessor::SET_MAX_NUM_EVENTS_BLT)?;
        if !(1..=MAX_EVENTS_PER_BLT).contains(&events) {
            return Err(DeviceError::invalid_parameter(
                accessor::SET_MAX_NUM_EVENTS_BLT,
                format!("{} events per transfer outside 1..={}", events, MAX_EVENTS_PER_BLT),
            ));
        }
        debug!(events, "MockDigitizer: max events per block transfer set");
        self.registers.max_num_events_blt = events;
        Ok(())
    }

    fn max_num_events_blt(&mut self) -> DeviceResult<u32> {
        self.begin(accessor::GET_MAX_NUM_EVENTS_BLT)?;
        Ok(self.registers.max_num_events_blt)
    }

    fn set_channel_enable_mask(&mut self, mask: u32) -> DeviceResult<()> {
        self.begin(accessor::SET_CHANNEL_ENABLE_MASK)?;
        self.require_grouped(accessor::SET_CHANNEL_ENABLE_MASK, false)?;
        Self::check_mask_width(accessor::SET_CHANNEL_ENABLE_MASK, mask, self.info.channels)?;
        debug!(mask = format_args!("{:#x}", mask), "MockDigitizer: channel enable mask set");
        self.registers.channel_enable_mask = mask;
        Ok(())
    }

    fn channel_enable_mask(&mut self) -> DeviceResult<u32> {
        self.begin(accessor::GET_CHANNEL_ENABLE_MASK)?;
        self.require_grouped(accessor::GET_CHANNEL_ENABLE_MASK, false)?;
        Ok(self.registers.channel_enable_mask)
    }

    fn set_group_enable_mask(&mut self, mask: u32) -> DeviceResult<()> {
        self.begin(accessor::SET_GROUP_ENABLE_MASK)?;
        self.require_grouped(accessor::SET_GROUP_ENABLE_MASK, true)?;
        Self::check_mask_width(accessor::SET_GROUP_ENABLE_MASK, mask, self.info.groups)?;
        debug!(mask = format_args!("{:#x}", mask), "MockDigitizer: group enable mask set");
        self.registers.group_enable_mask = mask;
        Ok(())
    }

    fn group_enable_mask(&mut self) -> DeviceResult<u32> {
        self.begin(accessor::GET_GROUP_ENABLE_MASK)?;
        self.require_grouped(accessor::GET_GROUP_ENABLE_MASK, true)?;
        Ok(self.registers.group_enable_mask)
    }
}

/// Builder for [`MockDigitizer`].
#[derive(Debug, Clone)]
pub struct MockDigitizerBuilder {
    preset: ModelPreset,
    serial_number: u32,
    registers: RegisterState,
    faults: FaultPlan,
}

impl Default for MockDigitizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDigitizerBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            preset: DT5724,
            serial_number: 1000,
            registers: RegisterState::default(),
            faults: FaultPlan::none(),
        }
    }

    /// Set the board model
    pub fn preset(mut self, preset: &ModelPreset) -> Self {
        self.preset = *preset;
        self
    }

    /// Override the channel layout of the preset
    pub fn layout(mut self, channels: u32, groups: u32) -> Self {
        self.preset.channels = channels;
        self.preset.groups = groups.max(1);
        self
    }

    /// Set the serial number
    pub fn serial_number(mut self, serial_number: u32) -> Self {
        self.serial_number = serial_number;
        self
    }

    /// Set the initial register contents
    pub fn registers(mut self, registers: RegisterState) -> Self {
        self.registers = registers;
        self
    }

    /// Set fault injection
    pub fn faults(mut self, faults: FaultPlan) -> Self {
        self.faults = faults;
        self
    }

    /// Build the MockDigitizer
    pub fn build(self) -> MockDigitizer {
        let preset = self.preset;
        MockDigitizer {
            info: DeviceInfo {
                model_name: preset.model_name.to_string(),
                model_no: preset.model_no,
                serial_number: self.serial_number,
                channels: preset.channels,
                groups: preset.groups,
                adc_bits: preset.adc_bits,
                form_factor: preset.form_factor.to_string(),
                family_code: preset.family_code,
                roc_firmware_rel: "04.25 - Build 1F12".to_string(),
                amc_firmware_rel: "00.17 - Build 1F08".to_string(),
                pcb_revision: 1,
                license: "mock".to_string(),
            },
            registers: self.registers,
            faults: self.faults,
            calls: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DT5742, V1740};

    #[test]
    fn test_builder_defaults() {
        let mock = MockDigitizer::builder().build();
        assert_eq!(mock.info().model_name, "DT5724");
        assert_eq!(mock.channels(), 4);
        assert_eq!(mock.groups(), 1);
        assert_eq!(mock.registers(), &RegisterState::default());
    }

    #[test]
    fn test_layout_override() {
        let mock = MockDigitizer::builder().layout(8, 2).build();
        assert_eq!(mock.channels(), 8);
        assert_eq!(mock.groups(), 2);
        assert!(mock.info().is_grouped());
    }

    #[test]
    fn test_register_round_trip() {
        let mut mock = MockDigitizer::new(&DT5724);
        mock.set_record_length(4096).unwrap();
        mock.set_io_level(IoLevel::Ttl).unwrap();
        assert_eq!(mock.record_length().unwrap(), 4096);
        assert_eq!(mock.io_level().unwrap(), IoLevel::Ttl);
        assert_eq!(
            mock.calls(),
            &[
                accessor::SET_RECORD_LENGTH,
                accessor::SET_IO_LEVEL,
                accessor::GET_RECORD_LENGTH,
                accessor::GET_IO_LEVEL,
            ]
        );
    }

    #[test]
    fn test_range_checks() {
        let mut mock = MockDigitizer::new(&DT5724);
        let err = mock.set_post_trigger_size(150).unwrap_err();
        assert_eq!(err.kind, DeviceErrorKind::InvalidParameter);
        assert_eq!(mock.registers().post_trigger_size, 50);

        assert!(mock.set_max_num_events_blt(0).is_err());
        assert!(mock.set_max_num_events_blt(MAX_EVENTS_PER_BLT + 1).is_err());
        assert!(mock.set_record_length(0).is_err());
    }

    #[test]
    fn test_mask_registers_follow_grouping() {
        let mut ungrouped = MockDigitizer::new(&DT5724);
        assert!(ungrouped.set_channel_enable_mask(0b1111).is_ok());
        let err = ungrouped.set_group_enable_mask(0b1).unwrap_err();
        assert_eq!(err.kind, DeviceErrorKind::NotSupported);

        let mut grouped = MockDigitizer::new(&DT5742);
        assert!(grouped.set_group_enable_mask(0b11).is_ok());
        assert!(grouped.channel_enable_mask().is_err());
    }

    #[test]
    fn test_mask_width_checked() {
        let mut mock = MockDigitizer::new(&DT5724);
        assert!(mock.set_channel_enable_mask(0b1_0000).is_err());

        let mut wide = MockDigitizer::new(&V1740);
        assert!(wide.set_group_enable_mask(0xFF).is_ok());
        assert!(wide.set_group_enable_mask(0x1FF).is_err());
    }

    #[test]
    fn test_faults_are_recorded_and_returned() {
        let mut mock = MockDigitizer::builder()
            .faults(FaultPlan::failing(accessor::SET_IO_LEVEL))
            .build();
        let err = mock.set_io_level(IoLevel::Ttl).unwrap_err();
        assert_eq!(err.accessor, accessor::SET_IO_LEVEL);
        assert_eq!(mock.registers().io_level, IoLevel::Nim);
        assert_eq!(mock.call_count(accessor::SET_IO_LEVEL), 1);
    }
}
