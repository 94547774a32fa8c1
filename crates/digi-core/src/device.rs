//! Device boundary for digitizer hardware.
//!
//! This module defines what the synchronization engine needs from a
//! connected digitizer: a fixed set of typed setter/getter pairs, and a few
//! read-only capability facts ([`DeviceInfo`]) used to pick channel- or
//! group-granularity mask programming and to identify the unit in logs.
//!
//! The wire protocol lives behind the [`Digitizer`] trait. Opening a unit is
//! the job of a [`Connector`], which turns [`ConnectionSettings`] into a
//! boxed handle.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DeviceResult, SettingsError};

// =============================================================================
// Field value types
// =============================================================================

/// What happens when a trigger of a given source arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Trigger is ignored.
    #[default]
    Disabled,
    /// Trigger is only propagated to the TRG-OUT connector.
    ExtOutOnly,
    /// Trigger only starts an acquisition.
    AcquisitionOnly,
    /// Trigger starts an acquisition and is propagated to TRG-OUT.
    AcquisitionAndExtOut,
}

/// How an acquisition run is started and stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Start/stop by software command.
    #[default]
    SwControlled,
    /// Start/stop by the level on the S-IN connector.
    SInControlled,
    /// Start on the first trigger.
    FirstTriggerControlled,
}

/// Electrical standard of the front panel LEMO connectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoLevel {
    /// NIM levels.
    #[default]
    Nim,
    /// TTL levels.
    Ttl,
}

// =============================================================================
// Capability facts
// =============================================================================

/// Identification and capability facts of a connected digitizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Model name, e.g. "V1740D"
    pub model_name: String,
    /// Numeric model code reported by the board
    pub model_no: u32,
    /// Board serial number
    pub serial_number: u32,
    /// Number of input channels
    pub channels: u32,
    /// Number of channel groups (1 = channels individually addressable)
    pub groups: u32,
    /// ADC resolution in bits
    pub adc_bits: u32,
    /// Form factor (VME64, VME64X, desktop, NIM)
    pub form_factor: String,
    /// Family code of the board
    pub family_code: u32,
    /// ROC FPGA firmware release
    pub roc_firmware_rel: String,
    /// AMC FPGA firmware release
    pub amc_firmware_rel: String,
    /// PCB revision
    pub pcb_revision: u32,
    /// License string of the firmware
    pub license: String,
}

impl DeviceInfo {
    /// Whether channels share group-level enable bits.
    pub fn is_grouped(&self) -> bool {
        self.groups > 1
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (serial {})", self.model_name, self.serial_number)
    }
}

// =============================================================================
// Digitizer trait
// =============================================================================

/// A connected digitizer.
///
/// Every accessor is a blocking call into the driver. Calls are issued
/// strictly one at a time; `&mut self` reflects that the communication
/// channel to one unit is a serial resource.
pub trait Digitizer: Send {
    /// Identification and capability facts.
    fn info(&self) -> &DeviceInfo;

    /// Number of input channels.
    fn channels(&self) -> u32 {
        self.info().channels
    }

    /// Number of channel groups, 1 when ungrouped.
    fn groups(&self) -> u32 {
        self.info().groups
    }

    /// Program the software trigger mode.
    fn set_sw_trigger_mode(&mut self, mode: TriggerMode) -> DeviceResult<()>;
    /// Read the software trigger mode.
    fn sw_trigger_mode(&mut self) -> DeviceResult<TriggerMode>;

    /// Program the external (TRG-IN) trigger mode.
    fn set_ext_trigger_mode(&mut self, mode: TriggerMode) -> DeviceResult<()>;
    /// Read the external (TRG-IN) trigger mode.
    fn ext_trigger_mode(&mut self) -> DeviceResult<TriggerMode>;

    /// Program the acquisition start/stop mode.
    fn set_acquisition_mode(&mut self, mode: AcquisitionMode) -> DeviceResult<()>;
    /// Read the acquisition start/stop mode.
    fn acquisition_mode(&mut self) -> DeviceResult<AcquisitionMode>;

    /// Program the front panel I/O level.
    fn set_io_level(&mut self, level: IoLevel) -> DeviceResult<()>;
    /// Read the front panel I/O level.
    fn io_level(&mut self) -> DeviceResult<IoLevel>;

    /// Program the record length in samples.
    fn set_record_length(&mut self, samples: u32) -> DeviceResult<()>;
    /// Read the record length in samples.
    fn record_length(&mut self) -> DeviceResult<u32>;

    /// Program the post-trigger size in percent of the record.
    fn set_post_trigger_size(&mut self, percent: u32) -> DeviceResult<()>;
    /// Read the post-trigger size in percent of the record.
    fn post_trigger_size(&mut self) -> DeviceResult<u32>;

    /// Program the maximum number of events per block transfer.
    fn set_max_num_events_blt(&mut self, events: u32) -> DeviceResult<()>;
    /// Read the maximum number of events per block transfer.
    fn max_num_events_blt(&mut self) -> DeviceResult<u32>;

    /// Program the per-channel enable mask (ungrouped boards).
    fn set_channel_enable_mask(&mut self, mask: u32) -> DeviceResult<()>;
    /// Read the per-channel enable mask (ungrouped boards).
    fn channel_enable_mask(&mut self) -> DeviceResult<u32>;

    /// Program the per-group enable mask (grouped boards).
    fn set_group_enable_mask(&mut self, mask: u32) -> DeviceResult<()>;
    /// Read the per-group enable mask (grouped boards).
    fn group_enable_mask(&mut self) -> DeviceResult<u32>;
}

// =============================================================================
// Connections
// =============================================================================

/// Physical link used to reach a digitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// Direct USB connection.
    #[default]
    Usb,
    /// CONET optical link through an A2818/A3818 controller.
    OpticalLink,
    /// USB to CONET bridge (A4818).
    UsbA4818,
    /// In-memory simulated board.
    Mock,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LinkType::Usb => "usb",
            LinkType::OpticalLink => "optical_link",
            LinkType::UsbA4818 => "usb_a4818",
            LinkType::Mock => "mock",
        };
        write!(f, "{}", label)
    }
}

/// Largest number of nodes on one CONET daisy chain.
pub const MAX_CONET_NODES: u32 = 8;

/// How to reach one digitizer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Physical link type
    #[serde(default)]
    pub link_type: LinkType,
    /// Link index (USB device number or optical controller port)
    #[serde(default)]
    pub link_num: u32,
    /// Position of the board on a CONET daisy chain
    #[serde(default)]
    pub conet_node: u32,
    /// VME base address, 0 when the board is accessed directly
    #[serde(default)]
    pub vme_base_address: u32,
}

impl ConnectionSettings {
    /// Check that the connection keys are consistent with each other.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.conet_node >= MAX_CONET_NODES {
            return Err(SettingsError::Connection(format!(
                "conet_node {} exceeds the daisy chain limit of {} nodes",
                self.conet_node, MAX_CONET_NODES
            )));
        }
        let chained = matches!(self.link_type, LinkType::OpticalLink | LinkType::UsbA4818);
        if self.conet_node != 0 && !chained {
            return Err(SettingsError::Connection(format!(
                "conet_node {} requires an optical link, link_type is {}",
                self.conet_node, self.link_type
            )));
        }
        Ok(())
    }
}

/// Opens digitizers.
pub trait Connector {
    /// Establish a connection to the digitizer described by `link`.
    ///
    /// `name` is the configuration section name, used for diagnostics only.
    fn open(&self, name: &str, link: &ConnectionSettings) -> DeviceResult<Box<dyn Digitizer>>;
}
