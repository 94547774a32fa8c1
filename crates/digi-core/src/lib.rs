//! Settings synchronization engine for digitizers.
//!
//! This crate maps named configuration fields onto digitizer register
//! accessors and keeps the two in sync in either direction:
//!
//! - **Writing** pushes a settings record to the hardware.
//! - **Reading** pulls the hardware's actual state back into the record, so
//!   that what gets serialized afterwards is confirmed state, not intent.
//!
//! # Architecture
//!
//! - [`device`] - The [`Digitizer`] and [`Connector`] boundary traits
//! - [`program`] - Single-field synchronization ([`synchronize`],
//!   [`synchronize_optional`]) over [`Register`] accessor pairs
//! - [`mask`] - Per-channel enable vectors vs channel/group bitmasks
//! - [`settings`] - [`RegisterSettings`] and the [`program_settings`]
//!   orchestrator
//!
//! # Example
//!
//! ```rust,ignore
//! use digi_core::{program_settings, Direction, RegisterSettings};
//!
//! let mut settings = RegisterSettings::from_config(&config, device.channels())?;
//! program_settings(device.as_mut(), &mut settings, Direction::Writing);
//! program_settings(device.as_mut(), &mut settings, Direction::Reading);
//! assert!(settings.is_complete());
//! ```

pub mod device;
pub mod error;
pub mod mask;
pub mod program;
pub mod settings;

pub use device::{
    AcquisitionMode, ConnectionSettings, Connector, DeviceInfo, Digitizer, IoLevel, LinkType,
    TriggerMode,
};
pub use error::{DeviceError, DeviceErrorKind, DeviceResult, SettingsError};
pub use mask::{
    channels_to_mask, check_group_consistency, mask_to_channels, synchronize_mask, MaskCheck,
    MaskRegister,
};
pub use program::{synchronize, synchronize_optional, Direction, FieldOutcome, Register};
pub use settings::{program_settings, PassSummary, RegisterConfig, RegisterSettings};
