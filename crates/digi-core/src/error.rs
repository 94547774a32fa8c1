//! Error types for digitizer communication and settings handling.
//!
//! Two families live here:
//!
//! - [`DeviceError`] is what the device boundary returns from every accessor
//!   call and from opening a connection. It always names the accessor that
//!   failed so diagnostics can point at the register involved.
//! - [`SettingsError`] covers semantic problems found while turning a parsed
//!   configuration into a [`RegisterSettings`](crate::settings::RegisterSettings)
//!   record (out-of-range values, channel indices the device does not have).
//!
//! Neither is allowed to abort a configuration pass once it has started: the
//! field programmer catches every `DeviceError` at the call site.

use thiserror::Error;

// =============================================================================
// Device Errors
// =============================================================================

/// Broad category of a device boundary failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorKind {
    /// Transport level failure while talking to the device.
    Communication,
    /// The driver gave up waiting for the device.
    Timeout,
    /// The device rejected the value.
    InvalidParameter,
    /// The accessor is not available on this model.
    NotSupported,
    /// The device reported an internal fault.
    Hardware,
    /// The link to the device could not be established.
    LinkFailure,
}

impl std::fmt::Display for DeviceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeviceErrorKind::Communication => "communication",
            DeviceErrorKind::Timeout => "timeout",
            DeviceErrorKind::InvalidParameter => "invalid_parameter",
            DeviceErrorKind::NotSupported => "not_supported",
            DeviceErrorKind::Hardware => "hardware",
            DeviceErrorKind::LinkFailure => "link_failure",
        };
        write!(f, "{}", label)
    }
}

/// Failure raised by a setter, getter or connection attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{accessor} failed ({kind}): {message}")]
pub struct DeviceError {
    /// Name of the driver call that failed, e.g. `SetRecordLength`.
    pub accessor: &'static str,
    /// Failure category.
    pub kind: DeviceErrorKind,
    /// Human-readable description from the driver.
    pub message: String,
}

impl DeviceError {
    /// Create a new device error.
    pub fn new(accessor: &'static str, kind: DeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            accessor,
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a communication failure.
    pub fn communication(accessor: &'static str, message: impl Into<String>) -> Self {
        Self::new(accessor, DeviceErrorKind::Communication, message)
    }

    /// Shorthand for a rejected value.
    pub fn invalid_parameter(accessor: &'static str, message: impl Into<String>) -> Self {
        Self::new(accessor, DeviceErrorKind::InvalidParameter, message)
    }

    /// Whether this error happened while establishing the link.
    pub fn is_link_failure(&self) -> bool {
        self.kind == DeviceErrorKind::LinkFailure
    }
}

/// Result type alias for device boundary calls.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

// =============================================================================
// Settings Errors
// =============================================================================

/// Semantic errors in a settings record, caught before any device access.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    /// A value is outside the range the setting accepts.
    ///
    /// Fix the value in the configuration file; nothing has been written.
    #[error("Setting '{setting}' = {value} is out of range ({expected})")]
    OutOfRange {
        /// Name of the setting
        setting: &'static str,
        /// Rejected value
        value: i64,
        /// Human-readable accepted range
        expected: &'static str,
    },

    /// `ch_enable` names a channel the device does not have.
    #[error("Setting '{setting}' refers to channel '{channel}', device has {channels} channels")]
    InvalidChannel {
        /// Name of the setting
        setting: &'static str,
        /// Channel key as written in the configuration
        channel: String,
        /// Channel count of the connected device
        channels: u32,
    },

    /// A `ch_enable` key that is not a plain decimal channel number.
    ///
    /// Keys like `03` or `+3` are rejected so that each channel can only be
    /// configured once.
    #[error("Setting '{setting}' has key '{key}', expected a channel number such as 0 or 12")]
    ChannelKey {
        /// Name of the setting
        setting: &'static str,
        /// Offending key
        key: String,
    },

    /// Connection keys that contradict each other.
    #[error("Invalid connection settings: {0}")]
    Connection(String),
}
