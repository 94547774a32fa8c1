//! Error types for the configuration tool.
//!
//! Everything in this module is fatal for a configuration cycle. Recoverable
//! per-field failures never surface here: the engine logs them and carries
//! on (see [`digi_core::program_settings`]).
//!
//! ## Error Hierarchy
//!
//! - [`ConfigError`]: the configuration file could not be read, parsed or
//!   validated. Raised before any device is touched.
//! - [`SessionError`]: a digitizer could not be opened, its settings do not
//!   fit the connected board, or a session step was called out of order.
//! - [`OutputError`]: the applied configuration could not be written.
//!
//! [`DaqError`] wraps all three so the binary can propagate with `?`.

use std::path::PathBuf;

use thiserror::Error;

use digi_core::{DeviceError, SettingsError};

use crate::session::Stage;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Problems with the configuration file.
///
/// All of these are reported before any digitizer is opened.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid TOML.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A top-level key holds a plain value instead of a digitizer table.
    #[error("Top-level key '{name}' is not a section")]
    NotASection {
        /// Offending key
        name: String,
    },

    /// A digitizer section has a value of the wrong type.
    #[error("Invalid section [{name}]: {source}")]
    Section {
        /// Section name
        name: String,
        /// Deserialization error naming the key
        source: toml::de::Error,
    },

    /// A digitizer section has values that fail validation.
    #[error("Invalid section [{name}]: {source}")]
    Invalid {
        /// Section name
        name: String,
        /// Validation failure
        source: SettingsError,
    },

    /// The `[daq]` section or a `DIGI_DAQ_*` variable is invalid.
    #[error("Invalid [daq] settings: {0}")]
    App(Box<figment::Error>),
}

/// Problems while configuring one digitizer.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The digitizer could not be opened.
    ///
    /// Fatal for the whole cycle: check power, cabling and link keys, then rerun.
    #[error("Could not open digitizer [{name}]: {source}")]
    Connection {
        /// Section name
        name: String,
        /// Error from the connector
        source: DeviceError,
    },

    /// The settings refer to channels the connected board does not have.
    #[error("Settings of [{name}] do not fit the connected board: {source}")]
    Settings {
        /// Section name
        name: String,
        /// Validation failure
        source: SettingsError,
    },

    /// A session step was called out of order.
    #[error("Digitizer [{name}] cannot {action} while {stage}")]
    InvalidTransition {
        /// Section name
        name: String,
        /// Stage the session was in
        stage: Stage,
        /// Step that was attempted
        action: &'static str,
    },
}

/// Problems writing the applied configuration.
#[derive(Error, Debug)]
pub enum OutputError {
    /// The records could not be rendered as TOML.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The output file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// Output file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Any fatal error of a configuration cycle.
#[derive(Error, Debug)]
pub enum DaqError {
    /// Configuration file error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Digitizer session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Output file error
    #[error(transparent)]
    Output(#[from] OutputError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use digi_core::DeviceErrorKind;

    #[test]
    fn test_connection_error_display() {
        let err = SessionError::Connection {
            name: "top".to_string(),
            source: DeviceError::new("OpenDigitizer", DeviceErrorKind::LinkFailure, "no reply"),
        };
        let msg = err.to_string();
        assert!(msg.contains("[top]"));
        assert!(msg.contains("OpenDigitizer"));
        assert!(msg.contains("no reply"));
    }

    #[test]
    fn test_transition_error_display() {
        let err = SessionError::InvalidTransition {
            name: "top".to_string(),
            stage: Stage::Connected,
            action: "read back",
        };
        assert_eq!(err.to_string(), "Digitizer [top] cannot read back while connected");
    }

    #[test]
    fn test_wrapped_errors_are_transparent() {
        let err: DaqError = ConfigError::NotASection {
            name: "x".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Top-level key 'x' is not a section");
    }
}
