//! # digi-daq
//!
//! Configures digitizers from a declarative TOML file, reads the applied
//! settings back from the hardware and writes the confirmed state out again.
//!
//! The synchronization engine itself lives in [`digi_core`]. This crate is the
//! glue around it:
//!
//! - **`config`**: Loads the digitizer configuration file and the `[daq]`
//!   application settings (figment, `DIGI_DAQ_*` overrides).
//! - **`session`**: Drives one digitizer through
//!   `Connected -> Written -> Read -> Serializable`, and all of them in order.
//! - **`output`**: Writes the read-back settings in the configuration format.
//! - **`app`**: One configuration cycle, file in to file out.
//! - **`logging`**: `tracing-subscriber` setup for the binary.
//! - **`error`**: Fatal error types.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod session;

pub use app::run;
pub use config::{AppConfig, ConfigFile, DigitizerConfig};
pub use error::{AppResult, ConfigError, DaqError, OutputError, SessionError};
pub use output::DigitizerRecord;
pub use session::{configure_all, DigitizerSession, Stage};
