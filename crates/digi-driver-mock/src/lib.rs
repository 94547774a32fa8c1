//! Mock digitizer driver for digi-daq
//!
//! This crate provides a simulated digitizer for testing without physical
//! hardware, and the connector the `digi-daq` binary uses for
//! `link_type = "mock"` sections.
//!
//! # Components
//!
//! - [`MockDigitizer`] - In-memory registers with board-like validation and
//!   accessor call recording
//! - [`FaultPlan`] - Deterministic accessor failures for resilience testing
//! - [`MockConnector`] - Maps link numbers to mock boards
//! - [`catalog`] - Model presets (ungrouped and grouped boards)
//!
//! # Example
//!
//! ```rust
//! use digi_core::{program_settings, Direction, RegisterSettings};
//! use digi_driver_mock::{catalog, MockDigitizer};
//!
//! let mut board = MockDigitizer::new(&catalog::V1724);
//! let mut settings = RegisterSettings::new(8);
//! settings.record_length = Some(2048);
//!
//! program_settings(&mut board, &mut settings, Direction::Writing);
//! program_settings(&mut board, &mut settings, Direction::Reading);
//! assert!(settings.is_complete());
//! ```

pub mod catalog;
mod connector;
mod digitizer;
mod faults;

pub use catalog::ModelPreset;
pub use connector::MockConnector;
pub use digitizer::{
    accessor, MockDigitizer, MockDigitizerBuilder, RegisterState, MAX_EVENTS_PER_BLT,
};
pub use faults::{FaultPlan, FaultScenario};
