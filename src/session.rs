//! Per-digitizer configuration session.
//!
//! A [`DigitizerSession`] owns one connected board and its settings record
//! for one configuration cycle and walks it through
//! `Connected -> Written -> Read -> Serializable`:
//!
//! 1. [`DigitizerSession::open`] connects and builds the settings record
//! 2. [`DigitizerSession::write`] pushes the configured settings
//! 3. [`DigitizerSession::report_unknown_keys`] warns about leftover keys
//! 4. [`DigitizerSession::read_back`] pulls the board's actual state
//! 5. [`DigitizerSession::finish`] hands out the record for serialization
//!
//! Steps never move backward. Calling one out of order returns
//! [`SessionError::InvalidTransition`].

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, error, info, warn};

use digi_core::{
    program_settings, ConnectionSettings, Connector, Digitizer, Direction, PassSummary,
    RegisterSettings,
};

use crate::config::DigitizerConfig;
use crate::error::SessionError;
use crate::output::DigitizerRecord;

const CONNECTION_HINT: &str = "Check that the digitizer is powered on, that link_type, link_num, \
     conet_node and vme_base_address match the hardware setup, and that the driver for the link \
     is installed";

/// Where a session is in its configuration cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Board open, nothing programmed yet
    Connected,
    /// Settings pushed to the board
    Written,
    /// Board state pulled back into the settings record
    Read,
    /// Record handed out for serialization
    Serializable,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Connected => "connected",
            Stage::Written => "written",
            Stage::Read => "read",
            Stage::Serializable => "serializable",
        };
        write!(f, "{}", label)
    }
}

/// One digitizer through one configuration cycle.
pub struct DigitizerSession {
    name: String,
    connection: ConnectionSettings,
    device: Box<dyn Digitizer>,
    settings: RegisterSettings,
    unknown: BTreeMap<String, toml::Value>,
    stage: Stage,
}

impl fmt::Debug for DigitizerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigitizerSession")
            .field("name", &self.name)
            .field("device", self.device.info())
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl DigitizerSession {
    /// Connect to the digitizer described by `config`.
    ///
    /// Connection failures are logged with a remediation hint. Channel
    /// enables that name channels the board does not have are rejected here,
    /// since the channel count is only known once connected.
    pub fn open(config: DigitizerConfig, connector: &dyn Connector) -> Result<Self, SessionError> {
        let DigitizerConfig {
            name,
            connection,
            registers,
            unknown,
        } = config;

        info!(
            digitizer = %name,
            link_type = %connection.link_type,
            link_num = connection.link_num,
            conet_node = connection.conet_node,
            vme_base_address = format_args!("{:#x}", connection.vme_base_address),
            "Connecting to digitizer"
        );

        let device = match connector.open(&name, &connection) {
            Ok(device) => device,
            Err(source) => {
                error!(digitizer = %name, error = %source, "Failed to open digitizer");
                error!(digitizer = %name, "{}", CONNECTION_HINT);
                return Err(SessionError::Connection { name, source });
            }
        };

        let info = device.info();
        info!(
            digitizer = %name,
            model = %info.model_name,
            serial = info.serial_number,
            "Connected to digitizer"
        );
        debug!(
            digitizer = %name,
            model_no = info.model_no,
            channels = info.channels,
            groups = info.groups,
            adc_bits = info.adc_bits,
            form_factor = %info.form_factor,
            family_code = info.family_code,
            roc_firmware = %info.roc_firmware_rel,
            amc_firmware = %info.amc_firmware_rel,
            pcb_revision = info.pcb_revision,
            license = %info.license,
            "Digitizer identity"
        );

        let settings = match RegisterSettings::from_config(&registers, device.channels()) {
            Ok(settings) => settings,
            Err(source) => return Err(SessionError::Settings { name, source }),
        };

        Ok(Self {
            name,
            connection,
            device,
            settings,
            unknown,
            stage: Stage::Connected,
        })
    }

    /// Current stage
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Settings record in its current state
    pub fn settings(&self) -> &RegisterSettings {
        &self.settings
    }

    /// Push the configured settings to the board.
    pub fn write(&mut self) -> Result<PassSummary, SessionError> {
        self.require(Stage::Connected, "write settings")?;
        let summary = program_settings(self.device.as_mut(), &mut self.settings, Direction::Writing);
        self.stage = Stage::Written;
        Ok(summary)
    }

    /// Warn about every key of the section no setting consumed.
    ///
    /// Returns the number of unknown keys.
    pub fn report_unknown_keys(&self) -> usize {
        for (key, value) in &self.unknown {
            warn!(
                digitizer = %self.name,
                key = %key,
                value = %value,
                "Unknown setting in section ignored"
            );
        }
        self.unknown.len()
    }

    /// Pull the board's actual state into the settings record.
    pub fn read_back(&mut self) -> Result<PassSummary, SessionError> {
        self.require(Stage::Written, "read back")?;
        let summary = program_settings(self.device.as_mut(), &mut self.settings, Direction::Reading);
        self.stage = Stage::Read;
        Ok(summary)
    }

    /// Hand out the confirmed settings for serialization.
    pub fn finish(&mut self) -> Result<DigitizerRecord, SessionError> {
        self.require(Stage::Read, "finish")?;
        let missing = self.settings.unset_fields();
        if !missing.is_empty() {
            warn!(
                digitizer = %self.name,
                missing = ?missing,
                "Settings could not be read back and are missing from the output"
            );
        }
        self.stage = Stage::Serializable;
        Ok(DigitizerRecord {
            name: self.name.clone(),
            connection: self.connection.clone(),
            registers: self.settings.to_config(),
        })
    }

    fn require(&self, stage: Stage, action: &'static str) -> Result<(), SessionError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                name: self.name.clone(),
                stage: self.stage,
                action,
            })
        }
    }
}

/// Run a full configuration cycle on every digitizer, one at a time, in order.
///
/// The first connection failure aborts the whole cycle.
pub fn configure_all(
    digitizers: Vec<DigitizerConfig>,
    connector: &dyn Connector,
) -> Result<Vec<DigitizerRecord>, SessionError> {
    let mut records = Vec::with_capacity(digitizers.len());

    for config in digitizers {
        let mut session = DigitizerSession::open(config, connector)?;
        session.write()?;
        session.report_unknown_keys();
        session.read_back()?;
        records.push(session.finish()?);
    }

    Ok(records)
}
