//! Digitizer configuration file.
//!
//! The file is TOML. Every top-level table is one digitizer, keyed by its
//! name, in file order:
//!
//! ```toml
//! [daq]
//! output = "applied.toml"
//! log_level = "debug"
//!
//! [top_board]
//! link_type = "mock"
//! link_num = 4
//! record_length = 2048
//! io_level = "ttl"
//! ch_enable = { 0 = true, 9 = true }
//! ```
//!
//! `daq` and `general` are reserved section names (case-insensitive). `daq`
//! holds application settings, loaded through figment so that `DIGI_DAQ_*`
//! environment variables override the file. `general` is accepted and
//! ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use digi_core::{ConnectionSettings, RegisterConfig};

use crate::error::ConfigError;
use crate::logging::OutputFormat;

/// Section holding application settings.
pub const APP_SECTION: &str = "daq";

/// Sections that never describe a digitizer.
pub const RESERVED_SECTIONS: &[&str] = &[APP_SECTION, "general"];

/// Prefix of environment variables overriding `[daq]` keys.
pub const ENV_PREFIX: &str = "DIGI_DAQ_";

fn is_reserved(name: &str) -> bool {
    RESERVED_SECTIONS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

// =============================================================================
// Application settings
// =============================================================================

/// Application settings from the `[daq]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the applied configuration is written
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: OutputFormat,
}

fn default_output() -> PathBuf {
    PathBuf::from("output.toml")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            log_level: default_log_level(),
            log_format: OutputFormat::default(),
        }
    }
}

impl AppConfig {
    /// Layer defaults, the `[daq]` table and the environment.
    pub fn from_table(section: &toml::Table) -> Result<Self, ConfigError> {
        Self::from_table_with_env(section, ENV_PREFIX)
    }

    fn from_table_with_env(section: &toml::Table, env_prefix: &str) -> Result<Self, ConfigError> {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Serialized::defaults(section))
            .merge(Env::prefixed(env_prefix))
            .extract()
            .map_err(|e| ConfigError::App(Box::new(e)))
    }
}

// =============================================================================
// Digitizer sections
// =============================================================================

#[derive(Debug, Deserialize)]
struct SectionKeys {
    #[serde(flatten)]
    connection: ConnectionSettings,
    #[serde(flatten)]
    registers: RegisterConfig,
    #[serde(flatten)]
    unknown: BTreeMap<String, toml::Value>,
}

/// One digitizer section of the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitizerConfig {
    /// Section name
    pub name: String,
    /// How to reach the board
    pub connection: ConnectionSettings,
    /// Register settings as written in the file
    pub registers: RegisterConfig,
    /// Keys no setting consumed
    pub unknown: BTreeMap<String, toml::Value>,
}

/// A parsed configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Application settings
    pub app: AppConfig,
    /// Digitizers in file order
    pub digitizers: Vec<DigitizerConfig>,
}

impl ConfigFile {
    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let document: toml::Table = text.parse()?;

        let mut app_section = toml::Table::new();
        let mut digitizers = Vec::new();

        for (name, value) in document {
            if name.eq_ignore_ascii_case(APP_SECTION) {
                app_section = match value {
                    toml::Value::Table(table) => table,
                    _ => return Err(ConfigError::NotASection { name }),
                };
                continue;
            }
            if is_reserved(&name) {
                debug!(section = %name, "Reserved section ignored");
                continue;
            }
            if !value.is_table() {
                return Err(ConfigError::NotASection { name });
            }

            digitizers.push(parse_digitizer(name, value)?);
        }

        let app = AppConfig::from_table(&app_section)?;
        Ok(Self { app, digitizers })
    }
}

fn parse_digitizer(name: String, value: toml::Value) -> Result<DigitizerConfig, ConfigError> {
    let keys: SectionKeys = match value.try_into() {
        Ok(keys) => keys,
        Err(source) => return Err(ConfigError::Section { name, source }),
    };

    if let Err(source) = keys.connection.validate() {
        return Err(ConfigError::Invalid { name, source });
    }
    if let Err(source) = keys.registers.validate() {
        return Err(ConfigError::Invalid { name, source });
    }

    Ok(DigitizerConfig {
        name,
        connection: keys.connection,
        registers: keys.registers,
        unknown: keys.unknown,
    })
}
