//! Applied configuration output.
//!
//! Written in the same format [`ConfigFile`](crate::config::ConfigFile)
//! reads, so a run's output can be fed back in as the next run's input.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use digi_core::{ConnectionSettings, RegisterConfig};

use crate::error::OutputError;

const HEADER: &str = "# Settings read back from the digitizers by digi-daq\n\n";

/// Confirmed state of one digitizer after a configuration cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigitizerRecord {
    /// Section name
    #[serde(skip)]
    pub name: String,
    /// How the board was reached
    #[serde(flatten)]
    pub connection: ConnectionSettings,
    /// Register settings as read back
    #[serde(flatten)]
    pub registers: RegisterConfig,
}

/// Render records as a configuration document.
pub fn render(records: &[DigitizerRecord]) -> Result<String, OutputError> {
    let mut document = toml::Table::new();
    for record in records {
        document.insert(record.name.clone(), toml::Value::try_from(record)?);
    }
    Ok(format!("{}{}", HEADER, toml::to_string_pretty(&document)?))
}

/// Render records and write them to `path`.
pub fn write_output(path: &Path, records: &[DigitizerRecord]) -> Result<(), OutputError> {
    let text = render(records)?;
    std::fs::write(path, text).map_err(|source| OutputError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        digitizers = records.len(),
        "Applied configuration written"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFile;
    use digi_core::{IoLevel, LinkType, TriggerMode};

    fn record(name: &str, link_num: u32) -> DigitizerRecord {
        let mut registers = RegisterConfig {
            sw_trigger_mode: Some(TriggerMode::AcquisitionOnly),
            io_level: Some(IoLevel::Ttl),
            record_length: Some(1024),
            post_trigger_size: Some(50),
            ..Default::default()
        };
        registers.ch_enable.insert("0".to_string(), true);
        registers.ch_enable.insert("1".to_string(), false);

        DigitizerRecord {
            name: name.to_string(),
            connection: ConnectionSettings {
                link_type: LinkType::Mock,
                link_num,
                ..Default::default()
            },
            registers,
        }
    }

    #[test]
    fn test_output_is_valid_configuration() {
        let records = vec![record("second", 1), record("first", 0)];
        let text = render(&records).unwrap();
        assert!(text.starts_with("# Settings read back"));

        let parsed = ConfigFile::parse(&text).unwrap();
        let names: Vec<_> = parsed.digitizers.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["second", "first"]);
        assert_eq!(parsed.digitizers[0].registers, records[0].registers);
        assert_eq!(parsed.digitizers[0].connection, records[0].connection);
        assert!(parsed.digitizers[0].unknown.is_empty());
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let text = render(&[record("only", 0)]).unwrap();
        assert!(text.contains("record_length = 1024"));
        assert!(!text.contains("max_num_events_blt"));
        assert!(!text.contains("acquisition_mode"));
    }

    #[test]
    fn test_write_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applied.toml");

        write_output(&path, &[record("board", 3)]).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("[board]"));
        assert!(written.contains("link_num = 3"));
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("applied.toml");

        let err = write_output(&path, &[]).unwrap_err();
        assert!(matches!(err, OutputError::Write { .. }));
    }
}
