//! End-to-end configuration cycles against mock digitizers.
//!
//! Each test writes a configuration file to a temporary directory, runs a
//! full cycle through [`digi_daq::run`] and inspects the written output.

use std::path::{Path, PathBuf};

use digi_core::{DeviceErrorKind, IoLevel, TriggerMode};
use digi_daq::{ConfigFile, DaqError, SessionError};
use digi_driver_mock::{accessor, catalog, FaultPlan, MockConnector, MockDigitizer};
use tempfile::TempDir;
use tracing_test::traced_test;

fn write_config(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("digitizers.toml");
    std::fs::write(&path, text).unwrap();
    path
}

fn load(path: &Path) -> ConfigFile {
    ConfigFile::load(path).unwrap()
}

// =============================================================================
// Successful cycles
// =============================================================================

#[test]
fn test_output_reflects_board_state() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        &dir,
        r#"
[desk]
link_type = "mock"
link_num = 0
record_length = 2048
io_level = "ttl"
ch_enable = { 1 = true }
"#,
    );
    let output = dir.path().join("applied.toml");

    let records = digi_daq::run(load(&input), &output, &MockConnector::with_catalog()).unwrap();
    assert_eq!(records.len(), 1);

    let applied = load(&output);
    let desk = &applied.digitizers[0];
    assert_eq!(desk.name, "desk");
    assert_eq!(desk.registers.record_length, Some(2048));
    assert_eq!(desk.registers.io_level, Some(IoLevel::Ttl));
    // Unconfigured fields are filled in from the board
    assert_eq!(desk.registers.sw_trigger_mode, Some(TriggerMode::AcquisitionOnly));
    assert_eq!(desk.registers.post_trigger_size, Some(50));
    // DT5724: 4 channels, only channel 1 enabled
    assert_eq!(desk.registers.ch_enable.len(), 4);
    assert_eq!(desk.registers.ch_enable.get("1"), Some(&true));
    assert_eq!(desk.registers.ch_enable.get("0"), Some(&false));
}

#[test]
fn test_output_is_a_fixed_point() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        &dir,
        "[a]\nlink_type = \"mock\"\nlink_num = 1\nmax_num_events_blt = 16\n\
         [b]\nlink_type = \"mock\"\nlink_num = 2\nacquisition_mode = \"s_in_controlled\"\n",
    );
    let first = dir.path().join("first.toml");
    let second = dir.path().join("second.toml");

    digi_daq::run(load(&input), &first, &MockConnector::with_catalog()).unwrap();
    digi_daq::run(load(&first), &second, &MockConnector::with_catalog()).unwrap();

    assert_eq!(load(&first), load(&second));
}

#[test]
#[traced_test]
fn test_grouped_board_output_shows_whole_groups() {
    let dir = tempfile::tempdir().unwrap();
    // V1740: 64 channels in 8 groups of 8
    let input = write_config(
        &dir,
        "[big]\nlink_type = \"mock\"\nlink_num = 4\nch_enable = { 3 = true, 17 = true }\n",
    );
    let output = dir.path().join("applied.toml");

    digi_daq::run(load(&input), &output, &MockConnector::with_catalog()).unwrap();

    assert!(logs_contain("cannot be exactly mapped to groups"));
    let applied = load(&output);
    let enables = &applied.digitizers[0].registers.ch_enable;
    let on: Vec<usize> = (0..64)
        .filter(|ch| enables.get(&ch.to_string()) == Some(&true))
        .collect();
    assert_eq!(on, [0, 1, 2, 3, 4, 5, 6, 7, 16, 17, 18, 19, 20, 21, 22, 23]);
}

#[test]
#[traced_test]
fn test_unknown_keys_warn_but_do_not_fail() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        &dir,
        "[desk]\nlink_type = \"mock\"\ntrigger_threshold = 120\n",
    );
    let output = dir.path().join("applied.toml");

    digi_daq::run(load(&input), &output, &MockConnector::with_catalog()).unwrap();

    assert!(logs_contain("Unknown setting in section ignored"));
    assert!(logs_contain("key=trigger_threshold"));
    let written = std::fs::read_to_string(&output).unwrap();
    assert!(!written.contains("trigger_threshold"));
}

#[test]
#[traced_test]
fn test_field_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        &dir,
        "[desk]\nlink_type = \"mock\"\nio_level = \"ttl\"\nrecord_length = 512\n",
    );
    let output = dir.path().join("applied.toml");
    let connector = MockConnector::new().with_board(
        0,
        MockDigitizer::builder()
            .preset(&catalog::V1724)
            .faults(FaultPlan::failing(accessor::SET_IO_LEVEL)),
    );

    digi_daq::run(load(&input), &output, &connector).unwrap();

    assert!(logs_contain("Communication with digitizer failed"));
    let applied = load(&output);
    // The board kept its power-on level, and that is what gets written out
    assert_eq!(applied.digitizers[0].registers.io_level, Some(IoLevel::Nim));
    assert_eq!(applied.digitizers[0].registers.record_length, Some(512));
}

// =============================================================================
// Fatal errors
// =============================================================================

#[test]
#[traced_test]
fn test_connection_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(
        &dir,
        "[ok]\nlink_type = \"mock\"\n[remote]\nlink_type = \"optical_link\"\nconet_node = 1\n",
    );
    let output = dir.path().join("applied.toml");

    let err = digi_daq::run(load(&input), &output, &MockConnector::with_catalog()).unwrap_err();

    match err {
        DaqError::Session(SessionError::Connection { name, source }) => {
            assert_eq!(name, "remote");
            assert_eq!(source.kind, DeviceErrorKind::LinkFailure);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!output.exists());
    assert!(logs_contain("no hardware backend available"));
}

#[test]
fn test_channel_beyond_board_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_config(&dir, "[desk]\nlink_type = \"mock\"\nch_enable = { 4 = true }\n");
    let output = dir.path().join("applied.toml");

    let err = digi_daq::run(load(&input), &output, &MockConnector::with_catalog()).unwrap_err();
    assert!(matches!(err, DaqError::Session(SessionError::Settings { .. })));
    assert!(!output.exists());
}
