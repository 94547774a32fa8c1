//! One configuration cycle from parsed file to written output.

use std::path::Path;

use tracing::info;

use digi_core::Connector;

use crate::config::ConfigFile;
use crate::error::AppResult;
use crate::output::{write_output, DigitizerRecord};
use crate::session::configure_all;

/// Configure every digitizer in `config` and write the confirmed state to `output`.
///
/// Nothing is written if any digitizer fails to connect.
pub fn run(
    config: ConfigFile,
    output: &Path,
    connector: &dyn Connector,
) -> AppResult<Vec<DigitizerRecord>> {
    info!(
        count = config.digitizers.len(),
        "Configuration for {} digitizer(s) found",
        config.digitizers.len()
    );
    let records = configure_all(config.digitizers, connector)?;
    write_output(output, &records)?;
    info!(digitizers = records.len(), "Configuration cycle complete");
    Ok(records)
}
