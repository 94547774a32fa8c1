//! Connector that hands out mock digitizers.
//!
//! Mock boards are addressed by `link_type = "mock"` and a `link_num`. Each
//! link number maps to a [`MockDigitizerBuilder`]; opening a link builds a
//! fresh board with power-on registers.

use std::collections::BTreeMap;

use tracing::info;

use digi_core::{
    ConnectionSettings, Connector, DeviceError, DeviceErrorKind, DeviceResult, Digitizer, LinkType,
};

use crate::catalog::CATALOG;
use crate::digitizer::{MockDigitizer, MockDigitizerBuilder};

const OPEN_DIGITIZER: &str = "OpenDigitizer";

/// Serial number of the first catalog board; later boards count up from it.
const CATALOG_SERIAL_BASE: u32 = 1000;

/// Opens mock digitizers by link number.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    boards: BTreeMap<u32, MockDigitizerBuilder>,
}

impl MockConnector {
    /// Connector with no boards attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector with every catalog preset attached, link number = catalog index
    pub fn with_catalog() -> Self {
        CATALOG
            .iter()
            .zip(0u32..)
            .fold(Self::new(), |connector, (preset, link_num)| {
                connector.with_board(
                    link_num,
                    MockDigitizer::builder()
                        .preset(preset)
                        .serial_number(CATALOG_SERIAL_BASE + link_num),
                )
            })
    }

    /// Attach a board at `link_num`, replacing any board already there
    pub fn with_board(mut self, link_num: u32, board: MockDigitizerBuilder) -> Self {
        self.boards.insert(link_num, board);
        self
    }

    /// Link numbers with a board attached
    pub fn links(&self) -> impl Iterator<Item = u32> + '_ {
        self.boards.keys().copied()
    }
}

impl Connector for MockConnector {
    fn open(&self, name: &str, link: &ConnectionSettings) -> DeviceResult<Box<dyn Digitizer>> {
        if link.link_type != LinkType::Mock {
            return Err(DeviceError::new(
                OPEN_DIGITIZER,
                DeviceErrorKind::LinkFailure,
                format!(
                    "no hardware backend available for link type '{}'",
                    link.link_type
                ),
            ));
        }

        let board = self.boards.get(&link.link_num).ok_or_else(|| {
            DeviceError::new(
                OPEN_DIGITIZER,
                DeviceErrorKind::LinkFailure,
                format!("no mock digitizer attached at link {}", link.link_num),
            )
        })?;

        let digitizer = board.clone().build();
        info!(
            name,
            link_num = link.link_num,
            model = %digitizer.info().model_name,
            "Opened mock digitizer"
        );
        Ok(Box::new(digitizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_link(link_num: u32) -> ConnectionSettings {
        ConnectionSettings {
            link_type: LinkType::Mock,
            link_num,
            ..Default::default()
        }
    }

    #[test]
    fn test_catalog_links() {
        let connector = MockConnector::with_catalog();
        assert_eq!(connector.links().count(), CATALOG.len());

        let board = connector.open("dig", &mock_link(4)).unwrap();
        assert_eq!(board.info().model_name, "V1740");
        assert_eq!(board.info().serial_number, 1004);
    }

    #[test]
    fn test_missing_board() {
        let connector = MockConnector::new();
        let err = connector.open("dig", &mock_link(0)).err().unwrap();
        assert!(err.is_link_failure());
    }

    #[test]
    fn test_hardware_link_rejected() {
        let connector = MockConnector::with_catalog();
        let err = connector
            .open("dig", &ConnectionSettings::default())
            .err()
            .unwrap();
        assert!(err.is_link_failure());
        assert!(err.message.contains("usb"));
    }
}
