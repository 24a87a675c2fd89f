//! PN532 NFC front-end adapter (spec.md §1: "assumed provided as a
//! library" — the vendor SPI transport and framing are out of core
//! scope). Wraps the `pn532` crate's blocking driver over
//! `linux-embedded-hal`'s `spidev`/GPIO character-device primitives and
//! implements [`NfcFrontEnd`], per the re-architecture note (spec.md §9)
//! that a reimplementation should embed the PN532 handle as a field
//! rather than inherit from the driver type the way the Python source's
//! `Tapper(PN532_SPI)` does.

use std::time::Duration;

use linux_embedded_hal::{CdevPin, Delay, Spidev};
use pn532::requests::SAMMode;
use pn532::spi::SPIInterface;
use pn532::{Error as Pn532Error, Pn532, Request};

use crate::device::ports::NfcFrontEnd;
use crate::error::DeviceError;

type Interface = SPIInterface<Spidev, CdevPin>;

/// Response buffer large enough for an `InListPassiveTarget` reply
/// carrying a 7-byte NFCID1 (the longest UID this appliance expects).
const MAX_RESPONSE_LEN: usize = 32;

pub struct Pn532Adapter {
    driver: Pn532<Interface, Delay, MAX_RESPONSE_LEN>,
}

impl Pn532Adapter {
    /// Initializes the front-end over SPI and configures it as a normal
    /// ISO/IEC 14443 Type A initiator (spec.md §4.1 step 1).
    pub fn new(spi: Spidev, chip_select: CdevPin) -> Result<Self, DeviceError> {
        let interface = SPIInterface::new(spi, chip_select);
        let mut driver = Pn532::new(interface, Delay);

        driver
            .process(&Request::sam_configuration(SAMMode::Normal, true), 0, Duration::from_millis(100))
            .map_err(pn532_err)?;

        Ok(Self { driver })
    }

    /// Opens the SPI bus and requests the chip-select line, then builds
    /// and initializes the adapter. `spi_path` and `cs_line` come from
    /// the resolved [`crate::config::PinMap`] (spec.md §6: "NFC
    /// chip-select: SPI CE0 (D8)").
    pub fn open(chip: &mut gpio_cdev::Chip, spi_path: &str, cs_line: u32) -> Result<Self, DeviceError> {
        use gpio_cdev::LineRequestFlags;
        use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};

        let mut spi = Spidev::open(spi_path).map_err(|e| DeviceError::Nfc(format!("opening {spi_path}: {e}")))?;
        let options = SpidevOptions::new().bits_per_word(8).max_speed_hz(1_000_000).mode(SpiModeFlags::SPI_MODE_0).build();
        spi.configure(&options).map_err(|e| DeviceError::Nfc(format!("configuring SPI: {e}")))?;

        let cs_handle = chip
            .get_line(cs_line)
            .map_err(|e| DeviceError::Nfc(format!("getting CS line {cs_line}: {e}")))?
            .request(LineRequestFlags::OUTPUT, 1, "tapper-nfc-cs")
            .map_err(|e| DeviceError::Nfc(format!("requesting CS line {cs_line}: {e}")))?;
        let cs = CdevPin::new(cs_handle).map_err(|e| DeviceError::Nfc(format!("wrapping CS line: {e}")))?;

        Self::new(spi, cs)
    }
}

impl NfcFrontEnd for Pn532Adapter {
    fn firmware_version(&mut self) -> Result<(u8, u8, u8, u8), DeviceError> {
        let response = self
            .driver
            .process(&Request::GET_FIRMWARE_VERSION, 4, Duration::from_millis(500))
            .map_err(pn532_err)?;
        Ok((response[0], response[1], response[2], response[3]))
    }

    fn read_passive_target(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, DeviceError> {
        match self.driver.process(&Request::INLIST_ONE_ISO_A_TARGET, MAX_RESPONSE_LEN - 1, timeout) {
            Ok(response) => Ok(parse_uid(response)),
            Err(Pn532Error::TimeoutResponse) | Err(Pn532Error::TimeoutAck) => Ok(None),
            Err(e) => Err(pn532_err(e)),
        }
    }
}

/// Extracts the NFCID1 from an `InListPassiveTarget` response
/// (PN532 user guide §7.3.5): one target count byte, then per target a
/// target number, 2-byte SENS_RES, 1-byte SEL_RES, a UID-length byte and
/// the UID itself.
fn parse_uid(response: &[u8]) -> Option<Vec<u8>> {
    if response.first().copied().unwrap_or(0) < 1 {
        return None;
    }
    let uid_len = *response.get(5)?as usize;
    let uid = response.get(6..6 + uid_len)?;
    Some(uid.to_vec())
}

fn pn532_err<E: std::fmt::Debug>(err: Pn532Error<E>) -> DeviceError {
    DeviceError::Nfc(format!("{err:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_byte_uid() {
        let response = [1u8, 1, 0x00, 0x44, 0x00, 4, 0x04, 0xA2, 0x1F, 0x7B];
        assert_eq!(parse_uid(&response), Some(vec![0x04, 0xA2, 0x1F, 0x7B]));
    }

    #[test]
    fn zero_targets_is_none() {
        let response = [0u8];
        assert_eq!(parse_uid(&response), None);
    }
}
