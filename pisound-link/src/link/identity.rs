//! Device identity read once during bring-up.
//!
//! The peer answers a handshake with a field count, then serves each field as
//! a length-prefixed block:
//!
//! | Index | Field | Encoding |
//! |-------|-------|----------|
//! | 0 | firmware version | 2 bytes, shown `"{major:x}.{minor:02x}"` |
//! | 1 | serial number | ASCII, at most 10 characters |
//! | 2 | unique id | raw bytes, shown as lowercase hex, at most 24 characters |
//! | 3 | hardware version | 2 bytes, shown `"{major:x}.{minor:x}"` |
//! | 4.. | reserved | read and discarded |

use core::fmt;

use embedded_hal::spi::SpiDevice;

use crate::constants::DEFAULT_HW_VERSION;
use crate::error::ProtocolError;

use super::exchange::{ready_byte, FrameExchange, MAX_BLOCK_LEN};

/// Serial number storage, including the terminator slot the firmware assumes.
const SERIAL_CAPACITY: usize = 11;

/// Hex id storage, including the terminator slot.
const ID_CAPACITY: usize = 25;

const FIELD_FW_VERSION: u8 = 0;
const FIELD_SERIAL: u8 = 1;
const FIELD_ID: u8 = 2;
const FIELD_HW_VERSION: u8 = 3;

/// Peripheral metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub serial: String,
    pub id: String,
    pub firmware_version: String,
    pub hardware_version: String,
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            serial: String::new(),
            id: String::new(),
            firmware_version: String::new(),
            hardware_version: DEFAULT_HW_VERSION.to_owned(),
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "serial {}, firmware {}, hardware {}, id {}",
            self.serial, self.firmware_version, self.hardware_version, self.id
        )
    }
}

impl DeviceIdentity {
    /// Query the peer for its identity.
    ///
    /// Nothing is returned unless every field decodes; the first malformed
    /// handshake or field aborts the whole read.
    pub fn read<SPI: SpiDevice>(link: &mut FrameExchange<SPI>) -> Result<Self, ProtocolError> {
        let mut identity = DeviceIdentity::default();
        let count = ready_byte(link.exchange16(0))?;

        let mut buf = [0u8; MAX_BLOCK_LEN];
        for field in 0..count {
            let n = link.read_length_prefixed(&mut buf)?;
            identity.apply(field, &buf[..n])?;
        }
        Ok(identity)
    }

    fn apply(&mut self, field: u8, bytes: &[u8]) -> Result<(), ProtocolError> {
        match field {
            FIELD_FW_VERSION => {
                let [major, minor] = version_bytes(field, bytes)?;
                self.firmware_version = format!("{major:x}.{minor:02x}");
            }
            FIELD_SERIAL => {
                if bytes.len() >= SERIAL_CAPACITY {
                    return Err(ProtocolError::FieldOverflow {
                        field,
                        len: bytes.len(),
                        capacity: SERIAL_CAPACITY - 1,
                    });
                }
                // The serial is NUL padded on some firmware.
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                self.serial = String::from_utf8_lossy(&bytes[..end]).into_owned();
            }
            FIELD_ID => {
                if bytes.len() * 2 >= ID_CAPACITY {
                    return Err(ProtocolError::FieldOverflow {
                        field,
                        len: bytes.len(),
                        capacity: ID_CAPACITY - 1,
                    });
                }
                self.id = bytes.iter().map(|b| format!("{b:02x}")).collect();
            }
            FIELD_HW_VERSION => {
                let [major, minor] = version_bytes(field, bytes)?;
                self.hardware_version = format!("{major:x}.{minor:x}");
            }
            _ => tracing::debug!(field, len = bytes.len(), "ignoring identity field"),
        }
        Ok(())
    }

    /// Name the MIDI endpoints are published under.
    pub fn port_name(&self) -> String {
        format!("pisound MIDI {}", self.serial)
    }
}

fn version_bytes(field: u8, bytes: &[u8]) -> Result<[u8; 2], ProtocolError> {
    <[u8; 2]>::try_from(bytes).map_err(|_| ProtocolError::FieldLength {
        field,
        expected: 2,
        actual: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedSpi;

    fn read(spi: ScriptedSpi) -> Result<DeviceIdentity, ProtocolError> {
        let mut link = FrameExchange::new(spi, 10);
        DeviceIdentity::read(&mut link)
    }

    #[test]
    fn full_identity() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0104)
            .push_block(&[0x01, 0x02])
            .push_block(b"PS-1A2B3C")
            .push_block(&[0xDE, 0xAD, 0xBE, 0xEF])
            .push_block(&[0x01, 0x01]);

        let identity = read(spi).unwrap();
        assert_eq!(identity.firmware_version, "1.02");
        assert_eq!(identity.serial, "PS-1A2B3C");
        assert_eq!(identity.id, "deadbeef");
        assert_eq!(identity.hardware_version, "1.1");
        assert_eq!(identity.port_name(), "pisound MIDI PS-1A2B3C");
    }

    #[test]
    fn missing_hw_version_keeps_default() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0103)
            .push_block(&[0x01, 0x02])
            .push_block(b"SN")
            .push_block(&[0x0A]);

        let identity = read(spi).unwrap();
        assert_eq!(identity.firmware_version, "1.02");
        assert_eq!(identity.hardware_version, "1.0");
        assert_eq!(identity.id, "0a");
    }

    #[test]
    fn extra_fields_are_discarded() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0106)
            .push_block(&[0x1F, 0x00])
            .push_block(b"X")
            .push_block(&[])
            .push_block(&[0x02, 0x0B])
            .push_block(b"future")
            .push_block(&[0xFF; 40]);

        let identity = read(spi).unwrap();
        assert_eq!(identity.firmware_version, "1f.00");
        assert_eq!(identity.hardware_version, "2.b");
        assert_eq!(identity.id, "");
    }

    #[test]
    fn zero_count_yields_defaults() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0100);
        assert_eq!(read(spi).unwrap(), DeviceIdentity::default());
    }

    #[test]
    fn not_ready_count_fails() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0004);
        assert_eq!(read(spi), Err(ProtocolError::NotReady { word: 0x0004 }));
    }

    #[test]
    fn firmware_version_wrong_length() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0101).push_block(&[0x01, 0x02, 0x03]);
        assert_eq!(
            read(spi),
            Err(ProtocolError::FieldLength {
                field: 0,
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn serial_must_leave_room_for_terminator() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0102)
            .push_block(&[0x01, 0x00])
            .push_block(b"0123456789A");
        assert_eq!(
            read(spi),
            Err(ProtocolError::FieldOverflow {
                field: 1,
                len: 11,
                capacity: 10
            })
        );

        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0102)
            .push_block(&[0x01, 0x00])
            .push_block(b"0123456789");
        assert_eq!(read(spi).unwrap().serial, "0123456789");
    }

    #[test]
    fn id_hex_must_fit() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0103)
            .push_block(&[0x01, 0x00])
            .push_block(b"S")
            .push_block(&[0xAB; 13]);
        assert!(matches!(
            read(spi),
            Err(ProtocolError::FieldOverflow { field: 2, len: 13, .. })
        ));

        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0103)
            .push_block(&[0x01, 0x00])
            .push_block(b"S")
            .push_block(&[0xAB; 12]);
        assert_eq!(read(spi).unwrap().id, "ab".repeat(12));
    }

    #[test]
    fn not_ready_inside_field_fails_whole_read() {
        let mut spi = ScriptedSpi::new();
        spi.push_word(0x0102)
            .push_block(&[0x01, 0x02])
            .push_word(0x0102)
            .push_word(0x0141)
            .push_word(0x0000);
        assert_eq!(read(spi), Err(ProtocolError::NotReady { word: 0 }));
    }

    #[test]
    fn display_lists_every_field() {
        let identity = DeviceIdentity {
            serial: "SN".into(),
            id: "00ff".into(),
            firmware_version: "1.02".into(),
            hardware_version: "1.0".into(),
        };
        assert_eq!(
            identity.to_string(),
            "serial SN, firmware 1.02, hardware 1.0, id 00ff"
        );
    }
}
