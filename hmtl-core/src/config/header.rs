//! Module configuration header
//!
//! Seven bytes at the start of the EEPROM image:
//! ```text
//! ┌──────────┬─────────┬──────────┬─────────────┬───────┐
//! │ MAGIC    │ VERSION │ ADDRESS  │ NUM_OUTPUTS │ FLAGS │
//! │ 2B LE    │ 1B      │ 2B LE    │ 1B          │ 1B    │
//! └──────────┴─────────┴──────────┴─────────────┴───────┘
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Signature marking a configured EEPROM
pub const CONFIG_MAGIC: u16 = 0x005C;

/// Layout version written by this crate
pub const CONFIG_VERSION: u8 = 1;

/// Module is bus master and relays frames for other addresses
pub const FLAG_MASTER: u8 = 0x01;

/// Encoded header size
pub const CONFIG_HEADER_LEN: usize = 7;

/// Persistent module header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigHeader {
    pub magic: u16,
    pub version: u8,
    /// This module's bus address
    pub address: u16,
    pub num_outputs: u8,
    pub flags: u8,
}

impl Default for ConfigHeader {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConfigHeader {
    /// Fresh header for an unprovisioned module: no outputs, not master
    pub fn new(address: u16) -> Self {
        Self {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            address,
            num_outputs: 0,
            flags: 0,
        }
    }

    /// Whether the signature matches
    pub fn is_valid(&self) -> bool {
        self.magic == CONFIG_MAGIC
    }

    pub fn is_master(&self) -> bool {
        self.flags & FLAG_MASTER != 0
    }

    pub fn set_master(&mut self, master: bool) {
        if master {
            self.flags |= FLAG_MASTER;
        } else {
            self.flags &= !FLAG_MASTER;
        }
    }

    pub fn encode(&self) -> [u8; CONFIG_HEADER_LEN] {
        let magic = self.magic.to_le_bytes();
        let address = self.address.to_le_bytes();
        [
            magic[0],
            magic[1],
            self.version,
            address[0],
            address[1],
            self.num_outputs,
            self.flags,
        ]
    }

    pub fn decode(bytes: &[u8; CONFIG_HEADER_LEN]) -> Self {
        Self {
            magic: u16::from_le_bytes([bytes[0], bytes[1]]),
            version: bytes[2],
            address: u16::from_le_bytes([bytes[3], bytes[4]]),
            num_outputs: bytes[5],
            flags: bytes[6],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_header() {
        let header = ConfigHeader::new(42);
        assert!(header.is_valid());
        assert!(!header.is_master());
        assert_eq!(header.num_outputs, 0);
        assert_eq!(header.version, CONFIG_VERSION);
    }

    #[test]
    fn test_layout() {
        let mut header = ConfigHeader::new(0x0203);
        header.num_outputs = 4;
        header.set_master(true);
        assert_eq!(header.encode(), [0x5C, 0x00, CONFIG_VERSION, 0x03, 0x02, 4, 1]);
        assert_eq!(ConfigHeader::decode(&header.encode()), header);
    }

    #[test]
    fn test_master_flag_preserves_other_bits() {
        let mut header = ConfigHeader::new(1);
        header.flags = 0x80;
        header.set_master(true);
        assert_eq!(header.flags, 0x81);
        header.set_master(false);
        assert_eq!(header.flags, 0x80);
    }

    #[test]
    fn test_erased_eeprom_is_invalid() {
        let header = ConfigHeader::decode(&[0xFF; CONFIG_HEADER_LEN]);
        assert!(!header.is_valid());
    }
}
