//! Output type tags
//!
//! The tag byte is shared by the EEPROM descriptor layout and the wire
//! `OutputHeader`. Zero is never a valid output tag.

/// Type of an addressable output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum OutputType {
    /// Single PWM or on/off channel
    Value = 1,
    /// Three-channel RGB LED
    Rgb = 2,
    /// Program slot
    Program = 3,
    /// Addressable pixel strip
    Pixels = 4,
    /// MPR121 capacitive touch sensor array
    Mpr121 = 5,
    /// RS485 bus transceiver
    Rs485 = 6,
}

impl OutputType {
    /// All output types in tag order
    pub const ALL: [OutputType; 6] = [
        OutputType::Value,
        OutputType::Rgb,
        OutputType::Program,
        OutputType::Pixels,
        OutputType::Mpr121,
        OutputType::Rs485,
    ];

    /// Get the tag as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a type from its tag byte
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(OutputType::Value),
            2 => Some(OutputType::Rgb),
            3 => Some(OutputType::Program),
            4 => Some(OutputType::Pixels),
            5 => Some(OutputType::Mpr121),
            6 => Some(OutputType::Rs485),
            _ => None,
        }
    }

    /// Size of the runtime message payload carried for this type
    pub fn payload_len(self) -> usize {
        match self {
            OutputType::Value => crate::messages::VALUE_PAYLOAD_LEN,
            OutputType::Rgb => crate::messages::RGB_PAYLOAD_LEN,
            OutputType::Program => crate::messages::PROGRAM_PAYLOAD_LEN,
            OutputType::Pixels | OutputType::Mpr121 | OutputType::Rs485 => 0,
        }
    }

    /// Name used in provisioning files
    pub fn name(self) -> &'static str {
        match self {
            OutputType::Value => "value",
            OutputType::Rgb => "rgb",
            OutputType::Program => "program",
            OutputType::Pixels => "pixels",
            OutputType::Mpr121 => "mpr121",
            OutputType::Rs485 => "rs485",
        }
    }

    /// Look up a type by its provisioning name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl TryFrom<u8> for OutputType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(value)
    }
}

impl From<OutputType> for u8 {
    fn from(value: OutputType) -> Self {
        value.as_u8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for t in OutputType::ALL {
            assert_eq!(OutputType::from_u8(t.as_u8()), Some(t));
            assert_eq!(OutputType::from_name(t.name()), Some(t));
        }
    }

    #[test]
    fn test_unknown_tags() {
        assert_eq!(OutputType::from_u8(0), None);
        assert_eq!(OutputType::from_u8(7), None);
        assert_eq!(OutputType::try_from(0xFE), Err(0xFE));
        assert_eq!(OutputType::from_name("servo"), None);
    }

    #[test]
    fn test_payload_lengths() {
        assert_eq!(OutputType::Value.payload_len(), 1);
        assert_eq!(OutputType::Rgb.payload_len(), 3);
        assert_eq!(OutputType::Program.payload_len(), 13);
        assert_eq!(OutputType::Rs485.payload_len(), 0);
    }
}
