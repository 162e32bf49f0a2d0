//! Output descriptors
//!
//! A descriptor is the fixed-layout record for one output: its type tag,
//! its pins, and its current scalar state. The encoded size depends only on
//! the tag, which is what lets the EEPROM image use fixed offsets.
//!
//! EEPROM layout of every descriptor:
//! ```text
//! ┌──────┬────────┬──────────────────────────┐
//! │ TYPE │ OUTPUT │ PAYLOAD (size per TYPE)  │
//! │ 1B   │ 1B     │ 2–14B                    │
//! └──────┴────────┴──────────────────────────┘
//! ```

use hmtl_protocol::{OutputType, Payload, ProgramCommand, MAX_PROGRAM_VAL};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Type tag + output number
pub const DESCRIPTOR_HEADER_LEN: usize = 2;

/// Number of channels on an MPR121 sensor
pub const MAX_MPR121_PINS: usize = 12;

/// Largest encoded descriptor (the sensor array)
pub const MAX_DESCRIPTOR_LEN: usize = DESCRIPTOR_HEADER_LEN + 2 + MAX_MPR121_PINS;

/// Errors from the descriptor model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorError {
    /// Type tag is not recognized
    UnknownType(u8),
    /// Payload type does not match the descriptor's tag
    TypeMismatch {
        expected: OutputType,
        found: OutputType,
    },
    /// Buffer is shorter than the encoded descriptor
    Truncated,
}

/// Single PWM or on/off channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValueOutput {
    pub pin: u8,
    /// Current level, 0-255
    pub value: u8,
}

/// Three-channel RGB output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RgbOutput {
    pub pins: [u8; 3],
    pub values: [u8; 3],
}

/// Program slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgramOutput {
    pub values: [u8; MAX_PROGRAM_VAL],
}

/// Addressable pixel strip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelStripOutput {
    pub num_pixels: u16,
    pub data_pin: u8,
    pub clock_pin: u8,
    /// Driver-specific chipset/color-order code
    pub strip_type: u8,
}

/// MPR121 capacitive sensor array
///
/// Each threshold byte packs the touch level in the low nibble and the
/// release level in the high nibble. A zero byte leaves the chip default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorArrayOutput {
    pub irq_pin: u8,
    pub use_interrupt: bool,
    pub thresholds: [u8; MAX_MPR121_PINS],
}

impl SensorArrayOutput {
    /// `(touch, release)` thresholds for a channel
    pub fn threshold(&self, channel: usize) -> Option<(u8, u8)> {
        let packed = *self.thresholds.get(channel)?;
        Some((packed & 0x0F, (packed & 0xF0) >> 4))
    }

    /// Set the thresholds for a channel; levels are truncated to 4 bits
    pub fn set_threshold(&mut self, channel: usize, touch: u8, release: u8) -> bool {
        match self.thresholds.get_mut(channel) {
            Some(slot) => {
                *slot = (touch & 0x0F) | ((release & 0x0F) << 4);
                true
            }
            None => false,
        }
    }
}

/// RS485 transceiver wiring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BusTransportOutput {
    pub recv_pin: u8,
    pub xmit_pin: u8,
    pub enable_pin: u8,
}

/// Configuration and state of one output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OutputDescriptor {
    Value(ValueOutput),
    Rgb(RgbOutput),
    Program(ProgramOutput),
    PixelStrip(PixelStripOutput),
    CapacitiveSensorArray(SensorArrayOutput),
    BusTransportConfig(BusTransportOutput),
}

/// Outcome of applying a message payload to a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Applied {
    /// Scalar state changed
    Updated,
    /// Payload accepted, nothing to change
    Unchanged,
    /// Program to hand to the program runner
    Program(ProgramCommand),
}

/// Encoded size of a descriptor from its raw tag byte
pub fn size_of(tag: u8) -> Result<usize, DescriptorError> {
    OutputType::from_u8(tag)
        .map(encoded_len)
        .ok_or(DescriptorError::UnknownType(tag))
}

/// Encoded size of a descriptor of the given type
pub fn encoded_len(output_type: OutputType) -> usize {
    DESCRIPTOR_HEADER_LEN
        + match output_type {
            OutputType::Value => 2,
            OutputType::Rgb => 6,
            OutputType::Program => MAX_PROGRAM_VAL,
            OutputType::Pixels => 5,
            OutputType::Mpr121 => 2 + MAX_MPR121_PINS,
            OutputType::Rs485 => 3,
        }
}

impl OutputDescriptor {
    /// Tag of this descriptor
    pub fn output_type(&self) -> OutputType {
        match self {
            OutputDescriptor::Value(_) => OutputType::Value,
            OutputDescriptor::Rgb(_) => OutputType::Rgb,
            OutputDescriptor::Program(_) => OutputType::Program,
            OutputDescriptor::PixelStrip(_) => OutputType::Pixels,
            OutputDescriptor::CapacitiveSensorArray(_) => OutputType::Mpr121,
            OutputDescriptor::BusTransportConfig(_) => OutputType::Rs485,
        }
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.output_type())
    }

    /// Encode into `buf`, recording `output` as the output number
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, output: u8, buf: &mut [u8]) -> Result<usize, DescriptorError> {
        let len = self.encoded_len();
        if buf.len() < len {
            return Err(DescriptorError::Truncated);
        }

        buf[0] = self.output_type().as_u8();
        buf[1] = output;
        let body = &mut buf[DESCRIPTOR_HEADER_LEN..len];
        match self {
            OutputDescriptor::Value(v) => {
                body[0] = v.pin;
                body[1] = v.value;
            }
            OutputDescriptor::Rgb(rgb) => {
                body[..3].copy_from_slice(&rgb.pins);
                body[3..].copy_from_slice(&rgb.values);
            }
            OutputDescriptor::Program(p) => body.copy_from_slice(&p.values),
            OutputDescriptor::PixelStrip(px) => {
                body[..2].copy_from_slice(&px.num_pixels.to_le_bytes());
                body[2] = px.data_pin;
                body[3] = px.clock_pin;
                body[4] = px.strip_type;
            }
            OutputDescriptor::CapacitiveSensorArray(s) => {
                body[0] = s.irq_pin;
                body[1] = s.use_interrupt as u8;
                body[2..].copy_from_slice(&s.thresholds);
            }
            OutputDescriptor::BusTransportConfig(bus) => {
                body[0] = bus.recv_pin;
                body[1] = bus.xmit_pin;
                body[2] = bus.enable_pin;
            }
        }

        Ok(len)
    }

    /// Decode a descriptor, returning it with its recorded output number
    ///
    /// The tag is checked before any payload byte is read.
    pub fn decode(bytes: &[u8]) -> Result<(Self, u8), DescriptorError> {
        let tag = *bytes.first().ok_or(DescriptorError::Truncated)?;
        let output_type = OutputType::from_u8(tag).ok_or(DescriptorError::UnknownType(tag))?;
        let len = encoded_len(output_type);
        if bytes.len() < len {
            return Err(DescriptorError::Truncated);
        }

        let output = bytes[1];
        let body = &bytes[DESCRIPTOR_HEADER_LEN..len];
        let descriptor = match output_type {
            OutputType::Value => OutputDescriptor::Value(ValueOutput {
                pin: body[0],
                value: body[1],
            }),
            OutputType::Rgb => OutputDescriptor::Rgb(RgbOutput {
                pins: [body[0], body[1], body[2]],
                values: [body[3], body[4], body[5]],
            }),
            OutputType::Program => {
                let mut values = [0u8; MAX_PROGRAM_VAL];
                values.copy_from_slice(body);
                OutputDescriptor::Program(ProgramOutput { values })
            }
            OutputType::Pixels => OutputDescriptor::PixelStrip(PixelStripOutput {
                num_pixels: u16::from_le_bytes([body[0], body[1]]),
                data_pin: body[2],
                clock_pin: body[3],
                strip_type: body[4],
            }),
            OutputType::Mpr121 => {
                let mut thresholds = [0u8; MAX_MPR121_PINS];
                thresholds.copy_from_slice(&body[2..]);
                OutputDescriptor::CapacitiveSensorArray(SensorArrayOutput {
                    irq_pin: body[0],
                    use_interrupt: body[1] != 0,
                    thresholds,
                })
            }
            OutputType::Rs485 => OutputDescriptor::BusTransportConfig(BusTransportOutput {
                recv_pin: body[0],
                xmit_pin: body[1],
                enable_pin: body[2],
            }),
        };

        Ok((descriptor, output))
    }

    /// Apply a runtime message payload
    ///
    /// Only scalar state is touched; the tag and pin layout never change.
    /// On `TypeMismatch` the descriptor is left as it was.
    pub fn apply_value(&mut self, payload: &Payload) -> Result<Applied, DescriptorError> {
        let mismatch = DescriptorError::TypeMismatch {
            expected: self.output_type(),
            found: payload.output_type(),
        };

        match (self, payload) {
            (OutputDescriptor::Value(out), Payload::Value { value }) => {
                out.value = *value;
                Ok(Applied::Updated)
            }
            (OutputDescriptor::Rgb(out), Payload::Rgb { values }) => {
                out.values = *values;
                Ok(Applied::Updated)
            }
            (OutputDescriptor::Program(out), Payload::Program(program)) => {
                out.values = program.values();
                Ok(Applied::Program(*program))
            }
            (
                OutputDescriptor::Value(_) | OutputDescriptor::Rgb(_) | OutputDescriptor::PixelStrip(_),
                Payload::Program(program),
            ) => Ok(Applied::Program(*program)),
            (OutputDescriptor::PixelStrip(_), Payload::Pixels)
            | (OutputDescriptor::CapacitiveSensorArray(_), Payload::Mpr121)
            | (OutputDescriptor::BusTransportConfig(_), Payload::Rs485) => Ok(Applied::Unchanged),
            _ => Err(mismatch),
        }
    }
}
