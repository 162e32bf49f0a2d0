//! Message layout for the HMTL bus
//!
//! Every frame is a `MessageHeader` (start marker, total length, target
//! address) followed by an `OutputHeader` (output type, output index) and a
//! payload whose shape is fixed by the output type. All integers are
//! little-endian.

use crate::encoder::EncodeError;
use crate::frame::{Frame, FRAME_START, MAX_FRAME_LEN};
use crate::output::OutputType;

/// Start marker + length + address
pub const MESSAGE_HEADER_LEN: usize = 4;

/// Output type + output index
pub const OUTPUT_HEADER_LEN: usize = 2;

/// Smallest well-formed frame: both headers, empty payload
pub const MIN_FRAME_LEN: usize = MESSAGE_HEADER_LEN + OUTPUT_HEADER_LEN;

/// Number of value bytes carried by a program
pub const MAX_PROGRAM_VAL: usize = 12;

pub const VALUE_PAYLOAD_LEN: usize = 1;
pub const RGB_PAYLOAD_LEN: usize = 3;
/// Program id followed by the program's value bytes
pub const PROGRAM_PAYLOAD_LEN: usize = 1 + MAX_PROGRAM_VAL;

// Program ids
pub const PROGRAM_NONE: u8 = 0x00;
pub const PROGRAM_BLINK: u8 = 0x01;
pub const PROGRAM_TIMED_CHANGE: u8 = 0x02;

/// Errors interpreting a frame's contents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Output type tag is not recognized
    UnknownType(u8),
    /// Declared length does not match the payload size for the type
    InvalidLength,
    /// Program id is not recognized
    UnknownProgram(u8),
}

/// Frame-level header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageHeader {
    /// Total frame size in bytes, start marker included
    pub length: u8,
    /// Destination module address
    pub address: u16,
}

impl MessageHeader {
    /// Write the header (start marker included) into the first
    /// `MESSAGE_HEADER_LEN` bytes of `buf`
    pub fn write(&self, buf: &mut [u8]) {
        buf[0] = FRAME_START;
        buf[1] = self.length;
        buf[2..4].copy_from_slice(&self.address.to_le_bytes());
    }

    /// Read a header from the first `MESSAGE_HEADER_LEN` bytes of `buf`
    pub fn read(buf: &[u8]) -> Result<Self, MessageError> {
        if buf.len() < MESSAGE_HEADER_LEN {
            return Err(MessageError::InvalidLength);
        }
        Ok(Self {
            length: buf[1],
            address: u16::from_le_bytes([buf[2], buf[3]]),
        })
    }
}

/// Output addressing header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputHeader {
    pub output_type: OutputType,
    /// Index into the receiving module's descriptor table
    pub output_index: u8,
}

impl OutputHeader {
    /// Write the header into the first `OUTPUT_HEADER_LEN` bytes of `buf`
    pub fn write(&self, buf: &mut [u8]) {
        buf[0] = self.output_type.as_u8();
        buf[1] = self.output_index;
    }

    /// Read a header, validating the type tag
    pub fn read(buf: &[u8]) -> Result<Self, MessageError> {
        let &[tag, output_index, ..] = buf else {
            return Err(MessageError::InvalidLength);
        };
        let output_type = OutputType::from_u8(tag).ok_or(MessageError::UnknownType(tag))?;
        Ok(Self {
            output_type,
            output_index,
        })
    }
}

/// Timed behaviour run by a module's program runner
///
/// Colors and levels are packed `0x00RRGGBB` for RGB outputs and plain
/// levels for single-channel outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProgramCommand {
    /// Stop whatever program is running on the output
    Cancel,
    /// Alternate between two values with independent periods (ms)
    Blink {
        on_period: u16,
        on_value: u32,
        off_period: u16,
        off_value: u32,
    },
    /// Move from `start_value` to `stop_value` over `change_period` ms
    TimedChange {
        change_period: u32,
        start_value: u32,
        stop_value: u32,
    },
}

impl ProgramCommand {
    /// Program id byte
    pub fn id(&self) -> u8 {
        match self {
            ProgramCommand::Cancel => PROGRAM_NONE,
            ProgramCommand::Blink { .. } => PROGRAM_BLINK,
            ProgramCommand::TimedChange { .. } => PROGRAM_TIMED_CHANGE,
        }
    }

    /// Encoded value bytes, zero padded
    pub fn values(&self) -> [u8; MAX_PROGRAM_VAL] {
        let mut values = [0u8; MAX_PROGRAM_VAL];
        match *self {
            ProgramCommand::Cancel => {}
            ProgramCommand::Blink {
                on_period,
                on_value,
                off_period,
                off_value,
            } => {
                values[0..2].copy_from_slice(&on_period.to_le_bytes());
                values[2..6].copy_from_slice(&on_value.to_le_bytes());
                values[6..8].copy_from_slice(&off_period.to_le_bytes());
                values[8..12].copy_from_slice(&off_value.to_le_bytes());
            }
            ProgramCommand::TimedChange {
                change_period,
                start_value,
                stop_value,
            } => {
                values[0..4].copy_from_slice(&change_period.to_le_bytes());
                values[4..8].copy_from_slice(&start_value.to_le_bytes());
                values[8..12].copy_from_slice(&stop_value.to_le_bytes());
            }
        }
        values
    }

    /// Rebuild a program from its id and value bytes
    pub fn from_parts(id: u8, values: &[u8; MAX_PROGRAM_VAL]) -> Result<Self, MessageError> {
        let u16_at = |i: usize| u16::from_le_bytes([values[i], values[i + 1]]);
        let u32_at = |i: usize| {
            u32::from_le_bytes([values[i], values[i + 1], values[i + 2], values[i + 3]])
        };

        match id {
            PROGRAM_NONE => Ok(ProgramCommand::Cancel),
            PROGRAM_BLINK => Ok(ProgramCommand::Blink {
                on_period: u16_at(0),
                on_value: u32_at(2),
                off_period: u16_at(6),
                off_value: u32_at(8),
            }),
            PROGRAM_TIMED_CHANGE => Ok(ProgramCommand::TimedChange {
                change_period: u32_at(0),
                start_value: u32_at(4),
                stop_value: u32_at(8),
            }),
            other => Err(MessageError::UnknownProgram(other)),
        }
    }
}

/// Type-specific message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Payload {
    /// New level for a single-channel output
    Value { value: u8 },
    /// New levels for the three channels of an RGB output
    Rgb { values: [u8; 3] },
    /// Program to run on the output
    Program(ProgramCommand),
    /// Pixel strip outputs carry no runtime payload
    Pixels,
    /// Sensor arrays carry no runtime payload
    Mpr121,
    /// Bus transceivers carry no runtime payload
    Rs485,
}

impl Payload {
    /// Output type implied by this payload
    pub fn output_type(&self) -> OutputType {
        match self {
            Payload::Value { .. } => OutputType::Value,
            Payload::Rgb { .. } => OutputType::Rgb,
            Payload::Program(_) => OutputType::Program,
            Payload::Pixels => OutputType::Pixels,
            Payload::Mpr121 => OutputType::Mpr121,
            Payload::Rs485 => OutputType::Rs485,
        }
    }

    /// Encoded size in bytes
    pub fn encoded_len(&self) -> usize {
        self.output_type().payload_len()
    }

    /// Write the payload into the first `encoded_len()` bytes of `buf`
    pub fn write(&self, buf: &mut [u8]) {
        match self {
            Payload::Value { value } => buf[0] = *value,
            Payload::Rgb { values } => buf[..RGB_PAYLOAD_LEN].copy_from_slice(values),
            Payload::Program(program) => {
                buf[0] = program.id();
                buf[1..PROGRAM_PAYLOAD_LEN].copy_from_slice(&program.values());
            }
            Payload::Pixels | Payload::Mpr121 | Payload::Rs485 => {}
        }
    }

    /// Decode a payload of the given type
    ///
    /// `bytes` must be exactly the type's payload size.
    pub fn read(output_type: OutputType, bytes: &[u8]) -> Result<Self, MessageError> {
        if bytes.len() != output_type.payload_len() {
            return Err(MessageError::InvalidLength);
        }

        match output_type {
            OutputType::Value => Ok(Payload::Value { value: bytes[0] }),
            OutputType::Rgb => Ok(Payload::Rgb {
                values: [bytes[0], bytes[1], bytes[2]],
            }),
            OutputType::Program => {
                let mut values = [0u8; MAX_PROGRAM_VAL];
                values.copy_from_slice(&bytes[1..]);
                ProgramCommand::from_parts(bytes[0], &values).map(Payload::Program)
            }
            OutputType::Pixels => Ok(Payload::Pixels),
            OutputType::Mpr121 => Ok(Payload::Mpr121),
            OutputType::Rs485 => Ok(Payload::Rs485),
        }
    }
}

/// A complete decoded command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    /// Destination module address
    pub address: u16,
    /// Index into the destination's descriptor table
    pub output_index: u8,
    pub payload: Payload,
}

impl Message {
    pub fn new(address: u16, output_index: u8, payload: Payload) -> Self {
        Self {
            address,
            output_index,
            payload,
        }
    }

    /// Total encoded frame size
    pub fn frame_len(&self) -> usize {
        MIN_FRAME_LEN + self.payload.encoded_len()
    }

    /// Encode this message as a complete frame into `buf`
    ///
    /// Returns the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, EncodeError> {
        let len = self.frame_len();
        if buf.len() < len {
            return Err(EncodeError::EncodeOverflow);
        }

        MessageHeader {
            length: len as u8,
            address: self.address,
        }
        .write(&mut buf[..MESSAGE_HEADER_LEN]);
        OutputHeader {
            output_type: self.payload.output_type(),
            output_index: self.output_index,
        }
        .write(&mut buf[MESSAGE_HEADER_LEN..MIN_FRAME_LEN]);
        self.payload.write(&mut buf[MIN_FRAME_LEN..len]);

        Ok(len)
    }

    /// Encode this message into a `Frame`
    pub fn to_frame(&self) -> Result<Frame, EncodeError> {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let len = self.encode(&mut buf)?;
        Ok(Frame::from_encoded(&buf[..len]))
    }

    /// Decode a message from a complete frame
    ///
    /// The tag is validated before any payload byte is interpreted, and the
    /// declared length must match the type's payload size exactly.
    pub fn from_frame(frame: &Frame) -> Result<Self, MessageError> {
        let bytes = frame.as_bytes();
        let header = MessageHeader::read(bytes)?;
        let output = OutputHeader::read(&bytes[MESSAGE_HEADER_LEN..])?;

        if header.length as usize != MIN_FRAME_LEN + output.output_type.payload_len() {
            return Err(MessageError::InvalidLength);
        }

        let payload = Payload::read(output.output_type, frame.payload())?;
        Ok(Self {
            address: header.address,
            output_index: output.output_index,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_message_layout() {
        let msg = Message::new(0x1234, 3, Payload::Value { value: 128 });
        let mut buf = [0u8; 16];
        let len = msg.encode(&mut buf).unwrap();

        assert_eq!(len, 7);
        assert_eq!(buf[0], FRAME_START);
        assert_eq!(buf[1], 7); // length
        assert_eq!(buf[2], 0x34); // address, little-endian
        assert_eq!(buf[3], 0x12);
        assert_eq!(buf[4], OutputType::Value.as_u8());
        assert_eq!(buf[5], 3); // output index
        assert_eq!(buf[6], 128);
    }

    #[test]
    fn test_rgb_message_layout() {
        let msg = Message::new(1, 0, Payload::Rgb { values: [255, 0, 64] });
        let frame = msg.to_frame().unwrap();
        assert_eq!(frame.length(), 9);
        assert_eq!(frame.payload(), &[255, 0, 64]);
    }

    #[test]
    fn test_bare_message_has_no_payload() {
        let msg = Message::new(9, 1, Payload::Rs485);
        let frame = msg.to_frame().unwrap();
        assert_eq!(frame.length() as usize, MIN_FRAME_LEN);
        assert!(frame.payload().is_empty());
        assert_eq!(Message::from_frame(&frame), Ok(msg));
    }

    #[test]
    fn test_encode_overflow() {
        let msg = Message::new(1, 0, Payload::Program(ProgramCommand::Cancel));
        let mut buf = [0u8; 10];
        assert_eq!(msg.encode(&mut buf), Err(EncodeError::EncodeOverflow));
    }

    #[test]
    fn test_blink_values() {
        let program = ProgramCommand::Blink {
            on_period: 250,
            on_value: 0x00FF_0000,
            off_period: 750,
            off_value: 0,
        };
        let values = program.values();
        assert_eq!(&values[0..2], &250u16.to_le_bytes());
        assert_eq!(&values[2..6], &0x00FF_0000u32.to_le_bytes());
        assert_eq!(&values[6..8], &750u16.to_le_bytes());
        assert_eq!(ProgramCommand::from_parts(PROGRAM_BLINK, &values), Ok(program));
    }

    #[test]
    fn test_timed_change_values() {
        let program = ProgramCommand::TimedChange {
            change_period: 30_000,
            start_value: 0xFFFF_FFFF,
            stop_value: 0,
        };
        let values = program.values();
        assert_eq!(
            ProgramCommand::from_parts(PROGRAM_TIMED_CHANGE, &values),
            Ok(program)
        );
    }

    #[test]
    fn test_unknown_program() {
        assert_eq!(
            ProgramCommand::from_parts(0x7F, &[0; MAX_PROGRAM_VAL]),
            Err(MessageError::UnknownProgram(0x7F))
        );
    }

    #[test]
    fn test_payload_length_mismatch() {
        assert_eq!(
            Payload::read(OutputType::Rgb, &[1, 2]),
            Err(MessageError::InvalidLength)
        );
    }

    #[test]
    fn test_output_header_rejects_unknown_tag() {
        assert_eq!(OutputHeader::read(&[0x09, 0]), Err(MessageError::UnknownType(0x09)));
    }

    #[test]
    fn test_headers_reject_short_input() {
        assert_eq!(MessageHeader::read(&[FRAME_START, 6, 1]), Err(MessageError::InvalidLength));
        assert_eq!(OutputHeader::read(&[0x01]), Err(MessageError::InvalidLength));
        assert_eq!(OutputHeader::read(&[]), Err(MessageError::InvalidLength));
        assert_eq!(
            MessageHeader::read(&[FRAME_START, 7, 0x2A, 0x00]),
            Ok(MessageHeader {
                length: 7,
                address: 42
            })
        );
    }
}
