//! Outbound command encoding
//!
//! Upstream control logic (switch panels, touch controllers) uses
//! [`CommandEncoder`] to address outputs on other modules.

use hmtl_hal::BusTx;

use crate::messages::{Message, Payload, ProgramCommand};

/// Transmit buffer capacity
pub const TX_BUFFER_SIZE: usize = 64;

/// Errors that can occur while building or sending a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Frame does not fit in the transmit buffer; nothing was sent
    EncodeOverflow,
    /// Bus transport rejected the frame
    TransmitError,
}

/// Builds command frames and hands them to the bus
pub struct CommandEncoder<T, const N: usize = TX_BUFFER_SIZE> {
    bus: T,
    buffer: [u8; N],
}

impl<T: BusTx, const N: usize> CommandEncoder<T, N> {
    pub fn new(bus: T) -> Self {
        Self {
            bus,
            buffer: [0; N],
        }
    }

    /// Borrow the underlying transport
    pub fn bus(&self) -> &T {
        &self.bus
    }

    /// Mutably borrow the underlying transport
    pub fn bus_mut(&mut self) -> &mut T {
        &mut self.bus
    }

    /// Consume the encoder and return the transport
    pub fn into_inner(self) -> T {
        self.bus
    }

    /// Encode and transmit an arbitrary message
    ///
    /// Returns the number of bytes put on the bus.
    pub fn send(&mut self, message: &Message) -> Result<usize, EncodeError> {
        let len = message.encode(&mut self.buffer)?;
        self.bus.transmit(&self.buffer[..len]).map_err(|_| {
            warn!("encoder: transmit to {} failed", message.address);
            EncodeError::TransmitError
        })?;
        trace!("encoder: sent {} bytes to {}", len, message.address);
        Ok(len)
    }

    /// Set a single-channel output to `value`
    pub fn send_value(&mut self, address: u16, output: u8, value: u8) -> Result<usize, EncodeError> {
        self.send(&Message::new(address, output, Payload::Value { value }))
    }

    /// Set the three channels of an RGB output
    pub fn send_rgb(
        &mut self,
        address: u16,
        output: u8,
        red: u8,
        green: u8,
        blue: u8,
    ) -> Result<usize, EncodeError> {
        self.send(&Message::new(
            address,
            output,
            Payload::Rgb {
                values: [red, green, blue],
            },
        ))
    }

    /// Move an output from `start_value` to `stop_value` over `change_period` ms
    pub fn send_timed_change(
        &mut self,
        address: u16,
        output: u8,
        change_period: u32,
        start_value: u32,
        stop_value: u32,
    ) -> Result<usize, EncodeError> {
        self.send_program(
            address,
            output,
            ProgramCommand::TimedChange {
                change_period,
                start_value,
                stop_value,
            },
        )
    }

    /// Cancel any program running on an output
    pub fn send_cancel(&mut self, address: u16, output: u8) -> Result<usize, EncodeError> {
        self.send_program(address, output, ProgramCommand::Cancel)
    }

    /// Blink an output with independent on and off periods (ms)
    pub fn send_blink(
        &mut self,
        address: u16,
        output: u8,
        on_period: u16,
        on_value: u32,
        off_period: u16,
        off_value: u32,
    ) -> Result<usize, EncodeError> {
        self.send_program(
            address,
            output,
            ProgramCommand::Blink {
                on_period,
                on_value,
                off_period,
                off_value,
            },
        )
    }

    fn send_program(
        &mut self,
        address: u16,
        output: u8,
        program: ProgramCommand,
    ) -> Result<usize, EncodeError> {
        self.send(&Message::new(address, output, Payload::Program(program)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{MessageFramer, FRAME_START};
    use crate::messages::PROGRAM_TIMED_CHANGE;
    use crate::output::OutputType;
    use heapless::Vec;

    #[derive(Default)]
    struct RecordingBus {
        sent: Vec<Vec<u8, 64>, 8>,
        fail: bool,
    }

    impl BusTx for RecordingBus {
        type Error = ();

        fn transmit(&mut self, frame: &[u8]) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            let mut copy = Vec::new();
            copy.extend_from_slice(frame)?;
            self.sent.push(copy).map_err(|_| ())
        }
    }

    #[test]
    fn test_send_value() {
        let mut encoder: CommandEncoder<_> = CommandEncoder::new(RecordingBus::default());
        assert_eq!(encoder.send_value(42, 3, 128), Ok(7));

        let sent = &encoder.bus().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].as_slice(), &[FRAME_START, 7, 42, 0, 1, 3, 128]);
    }

    #[test]
    fn test_send_timed_change() {
        let mut encoder: CommandEncoder<_> = CommandEncoder::new(RecordingBus::default());
        assert_eq!(
            encoder.send_timed_change(0x0100, 1, 30_000, 0xFFFF_FFFF, 0),
            Ok(19)
        );

        let frame = &encoder.bus().sent[0];
        assert_eq!(frame[1], 19);
        assert_eq!(frame[4], OutputType::Program.as_u8());
        assert_eq!(frame[6], PROGRAM_TIMED_CHANGE);
        assert_eq!(&frame[7..11], &30_000u32.to_le_bytes());
    }

    #[test]
    fn test_cancel_and_blink_decode() {
        let mut encoder: CommandEncoder<_> = CommandEncoder::new(RecordingBus::default());
        encoder.send_cancel(7, 2).unwrap();
        encoder.send_blink(7, 2, 100, 255, 400, 0).unwrap();

        let mut framer = MessageFramer::new();
        let mut programs = Vec::<ProgramCommand, 4>::new();
        for bytes in encoder.bus().sent.iter() {
            for frame in framer.frames(bytes) {
                match frame.unwrap().message().unwrap().payload {
                    Payload::Program(p) => programs.push(p).unwrap(),
                    other => panic!("unexpected payload {:?}", other),
                }
            }
        }

        assert_eq!(
            programs.as_slice(),
            &[
                ProgramCommand::Cancel,
                ProgramCommand::Blink {
                    on_period: 100,
                    on_value: 255,
                    off_period: 400,
                    off_value: 0,
                },
            ]
        );
    }

    #[test]
    fn test_overflow_sends_nothing() {
        let mut encoder: CommandEncoder<_, 8> = CommandEncoder::new(RecordingBus::default());
        assert_eq!(encoder.send_value(1, 0, 1), Ok(7));
        assert_eq!(
            encoder.send_cancel(1, 0),
            Err(EncodeError::EncodeOverflow)
        );
        assert_eq!(encoder.bus().sent.len(), 1);
    }

    #[test]
    fn test_transmit_failure() {
        let mut encoder: CommandEncoder<_> = CommandEncoder::new(RecordingBus {
            fail: true,
            ..Default::default()
        });
        assert_eq!(encoder.send_rgb(1, 0, 1, 2, 3), Err(EncodeError::TransmitError));
    }
}
