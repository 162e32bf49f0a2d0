//! Frame dispatch
//!
//! Routes a complete frame either to the addressed local descriptor or, on
//! the bus master, back onto the bus for the module it is meant for.

use hmtl_hal::BusTx;
use hmtl_protocol::{Frame, MessageError, ProgramCommand};

use crate::config::{ConfigError, ConfigStore};
use crate::descriptor::{Applied, DescriptorError};

/// Dispatch errors
///
/// All of these are per-frame: the frame is dropped and the node carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchError {
    /// Output index is not below the receiver's `num_outputs`
    IndexOutOfRange,
    /// Payload type does not match the addressed descriptor
    TypeMismatch,
    /// Master could not forward the frame
    RelayError,
    /// Frame is for another module and this one does not relay
    NotForUs,
    /// Frame carries an unrecognized output type tag
    UnknownType(u8),
    /// Declared length does not match the payload size for the type
    InvalidLength,
    /// Program payload with an unrecognized program id
    UnknownProgram(u8),
}

impl From<MessageError> for DispatchError {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::UnknownType(tag) => DispatchError::UnknownType(tag),
            MessageError::InvalidLength => DispatchError::InvalidLength,
            MessageError::UnknownProgram(id) => DispatchError::UnknownProgram(id),
        }
    }
}

impl From<DescriptorError> for DispatchError {
    fn from(e: DescriptorError) -> Self {
        match e {
            DescriptorError::UnknownType(tag) => DispatchError::UnknownType(tag),
            DescriptorError::TypeMismatch { .. } => DispatchError::TypeMismatch,
            DescriptorError::Truncated => DispatchError::InvalidLength,
        }
    }
}

impl From<ConfigError> for DispatchError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::UnknownType(tag) => DispatchError::UnknownType(tag),
            _ => DispatchError::IndexOutOfRange,
        }
    }
}

/// Successful dispatch outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatched {
    /// Local descriptor value changed
    Updated(u8),
    /// Local descriptor accepted the frame without a value change
    Unchanged(u8),
    /// Program command for a local output
    Program { index: u8, program: ProgramCommand },
    /// Frame forwarded verbatim to the bus
    Relayed,
}

/// Validate a frame against the configuration and act on it
///
/// The address is compared first: frames for other modules are relayed by
/// a master, whatever their output index, and ignored otherwise. The index
/// is only checked against this module's own table. A failed relay leaves
/// local state untouched.
pub fn handle<T, const N: usize>(
    frame: &Frame,
    config: &mut ConfigStore<N>,
    relay: &mut T,
) -> Result<Dispatched, DispatchError>
where
    T: BusTx + ?Sized,
{
    if frame.address() != config.address() {
        if !config.is_master() {
            return Err(DispatchError::NotForUs);
        }
        relay.transmit(frame.as_bytes()).map_err(|_| {
            warn!("dispatch: relay to {} failed", frame.address());
            DispatchError::RelayError
        })?;
        trace!("dispatch: relayed {} bytes to {}", frame.length(), frame.address());
        return Ok(Dispatched::Relayed);
    }

    let index = frame.output_index();
    if index >= config.num_outputs() {
        debug!(
            "dispatch: index {} out of range ({} outputs)",
            index,
            config.num_outputs()
        );
        return Err(DispatchError::IndexOutOfRange);
    }

    let message = frame.message()?;
    let descriptor = config.descriptor_at_mut(index as usize)?;

    match descriptor.apply_value(&message.payload)? {
        Applied::Updated => {
            trace!("dispatch: output {} updated", index);
            Ok(Dispatched::Updated(index))
        }
        Applied::Unchanged => Ok(Dispatched::Unchanged(index)),
        Applied::Program(program) => {
            trace!("dispatch: output {} program {}", index, program.id());
            Ok(Dispatched::Program { index, program })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigHeader;
    use crate::descriptor::{OutputDescriptor, RgbOutput, ValueOutput};
    use hmtl_protocol::{Message, MessageFramer, Payload, FRAME_START};

    /// Bus that records relayed frames
    #[derive(Default)]
    struct RelayBus {
        sent: Vec<Vec<u8>>,
        fail: bool,
    }

    impl BusTx for RelayBus {
        type Error = ();

        fn transmit(&mut self, frame: &[u8]) -> Result<(), ()> {
            if self.fail {
                return Err(());
            }
            self.sent.push(frame.to_vec());
            Ok(())
        }
    }

    fn config(address: u16, master: bool) -> ConfigStore<4> {
        let mut header = ConfigHeader::new(address);
        header.set_master(master);
        ConfigStore::from_parts(
            header,
            &[
                OutputDescriptor::Rgb(RgbOutput {
                    pins: [3, 5, 6],
                    values: [0; 3],
                }),
                OutputDescriptor::Value(ValueOutput { pin: 9, value: 0 }),
            ],
        )
        .unwrap()
    }

    fn frame(address: u16, output: u8, payload: Payload) -> Frame {
        Message::new(address, output, payload).to_frame().unwrap()
    }

    #[test]
    fn test_value_update() {
        let mut cfg = config(7, false);
        let mut bus = RelayBus::default();
        let before = *cfg.descriptor_at(0).unwrap();

        let result = handle(&frame(7, 1, Payload::Value { value: 200 }), &mut cfg, &mut bus);

        assert_eq!(result, Ok(Dispatched::Updated(1)));
        assert_eq!(
            cfg.descriptor_at(1),
            Ok(&OutputDescriptor::Value(ValueOutput { pin: 9, value: 200 }))
        );
        assert_eq!(cfg.descriptor_at(0), Ok(&before));
        assert!(bus.sent.is_empty());
    }

    #[test]
    fn test_type_mismatch_no_mutation() {
        let mut cfg = config(7, false);
        let before = cfg.clone();

        let result = handle(
            &frame(7, 0, Payload::Value { value: 200 }),
            &mut cfg,
            &mut RelayBus::default(),
        );

        assert_eq!(result, Err(DispatchError::TypeMismatch));
        assert_eq!(cfg, before);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut cfg = config(7, false);
        let before = cfg.clone();
        let mut bus = RelayBus::default();

        let result = handle(&frame(7, 2, Payload::Value { value: 1 }), &mut cfg, &mut bus);

        assert_eq!(result, Err(DispatchError::IndexOutOfRange));
        assert_eq!(cfg, before);
        assert!(bus.sent.is_empty());
    }

    #[test]
    fn test_master_relays_foreign_index() {
        let mut header = ConfigHeader::new(7);
        header.set_master(true);
        let mut cfg: ConfigStore<4> = ConfigStore::from_parts(
            header,
            &[OutputDescriptor::Value(ValueOutput { pin: 9, value: 0 })],
        )
        .unwrap();
        let before = cfg.clone();
        let mut bus = RelayBus::default();
        let f = frame(5, 3, Payload::Value { value: 1 });

        let result = handle(&f, &mut cfg, &mut bus);

        assert_eq!(result, Ok(Dispatched::Relayed));
        assert_eq!(bus.sent.len(), 1);
        assert_eq!(bus.sent[0].as_slice(), f.as_bytes());
        assert_eq!(cfg, before);
    }

    #[test]
    fn test_foreign_index_ignored_without_master() {
        let mut cfg = config(7, false);
        let mut bus = RelayBus::default();

        let result = handle(&frame(5, 9, Payload::Value { value: 1 }), &mut cfg, &mut bus);

        assert_eq!(result, Err(DispatchError::NotForUs));
        assert!(bus.sent.is_empty());
    }

    #[test]
    fn test_not_for_us() {
        let mut cfg = config(7, false);
        let before = cfg.clone();
        let mut bus = RelayBus::default();

        let result = handle(&frame(5, 1, Payload::Value { value: 1 }), &mut cfg, &mut bus);

        assert_eq!(result, Err(DispatchError::NotForUs));
        assert_eq!(cfg, before);
        assert!(bus.sent.is_empty());
    }

    #[test]
    fn test_master_relays_verbatim() {
        let mut cfg = config(7, true);
        let before = cfg.clone();
        let mut bus = RelayBus::default();
        let f = frame(5, 1, Payload::Value { value: 1 });

        let result = handle(&f, &mut cfg, &mut bus);

        assert_eq!(result, Ok(Dispatched::Relayed));
        assert_eq!(bus.sent.len(), 1);
        assert_eq!(bus.sent[0].as_slice(), f.as_bytes());
        assert_eq!(cfg, before);
    }

    #[test]
    fn test_relay_failure() {
        let mut cfg = config(7, true);
        let before = cfg.clone();
        let mut bus = RelayBus {
            fail: true,
            ..Default::default()
        };

        let result = handle(&frame(5, 1, Payload::Value { value: 1 }), &mut cfg, &mut bus);

        assert_eq!(result, Err(DispatchError::RelayError));
        assert_eq!(cfg, before);
    }

    #[test]
    fn test_program_returned_to_caller() {
        let mut cfg = config(7, false);
        let program = ProgramCommand::Blink {
            on_period: 500,
            on_value: 255,
            off_period: 500,
            off_value: 0,
        };

        let result = handle(
            &frame(7, 1, Payload::Program(program)),
            &mut cfg,
            &mut RelayBus::default(),
        );

        assert_eq!(result, Ok(Dispatched::Program { index: 1, program }));
    }

    #[test]
    fn test_bad_frames_rejected() {
        let mut cfg = config(7, false);
        let mut framer = MessageFramer::new();

        // Unknown output type
        let unknown = [FRAME_START, 7, 7, 0, 0x42, 1, 0];
        let f = framer.frames(&unknown).next().unwrap().unwrap();
        assert_eq!(
            handle(&f, &mut cfg, &mut RelayBus::default()),
            Err(DispatchError::UnknownType(0x42))
        );

        // Value frame with an extra byte
        let long = [FRAME_START, 8, 7, 0, 1, 1, 10, 11];
        let f = framer.frames(&long).next().unwrap().unwrap();
        assert_eq!(
            handle(&f, &mut cfg, &mut RelayBus::default()),
            Err(DispatchError::InvalidLength)
        );
        assert_eq!(
            cfg.descriptor_at(1),
            Ok(&OutputDescriptor::Value(ValueOutput { pin: 9, value: 0 }))
        );
    }
}
