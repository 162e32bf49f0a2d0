//! HMTL Bus Protocol
//!
//! This crate defines the binary protocol spoken between HMTL modules on a
//! shared half-duplex RS485 bus: the output type tags, the message layout,
//! an incremental framer for the receive side and an encoder for commands.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬─────────┬──────┬────────┬─────────────┐
//! │ START │ LENGTH │ ADDRESS │ TYPE │ OUTPUT │ PAYLOAD     │
//! │ 1B    │ 1B     │ 2B LE   │ 1B   │ 1B     │ 0–13B       │
//! └───────┴────────┴─────────┴──────┴────────┴─────────────┘
//! ```
//!
//! LENGTH covers the whole frame. There is no checksum and no
//! acknowledgement; a corrupted frame is dropped by the receiver.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod encoder;
pub mod frame;
pub mod messages;
pub mod output;

pub use encoder::{CommandEncoder, EncodeError, TX_BUFFER_SIZE};
pub use frame::{Frame, FrameError, MessageFramer, ParseState, FRAME_START, MAX_FRAME_LEN, RX_BUFFER_SIZE};
pub use messages::{
    Message, MessageError, MessageHeader, OutputHeader, Payload, ProgramCommand, MAX_PROGRAM_VAL,
    MIN_FRAME_LEN,
};
pub use output::OutputType;
