//! Incremental frame parsing for the HMTL bus.
//!
//! Frame format:
//! - START (1 byte): 0xFC synchronization byte
//! - LENGTH (1 byte): total frame length, START included
//! - ADDRESS (2 bytes): destination module, little-endian
//! - TYPE (1 byte): output type tag
//! - OUTPUT (1 byte): output index on the destination
//! - PAYLOAD (0-13 bytes): type-specific data
//!
//! There is no checksum. Frames are delimited purely by the start marker
//! and the embedded length.

use heapless::Vec;
use hmtl_hal::BusRx;

use crate::messages::{
    Message, MessageError, MessageHeader, MESSAGE_HEADER_LEN, MIN_FRAME_LEN,
};
use crate::output::OutputType;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xFC;

/// Receive buffer capacity
pub const RX_BUFFER_SIZE: usize = 64;

/// Largest frame the framer can hold
pub const MAX_FRAME_LEN: usize = RX_BUFFER_SIZE;

/// Bytes pulled from the bus per read in [`MessageFramer::poll`]
const POLL_CHUNK: usize = 16;

/// Errors that can occur during frame parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Declared length is smaller than the two headers
    FrameTooShort,
    /// Frame did not complete before the receive buffer filled
    BufferOverrun,
}

/// A complete, length-checked frame
///
/// Holds the raw bytes so the frame can be relayed verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
}

impl Frame {
    /// Wrap bytes produced by the encoder or the framer
    pub(crate) fn from_encoded(bytes: &[u8]) -> Self {
        let mut vec = Vec::new();
        // Callers never exceed MAX_FRAME_LEN
        let _ = vec.extend_from_slice(bytes);
        Self { bytes: vec }
    }

    /// Raw frame bytes, start marker included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared total length
    pub fn length(&self) -> u8 {
        self.bytes[1]
    }

    pub fn header(&self) -> MessageHeader {
        // Frames always hold at least MIN_FRAME_LEN bytes
        MessageHeader {
            length: self.bytes[1],
            address: u16::from_le_bytes([self.bytes[2], self.bytes[3]]),
        }
    }

    /// Destination module address
    pub fn address(&self) -> u16 {
        self.header().address
    }

    /// Raw output type tag
    pub fn output_type_raw(&self) -> u8 {
        self.bytes[MESSAGE_HEADER_LEN]
    }

    /// Output type, if the tag is recognized
    pub fn output_type(&self) -> Option<OutputType> {
        OutputType::from_u8(self.output_type_raw())
    }

    /// Target output index on the destination module
    pub fn output_index(&self) -> u8 {
        self.bytes[MESSAGE_HEADER_LEN + 1]
    }

    /// Bytes following both headers
    pub fn payload(&self) -> &[u8] {
        &self.bytes[MIN_FRAME_LEN..]
    }

    /// Decode the typed message carried by this frame
    pub fn message(&self) -> Result<Message, MessageError> {
        Message::from_frame(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseState {
    /// Discarding bytes until a START marker
    AwaitingStart,
    /// Got START, accumulating until both headers are in
    CollectingHeader,
    /// Length validated, accumulating until it is reached
    CollectingBody,
}

/// State machine for parsing incoming frames
///
/// One instance per receive path. It owns the only state that survives
/// between polls: the partial frame and its offset.
#[derive(Debug, Clone)]
pub struct MessageFramer {
    state: ParseState,
    buffer: Vec<u8, RX_BUFFER_SIZE>,
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFramer {
    /// Create a new framer
    pub fn new() -> Self {
        Self {
            state: ParseState::AwaitingStart,
            buffer: Vec::new(),
        }
    }

    /// Drop any partial frame, e.g. after the bus is reinitialized
    pub fn reset(&mut self) {
        self.state = ParseState::AwaitingStart;
        self.buffer.clear();
    }

    /// Current parse state
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Number of bytes of the current partial frame
    pub fn offset(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a single byte to the framer
    ///
    /// Returns `Ok(Some(frame))` when a frame completes, `Ok(None)` when more
    /// bytes are needed, or `Err` when the partial frame was discarded. The
    /// framer is always back in a usable state after an error.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::AwaitingStart => {
                self.accept_start(byte);
                Ok(None)
            }
            ParseState::CollectingHeader | ParseState::CollectingBody => {
                if self.buffer.push(byte).is_err() {
                    warn!("framer: receive buffer overrun, dropping {} bytes", self.buffer.len());
                    self.reset();
                    // The overflowing byte may begin the next frame
                    self.accept_start(byte);
                    return Err(FrameError::BufferOverrun);
                }

                let offset = self.buffer.len();
                if offset < MIN_FRAME_LEN {
                    return Ok(None);
                }

                let length = self.buffer[1] as usize;
                if offset == MIN_FRAME_LEN {
                    if length < MIN_FRAME_LEN {
                        debug!("framer: declared length {} too short", length);
                        self.reset();
                        return Err(FrameError::FrameTooShort);
                    }
                    self.state = ParseState::CollectingBody;
                }

                if offset == length {
                    let frame = Frame {
                        bytes: self.buffer.clone(),
                    };
                    trace!("framer: frame complete, {} bytes", offset);
                    self.reset();
                    return Ok(Some(frame));
                }

                Ok(None)
            }
        }
    }

    /// Iterate over the frames and errors produced by `bytes`
    ///
    /// Every byte is consumed once the iterator is exhausted; a trailing
    /// partial frame stays buffered for the next call.
    pub fn frames<'f, 'b>(&'f mut self, bytes: &'b [u8]) -> Frames<'f, 'b> {
        Frames {
            framer: self,
            bytes: bytes.iter(),
        }
    }

    /// Drain whatever the receiver currently has buffered
    ///
    /// Each completed frame or framing error is passed to `on_frame`
    /// together with the receiver, which is free between reads so a
    /// half-duplex transport can answer or relay on it.
    /// Returns the number of bytes consumed; never waits for more.
    pub fn poll<R, F>(&mut self, rx: &mut R, mut on_frame: F) -> Result<usize, R::Error>
    where
        R: BusRx + ?Sized,
        F: FnMut(&mut R, Result<Frame, FrameError>),
    {
        let mut chunk = [0u8; POLL_CHUNK];
        let mut consumed = 0;

        loop {
            let n = rx.read_available(&mut chunk)?;
            if n == 0 {
                break;
            }
            consumed += n;
            for result in self.frames(&chunk[..n]) {
                on_frame(rx, result);
            }
        }

        Ok(consumed)
    }

    /// Enter `CollectingHeader` if `byte` is a START marker
    fn accept_start(&mut self, byte: u8) {
        if byte == FRAME_START {
            self.buffer.clear();
            // Buffer was just cleared
            let _ = self.buffer.push(byte);
            self.state = ParseState::CollectingHeader;
        }
    }
}

/// Iterator returned by [`MessageFramer::frames`]
pub struct Frames<'f, 'b> {
    framer: &'f mut MessageFramer,
    bytes: core::slice::Iter<'b, u8>,
}

impl Iterator for Frames<'_, '_> {
    type Item = Result<Frame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        for &byte in self.bytes.by_ref() {
            match self.framer.feed(byte) {
                Ok(None) => {}
                Ok(Some(frame)) => return Some(Ok(frame)),
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
