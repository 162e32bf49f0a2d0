//! Bus node polling context
//!
//! A `Node` owns the module's configuration and the receive-side framer.
//! The main loop calls [`Node::poll`] whenever it gets around to it; the node
//! drains the bus, dispatches every complete frame and reports what changed
//! so the loop can drive the hardware.

use heapless::Vec;
use hmtl_hal::{BusRx, BusTransport};
use hmtl_protocol::{MessageFramer, ParseState, ProgramCommand};

use crate::config::{ConfigStore, UpdateError, MAX_OUTPUTS};
use crate::dispatch::{self, DispatchError, Dispatched};
use crate::traits::OutputDriver;

/// Summary of one [`Node::poll`] call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollReport<const N: usize = MAX_OUTPUTS> {
    /// Bytes read from the bus
    pub bytes: usize,
    /// Complete frames seen, whatever their fate
    pub frames: usize,
    /// Frames forwarded for other modules
    pub relayed: usize,
    /// Frames or partial frames dropped on error
    pub dropped: usize,
    /// Indices whose descriptor value changed, each listed once
    pub changed: Vec<u8, N>,
    /// Latest program command per output index
    pub programs: Vec<(u8, ProgramCommand), N>,
}

impl<const N: usize> PollReport<N> {
    /// Whether any local output needs attention
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty() || !self.programs.is_empty()
    }

    fn mark_changed(&mut self, index: u8) {
        if !self.changed.contains(&index) {
            // Indices are below N, so a deduplicated list always fits
            let _ = self.changed.push(index);
        }
    }

    fn set_program(&mut self, index: u8, program: ProgramCommand) {
        match self.programs.iter_mut().find(|(i, _)| *i == index) {
            Some(slot) => slot.1 = program,
            None => {
                let _ = self.programs.push((index, program));
            }
        }
    }
}

/// Single-owner polling context for one module
pub struct Node<const N: usize = MAX_OUTPUTS> {
    config: ConfigStore<N>,
    framer: MessageFramer,
}

impl<const N: usize> Node<N> {
    pub fn new(config: ConfigStore<N>) -> Self {
        Self {
            config,
            framer: MessageFramer::new(),
        }
    }

    pub fn config(&self) -> &ConfigStore<N> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore<N> {
        &mut self.config
    }

    pub fn into_config(self) -> ConfigStore<N> {
        self.config
    }

    /// Current framer state
    pub fn link_state(&self) -> ParseState {
        self.framer.state()
    }

    /// Drop any partial frame, e.g. after the transceiver was re-enabled
    pub fn reset_link(&mut self) {
        self.framer.reset();
    }

    /// Drain the bus and dispatch every complete frame
    ///
    /// Per-frame errors are logged and counted, never returned. Only a
    /// failure reading the bus ends the poll early; frames already handled
    /// stay handled and a trailing partial frame stays buffered.
    pub fn poll<B>(&mut self, bus: &mut B) -> Result<PollReport<N>, <B as BusRx>::Error>
    where
        B: BusTransport,
    {
        let mut report = PollReport::default();
        let config = &mut self.config;

        let bytes = self.framer.poll(bus, |bus, result| {
            let frame = match result {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("node: framing error {:?}", e);
                    report.dropped += 1;
                    return;
                }
            };
            report.frames += 1;

            match dispatch::handle(&frame, config, bus) {
                Ok(Dispatched::Updated(index)) => report.mark_changed(index),
                Ok(Dispatched::Unchanged(_)) => {}
                Ok(Dispatched::Program { index, program }) => report.set_program(index, program),
                Ok(Dispatched::Relayed) => report.relayed += 1,
                Err(DispatchError::NotForUs) => {
                    trace!("node: frame for {} ignored", frame.address());
                }
                Err(e) => {
                    debug!("node: dropped frame: {:?}", e);
                    report.dropped += 1;
                }
            }
        })?;

        report.bytes = bytes;
        Ok(report)
    }

    /// Push every changed output to the hardware
    pub fn apply_changes<D: OutputDriver>(
        &self,
        report: &PollReport<N>,
        driver: &mut D,
    ) -> Result<(), UpdateError<D::Error>> {
        for &index in report.changed.iter() {
            self.config.update_output(index as usize, driver)?;
        }
        Ok(())
    }
}
