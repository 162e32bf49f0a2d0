//! Output actuation trait

use crate::descriptor::OutputDescriptor;

/// Drives the physical side of a module's outputs
///
/// Board support code implements this on top of its PWM channels, pixel
/// strip driver and sensor bus. The core never calls it from the message
/// path; the polling loop decides when to push state to the hardware.
pub trait OutputDriver {
    type Error;

    /// Configure pins and peripherals for one output
    ///
    /// Called once per output at start-up, in index order.
    fn setup(&mut self, index: u8, output: &OutputDescriptor) -> Result<(), Self::Error>;

    /// Drive one output to the state held in its descriptor
    fn apply(&mut self, index: u8, output: &OutputDescriptor) -> Result<(), Self::Error>;
}

impl<T: OutputDriver + ?Sized> OutputDriver for &mut T {
    type Error = T::Error;

    fn setup(&mut self, index: u8, output: &OutputDescriptor) -> Result<(), Self::Error> {
        (**self).setup(index, output)
    }

    fn apply(&mut self, index: u8, output: &OutputDescriptor) -> Result<(), Self::Error> {
        (**self).apply(index, output)
    }
}
