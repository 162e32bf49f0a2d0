//! Serial bus transport abstractions
//!
//! Modules share a half-duplex RS485 bus. The core never waits on it: reads
//! return whatever is buffered, writes hand a complete frame to the driver.

/// Bus transmitter
pub trait BusTx {
    /// Error type for transmit operations
    type Error;

    /// Put a complete frame on the bus
    ///
    /// The driver handles the transceiver enable line and turnaround.
    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error>;
}

/// Bus receiver
pub trait BusRx {
    /// Error type for receive operations
    type Error;

    /// Copy currently buffered bytes into `buf` without waiting
    ///
    /// Returns `Ok(0)` when nothing is pending.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Combined bus interface
///
/// For transceivers that provide both directions on a single peripheral.
pub trait BusTransport: BusTx + BusRx {}

// Blanket implementation
impl<T: BusTx + BusRx> BusTransport for T {}

impl<T: BusTx + ?Sized> BusTx for &mut T {
    type Error = T::Error;

    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        (**self).transmit(frame)
    }
}

impl<T: BusRx + ?Sized> BusRx for &mut T {
    type Error = T::Error;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).read_available(buf)
    }
}
