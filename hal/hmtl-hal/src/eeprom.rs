//! Persistent storage abstractions
//!
//! Module configuration lives at fixed byte offsets in EEPROM. The core only
//! needs random-access reads and writes of byte ranges.

/// Errors from persistent storage operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// Access extends past the end of the device
    OutOfBounds,
    /// Underlying device reported a failure
    Device,
}

/// Byte-addressable persistent store
///
/// Reads and writes may be short when they run off the end of the device;
/// callers compare the returned count against what they asked for.
pub trait PersistentStore {
    /// Read bytes starting at `offset` into `buf`
    ///
    /// # Returns
    /// The number of bytes actually read.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<usize, StoreError>;

    /// Write `data` starting at `offset`
    ///
    /// # Returns
    /// The offset following the last byte written.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<usize, StoreError>;

    /// Total size of the store in bytes
    fn capacity(&self) -> usize;
}

/// RAM-backed store with EEPROM semantics
///
/// Erased cells read as `0xFF`. Used for host-side simulation and tests.
#[derive(Debug, Clone)]
pub struct RamStore<const N: usize> {
    cells: [u8; N],
}

impl<const N: usize> Default for RamStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RamStore<N> {
    /// Create an erased store
    pub fn new() -> Self {
        Self { cells: [0xFF; N] }
    }

    /// Raw view of the stored bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    /// Mutable raw view, for corrupting images in tests
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }
}

impl<const N: usize> PersistentStore for RamStore<N> {
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> Result<usize, StoreError> {
        if offset > N {
            return Err(StoreError::OutOfBounds);
        }
        let len = buf.len().min(N - offset);
        buf[..len].copy_from_slice(&self.cells[offset..offset + len]);
        Ok(len)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<usize, StoreError> {
        if offset > N {
            return Err(StoreError::OutOfBounds);
        }
        let len = data.len().min(N - offset);
        self.cells[offset..offset + len].copy_from_slice(&data[..len]);
        Ok(offset + len)
    }

    fn capacity(&self) -> usize {
        N
    }
}
