//! Configuration persistence
//!
//! Loads and saves the module header and descriptor table through the
//! `PersistentStore` collaborator. The header sits at `CONFIG_BASE_ADDR`,
//! descriptors follow back to back, each sized by its tag.
//!
//! Writes are not atomic: a failure part way through leaves a partial image
//! behind. The next `load` reports whatever it finds.

use heapless::Vec;
use hmtl_hal::{PersistentStore, StoreError};

use super::header::{ConfigHeader, CONFIG_HEADER_LEN, CONFIG_MAGIC, CONFIG_VERSION};
use crate::descriptor::{self, DescriptorError, OutputDescriptor, DESCRIPTOR_HEADER_LEN, MAX_DESCRIPTOR_LEN};
use crate::traits::OutputDriver;

/// EEPROM offset of the configuration header
pub const CONFIG_BASE_ADDR: usize = 0;

/// Default descriptor table capacity
pub const MAX_OUTPUTS: usize = 16;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Header signature does not match; the module is unconfigured
    InvalidMagic,
    /// Header declares more outputs than the table can hold
    CapacityExceeded,
    /// Store failed or returned fewer bytes than requested
    ReadError,
    /// Store failed or accepted fewer bytes than given
    WriteError,
    /// Output index is not below `num_outputs`
    IndexOutOfRange,
    /// Stored descriptor has an unrecognized type tag
    UnknownType(u8),
}

/// Header plus ordered descriptor table
///
/// `header.num_outputs` always equals the number of descriptors held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore<const N: usize = MAX_OUTPUTS> {
    header: ConfigHeader,
    outputs: Vec<OutputDescriptor, N>,
}

impl<const N: usize> ConfigStore<N> {
    /// Build a table from provisioned parts
    ///
    /// `num_outputs` is taken from `outputs`, not from `header`.
    pub fn from_parts(
        mut header: ConfigHeader,
        outputs: &[OutputDescriptor],
    ) -> Result<Self, ConfigError> {
        if outputs.len() > N || outputs.len() > u8::MAX as usize {
            return Err(ConfigError::CapacityExceeded);
        }

        let mut table = Vec::new();
        table
            .extend_from_slice(outputs)
            .map_err(|_| ConfigError::CapacityExceeded)?;
        header.num_outputs = outputs.len() as u8;

        Ok(Self {
            header,
            outputs: table,
        })
    }

    /// Load the configuration from persistent storage
    ///
    /// Fails with `InvalidMagic` before touching any descriptor when the
    /// header signature is wrong. Callers treat that as "unconfigured".
    pub fn load<S>(store: &mut S) -> Result<Self, ConfigError>
    where
        S: PersistentStore + ?Sized,
    {
        let mut raw = [0u8; CONFIG_HEADER_LEN];
        let mut offset = read_exact(store, CONFIG_BASE_ADDR, &mut raw)?;
        let header = ConfigHeader::decode(&raw);

        if !header.is_valid() {
            warn!("config: invalid magic {:x}", header.magic);
            return Err(ConfigError::InvalidMagic);
        }

        if header.num_outputs as usize > N {
            error!(
                "config: {} outputs exceed table capacity {}",
                header.num_outputs,
                N
            );
            return Err(ConfigError::CapacityExceeded);
        }

        let mut outputs = Vec::new();
        for index in 0..header.num_outputs {
            let mut buf = [0u8; MAX_DESCRIPTOR_LEN];
            read_exact(store, offset, &mut buf[..DESCRIPTOR_HEADER_LEN])?;

            let len = descriptor::size_of(buf[0]).map_err(|_| {
                warn!("config: output {} has unknown type {}", index, buf[0]);
                ConfigError::UnknownType(buf[0])
            })?;
            offset = read_exact(store, offset + DESCRIPTOR_HEADER_LEN, &mut buf[DESCRIPTOR_HEADER_LEN..len])?;

            let (output, _) = OutputDescriptor::decode(&buf[..len]).map_err(|e| match e {
                DescriptorError::UnknownType(tag) => ConfigError::UnknownType(tag),
                _ => ConfigError::ReadError,
            })?;
            // Capacity was checked against the header above
            let _ = outputs.push(output);
        }

        info!(
            "config: loaded address={} outputs={} size={}",
            header.address,
            header.num_outputs,
            offset - CONFIG_BASE_ADDR
        );

        Ok(Self { header, outputs })
    }

    /// Write this configuration to persistent storage
    pub fn save<S>(&mut self, store: &mut S) -> Result<usize, ConfigError>
    where
        S: PersistentStore + ?Sized,
    {
        let end = save(store, &mut self.header, &self.outputs)?;
        Ok(end)
    }

    pub fn header(&self) -> &ConfigHeader {
        &self.header
    }

    /// This module's bus address
    pub fn address(&self) -> u16 {
        self.header.address
    }

    /// Whether this module relays frames for other addresses
    pub fn is_master(&self) -> bool {
        self.header.is_master()
    }

    pub fn num_outputs(&self) -> u8 {
        self.header.num_outputs
    }

    /// Descriptor at `index`
    pub fn descriptor_at(&self, index: usize) -> Result<&OutputDescriptor, ConfigError> {
        if index >= self.header.num_outputs as usize {
            return Err(ConfigError::IndexOutOfRange);
        }
        self.outputs.get(index).ok_or(ConfigError::IndexOutOfRange)
    }

    /// Mutable descriptor at `index`, for value updates
    pub fn descriptor_at_mut(&mut self, index: usize) -> Result<&mut OutputDescriptor, ConfigError> {
        if index >= self.header.num_outputs as usize {
            return Err(ConfigError::IndexOutOfRange);
        }
        self.outputs.get_mut(index).ok_or(ConfigError::IndexOutOfRange)
    }

    /// All descriptors in index order
    pub fn outputs(&self) -> &[OutputDescriptor] {
        &self.outputs
    }

    /// Initialize every output's hardware
    pub fn setup_outputs<D: OutputDriver>(&self, driver: &mut D) -> Result<(), D::Error> {
        for (index, output) in self.outputs.iter().enumerate() {
            driver.setup(index as u8, output)?;
        }
        Ok(())
    }

    /// Push the current state of every output to the hardware
    pub fn update_outputs<D: OutputDriver>(&self, driver: &mut D) -> Result<(), D::Error> {
        for (index, output) in self.outputs.iter().enumerate() {
            driver.apply(index as u8, output)?;
        }
        Ok(())
    }

    /// Push the current state of one output to the hardware
    pub fn update_output<D: OutputDriver>(
        &self,
        index: usize,
        driver: &mut D,
    ) -> Result<(), UpdateError<D::Error>> {
        let output = self.descriptor_at(index).map_err(UpdateError::Config)?;
        driver
            .apply(index as u8, output)
            .map_err(UpdateError::Driver)
    }

    /// Log the header and every descriptor
    pub fn log_summary(&self) {
        info!(
            "config: magic={:x} version={} address={} outputs={} flags={:x}",
            self.header.magic,
            self.header.version,
            self.header.address,
            self.header.num_outputs,
            self.header.flags
        );
        for (index, output) in self.outputs.iter().enumerate() {
            debug!("  output {}: {:?}", index, output);
        }
    }
}

/// Failure pushing one output to hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateError<E> {
    Config(ConfigError),
    Driver(E),
}

/// Write a complete configuration image
///
/// Stamps `header` with the magic, layout version and output count before
/// writing it, then writes each descriptor right after the previous one.
/// Returns the offset following the image.
pub fn save<S>(
    store: &mut S,
    header: &mut ConfigHeader,
    outputs: &[OutputDescriptor],
) -> Result<usize, ConfigError>
where
    S: PersistentStore + ?Sized,
{
    if outputs.len() > u8::MAX as usize {
        return Err(ConfigError::CapacityExceeded);
    }

    header.magic = CONFIG_MAGIC;
    header.version = CONFIG_VERSION;
    header.num_outputs = outputs.len() as u8;

    let mut offset = write_all(store, CONFIG_BASE_ADDR, &header.encode())?;
    for (index, output) in outputs.iter().enumerate() {
        let mut buf = [0u8; MAX_DESCRIPTOR_LEN];
        let len = output
            .encode(index as u8, &mut buf)
            .map_err(|_| ConfigError::WriteError)?;
        offset = write_all(store, offset, &buf[..len])?;
    }

    info!(
        "config: wrote {} outputs, size={} end={}",
        outputs.len(),
        offset - CONFIG_BASE_ADDR,
        offset
    );

    Ok(offset)
}

/// Read exactly `buf.len()` bytes, returning the following offset
fn read_exact<S>(store: &mut S, offset: usize, buf: &mut [u8]) -> Result<usize, ConfigError>
where
    S: PersistentStore + ?Sized,
{
    let n = store.read(offset, buf).map_err(|e: StoreError| {
        warn!("config: read at {} failed: {:?}", offset, e);
        ConfigError::ReadError
    })?;
    if n != buf.len() {
        warn!("config: short read at {} ({} of {})", offset, n, buf.len());
        return Err(ConfigError::ReadError);
    }
    Ok(offset + n)
}

/// Write all of `data`, returning the following offset
fn write_all<S>(store: &mut S, offset: usize, data: &[u8]) -> Result<usize, ConfigError>
where
    S: PersistentStore + ?Sized,
{
    let end = store.write(offset, data).map_err(|e: StoreError| {
        warn!("config: write at {} failed: {:?}", offset, e);
        ConfigError::WriteError
    })?;
    if end != offset + data.len() {
        warn!("config: partial write at {}", offset);
        return Err(ConfigError::WriteError);
    }
    Ok(end)
}
