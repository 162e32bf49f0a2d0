//! Simple TOML parser for module provisioning
//!
//! This is a minimal TOML parser that handles only the subset needed to
//! describe one module. It does NOT support the full TOML spec.
//!
//! Supported features:
//! - Key = value pairs (string, integer, boolean, `0x` hex integers)
//! - Flat integer arrays: pins = [3, 5, 6]
//! - [module] and [output.name] section headers
//! - Comments (# ...)
//!
//! Outputs are numbered in the order their sections appear.
//!
//! ```toml
//! [module]
//! address = 42
//! master = true
//!
//! [output.spot]
//! type = "value"
//! pin = 9
//! value = 0
//!
//! [output.sign]
//! type = "rgb"
//! pins = [3, 5, 6]
//! values = [0, 0, 0]
//! ```

use heapless::{String as HString, Vec};

use super::header::ConfigHeader;
use super::store::{ConfigError, ConfigStore, MAX_OUTPUTS};
use crate::descriptor::{
    BusTransportOutput, OutputDescriptor, PixelStripOutput, ProgramOutput, RgbOutput,
    SensorArrayOutput, ValueOutput, MAX_MPR121_PINS,
};
use hmtl_protocol::{OutputType, MAX_PROGRAM_VAL};

/// Maximum output name length
pub const MAX_NAME_LEN: usize = 16;

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid section header
    InvalidSection,
    /// Invalid value type
    InvalidValue,
    /// Too many items (exceeded heapless capacity)
    TooManyItems,
    /// `type` names no known output type
    UnknownType,
    /// A field the output type needs was not given
    MissingField(&'static str),
}

/// Parsed module description, ready to be saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioning<const N: usize = MAX_OUTPUTS> {
    pub header: ConfigHeader,
    pub outputs: Vec<OutputDescriptor, N>,
    /// Section name of each output, by index
    pub names: Vec<HString<MAX_NAME_LEN>, N>,
}

impl<const N: usize> Provisioning<N> {
    /// Index of the output declared as `[output.<name>]`
    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.names
            .iter()
            .position(|n| n.as_str() == name)
            .map(|i| i as u8)
    }

    pub fn into_store(self) -> Result<ConfigStore<N>, ConfigError> {
        ConfigStore::from_parts(self.header, &self.outputs)
    }
}

/// Current parsing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Root,
    Module,
    Output,
}

/// Fields collected for the output section being parsed
#[derive(Debug, Default)]
struct PendingOutput {
    kind: Option<OutputType>,
    pin: Option<u8>,
    value: Option<u8>,
    pins: Option<Vec<u8, 3>>,
    values: Option<Vec<u8, MAX_PROGRAM_VAL>>,
    num_pixels: Option<u16>,
    data_pin: Option<u8>,
    clock_pin: Option<u8>,
    strip_type: Option<u8>,
    irq_pin: Option<u8>,
    use_interrupt: Option<bool>,
    touch: Option<Vec<u8, MAX_MPR121_PINS>>,
    release: Option<Vec<u8, MAX_MPR121_PINS>>,
    recv_pin: Option<u8>,
    xmit_pin: Option<u8>,
    enable_pin: Option<u8>,
}

/// Parse TOML provisioning text into a module description
pub fn parse_config<const N: usize>(input: &str) -> Result<Provisioning<N>, ParseError> {
    let mut header = ConfigHeader::new(0);
    let mut have_address = false;
    let mut outputs: Vec<OutputDescriptor, N> = Vec::new();
    let mut names: Vec<HString<MAX_NAME_LEN>, N> = Vec::new();

    let mut section = Section::Root;
    let mut current: Option<PendingOutput> = None;

    for line in input.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Check for section header
        if line.starts_with('[') && line.ends_with(']') {
            // Save previous output
            if let Some(pending) = current.take() {
                outputs
                    .push(pending.finish()?)
                    .map_err(|_| ParseError::TooManyItems)?;
            }

            let (new_section, name) = parse_section_header(&line[1..line.len() - 1])?;
            if let Some(name) = name {
                if names.iter().any(|n| n.as_str() == name.as_str()) {
                    return Err(ParseError::InvalidSection);
                }
                names.push(name).map_err(|_| ParseError::TooManyItems)?;
                current = Some(PendingOutput::default());
            }
            section = new_section;
            continue;
        }

        // Parse key = value
        let Some((key, value)) = parse_key_value(line) else {
            continue;
        };

        match section {
            Section::Module => match key {
                "address" => {
                    header.address = parse_int(value)?;
                    have_address = true;
                }
                "flags" => header.flags = parse_int(value)?,
                "master" => header.set_master(parse_bool(value)?),
                _ => debug!("provision: ignoring module key"),
            },
            Section::Output => {
                if let Some(pending) = current.as_mut() {
                    pending.apply(key, value)?;
                }
            }
            Section::Root => debug!("provision: ignoring key outside a section"),
        }
    }

    // Save final output
    if let Some(pending) = current.take() {
        outputs
            .push(pending.finish()?)
            .map_err(|_| ParseError::TooManyItems)?;
    }

    if !have_address {
        return Err(ParseError::MissingField("address"));
    }
    if outputs.len() > u8::MAX as usize {
        return Err(ParseError::TooManyItems);
    }
    header.num_outputs = outputs.len() as u8;

    Ok(Provisioning {
        header,
        outputs,
        names,
    })
}

/// Parse section header like "module" or "output.spot"
fn parse_section_header(header: &str) -> Result<(Section, Option<HString<MAX_NAME_LEN>>), ParseError> {
    let header = header.trim();

    match header.split_once('.') {
        Some(("output", name)) => {
            let name = name.trim();
            if name.is_empty() || name.contains('.') {
                return Err(ParseError::InvalidSection);
            }
            let name = HString::try_from(name).map_err(|_| ParseError::InvalidSection)?;
            Ok((Section::Output, Some(name)))
        }
        Some(_) => Err(ParseError::InvalidSection),
        None if header == "module" => Ok((Section::Module, None)),
        None => Err(ParseError::InvalidSection),
    }
}

/// Parse "key = value" line
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let eq_pos = line.find('=')?;
    let key = line[..eq_pos].trim();
    let value = line[eq_pos + 1..].trim();

    // Remove inline comments
    let value = if let Some(hash_pos) = value.find('#') {
        // Make sure # is not inside a string
        let quote_count = value[..hash_pos].matches('"').count();
        if quote_count % 2 == 0 {
            value[..hash_pos].trim()
        } else {
            value
        }
    } else {
        value
    };

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

/// Parse a string value (removes quotes)
fn parse_string(value: &str) -> &str {
    if value.starts_with('"') && value.ends_with('"') && value.len() >= 2 {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

/// Parse a decimal or `0x` hex integer that must fit `T`
fn parse_int<T: TryFrom<u32>>(value: &str) -> Result<T, ParseError> {
    let raw = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    }
    .map_err(|_| ParseError::InvalidValue)?;

    T::try_from(raw).map_err(|_| ParseError::InvalidValue)
}

/// Parse a boolean value
fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

/// Parse a flat byte array like "[3, 5, 6]"
fn parse_bytes<const CAP: usize>(value: &str) -> Result<Vec<u8, CAP>, ParseError> {
    let inner = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .ok_or(ParseError::InvalidValue)?;

    let mut out = Vec::new();
    for item in inner.split(',') {
        let item = item.trim();
        // Trailing comma
        if item.is_empty() {
            continue;
        }
        out.push(parse_int(item)?)
            .map_err(|_| ParseError::TooManyItems)?;
    }
    Ok(out)
}

impl PendingOutput {
    fn apply(&mut self, key: &str, value: &str) -> Result<(), ParseError> {
        match key {
            "type" => {
                let kind = OutputType::from_name(parse_string(value)).ok_or(ParseError::UnknownType)?;
                self.kind = Some(kind);
            }
            "pin" => self.pin = Some(parse_int(value)?),
            "value" => self.value = Some(parse_int(value)?),
            "pins" => self.pins = Some(parse_bytes(value)?),
            "values" => self.values = Some(parse_bytes(value)?),
            "num_pixels" => self.num_pixels = Some(parse_int(value)?),
            "data_pin" => self.data_pin = Some(parse_int(value)?),
            "clock_pin" => self.clock_pin = Some(parse_int(value)?),
            "strip_type" => self.strip_type = Some(parse_int(value)?),
            "irq_pin" => self.irq_pin = Some(parse_int(value)?),
            "use_interrupt" => self.use_interrupt = Some(parse_bool(value)?),
            "touch" => self.touch = Some(parse_bytes(value)?),
            "release" => self.release = Some(parse_bytes(value)?),
            "recv_pin" => self.recv_pin = Some(parse_int(value)?),
            "xmit_pin" => self.xmit_pin = Some(parse_int(value)?),
            "enable_pin" => self.enable_pin = Some(parse_int(value)?),
            _ => debug!("provision: ignoring output key"),
        }
        Ok(())
    }

    /// Check required fields and build the descriptor
    fn finish(self) -> Result<OutputDescriptor, ParseError> {
        let kind = self.kind.ok_or(ParseError::MissingField("type"))?;

        let descriptor = match kind {
            OutputType::Value => OutputDescriptor::Value(ValueOutput {
                pin: required(self.pin, "pin")?,
                value: required(self.value, "value")?,
            }),
            OutputType::Rgb => OutputDescriptor::Rgb(RgbOutput {
                pins: exactly3(required(self.pins, "pins")?.as_slice())?,
                values: exactly3(required(self.values, "values")?.as_slice())?,
            }),
            OutputType::Program => {
                let mut values = [0u8; MAX_PROGRAM_VAL];
                if let Some(given) = self.values {
                    values[..given.len()].copy_from_slice(&given);
                }
                OutputDescriptor::Program(ProgramOutput { values })
            }
            OutputType::Pixels => OutputDescriptor::PixelStrip(PixelStripOutput {
                num_pixels: required(self.num_pixels, "num_pixels")?,
                data_pin: required(self.data_pin, "data_pin")?,
                clock_pin: required(self.clock_pin, "clock_pin")?,
                strip_type: required(self.strip_type, "strip_type")?,
            }),
            OutputType::Mpr121 => {
                let mut sensor = SensorArrayOutput {
                    irq_pin: required(self.irq_pin, "irq_pin")?,
                    use_interrupt: self.use_interrupt.unwrap_or(false),
                    ..Default::default()
                };
                let touch = self.touch.unwrap_or_default();
                let release = self.release.unwrap_or_default();
                if touch.len() != release.len() {
                    return Err(ParseError::InvalidValue);
                }
                for (channel, (&t, &r)) in touch.iter().zip(release.iter()).enumerate() {
                    if t > 0x0F || r > 0x0F {
                        return Err(ParseError::InvalidValue);
                    }
                    sensor.set_threshold(channel, t, r);
                }
                OutputDescriptor::CapacitiveSensorArray(sensor)
            }
            OutputType::Rs485 => OutputDescriptor::BusTransportConfig(BusTransportOutput {
                recv_pin: required(self.recv_pin, "recv_pin")?,
                xmit_pin: required(self.xmit_pin, "xmit_pin")?,
                enable_pin: required(self.enable_pin, "enable_pin")?,
            }),
        };

        Ok(descriptor)
    }
}

fn required<T>(field: Option<T>, name: &'static str) -> Result<T, ParseError> {
    field.ok_or(ParseError::MissingField(name))
}

fn exactly3(values: &[u8]) -> Result<[u8; 3], ParseError> {
    values.try_into().map_err(|_| ParseError::InvalidValue)
}
