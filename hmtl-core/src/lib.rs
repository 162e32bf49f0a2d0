//! Board-agnostic core logic for HMTL bus modules
//!
//! This crate contains everything a module does with its configuration and
//! the bus that does not depend on specific hardware:
//!
//! - Output descriptor model and its fixed EEPROM layout
//! - Configuration header, load and save through a `PersistentStore`
//! - Frame dispatch: local value updates or relay on the bus master
//! - `Node`, the single polling context tying framer and dispatch together
//! - The `OutputDriver` trait for the actuation side
//! - A TOML-subset provisioning parser
//!
//! # Example
//!
//! ```
//! use hmtl_core::config::{parse_config, ConfigStore};
//! use hmtl_hal::RamStore;
//!
//! let prov = parse_config::<4>("[module]\naddress = 7\n[output.spot]\ntype = \"value\"\npin = 9\nvalue = 0\n").unwrap();
//! let mut eeprom = RamStore::<64>::new();
//! prov.into_store().unwrap().save(&mut eeprom).unwrap();
//!
//! let config = ConfigStore::<4>::load(&mut eeprom).unwrap();
//! assert_eq!(config.address(), 7);
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod node;
pub mod traits;

pub use config::{ConfigError, ConfigHeader, ConfigStore};
pub use descriptor::{Applied, DescriptorError, OutputDescriptor};
pub use dispatch::{handle, DispatchError, Dispatched};
pub use node::{Node, PollReport};
pub use traits::OutputDriver;
