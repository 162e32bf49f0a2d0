//! HMTL Hardware Abstraction Layer
//!
//! This crate defines the narrow hardware interfaces the module core talks
//! through. Board support code implements them on top of the real EEPROM and
//! RS485 transceiver; host tests implement them in RAM.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  hmtl-core (config, dispatch, node)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  hmtl-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ EEPROM driver │       │ RS485 socket  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`eeprom::PersistentStore`] - Byte-addressable persistent storage
//! - [`bus::BusTx`], [`bus::BusRx`] - Shared serial bus transport

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod eeprom;

// Re-export key traits at crate root for convenience
pub use bus::{BusRx, BusTransport, BusTx};
pub use eeprom::{PersistentStore, RamStore, StoreError};
