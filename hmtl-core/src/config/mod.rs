//! Module configuration
//!
//! The persistent header, the descriptor table built on it, and the
//! provisioning text format used to produce both.

pub mod header;
pub mod store;
pub mod toml;

pub use header::{ConfigHeader, CONFIG_HEADER_LEN, CONFIG_MAGIC, CONFIG_VERSION, FLAG_MASTER};
pub use store::{save, ConfigError, ConfigStore, UpdateError, CONFIG_BASE_ADDR, MAX_OUTPUTS};
pub use toml::{parse_config, ParseError, Provisioning};
