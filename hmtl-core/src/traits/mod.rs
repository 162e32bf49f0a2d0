//! Hardware abstraction traits
//!
//! These traits define the interface between the module logic and the
//! board-specific output hardware.

pub mod output;

pub use output::OutputDriver;
