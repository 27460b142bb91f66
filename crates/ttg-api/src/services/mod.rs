//! Business logic services.

pub mod hardware;

pub use hardware::HardwareProbe;
