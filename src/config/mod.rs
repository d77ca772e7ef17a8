// src/config/mod.rs
pub mod feeder;

pub use feeder::{AilSection, ConfigError, FeederConfig};
