//! Application wiring

pub mod startup;

pub use startup::{Services, StartupContext, prepare_startup};
