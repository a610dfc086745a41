//! CLI command implementations
//!
//! This module re-exports all CLI command functions.

mod assign;
mod config_gen;
mod select;
mod stats;

pub use assign::*;
pub use config_gen::*;
pub use select::*;
pub use stats::*;
