//! reaccess - reciprocity ranking and slot selection
//!
//! Affiliated sites exchange traffic. Every visit a site sends us is an IN,
//! every visit we send to it is an OUT, both counted per day. A site's
//! return need is `max(0, IN - OUT)` over a trailing window, and that number
//! drives which sites appear first in the link and RSS slots we render.
//!
//! # Features
//! - **cli**: Command-line interface (default)
//!
//! # Architecture
//! - `storage`: Counter, site registry and slot config stores (SeaORM or in-memory)
//! - `cache`: Aggregate caches for computed priorities (moka, Redis, null)
//! - `services`: Reciprocity aggregation, slot selection, exclusivity, ranking
//! - `interfaces`: Command-line front end
//! - `config`: Static configuration (TOML + `RA__*` environment)
//! - `runtime`: Service wiring
//! - `system`: Logging

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
