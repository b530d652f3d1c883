//! SignCam firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod actuation;
pub mod app;
pub mod config;
pub mod decision;
pub mod diagnostics;
pub mod error;
pub mod fsm;
pub mod inference;
pub mod link;
pub mod pins;
pub mod report;

// Hardware-facing modules; each falls back to a host simulation
// when not built for ESP-IDF.
pub mod adapters;
pub mod drivers;
