//! Application core: session orchestration with no direct I/O.
//!
//! The service drives the session state machine, the inference session,
//! the decision policy and the actuation sequencer.  Hardware and the
//! serial link are reached only through the **port traits** in [`ports`],
//! so the whole loop runs on the host against mock adapters.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
