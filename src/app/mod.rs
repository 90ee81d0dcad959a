//! Application core: orchestration, zero direct I/O.
//!
//! The [`service::ControlLoop`] ties the sensor aggregator, decision policy
//! and actuation sequencer together. All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
