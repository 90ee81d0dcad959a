//! Greenhouse controller library.
//!
//! The sensor health and actuation control engine: per-device liveness
//! tracking with recovery and rediscovery, a pure threshold-and-hysteresis
//! decision policy, and a sequencer that owns all actuator output.
//! Hardware, clock, setpoints and event output are reached only through
//! the port traits in [`app::ports`].

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod health;
pub mod sensors;
pub mod time;

pub mod adapters;
