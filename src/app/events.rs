//! Outbound application events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) emits these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them: log to serial, refresh a display, serve
//! them from a status endpoint.

use serde::Serialize;

use crate::control::ActuatorId;
use crate::control::sequencer::Output;
use crate::error::ActuatorError;
use crate::health::HealthStatus;
use crate::sensors::{DeviceId, SensorSnapshot};

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The loop has started; carries the number of devices discovered.
    Started { devices_present: u8 },

    /// A sensor device changed health status.
    HealthChanged {
        device: DeviceId,
        from: HealthStatus,
        to: HealthStatus,
    },

    /// An actuator's physical output changed.
    ActuatorChanged { actuator: ActuatorId, output: Output },

    /// An actuator write failed; it will be retried.
    ActuatorFault {
        actuator: ActuatorId,
        error: ActuatorError,
    },

    /// A rediscovery pass ran; carries the number of devices that came back.
    Rediscovery { recovered: u8 },

    /// The setpoints provider could not deliver a snapshot; no decisions
    /// were taken this cycle.
    SetpointsUnavailable,

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// Every relay has been switched off and the loop is stopping.
    Stopped,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    pub tick: u64,
    pub sensors: SensorSnapshot,
    pub system_healthy: bool,
    pub pump: Output,
    pub fan: Output,
    pub heater: Output,
    pub light: Output,
    pub door: Output,
}
