//! Inbound commands to the control loop.
//!
//! These represent actions requested by the outside world (web API,
//! buttons, serial console) that the
//! [`ControlLoop`](super::service::ControlLoop) interprets and acts upon.

use crate::control::ActuatorCommand;
use crate::sensors::validate::CalibrationPoint;

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand {
    /// Drive one actuator directly, outside the policy.
    ///
    /// With automation enabled the next cycle may override it.
    Manual(ActuatorCommand),

    /// Store the current raw soil reading as a calibration point.
    CalibrateSoil(CalibrationPoint),

    /// Switch every relay off immediately.
    StopAll,
}
