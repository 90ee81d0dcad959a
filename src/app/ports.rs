//! Port traits: the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (sensor bus, actuator bus, clock, setpoint store, event
//! sinks) implement these traits. The [`ControlLoop`](super::service::ControlLoop)
//! consumes them via generics, so the core never touches hardware or a
//! global clock directly.
//!
//! All calls are blocking and synchronous. A slow bus transaction stalls
//! the whole cycle, which is fine at a cadence of seconds.

use crate::config::Setpoints;
use crate::control::ActuatorId;
use crate::error::{ActuatorError, ConfigError, SensorError};
use crate::sensors::DeviceId;
use crate::sensors::validate::{EnvironmentalReading, RawAdc};
use crate::time::{ClockSample, Timestamp};

// ───────────────────────────────────────────────────────────────
// Sensor bus (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Typed read access to every sensor device.
///
/// Implementations return the raw driver value; range validation happens
/// in the core so that out-of-range data is counted against device health.
pub trait SensorBus {
    /// Air temperature (°C), relative humidity (%) and pressure (hPa).
    fn read_environmental(&mut self) -> Result<EnvironmentalReading, SensorError>;

    /// Illuminance (lux).
    fn read_illuminance(&mut self) -> Result<f32, SensorError>;

    /// Raw soil moisture ADC sample.
    fn read_soil_moisture(&mut self) -> Result<RawAdc, SensorError>;

    /// Raw soil temperature ADC sample.
    fn read_soil_temperature(&mut self) -> Result<RawAdc, SensorError>;

    /// Re-initialise (or probe) a device. `true` if it answered.
    fn reinit(&mut self, device: DeviceId) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator bus (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for relays and the door/window servo.
///
/// Writes are idempotent; the core retries a failed write on a later cycle.
pub trait ActuatorBus {
    /// Drive a relay output.
    fn set_digital(&mut self, actuator: ActuatorId, on: bool) -> Result<(), ActuatorError>;

    /// Drive a servo to `degrees` (already clamped to 0–180 by the core).
    fn set_angle(&mut self, actuator: ActuatorId, degrees: u8) -> Result<(), ActuatorError>;

    /// Switch every relay off for a safe shutdown.
    ///
    /// Attempts every relay even if one fails and reports the first error.
    fn all_off(&mut self) -> Result<(), ActuatorError> {
        let mut first_err = None;
        for id in ActuatorId::ALL.into_iter().filter(|id| id.is_digital()) {
            if let Err(e) = self.set_digital(id, false) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Injected time source. Never read globally.
pub trait Clock {
    /// Monotonic milliseconds.
    fn now(&self) -> Timestamp;

    /// Local hour of day (0–23), or `None` before wall-clock sync.
    fn hour_of_day(&self) -> Option<u8>;

    /// Both values, captured together for one control cycle.
    fn sample(&self) -> ClockSample {
        ClockSample {
            now: self.now(),
            hour: self.hour_of_day(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Setpoints provider
// ───────────────────────────────────────────────────────────────

/// Read-only access to the current user setpoints.
///
/// Implementations MUST validate updates (see
/// [`Setpoints::validate`]) before making them visible; the core treats
/// every snapshot as already valid.
pub trait SetpointsProvider {
    fn snapshot(&self) -> Result<Setpoints, ConfigError>;
}

/// A fixed snapshot, assumed valid.
impl SetpointsProvider for Setpoints {
    fn snapshot(&self) -> Result<Setpoints, ConfigError> {
        Ok(self.clone())
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log, display,
/// HTTP status endpoint, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
