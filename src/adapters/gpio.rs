//! GPIO actuator adapter.
//!
//! Implements [`ActuatorBus`] over `embedded-hal` 1.0 traits: one
//! [`OutputPin`] per relay and a [`SetDutyCycle`] channel running the
//! door servo at 50 Hz. Any HAL that provides those traits can drive the
//! greenhouse outputs.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, warn};

use crate::app::ports::ActuatorBus;
use crate::control::ActuatorId;
use crate::control::sequencer::MAX_ANGLE;
use crate::error::ActuatorError;

/// Servo frame length at 50 Hz (µs).
const SERVO_PERIOD_US: u16 = 20_000;
/// Pulse width at 0° (µs).
const SERVO_MIN_PULSE_US: u16 = 1_000;
/// Pulse width at 180° (µs).
const SERVO_MAX_PULSE_US: u16 = 2_000;

/// Relay pins are active-high.
pub struct GpioActuatorBus<P, S> {
    pump: P,
    fan: P,
    heater: P,
    light: P,
    door: S,
}

impl<P, S> GpioActuatorBus<P, S>
where
    P: OutputPin,
    S: SetDutyCycle,
{
    pub fn new(pump: P, fan: P, heater: P, light: P, door: S) -> Self {
        Self {
            pump,
            fan,
            heater,
            light,
            door,
        }
    }

    fn relay(&mut self, id: ActuatorId) -> Option<&mut P> {
        match id {
            ActuatorId::Pump => Some(&mut self.pump),
            ActuatorId::Fan => Some(&mut self.fan),
            ActuatorId::Heater => Some(&mut self.heater),
            ActuatorId::Light => Some(&mut self.light),
            ActuatorId::Door => None,
        }
    }
}

impl<P, S> ActuatorBus for GpioActuatorBus<P, S>
where
    P: OutputPin,
    S: SetDutyCycle,
{
    fn set_digital(&mut self, actuator: ActuatorId, on: bool) -> Result<(), ActuatorError> {
        let pin = self.relay(actuator).ok_or(ActuatorError::Unsupported)?;
        let result = if on { pin.set_high() } else { pin.set_low() };
        result.map_err(|e| {
            warn!("{} relay write failed: {:?}", actuator, e);
            ActuatorError::GpioWriteFailed
        })?;
        debug!("{} relay {}", actuator, if on { "ON" } else { "OFF" });
        Ok(())
    }

    fn set_angle(&mut self, actuator: ActuatorId, degrees: u8) -> Result<(), ActuatorError> {
        if actuator != ActuatorId::Door {
            return Err(ActuatorError::Unsupported);
        }
        let pulse = servo_pulse_us(degrees);
        self.door
            .set_duty_cycle_fraction(pulse, SERVO_PERIOD_US)
            .map_err(|e| {
                warn!("servo write failed: {:?}", e);
                ActuatorError::PwmWriteFailed
            })?;
        debug!("door servo {}° ({} µs)", degrees, pulse);
        Ok(())
    }
}

/// Pulse width for an angle, linear between the end stops.
fn servo_pulse_us(degrees: u8) -> u16 {
    let deg = degrees.min(MAX_ANGLE) as u32;
    let span = (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) as u32;
    SERVO_MIN_PULSE_US + (deg * span / MAX_ANGLE as u32) as u16
}
