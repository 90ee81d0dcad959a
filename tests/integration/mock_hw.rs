//! Mock hardware adapters for integration tests.
//!
//! Records every actuator call and every sensor read so tests can assert
//! on the full history without touching real buses.

use std::cell::Cell;

use greenhouse::app::events::AppEvent;
use greenhouse::app::ports::{ActuatorBus, Clock, EventSink, SensorBus, SetpointsProvider};
use greenhouse::config::Setpoints;
use greenhouse::control::ActuatorId;
use greenhouse::error::{ActuatorError, ConfigError, SensorError};
use greenhouse::sensors::DeviceId;
use greenhouse::sensors::validate::{EnvironmentalReading, RawAdc};
use greenhouse::time::Timestamp;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    SetDigital { id: ActuatorId, on: bool },
    SetAngle { id: ActuatorId, degrees: u8 },
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

/// Scripted sensor values plus a recording actuator bus.
pub struct MockHardware {
    pub env: Result<EnvironmentalReading, SensorError>,
    pub lux: Result<f32, SensorError>,
    pub soil_moisture: Result<RawAdc, SensorError>,
    pub soil_temperature: Result<RawAdc, SensorError>,
    /// Indexed by `DeviceId as usize`.
    pub reinit_ok: [bool; DeviceId::COUNT],
    pub reads: [u32; DeviceId::COUNT],
    pub reinits: [u32; DeviceId::COUNT],

    pub calls: Vec<ActuatorCall>,
    /// Writes to this actuator fail.
    pub broken: Option<ActuatorId>,
}

#[allow(dead_code)]
impl MockHardware {
    /// Every device present, readings inside every band at default setpoints.
    pub fn new() -> Self {
        Self {
            env: Ok(EnvironmentalReading {
                temperature_c: 25.0,
                humidity_pct: 60.0,
                pressure_hpa: 1010.0,
            }),
            lux: Ok(10_000.0),
            soil_moisture: Ok(2000), // 50 %
            soil_temperature: Ok(444),
            reinit_ok: [true; DeviceId::COUNT],
            reads: [0; DeviceId::COUNT],
            reinits: [0; DeviceId::COUNT],
            calls: Vec::new(),
            broken: None,
        }
    }

    pub fn set_temperature(&mut self, t: f32) {
        if let Ok(env) = self.env.as_mut() {
            env.temperature_c = t;
        }
    }

    pub fn set_humidity(&mut self, h: f32) {
        if let Ok(env) = self.env.as_mut() {
            env.humidity_pct = h;
        }
    }

    /// Last digital level written to `id`, or `None` if never written.
    pub fn relay(&self, id: ActuatorId) -> Option<bool> {
        self.calls.iter().rev().find_map(|c| match *c {
            ActuatorCall::SetDigital { id: i, on } if i == id => Some(on),
            ActuatorCall::AllOff => Some(false),
            _ => None,
        })
    }

    pub fn writes_to(&self, id: ActuatorId) -> usize {
        self.calls
            .iter()
            .filter(|c| match c {
                ActuatorCall::SetDigital { id: i, .. } | ActuatorCall::SetAngle { id: i, .. } => {
                    *i == id
                }
                ActuatorCall::AllOff => false,
            })
            .count()
    }

    pub fn reads_of(&self, device: DeviceId) -> u32 {
        self.reads[device as usize]
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBus for MockHardware {
    fn read_environmental(&mut self) -> Result<EnvironmentalReading, SensorError> {
        self.reads[DeviceId::Environmental as usize] += 1;
        self.env
    }

    fn read_illuminance(&mut self) -> Result<f32, SensorError> {
        self.reads[DeviceId::Light as usize] += 1;
        self.lux
    }

    fn read_soil_moisture(&mut self) -> Result<RawAdc, SensorError> {
        self.reads[DeviceId::Soil as usize] += 1;
        self.soil_moisture
    }

    fn read_soil_temperature(&mut self) -> Result<RawAdc, SensorError> {
        self.soil_temperature
    }

    fn reinit(&mut self, device: DeviceId) -> bool {
        self.reinits[device as usize] += 1;
        self.reinit_ok[device as usize]
    }
}

impl ActuatorBus for MockHardware {
    fn set_digital(&mut self, id: ActuatorId, on: bool) -> Result<(), ActuatorError> {
        if self.broken == Some(id) {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.calls.push(ActuatorCall::SetDigital { id, on });
        Ok(())
    }

    fn set_angle(&mut self, id: ActuatorId, degrees: u8) -> Result<(), ActuatorError> {
        if self.broken == Some(id) {
            return Err(ActuatorError::PwmWriteFailed);
        }
        self.calls.push(ActuatorCall::SetAngle { id, degrees });
        Ok(())
    }

    fn all_off(&mut self) -> Result<(), ActuatorError> {
        if self.broken.is_some_and(|id| id.is_digital()) {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.calls.push(ActuatorCall::AllOff);
        Ok(())
    }
}

// ── ManualClock ───────────────────────────────────────────────

/// Clock the test advances by hand.
pub struct ManualClock {
    now: Cell<u64>,
    hour: Cell<Option<u8>>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            hour: Cell::new(None),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn now_ms(&self) -> u64 {
        self.now.get()
    }

    pub fn set_hour(&self, hour: Option<u8>) {
        self.hour.set(hour);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.now.get())
    }

    fn hour_of_day(&self) -> Option<u8> {
        self.hour.get()
    }
}

// ── Setpoints ─────────────────────────────────────────────────

/// Provider whose store is unreachable.
pub struct UnavailableSetpoints;

impl SetpointsProvider for UnavailableSetpoints {
    fn snapshot(&self) -> Result<Setpoints, ConfigError> {
        Err(ConfigError::Unavailable)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
