//! Simulated greenhouse.
//!
//! Implements both [`SensorBus`] and [`ActuatorBus`] over a crude thermal
//! and moisture model, so the binary runs on a host without hardware.
//! Devices can be unplugged to exercise health tracking and rediscovery.

use log::{debug, info};

use crate::app::ports::{ActuatorBus, SensorBus};
use crate::control::ActuatorId;
use crate::error::{ActuatorError, SensorError};
use crate::sensors::DeviceId;
use crate::sensors::validate::{EnvironmentalReading, RawAdc, SOIL_ADC_MAX, SoilCalibration};

const OUTSIDE_TEMP_C: f32 = 16.0;
const OUTSIDE_HUMIDITY_PCT: f32 = 55.0;
const DAYLIGHT_LUX: f32 = 18_000.0;
const GROW_LIGHT_LUX: f32 = 6_000.0;

pub struct SimulatedGreenhouse {
    temperature_c: f32,
    humidity_pct: f32,
    pressure_hpa: f32,
    soil_moisture_pct: f32,
    soil_temperature_c: f32,
    /// Indexed by `ActuatorId as usize`; the door slot stays false.
    relays: [bool; ActuatorId::COUNT],
    door_angle: u8,
    /// Indexed by `DeviceId as usize`.
    connected: [bool; DeviceId::COUNT],
}

impl Default for SimulatedGreenhouse {
    fn default() -> Self {
        Self {
            temperature_c: 21.0,
            humidity_pct: 62.0,
            pressure_hpa: 1013.0,
            soil_moisture_pct: 48.0,
            soil_temperature_c: 18.0,
            relays: [false; ActuatorId::COUNT],
            door_angle: 0,
            connected: [true; DeviceId::COUNT],
        }
    }
}

impl SimulatedGreenhouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the model by `dt_ms`.
    pub fn step(&mut self, dt_ms: u64) {
        let dt = dt_ms as f32 / 1_000.0;
        let opening = self.door_angle as f32 / 180.0;

        // Leak toward outside air, faster with the door open or the fan on.
        let fan = if self.relay(ActuatorId::Fan) { 1.0 } else { 0.0 };
        let exchange = (0.002 + 0.01 * opening + 0.006 * fan) * dt;
        self.temperature_c += (OUTSIDE_TEMP_C - self.temperature_c) * exchange.min(1.0);
        self.humidity_pct += (OUTSIDE_HUMIDITY_PCT - self.humidity_pct) * exchange.min(1.0);

        if self.relay(ActuatorId::Heater) {
            self.temperature_c += 0.05 * dt;
        }
        if self.relay(ActuatorId::Light) {
            self.temperature_c += 0.005 * dt;
        }

        // Plants transpire, soil dries.
        self.humidity_pct += 0.01 * dt;
        self.soil_moisture_pct -= 0.002 * dt;
        if self.relay(ActuatorId::Pump) {
            self.soil_moisture_pct += 0.8 * dt;
        }
        self.soil_temperature_c += (self.temperature_c - self.soil_temperature_c) * 0.0005 * dt;

        self.humidity_pct = self.humidity_pct.clamp(0.0, 100.0);
        self.soil_moisture_pct = self.soil_moisture_pct.clamp(0.0, 100.0);
    }

    /// Unplug or replug a sensor device.
    pub fn set_connected(&mut self, device: DeviceId, connected: bool) {
        info!("sim: {} {}", device, if connected { "plugged in" } else { "unplugged" });
        self.connected[device as usize] = connected;
    }

    pub fn relay(&self, id: ActuatorId) -> bool {
        self.relays[id as usize]
    }

    pub fn door_angle(&self) -> u8 {
        self.door_angle
    }

    pub fn temperature_c(&self) -> f32 {
        self.temperature_c
    }

    pub fn soil_moisture_pct(&self) -> f32 {
        self.soil_moisture_pct
    }

    fn require(&self, device: DeviceId) -> Result<(), SensorError> {
        if self.connected[device as usize] {
            Ok(())
        } else {
            Err(SensorError::Transport)
        }
    }
}

impl SensorBus for SimulatedGreenhouse {
    fn read_environmental(&mut self) -> Result<EnvironmentalReading, SensorError> {
        self.require(DeviceId::Environmental)?;
        Ok(EnvironmentalReading {
            temperature_c: self.temperature_c,
            humidity_pct: self.humidity_pct,
            pressure_hpa: self.pressure_hpa,
        })
    }

    fn read_illuminance(&mut self) -> Result<f32, SensorError> {
        self.require(DeviceId::Light)?;
        let grow = if self.relay(ActuatorId::Light) { GROW_LIGHT_LUX } else { 0.0 };
        Ok(DAYLIGHT_LUX + grow)
    }

    fn read_soil_moisture(&mut self) -> Result<RawAdc, SensorError> {
        self.require(DeviceId::Soil)?;
        let cal = SoilCalibration::default();
        let air = cal.air_raw() as f32;
        let water = cal.water_raw() as f32;
        Ok((air + (water - air) * self.soil_moisture_pct / 100.0) as RawAdc)
    }

    fn read_soil_temperature(&mut self) -> Result<RawAdc, SensorError> {
        self.require(DeviceId::Soil)?;
        // Inverse of the probe conversion.
        let raw = (self.soil_temperature_c / 100.0 + 0.5) / 6.27 * SOIL_ADC_MAX as f32;
        Ok(raw.clamp(0.0, SOIL_ADC_MAX as f32) as RawAdc)
    }

    fn reinit(&mut self, device: DeviceId) -> bool {
        debug!("sim: reinit {}", device);
        self.connected[device as usize]
    }
}

impl ActuatorBus for SimulatedGreenhouse {
    fn set_digital(&mut self, actuator: ActuatorId, on: bool) -> Result<(), ActuatorError> {
        if !actuator.is_digital() {
            return Err(ActuatorError::Unsupported);
        }
        self.relays[actuator as usize] = on;
        Ok(())
    }

    fn set_angle(&mut self, actuator: ActuatorId, degrees: u8) -> Result<(), ActuatorError> {
        if actuator != ActuatorId::Door {
            return Err(ActuatorError::Unsupported);
        }
        self.door_angle = degrees;
        Ok(())
    }
}
