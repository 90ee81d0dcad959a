//! Sensor subsystem: device table, validation, and the aggregating
//! [`SensorAggregator`].
//!
//! The aggregator owns the [`HealthTracker`] and produces one
//! [`SensorSnapshot`] per cycle. Unhealthy devices are not read; a device
//! that never answered discovery is not counted at all.

pub mod device;
pub mod validate;

use log::{debug, info, warn};
use serde::Serialize;

use crate::app::ports::SensorBus;
use crate::config::ControlConfig;
use crate::error::SensorError;
use crate::health::{DeviceHealth, HealthStatus, HealthTracker, ReadOutcome};
use crate::time::Timestamp;
pub use device::DeviceId;
use validate::{
    CalibrationPoint, SoilCalibration, soil_temperature_c, validate_environmental,
    validate_illuminance, validate_soil_adc,
};

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of every sensor value.
///
/// `None` marks a missing reading (device absent, unhealthy, or the read
/// failed this cycle). Rules never compare against a missing value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensorSnapshot {
    /// When the cycle's reads were taken.
    pub taken_at: Timestamp,

    /// Air temperature (°C).
    pub air_temperature_c: Option<f32>,
    /// Air relative humidity (%).
    pub air_humidity_pct: Option<f32>,
    /// Barometric pressure (hPa).
    pub pressure_hpa: Option<f32>,

    /// Illuminance (lux).
    pub illuminance_lux: Option<f32>,

    /// Soil moisture (%), calibrated.
    pub soil_moisture_pct: Option<f32>,
    /// Soil temperature (°C).
    pub soil_temperature_c: Option<f32>,

    /// No present device is `Unhealthy`.
    pub system_healthy: bool,
}

/// Presence and health of one device, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub device: DeviceId,
    pub present: bool,
    pub status: HealthStatus,
    pub consecutive_errors: u16,
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Polls every present device through the health tracker.
pub struct SensorAggregator {
    health: HealthTracker<DeviceId, { DeviceId::COUNT }>,
    /// Indexed by `DeviceId as usize`.
    present: [bool; DeviceId::COUNT],
    soil_calibration: SoilCalibration,
}

impl SensorAggregator {
    /// Every device starts tracked, `Healthy`, and *absent* until
    /// [`discover`](Self::discover) probes it.
    pub fn new(config: &ControlConfig) -> Self {
        let mut health = HealthTracker::new(config.recovery_cooldown_ms);
        for device in DeviceId::ALL {
            health.track(device, device.error_threshold(config));
        }
        Self {
            health,
            present: [false; DeviceId::COUNT],
            soil_calibration: SoilCalibration::default(),
        }
    }

    /// Probe every device once. Returns the number of devices found.
    pub fn discover(&mut self, bus: &mut impl SensorBus, now: Timestamp) -> u8 {
        let mut found = 0;
        for device in DeviceId::ALL {
            let present = bus.reinit(device);
            self.present[device as usize] = present;
            if present {
                self.health.mark_recovered(device, now);
                found += 1;
                info!("{} sensor detected", device);
            } else {
                warn!("{} sensor not found", device);
            }
        }
        found
    }

    /// Look again for every absent device and re-initialise every unhealthy one
    /// whose recovery cooldown has elapsed.
    ///
    /// Returns the number of devices that came back.
    pub fn rediscover(&mut self, bus: &mut impl SensorBus, now: Timestamp) -> u8 {
        info!("Rediscovering sensor devices");
        let mut recovered = 0;
        for device in DeviceId::ALL {
            let present = self.present[device as usize];
            if present && !self.health.should_attempt_recovery(device, now) {
                continue;
            }
            if bus.reinit(device) {
                self.present[device as usize] = true;
                self.health.mark_recovered(device, now);
                recovered += 1;
                info!("{} sensor back online", device);
            } else if present {
                self.health.mark_failed(device, now);
            }
        }
        recovered
    }

    /// Read every present, non-unhealthy device and build the cycle's snapshot.
    ///
    /// An unhealthy device whose recovery cooldown has elapsed gets one
    /// re-initialisation first; if that succeeds it is read this cycle.
    pub fn poll(&mut self, bus: &mut impl SensorBus, now: Timestamp) -> SensorSnapshot {
        let mut snap = SensorSnapshot {
            taken_at: now,
            ..SensorSnapshot::default()
        };

        for device in DeviceId::ALL {
            if !self.present[device as usize] {
                continue;
            }
            if self.health.is_unhealthy(device) {
                if !self.health.should_attempt_recovery(device, now) {
                    continue;
                }
                if bus.reinit(device) {
                    self.health.mark_recovered(device, now);
                } else {
                    self.health.mark_failed(device, now);
                    continue;
                }
            }

            let outcome = match device {
                DeviceId::Environmental => self.read_environmental(bus, &mut snap),
                DeviceId::Light => self.read_light(bus, &mut snap),
                DeviceId::Soil => self.read_soil(bus, &mut snap),
            };
            self.health.record_result(device, outcome, now);
        }

        snap.system_healthy = self.system_healthy();
        snap
    }

    /// Sample the raw moisture ADC and store it as a calibration point.
    pub fn calibrate_soil(
        &mut self,
        bus: &mut impl SensorBus,
        point: CalibrationPoint,
    ) -> Result<SoilCalibration, SensorError> {
        if !self.present[DeviceId::Soil as usize] {
            return Err(SensorError::NotPresent);
        }
        let raw = bus.read_soil_moisture()?;
        let raw = validate_soil_adc(raw)?;
        let cal = self
            .soil_calibration
            .with_point(point, raw)
            .ok_or(SensorError::OutOfRange)?;
        info!("Soil {:?} calibration: raw={}", point, raw);
        self.soil_calibration = cal;
        Ok(cal)
    }

    // ── Queries ───────────────────────────────────────────────

    /// AND over every present device: none may be `Unhealthy`.
    pub fn system_healthy(&self) -> bool {
        DeviceId::ALL
            .iter()
            .filter(|d| self.present[**d as usize])
            .all(|d| !self.health.is_unhealthy(*d))
    }

    /// True if any present device is `Unhealthy`.
    pub fn any_unhealthy(&self) -> bool {
        !self.system_healthy()
    }

    pub fn is_present(&self, device: DeviceId) -> bool {
        self.present[device as usize]
    }

    pub fn health(&self, device: DeviceId) -> DeviceHealth {
        self.health.health(device).unwrap_or_default()
    }

    /// Current status of every device, indexed by `DeviceId as usize`.
    pub fn statuses(&self) -> [HealthStatus; DeviceId::COUNT] {
        DeviceId::ALL.map(|d| self.health(d).status)
    }

    pub fn soil_calibration(&self) -> SoilCalibration {
        self.soil_calibration
    }

    pub fn summary(&self) -> [DeviceSummary; DeviceId::COUNT] {
        DeviceId::ALL.map(|device| {
            let h = self.health(device);
            DeviceSummary {
                device,
                present: self.is_present(device),
                status: h.status,
                consecutive_errors: h.consecutive_errors,
            }
        })
    }

    // ── Internal ──────────────────────────────────────────────

    fn read_environmental(
        &self,
        bus: &mut impl SensorBus,
        snap: &mut SensorSnapshot,
    ) -> ReadOutcome {
        let r = bus.read_environmental().and_then(validate_environmental)?;
        snap.air_temperature_c = Some(r.temperature_c);
        snap.air_humidity_pct = Some(r.humidity_pct);
        snap.pressure_hpa = Some(r.pressure_hpa);
        Ok(())
    }

    fn read_light(&self, bus: &mut impl SensorBus, snap: &mut SensorSnapshot) -> ReadOutcome {
        let lux = bus.read_illuminance().and_then(validate_illuminance)?;
        snap.illuminance_lux = Some(lux);
        Ok(())
    }

    /// Moisture drives soil health; a bad temperature sample is only dropped.
    fn read_soil(&self, bus: &mut impl SensorBus, snap: &mut SensorSnapshot) -> ReadOutcome {
        match bus.read_soil_temperature().and_then(validate_soil_adc) {
            Ok(raw) => snap.soil_temperature_c = Some(soil_temperature_c(raw)),
            Err(e) => debug!("soil temperature sample dropped: {}", e),
        }

        let raw = bus.read_soil_moisture().and_then(validate_soil_adc)?;
        snap.soil_moisture_pct = Some(self.soil_calibration.moisture_pct(raw));
        Ok(())
    }
}
