//! Range validation and raw-to-unit conversion.
//!
//! A transport-level success is not enough: a reading outside the
//! device's physical range counts as a failed read for health tracking.

use serde::{Deserialize, Serialize};

use crate::error::SensorError;

/// Full-scale value of the 12-bit soil ADC.
pub const SOIL_ADC_MAX: u16 = 4095;
/// Raw values this close to either rail mean a disconnected or shorted probe.
pub const SOIL_ADC_GUARD: u16 = 100;

/// Upper bound of the light sensor's 16-bit lux register.
pub const LUX_MAX: f32 = 65_535.0;

// Operating range of the environmental chip.
const AIR_TEMP_MIN_C: f32 = -40.0;
const AIR_TEMP_MAX_C: f32 = 85.0;
const PRESSURE_MIN_HPA: f32 = 300.0;
const PRESSURE_MAX_HPA: f32 = 1100.0;

// Analog soil temperature probe: 10 mV/°C with a 500 mV offset,
// scaled through the ADC front end.
const SOIL_TEMP_SCALE: f32 = 6.27;
const SOIL_TEMP_OFFSET: f32 = 0.5;

/// Raw ADC sample.
pub type RawAdc = u16;

/// One reading of the environmental chip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentalReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
}

/// Reject non-finite or physically impossible environmental values.
pub fn validate_environmental(
    r: EnvironmentalReading,
) -> Result<EnvironmentalReading, SensorError> {
    if !(r.temperature_c.is_finite() && r.humidity_pct.is_finite() && r.pressure_hpa.is_finite()) {
        return Err(SensorError::NotFinite);
    }
    if !(AIR_TEMP_MIN_C..=AIR_TEMP_MAX_C).contains(&r.temperature_c)
        || !(0.0..=100.0).contains(&r.humidity_pct)
        || !(PRESSURE_MIN_HPA..=PRESSURE_MAX_HPA).contains(&r.pressure_hpa)
    {
        return Err(SensorError::OutOfRange);
    }
    Ok(r)
}

/// Illuminance must satisfy `0 <= lux <= 65535`.
pub fn validate_illuminance(lux: f32) -> Result<f32, SensorError> {
    if !lux.is_finite() {
        return Err(SensorError::NotFinite);
    }
    if !(0.0..=LUX_MAX).contains(&lux) {
        return Err(SensorError::OutOfRange);
    }
    Ok(lux)
}

/// Soil ADC values must lie strictly inside `[GUARD, MAX - GUARD]`.
pub fn validate_soil_adc(raw: RawAdc) -> Result<RawAdc, SensorError> {
    if raw > SOIL_ADC_GUARD && raw < SOIL_ADC_MAX - SOIL_ADC_GUARD {
        Ok(raw)
    } else {
        Err(SensorError::OutOfRange)
    }
}

/// Soil temperature in °C from a validated raw ADC value.
pub fn soil_temperature_c(raw: RawAdc) -> f32 {
    ((raw as f32 / SOIL_ADC_MAX as f32 * SOIL_TEMP_SCALE) - SOIL_TEMP_OFFSET) * 100.0
}

/// Which reference point a soil calibration sample represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationPoint {
    /// Probe in dry air: 0 % moisture.
    Air,
    /// Probe submerged in water: 100 % moisture.
    Water,
}

/// Two-point linear calibration of the capacitive moisture probe.
///
/// Capacitive probes read *lower* when wet, so `water_raw` is normally
/// below `air_raw`; the mapping works in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SoilCalibration {
    air_raw: RawAdc,
    water_raw: RawAdc,
}

impl Default for SoilCalibration {
    fn default() -> Self {
        Self {
            air_raw: 2800,
            water_raw: 1200,
        }
    }
}

impl SoilCalibration {
    /// Returns `None` if both points are equal (zero span).
    pub fn new(air_raw: RawAdc, water_raw: RawAdc) -> Option<Self> {
        (air_raw != water_raw).then_some(Self { air_raw, water_raw })
    }

    pub fn air_raw(&self) -> RawAdc {
        self.air_raw
    }

    pub fn water_raw(&self) -> RawAdc {
        self.water_raw
    }

    /// Replace one calibration point. Rejects a sample that would collapse the span.
    pub fn with_point(self, point: CalibrationPoint, raw: RawAdc) -> Option<Self> {
        match point {
            CalibrationPoint::Air => Self::new(raw, self.water_raw),
            CalibrationPoint::Water => Self::new(self.air_raw, raw),
        }
    }

    /// Moisture percentage, clamped to 0–100.
    pub fn moisture_pct(&self, raw: RawAdc) -> f32 {
        let span = self.water_raw as f32 - self.air_raw as f32;
        let pct = (raw as f32 - self.air_raw as f32) * 100.0 / span;
        pct.clamp(0.0, 100.0)
    }
}
