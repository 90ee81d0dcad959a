//! Configuration parameters.
//!
//! [`Setpoints`] are the user-facing targets (updated through the external
//! API and handed to the core as a read-only snapshot every cycle).
//! [`ControlConfig`] holds the engine constants: error thresholds,
//! cooldowns and cadences. Both carry documented defaults so they can be
//! tuned without code changes.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// User-configured control targets.
///
/// The core assumes these are already valid; providers call
/// [`Setpoints::validate`] before accepting an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setpoints {
    // --- Temperature ---
    /// Target air temperature (°C)
    pub temperature_c: f32,
    /// Half-width of the temperature dead band (°C)
    pub temperature_hysteresis_c: f32,

    // --- Humidity ---
    /// Target relative humidity (%)
    pub humidity_pct: f32,
    /// Half-width of the humidity dead band (%)
    pub humidity_band_pct: f32,

    // --- Soil / watering ---
    /// Target soil moisture (%)
    pub soil_moisture_pct: f32,
    /// Watering starts once moisture drops this far below the setpoint (%)
    pub watering_margin_pct: f32,
    /// Length of one automatic watering run (ms)
    pub watering_duration_ms: u64,
    /// Minimum time between two automatic watering runs (ms)
    pub watering_cooldown_ms: u64,

    // --- Lighting ---
    /// Hour (0-23) the grow light switches on
    pub light_on_hour: u8,
    /// Hour (0-23) the grow light switches off. No wraparound past midnight.
    pub light_off_hour: u8,

    // --- Ventilation override ---
    /// Fan is forced on above this temperature (°C) ...
    pub vent_temperature_c: f32,
    /// ... when humidity is also above this value (%)
    pub vent_humidity_pct: f32,

    /// When false, the policy emits no commands (manual control only).
    pub automation_enabled: bool,
}

impl Default for Setpoints {
    fn default() -> Self {
        Self {
            temperature_c: 25.0,
            temperature_hysteresis_c: 1.0,

            humidity_pct: 60.0,
            humidity_band_pct: 5.0,

            soil_moisture_pct: 50.0,
            watering_margin_pct: 5.0,
            watering_duration_ms: 5_000,
            watering_cooldown_ms: 300_000, // 5 min

            light_on_hour: 8,
            light_off_hour: 20,

            vent_temperature_c: 28.0,
            vent_humidity_pct: 70.0,

            automation_enabled: true,
        }
    }
}

impl Setpoints {
    /// Range-check every field.
    ///
    /// Ranges follow the limits enforced by the settings store of the
    /// deployed controller. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10.0..=40.0).contains(&self.temperature_c) {
            return Err(ConfigError::ValidationFailed("temperature_c must be 10-40"));
        }
        if !(self.temperature_hysteresis_c > 0.0 && self.temperature_hysteresis_c <= 10.0) {
            return Err(ConfigError::ValidationFailed(
                "temperature_hysteresis_c must be in (0, 10]",
            ));
        }
        if !(20.0..=90.0).contains(&self.humidity_pct) {
            return Err(ConfigError::ValidationFailed("humidity_pct must be 20-90"));
        }
        if !(self.humidity_band_pct > 0.0 && self.humidity_band_pct <= 30.0) {
            return Err(ConfigError::ValidationFailed("humidity_band_pct must be in (0, 30]"));
        }
        if !(10.0..=90.0).contains(&self.soil_moisture_pct) {
            return Err(ConfigError::ValidationFailed("soil_moisture_pct must be 10-90"));
        }
        if !(0.0..=50.0).contains(&self.watering_margin_pct) {
            return Err(ConfigError::ValidationFailed("watering_margin_pct must be 0-50"));
        }
        if self.watering_duration_ms == 0 {
            return Err(ConfigError::ValidationFailed("watering_duration_ms must be > 0"));
        }
        if self.watering_cooldown_ms == 0 {
            return Err(ConfigError::ValidationFailed("watering_cooldown_ms must be > 0"));
        }
        if self.light_on_hour > 23 || self.light_off_hour > 23 {
            return Err(ConfigError::ValidationFailed("light hours must be 0-23"));
        }
        if !(-40.0..=85.0).contains(&self.vent_temperature_c) {
            return Err(ConfigError::ValidationFailed("vent_temperature_c must be -40-85"));
        }
        if !(0.0..=100.0).contains(&self.vent_humidity_pct) {
            return Err(ConfigError::ValidationFailed("vent_humidity_pct must be 0-100"));
        }
        Ok(())
    }
}

/// Engine constants: health thresholds, cooldowns and cadences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    // --- Health ---
    /// Consecutive failed reads before the environmental or light sensor is marked unhealthy
    pub env_error_threshold: u16,
    /// Consecutive failed reads before the soil sensors are marked unhealthy
    pub soil_error_threshold: u16,
    /// Minimum time between two recovery attempts on one device (ms)
    pub recovery_cooldown_ms: u64,

    // --- Timing ---
    /// Control decision interval (ms)
    pub control_interval_ms: u64,
    /// Minimum time between two full rediscovery passes (ms)
    pub rediscovery_interval_ms: u64,
    /// Telemetry report interval (ms)
    pub telemetry_interval_ms: u64,

    // --- Door / window ---
    /// Servo angle applied at startup (degrees)
    pub door_neutral_angle: u8,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            env_error_threshold: 5,
            soil_error_threshold: 10,
            recovery_cooldown_ms: 300_000,

            control_interval_ms: 2_000,
            rediscovery_interval_ms: 300_000,
            telemetry_interval_ms: 60_000,

            door_neutral_angle: 90,
        }
    }
}
