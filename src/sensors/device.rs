//! Physical sensor devices on the bus.
//!
//! Each [`DeviceId`] is one independently failing piece of hardware: a
//! single environmental chip delivers temperature, humidity and pressure,
//! and the two soil probes share one ADC front end and fail together.

use core::fmt;

use serde::Serialize;

use crate::config::ControlConfig;

/// Identity of a physical sensor device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum DeviceId {
    /// Combined air temperature / humidity / pressure sensor (I2C).
    Environmental = 0,
    /// Ambient light sensor (I2C).
    Light = 1,
    /// Soil moisture and soil temperature probes (ADC).
    Soil = 2,
}

impl DeviceId {
    /// Total number of devices, used to size per-device tables.
    pub const COUNT: usize = 3;

    /// Every device, in polling order.
    pub const ALL: [DeviceId; Self::COUNT] = [Self::Environmental, Self::Light, Self::Soil];

    /// Consecutive-failure threshold for this device class.
    pub fn error_threshold(self, config: &ControlConfig) -> u16 {
        match self {
            Self::Environmental | Self::Light => config.env_error_threshold,
            Self::Soil => config.soil_error_threshold,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Environmental => "environmental",
            Self::Light => "light",
            Self::Soil => "soil",
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
