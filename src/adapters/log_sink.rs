//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to the
//! `log` facade. Telemetry goes out as one JSON line so it can be scraped
//! from the console. A display or web adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::health::HealthStatus;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => match serde_json::to_string(t) {
                Ok(json) => info!("TELEM | {}", json),
                Err(e) => warn!("TELEM | encode failed: {}", e),
            },
            AppEvent::HealthChanged { device, from, to } => {
                if *to == HealthStatus::Unhealthy {
                    error!("HEALTH | {} {:?} -> {:?}", device, from, to);
                } else {
                    info!("HEALTH | {} {:?} -> {:?}", device, from, to);
                }
            }
            AppEvent::ActuatorChanged { actuator, output } => {
                info!("ACT | {} -> {:?}", actuator, output);
            }
            AppEvent::ActuatorFault { actuator, error } => {
                warn!("ACT | {} write failed: {}", actuator, error);
            }
            AppEvent::Rediscovery { recovered } => {
                info!("BUS | rediscovery pass, {} device(s) recovered", recovered);
            }
            AppEvent::SetpointsUnavailable => {
                warn!("CONFIG | setpoints unavailable, decisions skipped");
            }
            AppEvent::Started { devices_present } => {
                info!("START | {} sensor device(s) present", devices_present);
            }
            AppEvent::Stopped => {
                info!("STOP | all relays off");
            }
        }
    }
}
