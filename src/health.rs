//! Per-device liveness tracking.
//!
//! One [`HealthTracker`] is parametrised over the device identity type and
//! replaces the per-sensor boolean/counter pairs a controller would
//! otherwise duplicate for every bus device.
//!
//! ## Device lifecycle
//!
//! ```text
//!            ok                       fail (n < N)
//!   ┌──────────────┐            ┌───────────────────┐
//!   ▼              │            ▼                   │
//! HEALTHY ──[fail]──▶ DEGRADED ──[N-th consecutive fail]──▶ UNHEALTHY
//!   ▲                   │                                     │   ▲
//!   └────────[ok]───────┘        [cooldown & reinit ok]       │   │ [cooldown & reinit fails]
//!   ◀─────────────────────────────────────────────────────────┘   └──┘ (timer reset)
//! ```
//!
//! While a device is `Unhealthy` the tracker counts nothing: failed
//! recovery attempts only move `last_recovery_attempt`, so the error
//! counter cannot grow without bound.

use core::fmt::Debug;

use heapless::LinearMap;
use log::{error, info, warn};

use crate::error::SensorError;
use crate::time::Timestamp;

/// Result of one physical read after range validation.
pub type ReadOutcome = Result<(), SensorError>;

/// Externally visible liveness of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum HealthStatus {
    /// Last read succeeded.
    Healthy,
    /// Recent reads failed but the threshold has not been reached; still polled.
    Degraded,
    /// Threshold reached; skipped until a recovery attempt succeeds.
    Unhealthy,
}

/// Health record of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceHealth {
    pub consecutive_errors: u16,
    pub status: HealthStatus,
    /// Time of the last recovery attempt, or of the transition to `Unhealthy`.
    pub last_recovery_attempt: Option<Timestamp>,
}

impl Default for DeviceHealth {
    fn default() -> Self {
        Self {
            consecutive_errors: 0,
            status: HealthStatus::Healthy,
            last_recovery_attempt: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    health: DeviceHealth,
    error_threshold: u16,
}

/// Liveness state machine for up to `N` devices.
pub struct HealthTracker<D, const N: usize>
where
    D: Copy + Eq + Debug,
{
    devices: LinearMap<D, Tracked, N>,
    recovery_cooldown_ms: u64,
}

impl<D, const N: usize> HealthTracker<D, N>
where
    D: Copy + Eq + Debug,
{
    pub fn new(recovery_cooldown_ms: u64) -> Self {
        Self {
            devices: LinearMap::new(),
            recovery_cooldown_ms,
        }
    }

    /// Start tracking `device`, initially `Healthy`.
    ///
    /// Re-tracking an existing device only updates its threshold.
    /// Returns `false` if the tracker is full.
    pub fn track(&mut self, device: D, error_threshold: u16) -> bool {
        let error_threshold = error_threshold.max(1);
        if let Some(t) = self.devices.get_mut(&device) {
            t.error_threshold = error_threshold;
            return true;
        }
        self.devices
            .insert(
                device,
                Tracked {
                    health: DeviceHealth::default(),
                    error_threshold,
                },
            )
            .is_ok()
    }

    /// Fold one read outcome into the device's record.
    ///
    /// Returns the updated record, or `None` for an untracked device.
    pub fn record_result(
        &mut self,
        device: D,
        outcome: ReadOutcome,
        now: Timestamp,
    ) -> Option<DeviceHealth> {
        let t = self.devices.get_mut(&device)?;
        match outcome {
            Ok(()) => {
                if t.health.status != HealthStatus::Healthy {
                    info!(
                        "{:?} read ok after {} error(s)",
                        device, t.health.consecutive_errors
                    );
                }
                t.health.consecutive_errors = 0;
                t.health.status = HealthStatus::Healthy;
            }
            // The aggregator never reads an unhealthy device. A caller that
            // does gets no change: only recovery moves the cooldown.
            Err(e) if t.health.status == HealthStatus::Unhealthy => {
                warn!("{:?} read failed while unhealthy: {}", device, e);
            }
            Err(e) => {
                t.health.consecutive_errors = t.health.consecutive_errors.saturating_add(1);
                if t.health.consecutive_errors >= t.error_threshold {
                    t.health.status = HealthStatus::Unhealthy;
                    t.health.last_recovery_attempt = Some(now);
                    error!(
                        "{:?} marked UNHEALTHY after {} consecutive errors (last: {})",
                        device, t.health.consecutive_errors, e
                    );
                } else {
                    t.health.status = HealthStatus::Degraded;
                    warn!(
                        "{:?} read error #{}: {}",
                        device, t.health.consecutive_errors, e
                    );
                }
            }
        }
        Some(t.health)
    }

    /// True if `device` is `Unhealthy` and the recovery cooldown has elapsed.
    pub fn should_attempt_recovery(&self, device: D, now: Timestamp) -> bool {
        let Some(t) = self.devices.get(&device) else {
            return false;
        };
        if t.health.status != HealthStatus::Unhealthy {
            return false;
        }
        match t.health.last_recovery_attempt {
            Some(last) => now.millis_since(last) >= self.recovery_cooldown_ms,
            None => true,
        }
    }

    /// A re-initialization succeeded: back to `Healthy` with a clean counter.
    pub fn mark_recovered(&mut self, device: D, now: Timestamp) {
        if let Some(t) = self.devices.get_mut(&device) {
            if t.health.status == HealthStatus::Unhealthy {
                info!("{:?} recovered", device);
            }
            t.health = DeviceHealth {
                consecutive_errors: 0,
                status: HealthStatus::Healthy,
                last_recovery_attempt: Some(now),
            };
        }
    }

    /// A re-initialization failed: stays (or becomes) `Unhealthy`, timer reset.
    pub fn mark_failed(&mut self, device: D, now: Timestamp) {
        if let Some(t) = self.devices.get_mut(&device) {
            if t.health.status != HealthStatus::Unhealthy {
                error!("{:?} marked UNHEALTHY: re-initialization failed", device);
            } else {
                warn!("{:?} recovery attempt failed", device);
            }
            t.health.status = HealthStatus::Unhealthy;
            t.health.last_recovery_attempt = Some(now);
        }
    }

    pub fn health(&self, device: D) -> Option<DeviceHealth> {
        self.devices.get(&device).map(|t| t.health)
    }

    pub fn status(&self, device: D) -> Option<HealthStatus> {
        self.health(device).map(|h| h.status)
    }

    pub fn is_unhealthy(&self, device: D) -> bool {
        self.status(device) == Some(HealthStatus::Unhealthy)
    }

    /// Iterate over every tracked device and its record.
    pub fn iter(&self) -> impl Iterator<Item = (D, DeviceHealth)> + '_ {
        self.devices.iter().map(|(d, t)| (*d, t.health))
    }
}
