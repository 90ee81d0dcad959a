//! Shared, validated setpoint store.
//!
//! Implements [`SetpointsProvider`] for the control loop while another
//! thread (web handler, console) applies updates. Every update is
//! range-checked before it becomes visible; a rejected update leaves the
//! previous setpoints in place.

use std::sync::{Arc, RwLock};

use log::{info, warn};

use crate::app::ports::SetpointsProvider;
use crate::config::Setpoints;
use crate::error::ConfigError;

/// Cloneable handle; all clones see the same setpoints.
#[derive(Debug, Clone, Default)]
pub struct SharedSetpoints {
    inner: Arc<RwLock<Setpoints>>,
}

impl SharedSetpoints {
    /// Fails if `initial` does not validate.
    pub fn new(initial: Setpoints) -> Result<Self, ConfigError> {
        initial.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(initial)),
        })
    }

    /// Validate and publish new setpoints.
    pub fn update(&self, next: Setpoints) -> Result<(), ConfigError> {
        if let Err(e) = next.validate() {
            warn!("Rejected setpoint update: {}", e);
            return Err(e);
        }
        let mut guard = self.inner.write().map_err(|_| ConfigError::Unavailable)?;
        *guard = next;
        info!("Setpoints updated");
        Ok(())
    }

    /// Apply a change to a copy of the current setpoints, then publish it.
    pub fn modify(&self, f: impl FnOnce(&mut Setpoints)) -> Result<(), ConfigError> {
        let mut next = self.snapshot()?;
        f(&mut next);
        self.update(next)
    }
}

impl SetpointsProvider for SharedSetpoints {
    fn snapshot(&self) -> Result<Setpoints, ConfigError> {
        self.inner
            .read()
            .map(|s| s.clone())
            .map_err(|_| ConfigError::Unavailable)
    }
}
