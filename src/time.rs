//! Monotonic millisecond timestamps.
//!
//! Every timer in the core (recovery cooldowns, watering cooldown, timed
//! pump runs, rediscovery rate limit) is expressed as data against a
//! [`Timestamp`] supplied by the caller. Nothing in the core reads a clock
//! on its own.

use core::fmt;
use core::ops::Add;

use serde::{Deserialize, Serialize};

/// Milliseconds since an arbitrary monotonic epoch (usually boot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, or 0 if `earlier` is in the future.
    pub const fn millis_since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Monotonic time plus wall-clock hour, captured once per control cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSample {
    pub now: Timestamp,
    /// Local hour of day (0–23); `None` until the wall clock is synced.
    pub hour: Option<u8>,
}

impl ClockSample {
    pub const fn new(now: Timestamp, hour: Option<u8>) -> Self {
        Self { now, hour }
    }
}

impl Add<u64> for Timestamp {
    type Output = Timestamp;

    fn add(self, ms: u64) -> Timestamp {
        Timestamp(self.0.saturating_add(ms))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
