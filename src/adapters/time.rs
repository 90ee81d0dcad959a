//! Host time adapter.
//!
//! Implements [`Clock`] with `std::time::Instant` for the monotonic part and
//! the system wall clock (plus a fixed UTC offset) for the hour of day.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::app::ports::Clock;
use crate::time::Timestamp;

/// Anything before 2020-01-01 means the wall clock was never synced.
const EPOCH_2020: u64 = 1_577_836_800;

pub struct SystemClock {
    start: Instant,
    utc_offset_hours: i8,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SystemClock {
    /// `utc_offset_hours` shifts the reported hour into local time.
    pub fn new(utc_offset_hours: i8) -> Self {
        Self {
            start: Instant::now(),
            utc_offset_hours,
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.start.elapsed().as_millis() as u64)
    }

    fn hour_of_day(&self) -> Option<u8> {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        local_hour(secs, self.utc_offset_hours)
    }
}

/// Hour of day for a Unix time, or `None` if the time is clearly unsynced.
fn local_hour(unix_secs: u64, utc_offset_hours: i8) -> Option<u8> {
    if unix_secs < EPOCH_2020 {
        return None;
    }
    let utc_hour = (unix_secs / 3_600 % 24) as i16;
    Some((utc_hour + utc_offset_hours as i16).rem_euclid(24) as u8)
}
