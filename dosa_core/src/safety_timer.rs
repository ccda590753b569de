//! Per-valve watchdog for stuck-open dosing valves.

use dosa_traits::{Millis, elapsed_ms};

/// Tracks how long a valve has been continuously open.
///
/// The timer only reports; closing valves and raising lockout is the
/// arbiter's job. A report fires once per open interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyTimer {
    started_at: Option<Millis>,
    reported: bool,
}

impl SafetyTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the moment the valve opened.
    pub fn start(&mut self, now: Millis) {
        self.started_at = Some(now);
        self.reported = false;
    }

    /// Returns true the first time the valve has been open for `limit_ms`.
    ///
    /// A closed valve disarms the timer. An open valve that was never
    /// `start`ed is timed from the first observation. `limit_ms == 0`
    /// times out immediately.
    pub fn check(&mut self, valve_open: bool, now: Millis, limit_ms: u32) -> bool {
        if !valve_open {
            self.started_at = None;
            self.reported = false;
            return false;
        }
        let since = *self.started_at.get_or_insert(now);
        if self.reported {
            return false;
        }
        if elapsed_ms(now, since) >= limit_ms {
            self.reported = true;
            return true;
        }
        false
    }

    /// Milliseconds the valve has been open, if it is.
    pub fn open_for(&self, now: Millis) -> Option<u32> {
        self.started_at.map(|since| elapsed_ms(now, since))
    }
}
