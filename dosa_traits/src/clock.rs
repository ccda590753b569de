use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Milliseconds since boot. Wraps at `u32::MAX` like a microcontroller tick
/// counter; always compare timestamps through [`elapsed_ms`].
pub type Millis = u32;

/// Elapsed milliseconds from `since` to `now`, correct across one wraparound.
#[inline]
pub fn elapsed_ms(now: Millis, since: Millis) -> u32 {
    now.wrapping_sub(since)
}

/// Monotonic clock abstraction for control and timing across the stack.
///
/// - now_ms(): wrapping milliseconds since the clock's epoch
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - ms_since(): helper to compute elapsed milliseconds from an earlier reading
pub trait Clock {
    fn now_ms(&self) -> Millis;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `earlier`, modulo the counter width.
    fn ms_since(&self, earlier: Millis) -> u32 {
        elapsed_ms(self.now_ms(), earlier)
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }

    fn sleep(&self, d: Duration) {
        (**self).sleep(d);
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> Millis {
        // Truncation is the wraparound.
        self.epoch.elapsed().as_millis() as Millis
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time is set or advanced manually.
///
/// Clones share the same counter, so a test can keep one handle while the
/// controller owns another. sleep(d) advances time without blocking.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at an arbitrary reading (e.g. just below wraparound).
    pub fn starting_at(ms: Millis) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(ms)),
        }
    }

    /// Advance the clock by `ms`, wrapping like the hardware counter.
    pub fn advance(&self, ms: u32) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.wrapping_add(ms))
            });
    }

    /// Set the absolute reading.
    pub fn set(&self, ms: Millis) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, d: Duration) {
        self.advance(u32::try_from(d.as_millis()).unwrap_or(u32::MAX));
    }
}
