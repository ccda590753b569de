pub mod clock;

pub use clock::{Clock, ManualClock, Millis, MonotonicClock, elapsed_ms};

/// Opaque handle for a digital pin (BCM number on the Pi backend).
///
/// `PinId(0)` is the "not configured" value carried over from the device
/// firmware; reads return the bus default and writes go nowhere useful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PinId(pub u8);

impl PinId {
    pub const UNSET: PinId = PinId(0);

    #[inline]
    pub fn is_unset(self) -> bool {
        self == Self::UNSET
    }
}

impl core::fmt::Display for PinId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Synchronous digital I/O. Reads and writes are treated as instantaneous
/// and infallible at this layer; backends log bus faults themselves.
pub trait DigitalIo {
    fn read(&mut self, pin: PinId) -> bool;
    fn write(&mut self, pin: PinId, level: bool);
}

impl<T: DigitalIo + ?Sized> DigitalIo for Box<T> {
    fn read(&mut self, pin: PinId) -> bool {
        (**self).read(pin)
    }

    fn write(&mut self, pin: PinId, level: bool) {
        (**self).write(pin, level);
    }
}
