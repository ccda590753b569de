//! Digital I/O backends for the dosing controller.
//!
//! - `SimulatedIo`: in-process pin bank for demos, `dosa simulate` and tests.
//! - `GpioIo` (feature `hardware`): Raspberry Pi GPIO through `rppal`.
pub mod error;
#[cfg(feature = "hardware")]
pub mod gpio;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use dosa_traits::{DigitalIo, PinId};

#[cfg(feature = "hardware")]
pub use gpio::GpioIo;

/// Simulated pin bank. Clones share the same pins, so a caller can keep a
/// handle to drive inputs (the emergency stop) while the controller owns
/// the other.
///
/// Inputs read high until set, like a pulled-up line.
#[derive(Debug, Clone, Default)]
pub struct SimulatedIo {
    levels: Rc<RefCell<HashMap<PinId, bool>>>,
}

impl SimulatedIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive an input from outside (button press, wiring fault, ...).
    pub fn set_input(&self, pin: PinId, level: bool) {
        tracing::debug!(pin = pin.0, level, "input set (simulated)");
        self.levels.borrow_mut().insert(pin, level);
    }

    /// Last level seen on `pin`, `None` if never driven.
    pub fn level(&self, pin: PinId) -> Option<bool> {
        self.levels.borrow().get(&pin).copied()
    }
}

impl DigitalIo for SimulatedIo {
    fn read(&mut self, pin: PinId) -> bool {
        self.level(pin).unwrap_or(true)
    }

    fn write(&mut self, pin: PinId, level: bool) {
        let prev = self.levels.borrow_mut().insert(pin, level);
        if prev != Some(level) {
            tracing::debug!(pin = pin.0, level, "gpio write (simulated)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inputs_idle_high() {
        let mut io = SimulatedIo::new();
        assert!(io.read(PinId(17)));
        io.set_input(PinId(17), false);
        assert!(!io.read(PinId(17)));
    }
}
