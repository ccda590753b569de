//! Digital outputs driven by the controller.

use dosa_traits::{DigitalIo, PinId};

use crate::status::{StatusEvent, StatusField};

/// Which physical valve an output drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValveRole {
    Mixture,
    Ph,
    NutrientA,
    NutrientB,
}

impl ValveRole {
    pub const ALL: [ValveRole; 4] = [
        ValveRole::Mixture,
        ValveRole::Ph,
        ValveRole::NutrientA,
        ValveRole::NutrientB,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValveRole::Mixture => "mixture",
            ValveRole::Ph => "ph",
            ValveRole::NutrientA => "nutrient_a",
            ValveRole::NutrientB => "nutrient_b",
        }
    }
}

/// A valve output with its own publish-on-change bookkeeping.
///
/// Owned by exactly one driver (a dose cycle or the mixture controller).
/// Watchdogs only look at [`ValveOutput::is_open`].
#[derive(Debug, Clone)]
pub struct ValveOutput {
    role: ValveRole,
    pin: PinId,
    commanded: bool,
    last_published: bool,
}

impl ValveOutput {
    pub fn new(role: ValveRole, pin: PinId) -> Self {
        Self {
            role,
            pin,
            commanded: false,
            last_published: false,
        }
    }

    pub fn role(&self) -> ValveRole {
        self.role
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }

    /// Last commanded state (true = open).
    #[inline]
    pub fn is_open(&self) -> bool {
        self.commanded
    }

    /// Command the valve and write the pin.
    pub fn drive<I: DigitalIo + ?Sized>(&mut self, io: &mut I, open: bool) {
        io.write(self.pin, open);
        self.commanded = open;
    }

    /// Status event if the commanded state moved since the last publication.
    pub fn take_change(&mut self) -> Option<StatusEvent> {
        if self.commanded == self.last_published {
            return None;
        }
        self.last_published = self.commanded;
        Some(self.snapshot())
    }

    /// Current state as an event, without touching change detection.
    pub fn snapshot(&self) -> StatusEvent {
        StatusEvent::flag(StatusField::Valve(self.role), self.commanded)
    }
}

/// Plain on/off indicator (the lockout lamp). Writes only on change.
#[derive(Debug, Clone)]
pub struct Indicator {
    pin: PinId,
    lit: bool,
}

impl Indicator {
    pub fn new(pin: PinId) -> Self {
        Self { pin, lit: false }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn set<I: DigitalIo + ?Sized>(&mut self, io: &mut I, lit: bool) {
        if self.lit != lit {
            io.write(self.pin, lit);
            self.lit = lit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryIo;

    #[test]
    fn publishes_each_edge_once() {
        let mut io = MemoryIo::new();
        let mut valve = ValveOutput::new(ValveRole::Ph, PinId(4));
        assert_eq!(valve.take_change(), None);

        valve.drive(&mut io, true);
        assert_eq!(io.level(PinId(4)), Some(true));
        assert_eq!(
            valve.take_change(),
            Some(StatusEvent::flag(StatusField::Valve(ValveRole::Ph), true))
        );
        assert_eq!(valve.take_change(), None);

        // open -> closed -> open within one publication window: nothing visible changed
        valve.drive(&mut io, false);
        valve.drive(&mut io, true);
        assert_eq!(valve.take_change(), None);
    }

    #[test]
    fn indicator_writes_only_on_change() {
        let mut io = MemoryIo::new();
        let mut lamp = Indicator::new(PinId(9));
        lamp.set(&mut io, false);
        lamp.set(&mut io, true);
        lamp.set(&mut io, true);
        assert_eq!(io.write_count(PinId(9)), 1);
        assert!(lamp.is_lit());
    }
}
