//! Timed open/wait/close state machine shared by the pH and nutrient valves.

use dosa_traits::{DigitalIo, Millis, elapsed_ms};

use crate::valve::{ValveOutput, ValveRole};

/// Which chemical a dose cycle delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoseRole {
    Ph,
    NutrientA,
    NutrientB,
}

impl DoseRole {
    pub const ALL: [DoseRole; 3] = [DoseRole::NutrientA, DoseRole::NutrientB, DoseRole::Ph];

    pub fn valve_role(self) -> ValveRole {
        match self {
            DoseRole::Ph => ValveRole::Ph,
            DoseRole::NutrientA => ValveRole::NutrientA,
            DoseRole::NutrientB => ValveRole::NutrientB,
        }
    }

    /// Nutrient A and B answer the EC trigger; pH has its own.
    pub fn is_nutrient(self) -> bool {
        matches!(self, DoseRole::NutrientA | DoseRole::NutrientB)
    }

    pub fn name(self) -> &'static str {
        self.valve_role().name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DoseState {
    #[default]
    Idle,
    Starting,
    /// Valve open since the given clock reading.
    Running { since: Millis },
    Ending,
}

/// What the rest of the controller allows this tick.
#[derive(Debug, Clone, Copy)]
pub struct CycleGate {
    pub lockout_active: bool,
    /// Minimum-duration guard for leaving `Idle`.
    pub armed: bool,
    pub duration_ms: u32,
}

/// Transition taken by one call to [`DoseCycle::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Starting
    Started,
    /// Starting -> Running; the valve was opened
    Opened,
    /// Running -> Ending; the configured duration elapsed
    Elapsed,
    /// Ending -> Idle; the valve was closed and the trigger cleared
    Closed,
}

/// One dosing branch. Takes at most one transition per tick.
#[derive(Debug, Clone)]
pub struct DoseCycle {
    role: DoseRole,
    state: DoseState,
}

impl DoseCycle {
    pub fn new(role: DoseRole) -> Self {
        Self {
            role,
            state: DoseState::Idle,
        }
    }

    pub fn role(&self) -> DoseRole {
        self.role
    }

    pub fn state(&self) -> DoseState {
        self.state
    }

    /// Redirect to `Ending` so the next advance closes the valve.
    /// An idle cycle is left alone. Returns true if the cycle was redirected.
    pub fn force_end(&mut self) -> bool {
        match self.state {
            DoseState::Idle | DoseState::Ending => false,
            DoseState::Starting | DoseState::Running { .. } => {
                tracing::debug!(role = self.role.name(), from = ?self.state, "dose forced to end");
                self.state = DoseState::Ending;
                true
            }
        }
    }

    /// Advance by one step. `trigger` is this branch's dose request flag.
    pub fn advance<I: DigitalIo + ?Sized>(
        &mut self,
        gate: &CycleGate,
        trigger: &mut bool,
        valve: &mut ValveOutput,
        io: &mut I,
        now: Millis,
    ) -> Option<Transition> {
        let (next, transition) = match self.state {
            DoseState::Idle => {
                if !*trigger || gate.lockout_active || !gate.armed {
                    return None;
                }
                (DoseState::Starting, Transition::Started)
            }
            DoseState::Starting => {
                valve.drive(io, true);
                tracing::info!(
                    role = self.role.name(),
                    duration_ms = gate.duration_ms,
                    "dose started"
                );
                (DoseState::Running { since: now }, Transition::Opened)
            }
            DoseState::Running { since } => {
                if elapsed_ms(now, since) < gate.duration_ms {
                    return None;
                }
                (DoseState::Ending, Transition::Elapsed)
            }
            DoseState::Ending => {
                let was_open = valve.is_open();
                valve.drive(io, false);
                *trigger = false;
                if was_open {
                    tracing::info!(role = self.role.name(), "dose finished");
                }
                (DoseState::Idle, Transition::Closed)
            }
        };
        tracing::debug!(role = self.role.name(), from = ?self.state, to = ?next, "dose transition");
        self.state = next;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemoryIo;
    use dosa_traits::PinId;

    fn gate(duration_ms: u32) -> CycleGate {
        CycleGate {
            lockout_active: false,
            armed: true,
            duration_ms,
        }
    }

    #[test]
    fn walks_the_full_cycle() {
        let mut io = MemoryIo::new();
        let mut valve = ValveOutput::new(ValveRole::Ph, PinId(4));
        let mut cycle = DoseCycle::new(DoseRole::Ph);
        let mut trigger = true;
        let g = gate(1_000);

        assert_eq!(
            cycle.advance(&g, &mut trigger, &mut valve, &mut io, 0),
            Some(Transition::Started)
        );
        assert!(!valve.is_open());
        assert_eq!(
            cycle.advance(&g, &mut trigger, &mut valve, &mut io, 10),
            Some(Transition::Opened)
        );
        assert!(valve.is_open());
        assert_eq!(cycle.state(), DoseState::Running { since: 10 });
        assert_eq!(cycle.advance(&g, &mut trigger, &mut valve, &mut io, 1_009), None);
        assert_eq!(
            cycle.advance(&g, &mut trigger, &mut valve, &mut io, 1_010),
            Some(Transition::Elapsed)
        );
        assert!(valve.is_open(), "valve closes on the Ending step");
        assert!(trigger);
        assert_eq!(
            cycle.advance(&g, &mut trigger, &mut valve, &mut io, 1_020),
            Some(Transition::Closed)
        );
        assert!(!valve.is_open());
        assert!(!trigger);
        assert_eq!(cycle.state(), DoseState::Idle);
        assert_eq!(io.level(PinId(4)), Some(false));
    }

    #[test]
    fn idle_holds_without_trigger_guard_or_with_lockout() {
        let mut io = MemoryIo::new();
        let mut valve = ValveOutput::new(ValveRole::NutrientA, PinId(5));
        let mut cycle = DoseCycle::new(DoseRole::NutrientA);

        let mut trigger = false;
        assert_eq!(cycle.advance(&gate(10), &mut trigger, &mut valve, &mut io, 0), None);

        trigger = true;
        let locked = CycleGate {
            lockout_active: true,
            ..gate(10)
        };
        assert_eq!(cycle.advance(&locked, &mut trigger, &mut valve, &mut io, 0), None);

        let disarmed = CycleGate {
            armed: false,
            ..gate(10)
        };
        assert_eq!(cycle.advance(&disarmed, &mut trigger, &mut valve, &mut io, 0), None);
        assert_eq!(cycle.state(), DoseState::Idle);
        assert!(trigger, "a held request is not consumed");
    }

    #[test]
    fn forced_end_closes_on_next_advance() {
        let mut io = MemoryIo::new();
        let mut valve = ValveOutput::new(ValveRole::NutrientB, PinId(6));
        let mut cycle = DoseCycle::new(DoseRole::NutrientB);
        let mut trigger = true;
        let g = gate(60_000);
        cycle.advance(&g, &mut trigger, &mut valve, &mut io, 0);
        cycle.advance(&g, &mut trigger, &mut valve, &mut io, 0);
        assert!(valve.is_open());

        assert!(cycle.force_end());
        assert_eq!(
            cycle.advance(&g, &mut trigger, &mut valve, &mut io, 5),
            Some(Transition::Closed)
        );
        assert!(!valve.is_open());
        assert!(!trigger);
    }

    #[test]
    fn forcing_an_idle_cycle_touches_nothing() {
        let mut io = MemoryIo::new();
        let mut valve = ValveOutput::new(ValveRole::Ph, PinId(4));
        let mut cycle = DoseCycle::new(DoseRole::Ph);
        let mut trigger = false;
        let locked = CycleGate {
            lockout_active: true,
            ..gate(1_000)
        };
        for t in 0..5 {
            assert!(!cycle.force_end());
            assert_eq!(cycle.advance(&locked, &mut trigger, &mut valve, &mut io, t), None);
        }
        assert_eq!(cycle.state(), DoseState::Idle);
        assert_eq!(io.write_count(PinId(4)), 0);
    }

    #[test]
    fn zero_duration_still_takes_one_tick_per_state() {
        let mut io = MemoryIo::new();
        let mut valve = ValveOutput::new(ValveRole::NutrientB, PinId(6));
        let mut cycle = DoseCycle::new(DoseRole::NutrientB);
        let mut trigger = true;
        let g = gate(0);
        let steps: Vec<_> = (0..4)
            .filter_map(|_| cycle.advance(&g, &mut trigger, &mut valve, &mut io, 0))
            .collect();
        assert_eq!(
            steps,
            [
                Transition::Started,
                Transition::Opened,
                Transition::Elapsed,
                Transition::Closed
            ]
        );
    }
}
