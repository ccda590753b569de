//! Latched lockout arbitration.
//!
//! Any raised source (operator command, emergency stop, either watchdog)
//! latches its cause flag and makes the lockout active. Flags stay latched
//! until the operator withdraws the lockout command while nothing else is
//! still asserting. The single `cause` slot names the source whose input
//! rose most recently, latched or not; the full set is in
//! [`LockoutStatus::latched`].

use crate::status::{StatusEvent, StatusField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockoutCause {
    #[default]
    None,
    ExternalCommand,
    SafetyTimeoutEc,
    SafetyTimeoutPh,
    EmergencyStop,
}

/// One latched flag per lockout source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CauseFlags {
    pub external_command: bool,
    pub safety_timeout_ec: bool,
    pub safety_timeout_ph: bool,
    pub emergency_stop: bool,
}

impl CauseFlags {
    pub fn any(&self) -> bool {
        self.external_command || self.safety_timeout_ec || self.safety_timeout_ph || self.emergency_stop
    }

    fn events(&self) -> [StatusEvent; 4] {
        [
            StatusEvent::flag(StatusField::ExternalLockout, self.external_command),
            StatusEvent::flag(StatusField::SafetyTimeoutEc, self.safety_timeout_ec),
            StatusEvent::flag(StatusField::SafetyTimeoutPh, self.safety_timeout_ph),
            StatusEvent::flag(StatusField::EmergencyStopLockout, self.emergency_stop),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockoutStatus {
    pub active: bool,
    pub cause: LockoutCause,
    pub latched: CauseFlags,
}

/// Everything the arbiter looks at in one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockoutInputs {
    pub external_command: bool,
    /// Operator asked for a release since the last tick.
    pub release_requested: bool,
    /// Emergency stop asserted (already polarity-corrected).
    pub emergency_stop: bool,
    pub timeout_a: bool,
    pub timeout_b: bool,
    pub timeout_ph: bool,
}

impl LockoutInputs {
    fn anything_asserted(&self) -> bool {
        self.external_command || self.emergency_stop || self.timeout_a || self.timeout_b || self.timeout_ph
    }

    fn timeout_ec(&self) -> bool {
        self.timeout_a || self.timeout_b
    }
}

#[derive(Debug, Clone, Default)]
pub struct LockoutArbiter {
    status: LockoutStatus,
    published: CauseFlags,
    estop_level: bool,
    published_estop_level: bool,
    /// Source levels seen on the previous tick, for edge detection.
    prev: LockoutInputs,
}

impl LockoutArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> LockoutStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status.active
    }

    /// Fold this tick's inputs into the latched state.
    ///
    /// A watchdog timeout also withdraws the matching dose request so the
    /// stuck branch is not re-triggered once the lockout is released.
    pub fn arbitrate(
        &mut self,
        inputs: &LockoutInputs,
        needs_to_dose_ec: &mut bool,
        needs_to_dose_ph: &mut bool,
    ) -> LockoutStatus {
        let was_active = self.status.active;
        self.estop_level = inputs.emergency_stop;

        if inputs.release_requested && was_active {
            if inputs.anything_asserted() {
                tracing::warn!(
                    external = inputs.external_command,
                    estop = inputs.emergency_stop,
                    "lockout release refused: a source is still asserted"
                );
            } else {
                self.status = LockoutStatus::default();
            }
        }

        // Later sources win a same-tick tie, so the e-stop takes the slot.
        let prev = self.prev;
        let latched = &mut self.status.latched;
        let mut cause = self.status.cause;
        if inputs.external_command {
            latched.external_command = true;
            if !prev.external_command {
                cause = LockoutCause::ExternalCommand;
            }
        }
        if inputs.timeout_ec() {
            *needs_to_dose_ec = false;
            latched.safety_timeout_ec = true;
            if !prev.timeout_ec() {
                cause = LockoutCause::SafetyTimeoutEc;
            }
        }
        if inputs.timeout_ph {
            *needs_to_dose_ph = false;
            latched.safety_timeout_ph = true;
            if !prev.timeout_ph {
                cause = LockoutCause::SafetyTimeoutPh;
            }
        }
        if inputs.emergency_stop {
            latched.emergency_stop = true;
            if !prev.emergency_stop {
                cause = LockoutCause::EmergencyStop;
            }
        }
        self.status.cause = cause;
        self.prev = *inputs;
        self.status.active = self.status.latched.any();

        match (was_active, self.status.active) {
            (false, true) => tracing::info!(cause = ?self.status.cause, "lockout engaged"),
            (true, false) => tracing::info!("lockout released"),
            (true, true) => {
                tracing::trace!(cause = ?self.status.cause, latched = ?self.status.latched, "lockout held");
            }
            (false, false) => {}
        }
        self.status
    }

    /// Queue an event for every flag that moved since the last call.
    pub fn take_changes(&mut self, out: &mut Vec<StatusEvent>) {
        let now = self.status.latched.events();
        let before = self.published.events();
        out.extend(now.iter().zip(before.iter()).filter(|(n, b)| n != b).map(|(n, _)| *n));
        self.published = self.status.latched;

        if self.estop_level != self.published_estop_level {
            self.published_estop_level = self.estop_level;
            out.push(StatusEvent::flag(StatusField::EmergencyStopButton, self.estop_level));
        }
    }

    /// Every lockout field, ignoring change detection.
    pub fn snapshot(&self) -> impl Iterator<Item = StatusEvent> + '_ {
        self.status
            .latched
            .events()
            .into_iter()
            .chain(core::iter::once(StatusEvent::flag(
                StatusField::EmergencyStopButton,
                self.estop_level,
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(arb: &mut LockoutArbiter, inputs: LockoutInputs) -> (LockoutStatus, bool, bool) {
        let (mut ec, mut ph) = (true, true);
        let s = arb.arbitrate(&inputs, &mut ec, &mut ph);
        (s, ec, ph)
    }

    #[test]
    fn quiet_inputs_stay_inactive() {
        let mut arb = LockoutArbiter::new();
        let (s, ec, ph) = run(&mut arb, LockoutInputs::default());
        assert!(!s.active);
        assert_eq!(s.cause, LockoutCause::None);
        assert!(ec && ph);
    }

    #[test]
    fn timeout_latches_and_clears_its_trigger_only() {
        let mut arb = LockoutArbiter::new();
        let (s, ec, ph) = run(
            &mut arb,
            LockoutInputs {
                timeout_b: true,
                ..Default::default()
            },
        );
        assert!(s.active);
        assert_eq!(s.cause, LockoutCause::SafetyTimeoutEc);
        assert!(!ec);
        assert!(ph);

        // the timer reports once; the lockout holds anyway
        let (s, _, _) = run(&mut arb, LockoutInputs::default());
        assert!(s.active);
        assert!(s.latched.safety_timeout_ec);
    }

    #[test]
    fn release_needs_every_source_quiet() {
        let mut arb = LockoutArbiter::new();
        run(
            &mut arb,
            LockoutInputs {
                external_command: true,
                emergency_stop: true,
                ..Default::default()
            },
        );
        let (s, _, _) = run(
            &mut arb,
            LockoutInputs {
                release_requested: true,
                emergency_stop: true,
                ..Default::default()
            },
        );
        assert!(s.active, "e-stop still pressed");

        let (s, _, _) = run(&mut arb, LockoutInputs::default());
        assert!(s.active, "no release request, stays latched");

        let (s, _, _) = run(
            &mut arb,
            LockoutInputs {
                release_requested: true,
                ..Default::default()
            },
        );
        assert_eq!(s, LockoutStatus::default());
    }

    #[test]
    fn simultaneous_sources_attribute_to_estop_and_latch_all() {
        let mut arb = LockoutArbiter::new();
        let (s, ec, ph) = run(
            &mut arb,
            LockoutInputs {
                external_command: true,
                emergency_stop: true,
                timeout_a: true,
                timeout_ph: true,
                ..Default::default()
            },
        );
        assert_eq!(s.cause, LockoutCause::EmergencyStop);
        assert_eq!(
            s.latched,
            CauseFlags {
                external_command: true,
                safety_timeout_ec: true,
                safety_timeout_ph: true,
                emergency_stop: true,
            }
        );
        assert!(!ec && !ph);
    }

    #[test]
    fn later_source_takes_the_cause_slot() {
        let mut arb = LockoutArbiter::new();
        run(
            &mut arb,
            LockoutInputs {
                external_command: true,
                ..Default::default()
            },
        );
        let (s, _, _) = run(
            &mut arb,
            LockoutInputs {
                external_command: true,
                timeout_ph: true,
                ..Default::default()
            },
        );
        assert_eq!(s.cause, LockoutCause::SafetyTimeoutPh);
    }

    #[test]
    fn held_level_keeps_the_slot_and_a_fresh_edge_retakes_it() {
        let mut arb = LockoutArbiter::new();
        let operator = LockoutInputs {
            external_command: true,
            ..Default::default()
        };
        run(&mut arb, operator);
        run(
            &mut arb,
            LockoutInputs {
                timeout_ph: true,
                ..operator
            },
        );
        let (s, _, _) = run(&mut arb, operator);
        assert_eq!(s.cause, LockoutCause::SafetyTimeoutPh, "held command is not a new edge");

        run(&mut arb, LockoutInputs::default());
        let (s, _, _) = run(&mut arb, operator);
        assert_eq!(s.cause, LockoutCause::ExternalCommand);
        assert!(s.latched.safety_timeout_ph);
    }

    #[test]
    fn changes_publish_once_per_edge() {
        let mut arb = LockoutArbiter::new();
        let mut out = Vec::new();
        arb.take_changes(&mut out);
        assert!(out.is_empty());

        run(
            &mut arb,
            LockoutInputs {
                emergency_stop: true,
                ..Default::default()
            },
        );
        arb.take_changes(&mut out);
        assert_eq!(
            out,
            [
                StatusEvent::flag(StatusField::EmergencyStopLockout, true),
                StatusEvent::flag(StatusField::EmergencyStopButton, true),
            ]
        );

        out.clear();
        run(&mut arb, LockoutInputs::default());
        arb.take_changes(&mut out);
        assert_eq!(out, [StatusEvent::flag(StatusField::EmergencyStopButton, false)]);

        out.clear();
        run(&mut arb, LockoutInputs::default());
        arb.take_changes(&mut out);
        assert!(out.is_empty());
        assert_eq!(arb.snapshot().count(), 5);
    }
}
