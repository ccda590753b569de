//! The tick orchestrator: owns every component and runs one control cycle
//! per [`Controller::tick`].

use std::sync::Arc;

use dosa_traits::{Clock, DigitalIo, Millis};

use crate::config::{DosaSettings, PinMap};
use crate::dose_cycle::{CycleGate, DoseCycle, DoseRole, DoseState, Transition};
use crate::error::CommandError;
use crate::ingest::Command;
use crate::inputs::DoseControlInputs;
use crate::lockout::{LockoutArbiter, LockoutInputs, LockoutStatus};
use crate::mixture::drive_mixture;
use crate::safety_timer::SafetyTimer;
use crate::status::{StatusEvent, StatusField, StatusSink};
use crate::timing::{DoseTimings, RatioTimeCalculator};
use crate::util::secs_to_ms;
use crate::valve::{Indicator, ValveOutput, ValveRole};

/// One dosing branch: its state machine, the valve it owns and the
/// watchdog observing that valve.
#[derive(Debug)]
pub(crate) struct DoseChannel {
    pub(crate) cycle: DoseCycle,
    pub(crate) valve: ValveOutput,
    pub(crate) timer: SafetyTimer,
}

impl DoseChannel {
    pub(crate) fn new(role: DoseRole, pins: &PinMap) -> Self {
        Self {
            cycle: DoseCycle::new(role),
            valve: ValveOutput::new(role.valve_role(), pins.valve(role.valve_role())),
            timer: SafetyTimer::new(),
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub now: Millis,
    pub lockout: LockoutStatus,
    /// Number of status events handed to the sink.
    pub published: usize,
}

/// Dosing controller. Construct with [`Controller::builder`].
pub struct Controller<I: DigitalIo> {
    pub(crate) io: I,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) pins: PinMap,
    pub(crate) settings: DosaSettings,
    pub(crate) inputs: DoseControlInputs,
    pub(crate) timings: DoseTimings,
    pub(crate) published_timings: DoseTimings,
    pub(crate) calculator: RatioTimeCalculator,
    pub(crate) arbiter: LockoutArbiter,
    /// Indexed like [`DoseRole::ALL`].
    pub(crate) channels: [DoseChannel; 3],
    pub(crate) mixture: ValveOutput,
    pub(crate) lockout_led: Indicator,
    pub(crate) pending: Vec<StatusEvent>,
}

impl<I: DigitalIo> core::fmt::Debug for Controller<I> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("pins", &self.pins)
            .field("inputs", &self.inputs)
            .field("timings", &self.timings)
            .field("lockout", &self.arbiter.status())
            .field("channels", &self.channels)
            .field("mixture_open", &self.mixture.is_open())
            .finish_non_exhaustive()
    }
}

fn channel_index(role: DoseRole) -> usize {
    match role {
        DoseRole::NutrientA => 0,
        DoseRole::NutrientB => 1,
        DoseRole::Ph => 2,
    }
}

impl<I: DigitalIo> Controller<I> {
    /// Run one control cycle and publish whatever changed.
    ///
    /// Order: watchdogs, lockout, timing, dose cycles, mixture, publish.
    /// Lockout is settled before the cycles advance so a timeout closes
    /// its valve in the tick that detects it.
    pub fn tick<S: StatusSink + ?Sized>(&mut self, sink: &mut S) -> TickReport {
        let now = self.clock.now_ms();
        let limit_ms = self.inputs.safety_timeout_limit_ms();

        // 1. watchdogs
        let mut timed_out = [false; 3];
        for (flag, ch) in timed_out.iter_mut().zip(self.channels.iter_mut()) {
            *flag = ch.timer.check(ch.valve.is_open(), now, limit_ms);
            if *flag {
                tracing::warn!(
                    valve = ch.valve.role().name(),
                    limit_ms,
                    "safety timeout: valve open too long"
                );
            }
        }

        // 2. lockout
        let lockout_inputs = LockoutInputs {
            external_command: self.inputs.external_lockout_command(),
            release_requested: core::mem::take(&mut self.inputs.lockout_release_requested),
            emergency_stop: self.read_estop(),
            timeout_a: timed_out[channel_index(DoseRole::NutrientA)],
            timeout_b: timed_out[channel_index(DoseRole::NutrientB)],
            timeout_ph: timed_out[channel_index(DoseRole::Ph)],
        };
        let lockout = self.arbiter.arbitrate(
            &lockout_inputs,
            &mut self.inputs.needs_to_dose_ec,
            &mut self.inputs.needs_to_dose_ph,
        );
        if lockout.active {
            for ch in &mut self.channels {
                ch.cycle.force_end();
            }
            // requests made under lockout are dropped, not queued
            self.inputs.needs_to_dose_ec = false;
            self.inputs.needs_to_dose_ph = false;
        }
        self.lockout_led.set(&mut self.io, lockout.active);

        // 3. timing
        if let Some(t) = self.calculator.recompute(
            self.inputs.ratio_a_to_b_pct(),
            self.inputs.flow_rate_lpm(),
            self.inputs.dose_amount_l(),
        ) {
            self.timings = t;
        }

        // 4. dose cycles
        let nutrient_armed =
            self.inputs.ratio_a_to_b_pct() >= 1.0 && self.inputs.flow_rate_lpm() > 0.0;
        let ph_secs = self.inputs.ph_dose_time_s();
        for ch in &mut self.channels {
            let role = ch.cycle.role();
            let (armed, duration_ms, trigger) = match role {
                DoseRole::NutrientA => (
                    nutrient_armed,
                    self.timings.dose_a_ms,
                    &mut self.inputs.needs_to_dose_ec,
                ),
                DoseRole::NutrientB => (
                    nutrient_armed,
                    self.timings.dose_b_ms,
                    &mut self.inputs.needs_to_dose_ec,
                ),
                DoseRole::Ph => (
                    ph_secs >= 1,
                    secs_to_ms(ph_secs),
                    &mut self.inputs.needs_to_dose_ph,
                ),
            };
            let gate = CycleGate {
                lockout_active: lockout.active,
                armed,
                duration_ms,
            };
            let step = ch
                .cycle
                .advance(&gate, trigger, &mut ch.valve, &mut self.io, now);
            if step == Some(Transition::Opened) {
                ch.timer.start(now);
            }
        }

        // 5. mixture
        drive_mixture(self.inputs.mixture_commanded(), &mut self.mixture, &mut self.io);

        // 6. publish
        self.collect_changes();
        let published = self.flush(sink);
        tracing::trace!(now, published, lockout = lockout.active, "tick");
        TickReport {
            now,
            lockout,
            published,
        }
    }

    /// Close every valve and drop pending dose requests. The lockout
    /// state is left as is.
    pub fn shutdown<S: StatusSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let now = self.clock.now_ms();
        let gate = CycleGate {
            lockout_active: true,
            armed: false,
            duration_ms: 0,
        };
        for ch in &mut self.channels {
            ch.cycle.force_end();
            let trigger = if ch.cycle.role().is_nutrient() {
                &mut self.inputs.needs_to_dose_ec
            } else {
                &mut self.inputs.needs_to_dose_ph
            };
            ch.cycle.advance(&gate, trigger, &mut ch.valve, &mut self.io, now);
        }
        self.inputs.needs_to_dose_ec = false;
        self.inputs.needs_to_dose_ph = false;
        self.inputs.set_mixture_commanded(false);
        drive_mixture(false, &mut self.mixture, &mut self.io);
        self.collect_changes();
        let published = self.flush(sink);
        tracing::info!("controller shut down, all valves closed");
        published
    }

    /// Parse a control-channel message and apply it to the inputs.
    pub fn handle_message(&mut self, topic: &str, payload: &str) -> Result<Command, CommandError> {
        crate::ingest::apply_message(&mut self.inputs, topic, payload)
    }

    pub fn apply(&mut self, command: Command) {
        command.apply(&mut self.inputs);
    }

    /// Current value of every published field, without touching change
    /// detection.
    pub fn status_snapshot(&self) -> Vec<StatusEvent> {
        let mut out = Vec::with_capacity(11);
        out.push(self.mixture.snapshot());
        out.extend(self.channels.iter().map(|ch| ch.valve.snapshot()));
        out.extend(self.arbiter.snapshot());
        out.push(StatusEvent::millis(StatusField::DoseTimeA, self.timings.dose_a_ms));
        out.push(StatusEvent::millis(StatusField::DoseTimeB, self.timings.dose_b_ms));
        out
    }

    pub fn inputs(&self) -> &DoseControlInputs {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut DoseControlInputs {
        &mut self.inputs
    }

    pub fn lockout(&self) -> LockoutStatus {
        self.arbiter.status()
    }

    pub fn timings(&self) -> DoseTimings {
        self.timings
    }

    pub fn pins(&self) -> &PinMap {
        &self.pins
    }

    pub fn settings(&self) -> &DosaSettings {
        &self.settings
    }

    pub fn cycle_state(&self, role: DoseRole) -> DoseState {
        self.channels[channel_index(role)].cycle.state()
    }

    pub fn valve_open(&self, role: ValveRole) -> bool {
        match role {
            ValveRole::Mixture => self.mixture.is_open(),
            ValveRole::Ph => self.channels[channel_index(DoseRole::Ph)].valve.is_open(),
            ValveRole::NutrientA => self.channels[channel_index(DoseRole::NutrientA)].valve.is_open(),
            ValveRole::NutrientB => self.channels[channel_index(DoseRole::NutrientB)].valve.is_open(),
        }
    }

    pub fn lockout_led_lit(&self) -> bool {
        self.lockout_led.is_lit()
    }

    pub fn io(&self) -> &I {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut I {
        &mut self.io
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    fn read_estop(&mut self) -> bool {
        let pin = self.pins.emergency_stop;
        if pin.is_unset() {
            return false;
        }
        let level = self.io.read(pin);
        level != self.settings.estop_active_low
    }

    fn collect_changes(&mut self) {
        if let Some(ev) = self.mixture.take_change() {
            self.pending.push(ev);
        }
        for ch in &mut self.channels {
            if let Some(ev) = ch.valve.take_change() {
                self.pending.push(ev);
            }
        }
        self.arbiter.take_changes(&mut self.pending);
        if self.timings.dose_a_ms != self.published_timings.dose_a_ms {
            self.pending
                .push(StatusEvent::millis(StatusField::DoseTimeA, self.timings.dose_a_ms));
        }
        if self.timings.dose_b_ms != self.published_timings.dose_b_ms {
            self.pending
                .push(StatusEvent::millis(StatusField::DoseTimeB, self.timings.dose_b_ms));
        }
        self.published_timings = self.timings;
    }

    fn flush<S: StatusSink + ?Sized>(&mut self, sink: &mut S) -> usize {
        let n = self.pending.len();
        for ev in self.pending.drain(..) {
            sink.publish(ev);
        }
        n
    }
}
