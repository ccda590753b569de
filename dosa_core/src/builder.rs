//! Builder for [`Controller`].
//!
//! I/O backend and pin map are required; clock, settings and initial
//! inputs have defaults. `build()` validates the pin map, drives every
//! output low and leaves all dose cycles idle.

use std::sync::Arc;

use dosa_traits::{Clock, DigitalIo, MonotonicClock};

use crate::config::{DosaSettings, PinMap};
use crate::controller::{Controller, DoseChannel};
use crate::dose_cycle::DoseRole;
use crate::error::{BuildError, Result};
use crate::inputs::DoseControlInputs;
use crate::lockout::LockoutArbiter;
use crate::timing::{DoseTimings, RatioTimeCalculator};
use crate::valve::{Indicator, ValveOutput, ValveRole};

pub struct ControllerBuilder<I> {
    io: Option<I>,
    pins: Option<PinMap>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    settings: Option<DosaSettings>,
    inputs: Option<DoseControlInputs>,
}

impl<I> Default for ControllerBuilder<I> {
    fn default() -> Self {
        Self {
            io: None,
            pins: None,
            clock: None,
            settings: None,
            inputs: None,
        }
    }
}

impl<I: DigitalIo> Controller<I> {
    /// Start building a Controller.
    pub fn builder() -> ControllerBuilder<I> {
        ControllerBuilder::default()
    }
}

fn check_pins(pins: &PinMap) -> core::result::Result<(), BuildError> {
    let all = pins.all();
    for (i, (first, a)) in all.iter().enumerate() {
        if a.is_unset() {
            tracing::warn!(pin = *first, "pin not configured; line is inert");
            continue;
        }
        if let Some((second, _)) = all[i + 1..].iter().find(|(_, b)| b == a) {
            return Err(BuildError::DuplicatePin {
                pin: *a,
                first: *first,
                second: *second,
            });
        }
    }
    Ok(())
}

fn check_inputs(inputs: &DoseControlInputs) -> core::result::Result<(), BuildError> {
    let amount = inputs.dose_amount_l();
    if !amount.is_finite() || amount < 0.0 {
        return Err(BuildError::InvalidConfig("dose_amount_l must be finite and >= 0"));
    }
    if !inputs.flow_rate_lpm().is_finite() {
        return Err(BuildError::InvalidConfig("flow_rate_lpm must be finite"));
    }
    Ok(())
}

impl<I: DigitalIo> ControllerBuilder<I> {
    pub fn with_io(mut self, io: I) -> Self {
        self.io = Some(io);
        self
    }

    pub fn with_pins(mut self, pins: PinMap) -> Self {
        self.pins = Some(pins);
        self
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_settings(mut self, settings: DosaSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Initial operator inputs (typically from the config file).
    pub fn with_inputs(mut self, inputs: DoseControlInputs) -> Self {
        self.inputs = Some(inputs);
        self
    }

    pub fn build(self) -> Result<Controller<I>> {
        let mut io = self.io.ok_or_else(|| eyre::Report::new(BuildError::MissingIo))?;
        let pins = self.pins.ok_or_else(|| eyre::Report::new(BuildError::MissingPins))?;
        check_pins(&pins).map_err(eyre::Report::new)?;
        let inputs = self.inputs.unwrap_or_default();
        check_inputs(&inputs).map_err(eyre::Report::new)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        for (_, pin) in pins.outputs() {
            if !pin.is_unset() {
                io.write(pin, false);
            }
        }

        let settings = self.settings.unwrap_or_default();
        tracing::info!(
            pins = ?pins,
            estop_active_low = settings.estop_active_low,
            safety_timeout_limit_ms = inputs.safety_timeout_limit_ms(),
            "controller initialised"
        );

        Ok(Controller {
            io,
            clock,
            pins,
            settings,
            inputs,
            timings: DoseTimings::default(),
            published_timings: DoseTimings::default(),
            calculator: RatioTimeCalculator::new(),
            arbiter: LockoutArbiter::new(),
            channels: DoseRole::ALL.map(|role| DoseChannel::new(role, &pins)),
            mixture: ValveOutput::new(ValveRole::Mixture, pins.mixture_valve),
            lockout_led: Indicator::new(pins.lockout_led),
            pending: Vec::with_capacity(16),
        })
    }
}
