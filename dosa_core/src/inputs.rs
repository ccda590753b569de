//! Operator/automation inputs read by the controller each tick.

use dosa_config::DEFAULT_SAFETY_TIMEOUT_MS;

/// Clamp an A:B ratio to the valid percentage range. NaN passes through
/// and is rejected by the consumers.
#[inline]
pub fn clamp_ratio_pct(pct: f32) -> f32 {
    pct.clamp(0.0, 100.0)
}

/// Latest value of every externally commanded field.
///
/// Written by the command-ingestion side, read by the controller. The only
/// fields the controller writes back are the two dose triggers, which a
/// finished (or aborted) dose clears.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseControlInputs {
    flow_rate_lpm: f32,
    ratio_a_to_b_pct: f32,
    dose_amount_l: f32,
    ph_dose_time_s: u32,
    pub(crate) needs_to_dose_ec: bool,
    pub(crate) needs_to_dose_ph: bool,
    mixture_commanded: bool,
    external_lockout_command: bool,
    pub(crate) lockout_release_requested: bool,
    safety_timeout_limit_ms: u32,
}

impl Default for DoseControlInputs {
    fn default() -> Self {
        Self {
            flow_rate_lpm: 0.0,
            ratio_a_to_b_pct: 0.0,
            dose_amount_l: 1.0,
            ph_dose_time_s: 0,
            needs_to_dose_ec: false,
            needs_to_dose_ph: false,
            mixture_commanded: false,
            external_lockout_command: false,
            lockout_release_requested: false,
            safety_timeout_limit_ms: DEFAULT_SAFETY_TIMEOUT_MS,
        }
    }
}

impl DoseControlInputs {
    pub fn flow_rate_lpm(&self) -> f32 {
        self.flow_rate_lpm
    }

    pub fn set_flow_rate_lpm(&mut self, lpm: f32) {
        self.flow_rate_lpm = lpm;
    }

    pub fn ratio_a_to_b_pct(&self) -> f32 {
        self.ratio_a_to_b_pct
    }

    /// Stored clamped to [0, 100].
    pub fn set_ratio_a_to_b_pct(&mut self, pct: f32) {
        self.ratio_a_to_b_pct = clamp_ratio_pct(pct);
    }

    pub fn dose_amount_l(&self) -> f32 {
        self.dose_amount_l
    }

    pub fn set_dose_amount_l(&mut self, litres: f32) {
        self.dose_amount_l = litres;
    }

    pub fn ph_dose_time_s(&self) -> u32 {
        self.ph_dose_time_s
    }

    /// Below 1 s the pH branch is disabled.
    pub fn set_ph_dose_time_s(&mut self, secs: u32) {
        self.ph_dose_time_s = secs;
    }

    pub fn needs_to_dose_ec(&self) -> bool {
        self.needs_to_dose_ec
    }

    pub fn request_ec_dose(&mut self, on: bool) {
        self.needs_to_dose_ec = on;
    }

    pub fn needs_to_dose_ph(&self) -> bool {
        self.needs_to_dose_ph
    }

    pub fn request_ph_dose(&mut self, on: bool) {
        self.needs_to_dose_ph = on;
    }

    pub fn mixture_commanded(&self) -> bool {
        self.mixture_commanded
    }

    pub fn set_mixture_commanded(&mut self, on: bool) {
        self.mixture_commanded = on;
    }

    pub fn external_lockout_command(&self) -> bool {
        self.external_lockout_command
    }

    /// Raise or withdraw the operator lockout. Withdrawing also asks the
    /// arbiter to release a latched lockout on its next tick.
    pub fn set_external_lockout(&mut self, on: bool) {
        self.external_lockout_command = on;
        if !on {
            self.lockout_release_requested = true;
        }
    }

    pub fn lockout_release_requested(&self) -> bool {
        self.lockout_release_requested
    }

    pub fn safety_timeout_limit_ms(&self) -> u32 {
        self.safety_timeout_limit_ms
    }

    pub fn set_safety_timeout_limit_ms(&mut self, ms: u32) {
        self.safety_timeout_limit_ms = ms;
    }
}
