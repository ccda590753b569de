//! Control-channel commands: `(topic, payload)` text into typed updates
//! of [`DoseControlInputs`].
//!
//! Topics are matched on their `control/...` suffix so any device prefix
//! (`greenhouse/dosa-1/control/ec-dose`) is accepted.

use crate::error::CommandError;
use crate::inputs::DoseControlInputs;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    FlowRateLpm(f32),
    RatioAToBPct(f32),
    DoseAmountL(f32),
    PhDoseTimeS(u32),
    SafetyTimeoutMs(u32),
    EcDose(bool),
    PhDose(bool),
    RunMixture(bool),
    /// `true` raises the operator lockout; `false` asks for release.
    DoseLockout(bool),
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    FlowRate,
    Ratio,
    DoseAmount,
    PhDoseTime,
    SafetyTimeout,
    EcDose,
    PhDose,
    RunMixture,
    DoseLockout,
}

const TOPICS: [(&str, Kind); 9] = [
    ("control/flow-rate-lpm", Kind::FlowRate),
    ("control/ratio-of-A-to-B-%", Kind::Ratio),
    ("control/dose-amount-l", Kind::DoseAmount),
    ("control/ph-dose-time-s", Kind::PhDoseTime),
    ("control/safety-timeout-ms", Kind::SafetyTimeout),
    ("control/ec-dose", Kind::EcDose),
    ("control/ph-dose", Kind::PhDose),
    ("control/run-mixture", Kind::RunMixture),
    ("control/dose-lockout", Kind::DoseLockout),
];

fn lookup(topic: &str) -> Option<(&'static str, Kind)> {
    let topic = topic.trim();
    TOPICS.iter().copied().find(|(suffix, _)| {
        topic == *suffix
            || topic
                .strip_suffix(suffix)
                .is_some_and(|prefix| prefix.ends_with('/'))
    })
}

fn parse_bool(topic: &'static str, payload: &str) -> Result<bool, CommandError> {
    match payload.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        _ => Err(invalid(topic, payload, "1/0, true/false or on/off")),
    }
}

fn parse_f32(topic: &'static str, payload: &str) -> Result<f32, CommandError> {
    payload
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(topic, payload, "a finite number"))
}

fn parse_non_negative(topic: &'static str, payload: &str) -> Result<f32, CommandError> {
    parse_f32(topic, payload)
        .ok()
        .filter(|v| *v >= 0.0)
        .ok_or_else(|| invalid(topic, payload, "a finite number >= 0"))
}

fn parse_u32(topic: &'static str, payload: &str) -> Result<u32, CommandError> {
    payload
        .trim()
        .parse::<u32>()
        .map_err(|_| invalid(topic, payload, "an unsigned integer"))
}

fn invalid(topic: &'static str, payload: &str, expected: &'static str) -> CommandError {
    CommandError::InvalidPayload {
        topic,
        payload: payload.to_string(),
        expected,
    }
}

impl Command {
    pub fn parse(topic: &str, payload: &str) -> Result<Self, CommandError> {
        let (name, kind) =
            lookup(topic).ok_or_else(|| CommandError::UnknownTopic(topic.to_string()))?;
        let cmd = match kind {
            Kind::FlowRate => Command::FlowRateLpm(parse_f32(name, payload)?),
            Kind::Ratio => Command::RatioAToBPct(parse_f32(name, payload)?),
            Kind::DoseAmount => Command::DoseAmountL(parse_non_negative(name, payload)?),
            Kind::PhDoseTime => Command::PhDoseTimeS(parse_u32(name, payload)?),
            Kind::SafetyTimeout => Command::SafetyTimeoutMs(parse_u32(name, payload)?),
            Kind::EcDose => Command::EcDose(parse_bool(name, payload)?),
            Kind::PhDose => Command::PhDose(parse_bool(name, payload)?),
            Kind::RunMixture => Command::RunMixture(parse_bool(name, payload)?),
            Kind::DoseLockout => Command::DoseLockout(parse_bool(name, payload)?),
        };
        Ok(cmd)
    }

    /// Canonical topic (without device prefix).
    pub fn topic(&self) -> &'static str {
        match self {
            Command::FlowRateLpm(_) => "control/flow-rate-lpm",
            Command::RatioAToBPct(_) => "control/ratio-of-A-to-B-%",
            Command::DoseAmountL(_) => "control/dose-amount-l",
            Command::PhDoseTimeS(_) => "control/ph-dose-time-s",
            Command::SafetyTimeoutMs(_) => "control/safety-timeout-ms",
            Command::EcDose(_) => "control/ec-dose",
            Command::PhDose(_) => "control/ph-dose",
            Command::RunMixture(_) => "control/run-mixture",
            Command::DoseLockout(_) => "control/dose-lockout",
        }
    }

    pub fn apply(self, inputs: &mut DoseControlInputs) {
        tracing::debug!(command = ?self, "applying command");
        match self {
            Command::FlowRateLpm(v) => inputs.set_flow_rate_lpm(v),
            Command::RatioAToBPct(v) => inputs.set_ratio_a_to_b_pct(v),
            Command::DoseAmountL(v) => inputs.set_dose_amount_l(v),
            Command::PhDoseTimeS(v) => inputs.set_ph_dose_time_s(v),
            Command::SafetyTimeoutMs(v) => inputs.set_safety_timeout_limit_ms(v),
            Command::EcDose(v) => inputs.request_ec_dose(v),
            Command::PhDose(v) => inputs.request_ph_dose(v),
            Command::RunMixture(v) => inputs.set_mixture_commanded(v),
            Command::DoseLockout(v) => inputs.set_external_lockout(v),
        }
    }
}

/// Parse and apply in one step; on error `inputs` is untouched.
pub fn apply_message(inputs: &mut DoseControlInputs, topic: &str, payload: &str) -> Result<Command, CommandError> {
    let cmd = Command::parse(topic, payload)?;
    cmd.apply(inputs);
    Ok(cmd)
}
