//! Status-change events handed to the publication collaborator.
//!
//! Every observable field publishes only when its value differs from the
//! last value published for it. Topic names match the device firmware so
//! existing dashboards keep working.

use crate::valve::ValveRole;

/// An observable field of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusField {
    /// Open/closed state of one valve.
    Valve(ValveRole),
    /// Latched lockout raised by the operator command.
    ExternalLockout,
    /// Latched lockout raised by a nutrient valve watchdog.
    SafetyTimeoutEc,
    /// Latched lockout raised by the pH valve watchdog.
    SafetyTimeoutPh,
    /// Latched lockout raised by the emergency-stop button.
    EmergencyStopLockout,
    /// Live level of the emergency-stop button (true = pressed).
    EmergencyStopButton,
    DoseTimeA,
    DoseTimeB,
}

impl StatusField {
    pub fn topic(self) -> &'static str {
        match self {
            StatusField::Valve(ValveRole::Mixture) => "status/mixture-pin",
            StatusField::Valve(ValveRole::Ph) => "status/ph-pin",
            StatusField::Valve(ValveRole::NutrientA) => "status/nutrient-A-valve-pin",
            StatusField::Valve(ValveRole::NutrientB) => "status/nutrient-B-valve-pin",
            StatusField::ExternalLockout => "status/doser-lockout",
            StatusField::SafetyTimeoutEc => "status/doser-safety-timer-lockout-ec",
            StatusField::SafetyTimeoutPh => "status/doser-safety-timer-lockout-ph",
            StatusField::EmergencyStopLockout => "status/doser-emergency-stop-lockout",
            StatusField::EmergencyStopButton => "status/emergency-stop-button",
            // Named "-s" on the wire for compatibility; the value is milliseconds.
            StatusField::DoseTimeA => "status/nutrient-A-dosing-time-s",
            StatusField::DoseTimeB => "status/nutrient-B-dosing-time-s",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusValue {
    Bool(bool),
    Millis(u32),
}

impl core::fmt::Display for StatusValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StatusValue::Bool(b) => write!(f, "{b}"),
            StatusValue::Millis(ms) => write!(f, "{ms}"),
        }
    }
}

/// One edge-triggered notification: `field` now has `value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEvent {
    pub field: StatusField,
    pub value: StatusValue,
}

impl StatusEvent {
    #[inline]
    pub fn flag(field: StatusField, on: bool) -> Self {
        Self {
            field,
            value: StatusValue::Bool(on),
        }
    }

    #[inline]
    pub fn millis(field: StatusField, ms: u32) -> Self {
        Self {
            field,
            value: StatusValue::Millis(ms),
        }
    }

    pub fn topic(&self) -> &'static str {
        self.field.topic()
    }
}

impl core::fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.topic(), self.value)
    }
}

/// Receiver for status-change events (MQTT client, stdout, test spy, ...).
pub trait StatusSink {
    fn publish(&mut self, event: StatusEvent);
}

impl StatusSink for Vec<StatusEvent> {
    fn publish(&mut self, event: StatusEvent) {
        self.push(event);
    }
}

impl<S: StatusSink + ?Sized> StatusSink for &mut S {
    fn publish(&mut self, event: StatusEvent) {
        (**self).publish(event);
    }
}

/// Adapts a closure into a [`StatusSink`].
pub struct FnSink<F>(pub F);

impl<F: FnMut(StatusEvent)> StatusSink for FnSink<F> {
    fn publish(&mut self, event: StatusEvent) {
        (self.0)(event);
    }
}

/// Sink that drops everything (headless runs, benches).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StatusSink for NullSink {
    fn publish(&mut self, _event: StatusEvent) {}
}
