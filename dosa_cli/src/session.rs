//! Controller assembly from config and status-event printing.

use dosa_core::{Controller, DosaSettings, DoseControlInputs, PinMap, StatusEvent, StatusSink, StatusValue};
use dosa_traits::{Clock, DigitalIo};

#[cfg(feature = "hardware")]
pub const BACKEND: &str = "gpio";
#[cfg(not(feature = "hardware"))]
pub const BACKEND: &str = "simulated";

/// Claim the configured pins on the Raspberry Pi.
#[cfg(feature = "hardware")]
pub fn open_backend(cfg: &dosa_config::Config) -> eyre::Result<dosa_hardware::GpioIo> {
    let pins = PinMap::from(&cfg.pins);
    let outputs = pins.outputs().map(|(_, pin)| pin);
    Ok(dosa_hardware::GpioIo::new(&outputs, &[pins.emergency_stop])?)
}

/// Simulated pins: outputs are only logged, the e-stop reads released.
#[cfg(not(feature = "hardware"))]
pub fn open_backend(_cfg: &dosa_config::Config) -> eyre::Result<dosa_hardware::SimulatedIo> {
    Ok(dosa_hardware::SimulatedIo::new())
}

/// Build a controller on `io` with everything else taken from the config.
pub fn build_controller<I: DigitalIo>(
    cfg: &dosa_config::Config,
    io: I,
    clock: Box<dyn Clock + Send + Sync>,
) -> eyre::Result<Controller<I>> {
    Controller::builder()
        .with_io(io)
        .with_pins(PinMap::from(&cfg.pins))
        .with_settings(DosaSettings::from(cfg))
        .with_inputs(DoseControlInputs::from(cfg))
        .with_clock(clock)
        .build()
}

/// Prints status events to stdout, one per line.
///
/// Text: `<t_ms> <topic> <value>`. JSON: `{"t_ms":..,"topic":..,"value":..}`.
pub struct Printer {
    json: bool,
    t_ms: u64,
    count: u64,
}

impl Printer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            t_ms: 0,
            count: 0,
        }
    }

    /// Timestamp attached to the next events.
    pub fn at(&mut self, t_ms: u64) -> &mut Self {
        self.t_ms = t_ms;
        self
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn render(&self, event: &StatusEvent) -> String {
        if self.json {
            let value = match event.value {
                StatusValue::Bool(b) => serde_json::Value::from(b),
                StatusValue::Millis(ms) => serde_json::Value::from(ms),
            };
            serde_json::json!({
                "t_ms": self.t_ms,
                "topic": event.topic(),
                "value": value,
            })
            .to_string()
        } else {
            format!("{:>8} {event}", self.t_ms)
        }
    }
}

impl StatusSink for Printer {
    fn publish(&mut self, event: StatusEvent) {
        self.count += 1;
        println!("{}", self.render(&event));
    }
}

/// Parse a `<topic> <payload>` command line. Blank lines and `#` comments
/// yield `None`.
pub fn split_command_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((topic, payload)) => Some((topic, payload.trim())),
        None => Some((line, "")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dosa_core::{StatusField, ValveRole};

    #[test]
    fn renders_text_and_json() {
        let ev = StatusEvent::flag(StatusField::Valve(ValveRole::Ph), true);
        let mut p = Printer::new(false);
        p.at(1_500);
        assert_eq!(p.render(&ev), "    1500 status/ph-pin true");

        let mut p = Printer::new(true);
        p.at(7);
        let v: serde_json::Value = serde_json::from_str(&p.render(&ev)).expect("json");
        assert_eq!(v["t_ms"], 7);
        assert_eq!(v["topic"], "status/ph-pin");
        assert_eq!(v["value"], true);
    }

    #[test]
    fn command_lines_split_on_first_whitespace() {
        assert_eq!(
            split_command_line("  control/ec-dose   1 "),
            Some(("control/ec-dose", "1"))
        );
        assert_eq!(split_command_line("control/ec-dose"), Some(("control/ec-dose", "")));
        assert_eq!(split_command_line("# comment"), None);
        assert_eq!(split_command_line("   "), None);
    }
}
