//! Human-readable error descriptions and structured JSON error formatting.

/// Exit code for configuration and scenario-file problems.
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for controller construction failures (pin map, inputs).
pub const EXIT_BUILD: i32 = 3;
/// Exit code for GPIO backend failures.
pub const EXIT_HARDWARE: i32 = 4;

/// Context attached to config loading errors.
pub const CONFIG_CONTEXT: &str = "invalid configuration";
/// Context attached to scenario loading errors.
pub const SCENARIO_CONTEXT: &str = "invalid scenario";

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use dosa_core::error::{BuildError, CommandError};
    use dosa_hardware::error::HwError;

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingIo => {
                "What happened: No digital I/O backend was provided to the controller.\nLikely causes: GPIO failed to initialize or was not wired into the builder.\nHow to fix: Ensure the backend is created successfully and passed via with_io(...).".to_string()
            }
            BuildError::MissingPins => {
                "What happened: No pin map was provided to the controller.\nLikely causes: The builder was not configured with with_pins(...).\nHow to fix: Pass the [pins] section of the config to the builder.".to_string()
            }
            BuildError::DuplicatePin { pin, first, second } => format!(
                "What happened: Pin {pin} is assigned to both {first} and {second}.\nLikely causes: A copy-paste slip in the [pins] table.\nHow to fix: Give every valve, the lockout LED and the emergency stop their own pin."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(hw) = err.downcast_ref::<HwError>() {
        return match hw {
            HwError::PinUnavailable { pin, reason } => format!(
                "What happened: GPIO pin {pin} could not be claimed ({reason}).\nLikely causes: Wrong BCM number, pin already in use, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process may access /dev/gpiomem."
            ),
            other => format!(
                "What happened: Failed to initialize GPIO ({other}).\nLikely causes: Not running on a Raspberry Pi, or missing permissions.\nHow to fix: Run on the target device, or build without the `hardware` feature to simulate."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CommandError>() {
        return format!(
            "What happened: A command could not be applied ({ce}).\nLikely causes: Typo in the topic or a payload of the wrong type.\nHow to fix: Use topics like control/ec-dose with payloads 1/0, numbers for rates and ratios."
        );
    }

    // String-based heuristics for errors coming from config or scenario loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();
    let root = err.root_cause().to_string();

    // Scenario CSV header special-case
    if root.to_ascii_lowercase().contains("scenario csv must have headers") {
        return "Invalid headers in scenario CSV. Expected 'at_ms,topic,payload'.".to_string();
    }

    if lower.contains(SCENARIO_CONTEXT) {
        return format!(
            "What happened: The scenario file could not be used ({root}).\nLikely causes: Rows out of time order, a non-numeric at_ms, or an estop row without pins.emergency_stop.\nHow to fix: Fix the CSV (header at_ms,topic,payload) and rerun."
        );
    }

    if lower.contains(CONFIG_CONTEXT) {
        return format!(
            "What happened: Configuration is invalid or incomplete ({root}).\nLikely causes: Out-of-range values, duplicate pins, or a type mismatch in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per failure class; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use dosa_core::error::BuildError;
    use dosa_hardware::error::HwError;

    if err.downcast_ref::<BuildError>().is_some() {
        return EXIT_BUILD;
    }
    if err.downcast_ref::<HwError>().is_some() {
        return EXIT_HARDWARE;
    }
    let msg = err.to_string();
    if msg.contains(CONFIG_CONTEXT) || msg.contains(SCENARIO_CONTEXT) {
        return EXIT_CONFIG;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        EXIT_CONFIG => "Config",
        EXIT_BUILD => "Build",
        EXIT_HARDWARE => "Hardware",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dosa_core::error::BuildError;
    use dosa_traits::PinId;
    use eyre::WrapErr;

    #[test]
    fn build_errors_map_to_their_exit_code() {
        let err = eyre::Report::new(BuildError::DuplicatePin {
            pin: PinId(4),
            first: "ph_valve",
            second: "emergency_stop",
        });
        assert_eq!(exit_code_for_error(&err), EXIT_BUILD);
        assert!(humanize(&err).contains("Pin 4 is assigned to both ph_valve and emergency_stop"));
    }

    #[test]
    fn config_context_is_recognised() {
        let err: eyre::Result<()> = Err(eyre::eyre!("runner.tick_ms must be >= 1"));
        let err = err.wrap_err(CONFIG_CONTEXT).unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG);
        assert!(humanize(&err).contains("runner.tick_ms must be >= 1"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).expect("json");
        assert_eq!(v["reason"], "Config");
    }
}
