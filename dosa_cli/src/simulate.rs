//! `dosa simulate`: deterministic replay of a scenario CSV.

use std::path::Path;

use dosa_config::ScenarioRow;
use dosa_core::Controller;
use dosa_hardware::SimulatedIo;
use dosa_traits::{ManualClock, Millis, PinId};
use eyre::{WrapErr, bail, eyre};

use crate::error_fmt::SCENARIO_CONTEXT;
use crate::session::{Printer, build_controller};

/// Scenario topic that drives the emergency-stop input instead of a command.
pub const ESTOP_TOPIC: &str = "estop";

fn parse_pressed(payload: &str) -> Option<bool> {
    match payload.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "pressed" => Some(true),
        "0" | "false" | "off" | "released" => Some(false),
        _ => None,
    }
}

struct Estop {
    pin: PinId,
    active_low: bool,
}

fn apply_row(
    ctl: &mut Controller<SimulatedIo>,
    io: &SimulatedIo,
    estop: &Estop,
    row: &ScenarioRow,
) -> eyre::Result<()> {
    if row.topic == ESTOP_TOPIC {
        let Some(pressed) = parse_pressed(&row.payload) else {
            bail!(
                "scenario row at {} ms: estop payload must be pressed/released, got {:?}",
                row.at_ms,
                row.payload
            );
        };
        io.set_input(estop.pin, pressed != estop.active_low);
        return Ok(());
    }
    ctl.handle_message(&row.topic, &row.payload)
        .map_err(eyre::Report::new)
        .wrap_err_with(|| format!("scenario row at {} ms", row.at_ms))?;
    Ok(())
}

pub fn simulate(
    cfg: &dosa_config::Config,
    json: bool,
    scenario: &Path,
    until_ms: Option<u64>,
) -> eyre::Result<()> {
    let rows = dosa_config::load_scenario_csv(scenario).wrap_err(SCENARIO_CONTEXT)?;
    let estop = Estop {
        pin: PinId(cfg.pins.emergency_stop),
        active_low: cfg.estop.active_low,
    };
    if estop.pin.is_unset() && rows.iter().any(|r| r.topic == ESTOP_TOPIC) {
        return Err(eyre!("scenario drives '{ESTOP_TOPIC}' but pins.emergency_stop is not set"))
            .wrap_err(SCENARIO_CONTEXT);
    }

    let io = SimulatedIo::new();
    let clock = ManualClock::new();
    let mut ctl = build_controller(cfg, io.clone(), Box::new(clock.clone()))?;

    let end = until_ms.unwrap_or_else(|| rows.last().map_or(0, |r| r.at_ms));
    let step = cfg.runner.tick_ms.max(1);
    let mut printer = Printer::new(json);
    let mut pending = rows.iter().peekable();
    let mut t: u64 = 0;
    tracing::info!(rows = rows.len(), end_ms = end, tick_ms = step, "simulation started");

    loop {
        while let Some(row) = pending.next_if(|r| r.at_ms <= t) {
            apply_row(&mut ctl, &io, &estop, row)?;
        }
        let now = Millis::try_from(t)
            .map_err(|_| eyre!("simulated time {t} ms overflows the millisecond clock"))?;
        clock.set(now);
        ctl.tick(printer.at(t));
        if t >= end {
            break;
        }
        t = t.saturating_add(step);
    }

    let lockout = ctl.lockout();
    tracing::info!(
        end_ms = t,
        events = printer.count(),
        lockout = lockout.active,
        cause = ?lockout.cause,
        "simulation finished"
    );
    Ok(())
}
