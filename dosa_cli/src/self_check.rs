//! `dosa self-check`: build the controller on the configured backend and
//! report what it sees.

use dosa_core::NullSink;
use dosa_traits::MonotonicClock;

use crate::session::{BACKEND, build_controller, open_backend};

pub fn self_check(cfg: &dosa_config::Config, json: bool) -> eyre::Result<()> {
    let io = open_backend(cfg)?;
    let mut ctl = build_controller(cfg, io, Box::new(MonotonicClock::new()))?;
    let report = ctl.tick(&mut NullSink);
    let estop_pressed = report.lockout.latched.emergency_stop;

    if json {
        let pins: serde_json::Map<String, serde_json::Value> = ctl
            .pins()
            .all()
            .iter()
            .map(|(name, pin)| {
                let v = if pin.is_unset() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::from(pin.0)
                };
                ((*name).to_string(), v)
            })
            .collect();
        let obj = serde_json::json!({
            "ok": true,
            "backend": BACKEND,
            "pins": pins,
            "estop_pressed": estop_pressed,
            "safety_timeout_limit_ms": ctl.inputs().safety_timeout_limit_ms(),
        });
        println!("{obj}");
    } else {
        println!("backend: {BACKEND}");
        for (name, pin) in ctl.pins().all() {
            if pin.is_unset() {
                println!("  {name:<17} unset");
            } else {
                println!("  {name:<17} {pin}");
            }
        }
        println!("emergency stop: {}", if estop_pressed { "PRESSED" } else { "released" });
        println!("self-check ok");
    }
    Ok(())
}
