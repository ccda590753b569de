//! Quick Start Example
//!
//! Drives one EC dose through the controller on in-memory pins and a
//! manual clock, printing every status change.
//!
//! Run with `cargo run -p dosa_core --example quick_start`.

use dosa_core::mocks::MemoryIo;
use dosa_core::{Controller, FnSink, PinMap, StatusEvent, ValveRole};
use dosa_traits::{Clock, ManualClock, PinId};

fn main() -> Result<(), eyre::Report> {
    let clock = ManualClock::new();
    let mut ctl = Controller::builder()
        .with_io(MemoryIo::new())
        .with_pins(PinMap {
            mixture_valve: PinId(3),
            ph_valve: PinId(4),
            nutrient_a_valve: PinId(5),
            nutrient_b_valve: PinId(6),
            emergency_stop: PinId(17),
            lockout_led: PinId(9),
        })
        .with_clock(Box::new(clock.clone()))
        .build()?;

    // 1 L at 2 L/min, three quarters through valve A
    ctl.handle_message("control/flow-rate-lpm", "2")?;
    ctl.handle_message("control/ratio-of-A-to-B-%", "75")?;
    ctl.handle_message("control/ec-dose", "1")?;

    let mut print = FnSink(|ev: StatusEvent| println!("{:>6} ms  {ev}", clock.now_ms()));
    while clock.now_ms() <= 25_000 {
        ctl.tick(&mut print);
        clock.advance(100);
    }

    println!(
        "nutrient A open: {}, B open: {}, lockout: {}",
        ctl.valve_open(ValveRole::NutrientA),
        ctl.valve_open(ValveRole::NutrientB),
        ctl.lockout().active
    );
    Ok(())
}
