use dosa_core::mocks::MemoryIo;
use dosa_core::{BuildError, Controller, DoseControlInputs, PinMap};
use dosa_traits::PinId;

fn pins() -> PinMap {
    PinMap {
        mixture_valve: PinId(3),
        ph_valve: PinId(4),
        nutrient_a_valve: PinId(5),
        nutrient_b_valve: PinId(6),
        emergency_stop: PinId(17),
        lockout_led: PinId(9),
    }
}

#[test]
fn missing_io_is_reported() {
    let err = Controller::<MemoryIo>::builder()
        .with_pins(pins())
        .build()
        .expect_err("should fail without io");
    assert_eq!(err.downcast_ref::<BuildError>(), Some(&BuildError::MissingIo));
}

#[test]
fn missing_pins_is_reported() {
    let err = Controller::builder()
        .with_io(MemoryIo::new())
        .build()
        .expect_err("should fail without pins");
    assert_eq!(err.downcast_ref::<BuildError>(), Some(&BuildError::MissingPins));
}

#[test]
fn duplicate_pin_names_both_lines() {
    let mut p = pins();
    p.emergency_stop = p.ph_valve;
    let err = Controller::builder()
        .with_io(MemoryIo::new())
        .with_pins(p)
        .build()
        .expect_err("duplicate pin");
    assert_eq!(
        err.downcast_ref::<BuildError>(),
        Some(&BuildError::DuplicatePin {
            pin: PinId(4),
            first: "ph_valve",
            second: "emergency_stop",
        })
    );
    assert!(err.to_string().contains("pin 4"));
}

#[test]
fn unset_pins_are_allowed_and_skipped_at_init() {
    let io = MemoryIo::new();
    let mut p = pins();
    p.mixture_valve = PinId::UNSET;
    p.lockout_led = PinId::UNSET;
    let ctl = Controller::builder()
        .with_io(io.clone())
        .with_pins(p)
        .build()
        .expect("unset pins are a warning, not an error");
    assert_eq!(io.level(PinId::UNSET), None);
    for pin in [4, 5, 6] {
        assert_eq!(io.level(PinId(pin)), Some(false), "pin {pin} driven low");
    }
    assert_eq!(io.level(PinId(17)), None, "inputs are never written");
    assert!(!ctl.lockout().active);
}

#[test]
fn non_finite_dose_amount_is_rejected() {
    let mut inputs = DoseControlInputs::default();
    inputs.set_dose_amount_l(f32::INFINITY);
    let err = Controller::builder()
        .with_io(MemoryIo::new())
        .with_pins(pins())
        .with_inputs(inputs)
        .build()
        .expect_err("bad amount");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}
