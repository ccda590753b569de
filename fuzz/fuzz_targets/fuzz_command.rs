#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (topic, payload) = data;
    let mut inputs = dosa_core::DoseControlInputs::default();
    if let Ok(cmd) = dosa_core::Command::parse(topic, payload) {
        let _ = cmd.topic();
        cmd.apply(&mut inputs);
        let ratio = inputs.ratio_a_to_b_pct();
        assert!((0.0..=100.0).contains(&ratio));
    }
});
