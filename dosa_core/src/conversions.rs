//! `From` implementations bridging `dosa_config` types to `dosa_core` types.

use dosa_traits::PinId;

use crate::config::{DosaSettings, PinMap};
use crate::inputs::DoseControlInputs;

impl From<&dosa_config::Pins> for PinMap {
    fn from(p: &dosa_config::Pins) -> Self {
        Self {
            mixture_valve: PinId(p.mixture_valve),
            ph_valve: PinId(p.ph_valve),
            nutrient_a_valve: PinId(p.nutrient_a_valve),
            nutrient_b_valve: PinId(p.nutrient_b_valve),
            emergency_stop: PinId(p.emergency_stop),
            lockout_led: PinId(p.lockout_led),
        }
    }
}

impl From<&dosa_config::Config> for DosaSettings {
    fn from(c: &dosa_config::Config) -> Self {
        Self {
            estop_active_low: c.estop.active_low,
        }
    }
}

/// Boot-time inputs: configured dosing parameters, no triggers raised.
impl From<&dosa_config::Config> for DoseControlInputs {
    fn from(c: &dosa_config::Config) -> Self {
        let mut inputs = Self::default();
        inputs.set_dose_amount_l(c.dosing.dose_amount_l);
        inputs.set_flow_rate_lpm(c.dosing.flow_rate_lpm);
        inputs.set_ratio_a_to_b_pct(c.dosing.ratio_a_to_b_pct);
        inputs.set_ph_dose_time_s(c.dosing.ph_dose_time_s);
        inputs.set_safety_timeout_limit_ms(c.safety.safety_timeout_limit_ms);
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_maps_onto_runtime_types() {
        let cfg = dosa_config::load_toml(
            r#"
            [pins]
            ph_valve = 4
            emergency_stop = 17
            [dosing]
            flow_rate_lpm = 2.0
            ratio_a_to_b_pct = 75.0
            [safety]
            safety_timeout_ms = 5000
            [estop]
            active_low = false
            "#,
        )
        .expect("parse");
        let pins = PinMap::from(&cfg.pins);
        assert_eq!(pins.ph_valve, PinId(4));
        assert_eq!(pins.emergency_stop, PinId(17));
        assert!(pins.mixture_valve.is_unset());

        assert!(!DosaSettings::from(&cfg).estop_active_low);

        let inputs = DoseControlInputs::from(&cfg);
        assert_eq!(inputs.flow_rate_lpm(), 2.0);
        assert_eq!(inputs.ratio_a_to_b_pct(), 75.0);
        assert_eq!(inputs.dose_amount_l(), 1.0);
        assert_eq!(inputs.safety_timeout_limit_ms(), 5_000);
        assert!(!inputs.needs_to_dose_ec());
    }
}
