//! Runtime configuration for the controller.
//!
//! Separate from the TOML-deserialized config in `dosa_config`; see
//! `conversions` for the mapping.

use dosa_traits::PinId;

use crate::valve::ValveRole;

/// Pin assignment for every line the controller touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinMap {
    pub mixture_valve: PinId,
    pub ph_valve: PinId,
    pub nutrient_a_valve: PinId,
    pub nutrient_b_valve: PinId,
    pub emergency_stop: PinId,
    pub lockout_led: PinId,
}

impl PinMap {
    pub fn valve(&self, role: ValveRole) -> PinId {
        match role {
            ValveRole::Mixture => self.mixture_valve,
            ValveRole::Ph => self.ph_valve,
            ValveRole::NutrientA => self.nutrient_a_valve,
            ValveRole::NutrientB => self.nutrient_b_valve,
        }
    }

    /// Output pins with their names, in initialization order.
    pub fn outputs(&self) -> [(&'static str, PinId); 5] {
        [
            ("lockout_led", self.lockout_led),
            ("mixture_valve", self.mixture_valve),
            ("ph_valve", self.ph_valve),
            ("nutrient_a_valve", self.nutrient_a_valve),
            ("nutrient_b_valve", self.nutrient_b_valve),
        ]
    }

    /// Every pin, inputs included.
    pub fn all(&self) -> [(&'static str, PinId); 6] {
        let [a, b, c, d, e] = self.outputs();
        [a, b, c, d, e, ("emergency_stop", self.emergency_stop)]
    }
}

/// Controller behavior switches that are not operator inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosaSettings {
    /// Emergency stop counts as pressed when its pin reads low.
    pub estop_active_low: bool,
}

impl Default for DosaSettings {
    fn default() -> Self {
        Self {
            estop_active_low: true,
        }
    }
}
