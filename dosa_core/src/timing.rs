//! Flow rate + A:B ratio to per-branch valve-open durations.
//!
//! total_open_min = dose_amount_l / flow_rate_lpm
//! dose_a_ms      = ratio/100       * total_open_min * 60000
//! dose_b_ms      = (100-ratio)/100 * total_open_min * 60000

use crate::inputs::clamp_ratio_pct;
use crate::util::{MILLIS_PER_MIN, ms_from_f64};

/// Derived open times for the two nutrient valves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoseTimings {
    pub dose_a_ms: u32,
    pub dose_b_ms: u32,
}

/// Memoized timing calculator: produces new timings only when the ratio
/// moves, and stays silent without a positive flow rate.
#[derive(Debug, Clone, Default)]
pub struct RatioTimeCalculator {
    last_ratio_pct: f32,
}

impl RatioTimeCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ratio (clamped) that produced the current timings.
    pub fn last_ratio_pct(&self) -> f32 {
        self.last_ratio_pct
    }

    /// New timings if `ratio_pct` differs from the last one used.
    ///
    /// With `flow_rate_lpm <= 0` nothing is computed and the ratio is not
    /// recorded, so the change is picked up once a flow rate arrives.
    #[allow(clippy::float_cmp)]
    pub fn recompute(
        &mut self,
        ratio_pct: f32,
        flow_rate_lpm: f32,
        dose_amount_l: f32,
    ) -> Option<DoseTimings> {
        if flow_rate_lpm <= 0.0 || flow_rate_lpm.is_nan() || !ratio_pct.is_finite() {
            return None;
        }
        let ratio = clamp_ratio_pct(ratio_pct);
        if ratio == self.last_ratio_pct {
            return None;
        }
        self.last_ratio_pct = ratio;

        let total_open_min = f64::from(dose_amount_l) / f64::from(flow_rate_lpm);
        let a_share = f64::from(ratio) / 100.0;
        let b_share = (100.0 - f64::from(ratio)) / 100.0;
        let timings = DoseTimings {
            dose_a_ms: ms_from_f64(a_share * total_open_min * MILLIS_PER_MIN),
            dose_b_ms: ms_from_f64(b_share * total_open_min * MILLIS_PER_MIN),
        };
        tracing::debug!(
            ratio_pct = ratio,
            flow_rate_lpm,
            dose_amount_l,
            dose_a_ms = timings.dose_a_ms,
            dose_b_ms = timings.dose_b_ms,
            "dose timings recomputed"
        );
        Some(timings)
    }
}
