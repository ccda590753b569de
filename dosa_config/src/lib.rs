#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and scenario parsing for the dosing controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Scenario CSV loader enforces headers and ordering for `dosa simulate`.
use serde::Deserialize;

/// Default watchdog limit for a single valve-open interval (2 minutes).
pub const DEFAULT_SAFETY_TIMEOUT_MS: u32 = 120_000;

/// Output and input pin assignments (BCM numbers). 0 means "not wired".
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Pins {
    pub mixture_valve: u8,
    pub ph_valve: u8,
    pub nutrient_a_valve: u8,
    pub nutrient_b_valve: u8,
    pub emergency_stop: u8,
    pub lockout_led: u8,
}

impl Pins {
    /// Output pins with their names, in initialization order.
    pub fn outputs(&self) -> [(&'static str, u8); 5] {
        [
            ("lockout_led", self.lockout_led),
            ("mixture_valve", self.mixture_valve),
            ("ph_valve", self.ph_valve),
            ("nutrient_a_valve", self.nutrient_a_valve),
            ("nutrient_b_valve", self.nutrient_b_valve),
        ]
    }
}

/// Initial dosing parameters. Everything except `dose_amount_l` can be
/// changed at runtime through the command channel.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Dosing {
    /// Nutrient volume dispensed per EC dose (litres)
    pub dose_amount_l: f32,
    pub flow_rate_lpm: f32,
    /// Share of the EC dose delivered through the nutrient-A valve, percent
    #[serde(alias = "ratio_of_a_to_b")]
    pub ratio_a_to_b_pct: f32,
    pub ph_dose_time_s: u32,
}

impl Default for Dosing {
    fn default() -> Self {
        Self {
            dose_amount_l: 1.0,
            flow_rate_lpm: 0.0,
            ratio_a_to_b_pct: 0.0,
            ph_dose_time_s: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Longest a dosing valve may stay open before lockout (ms)
    #[serde(alias = "safety_timeout_ms")]
    pub safety_timeout_limit_ms: u32,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            safety_timeout_limit_ms: DEFAULT_SAFETY_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EstopCfg {
    /// Treat low level as pressed when true
    pub active_low: bool,
}

impl Default for EstopCfg {
    fn default() -> Self {
        Self { active_low: true }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Control tick period in milliseconds
    pub tick_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self { tick_ms: 100 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pins: Pins,
    #[serde(default)]
    pub dosing: Dosing,
    #[serde(default)]
    pub safety: Safety,
    #[serde(default)]
    pub estop: EstopCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Dosing
        if !self.dosing.dose_amount_l.is_finite() || self.dosing.dose_amount_l < 0.0 {
            eyre::bail!("dosing.dose_amount_l must be a finite value >= 0");
        }
        if !self.dosing.flow_rate_lpm.is_finite() || self.dosing.flow_rate_lpm < 0.0 {
            eyre::bail!("dosing.flow_rate_lpm must be a finite value >= 0");
        }
        if !(0.0..=100.0).contains(&self.dosing.ratio_a_to_b_pct) {
            eyre::bail!("dosing.ratio_a_to_b_pct must be in [0, 100]");
        }
        if self.dosing.ph_dose_time_s > 60 * 60 {
            eyre::bail!("dosing.ph_dose_time_s is unreasonably large (>1h)");
        }

        // Safety
        if self.safety.safety_timeout_limit_ms > 24 * 60 * 60 * 1000 {
            eyre::bail!("safety.safety_timeout_limit_ms is unreasonably large (>24h)");
        }

        // Runner
        if self.runner.tick_ms == 0 {
            eyre::bail!("runner.tick_ms must be >= 1");
        }
        if self.runner.tick_ms > 10_000 {
            eyre::bail!("runner.tick_ms is unreasonably large (>10s)");
        }

        // Pins: two outputs on one line would open valves together
        let outputs = self.pins.outputs();
        for (i, (name_a, pin_a)) in outputs.iter().enumerate() {
            if *pin_a == 0 {
                continue;
            }
            for (name_b, pin_b) in &outputs[i + 1..] {
                if pin_a == pin_b {
                    eyre::bail!("pins.{name_a} and pins.{name_b} share pin {pin_a}");
                }
            }
            if *pin_a == self.pins.emergency_stop {
                eyre::bail!("pins.{name_a} and pins.emergency_stop share pin {pin_a}");
            }
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly");
        }

        Ok(())
    }
}

/// One row of a simulation scenario.
///
/// Expected headers:
/// at_ms,topic,payload
///
/// Example:
/// at_ms,topic,payload
/// 0,control/flow-rate-lpm,2.0
/// 0,control/ratio-of-A-to-B-%,75
/// 100,control/ec-dose,1
/// 5000,estop,1
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ScenarioRow {
    pub at_ms: u64,
    pub topic: String,
    pub payload: String,
}

pub fn load_scenario_csv(path: &std::path::Path) -> eyre::Result<Vec<ScenarioRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(|e| eyre::eyre!("open scenario CSV {:?}: {}", path, e))?;
    read_scenario(rdr, &format!("{path:?}"))
}

/// Parse scenario CSV text (same rules as [`load_scenario_csv`]).
pub fn parse_scenario_csv(text: &str) -> eyre::Result<Vec<ScenarioRow>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(text.as_bytes());
    read_scenario(rdr, "<inline>")
}

fn read_scenario<R: std::io::Read>(
    mut rdr: csv::Reader<R>,
    origin: &str,
) -> eyre::Result<Vec<ScenarioRow>> {
    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {}: {}", origin, e))?
        .clone();
    let expected = ["at_ms", "topic", "payload"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "scenario CSV must have headers 'at_ms,topic,payload', got: {}",
            actual.join(",")
        );
    }

    let mut rows: Vec<ScenarioRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<ScenarioRow>().enumerate() {
        let row = match rec {
            Ok(row) => row,
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        };
        if let Some(prev) = rows.last()
            && row.at_ms < prev.at_ms
        {
            eyre::bail!(
                "scenario rows must be in time order (row {} at {} ms after {} ms)",
                idx + 2,
                row.at_ms,
                prev.at_ms
            );
        }
        rows.push(row);
    }
    Ok(rows)
}
