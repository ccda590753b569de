#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core dosing logic (hardware-agnostic).
//!
//! This crate decides, once per control tick, which of the four valves of a
//! fertigation rig (mixture, pH, nutrient A, nutrient B) are open. All
//! hardware interaction goes through `dosa_traits::DigitalIo` and time comes
//! from `dosa_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Watchdogs**: one `SafetyTimer` per dosing valve (`safety_timer`)
//! - **Timing**: flow rate and A:B ratio to open durations (`timing`)
//! - **Dose cycles**: Idle/Starting/Running/Ending per branch (`dose_cycle`)
//! - **Lockout**: latched, cause-attributed arbitration (`lockout`)
//! - **Orchestration**: the fixed per-tick order (`controller`)
//! - **Status**: edge-triggered events for publication (`status`)
//! - **Ingestion**: control-channel topics to typed commands (`ingest`)
//!
//! Time is a wrapping `u32` millisecond counter; all elapsed-time math uses
//! wrapping subtraction.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod dose_cycle;
pub mod error;
pub mod ingest;
pub mod inputs;
pub mod lockout;
pub mod mixture;
pub mod mocks;
pub mod safety_timer;
pub mod status;
pub mod timing;
pub mod util;
pub mod valve;

pub use builder::ControllerBuilder;
pub use config::{DosaSettings, PinMap};
pub use controller::{Controller, TickReport};
pub use dose_cycle::{DoseRole, DoseState};
pub use error::{BuildError, CommandError, Result};
pub use ingest::Command;
pub use inputs::DoseControlInputs;
pub use lockout::{CauseFlags, LockoutCause, LockoutStatus};
pub use status::{FnSink, NullSink, StatusEvent, StatusField, StatusSink, StatusValue};
pub use timing::DoseTimings;
pub use valve::ValveRole;
