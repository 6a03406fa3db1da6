//! Sensitivity sweeps.
//!
//! Re-runs one price history across a range of sensitivities and reports
//! which setting produced the best risk-adjusted strategy.

mod runner;

pub use runner::{SensitivitySweep, SweepPoint, SweepResult};
