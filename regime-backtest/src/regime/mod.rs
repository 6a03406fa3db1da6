//! Market regime classification module.
//!
//! Splits market conditions into two regimes from daily returns:
//! - Bear: trailing momentum below -2%, or annualized volatility above 30%
//! - Bull: everything else, including windows too short to judge

pub mod classifier;
pub mod detector;

pub use classifier::{
    regime_stats, Regime, RegimeClassifier, RegimeClassifierConfig, RegimeStats, WindowStats,
};
pub use detector::{RegimeDetector, RollingWindow};
