//! Bull/Bear regime backtesting.
//!
//! Classifies each daily return of a price history as Bull or Bear from
//! trailing momentum and volatility, holds the asset only in Bull, and
//! compares the resulting equity curve against buy-and-hold.

pub mod backtest;
pub mod data;
pub mod metrics;
pub mod regime;
pub mod report;
pub mod settings;
pub mod sweep;
pub mod validation;

// Re-export commonly used types
pub use backtest::{
    run_backtest, BacktestConfig, BacktestEngine, BacktestError, BacktestRequest, BacktestResult,
    ChartRow,
};
pub use data::{PricePoint, PriceSeries, PriceLoader};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use regime::{Regime, RegimeClassifier, RegimeDetector};
pub use sweep::{SensitivitySweep, SweepResult};
