//! Regime allocation backtesting.
//!
//! This module runs the binary Bull/Bear allocation strategy against a
//! buy-and-hold benchmark:
//! - Equity simulation with trade and turnover tracking
//! - End-to-end orchestration from prices to a finished result

pub mod engine;
pub mod simulator;

pub use engine::{
    run_backtest, BacktestConfig, BacktestEngine, BacktestError, BacktestRequest, BacktestResult,
    ChartRow,
};
pub use simulator::{SimulationOutcome, Simulator};
