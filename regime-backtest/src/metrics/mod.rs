//! Performance metrics module.
//!
//! Provides equity-curve statistics for strategy and benchmark:
//! - Cumulative and annualized return
//! - Annualized volatility, Sharpe ratio
//! - Maximum drawdown and drawdown analysis

pub mod calculator;

pub use calculator::{
    DrawdownAnalysis, MetricsCalculator, MetricsConfig, MetricsError, PerformanceMetrics,
    SinglePerformanceMetrics, StrategyMetrics,
};
