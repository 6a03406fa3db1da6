//! Core backtesting engine.
//!
//! Runs one end-to-end backtest:
//! 1. Validate the request
//! 2. Derive daily returns from close prices
//! 3. Classify a regime for every return
//! 4. Simulate strategy and buy-and-hold equity
//! 5. Compute metrics for both curves
//! 6. Assemble per-date chart rows

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::data::{PriceSeries, ReturnSeries};
use crate::metrics::{
    MetricsCalculator, MetricsConfig, MetricsError, PerformanceMetrics, StrategyMetrics,
};
use crate::regime::{regime_stats, Regime, RegimeClassifier, RegimeClassifierConfig, RegimeStats};
use crate::validation::validate_request;

use super::simulator::Simulator;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacktestError {
    #[error("Insufficient historical data: need at least {required} price points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Math domain error: {0}")]
    MathDomain(#[from] MetricsError),
}

/// Configuration for backtest execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Fewest price points a run accepts.
    pub min_price_points: usize,

    /// Smallest allocation change counted as a trade.
    pub trade_threshold: f64,

    /// Regime classifier thresholds.
    pub classifier: RegimeClassifierConfig,

    /// Metric constants.
    pub metrics: MetricsConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            min_price_points: 50,
            trade_threshold: 0.01,
            classifier: RegimeClassifierConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Inputs of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    /// Ticker symbol, already case-normalized by the caller.
    pub ticker: String,

    /// Regime sensitivity; larger values lengthen the lookback window.
    pub sensitivity: u32,

    /// Chronological close prices.
    pub prices: PriceSeries,
}

impl BacktestRequest {
    pub fn new(ticker: impl Into<String>, sensitivity: u32, prices: PriceSeries) -> Self {
        Self {
            ticker: ticker.into(),
            sensitivity,
            prices,
        }
    }

    /// Same ticker and prices with another sensitivity.
    pub fn with_sensitivity(&self, sensitivity: u32) -> Self {
        Self {
            sensitivity,
            ..self.clone()
        }
    }
}

/// One row of the per-date output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRow {
    pub date: NaiveDate,
    pub price: f64,
    /// Regime that set this row's allocation. Row 0 is always Bull.
    pub regime: Regime,
    pub allocation: f64,
    pub strategy_equity: f64,
    pub buy_and_hold_equity: f64,
}

/// Result of a completed backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    /// Ticker tested.
    pub ticker: String,

    /// Sensitivity used.
    pub sensitivity: u32,

    /// Strategy and buy-and-hold metrics.
    pub metrics: PerformanceMetrics,

    /// One row per price point.
    pub chart_data: Vec<ChartRow>,

    /// First close price.
    pub start_price: f64,

    /// Last close price.
    pub end_price: f64,
}

impl BacktestResult {
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.chart_data.first().map(|r| r.date)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.chart_data.last().map(|r| r.date)
    }

    pub fn strategy_equity(&self) -> Vec<f64> {
        self.chart_data.iter().map(|r| r.strategy_equity).collect()
    }

    pub fn buy_and_hold_equity(&self) -> Vec<f64> {
        self.chart_data.iter().map(|r| r.buy_and_hold_equity).collect()
    }

    /// Regime per return observation, excluding the row 0 placeholder.
    pub fn regimes(&self) -> Vec<Regime> {
        self.chart_data.iter().skip(1).map(|r| r.regime).collect()
    }

    /// Per-regime statistics over the classified returns.
    pub fn regime_stats(&self) -> HashMap<Regime, RegimeStats> {
        let prices: Vec<f64> = self.chart_data.iter().map(|r| r.price).collect();
        let returns = ReturnSeries::from_prices(&prices);
        regime_stats(&self.regimes(), returns.as_slice())
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let strategy = &self.metrics.strategy;
        let s = &strategy.performance;
        let b = &self.metrics.buy_and_hold;
        let range = match (self.start_date(), self.end_date()) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            _ => "no data".to_string(),
        };

        format!(
            "Regime Backtest: {} (sensitivity {}, {})\n\
             ----------------------------------------\n\
             Strategy Performance\n\
             \x20 Cumulative Return: {:.2}%\n\
             \x20 Annualized Return: {:.2}%\n\
             \x20 Volatility: {:.2}%\n\
             \x20 Sharpe Ratio: {:.3}\n\
             \x20 Max Drawdown: {:.2}%\n\
             \x20 Trade Count: {}\n\
             \x20 Annual Turnover: {:.1}%\n\
             \n\
             Buy & Hold Performance\n\
             \x20 Cumulative Return: {:.2}%\n\
             \x20 Annualized Return: {:.2}%\n\
             \x20 Volatility: {:.2}%\n\
             \x20 Sharpe Ratio: {:.3}\n\
             \x20 Max Drawdown: {:.2}%\n\
             \n\
             Price: {:.2} -> {:.2}",
            self.ticker,
            self.sensitivity,
            range,
            s.cumulative_return * 100.0,
            s.annualized_return * 100.0,
            s.volatility * 100.0,
            s.sharpe_ratio,
            s.max_drawdown * 100.0,
            strategy.trade_count,
            strategy.turnover * 100.0,
            b.cumulative_return * 100.0,
            b.annualized_return * 100.0,
            b.volatility * 100.0,
            b.sharpe_ratio,
            b.max_drawdown * 100.0,
            self.start_price,
            self.end_price,
        )
    }
}

/// The main backtesting engine.
///
/// Holds configuration only; every run is independent, so one engine can
/// be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: BacktestConfig,
    classifier: RegimeClassifier,
    calculator: MetricsCalculator,
    simulator: Simulator,
}

impl BacktestEngine {
    /// Create a new backtest engine.
    pub fn new(config: BacktestConfig) -> Self {
        let classifier = RegimeClassifier::new(config.classifier.clone());
        let calculator = MetricsCalculator::new(config.metrics.clone());
        let simulator = Simulator::new(config.metrics.initial_equity, config.trade_threshold);
        Self {
            config,
            classifier,
            calculator,
            simulator,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run a backtest. Fails without a partial result.
    pub fn run(&self, request: &BacktestRequest) -> Result<BacktestResult, BacktestError> {
        validate_request(request, &self.config)?;

        let points = request.prices.points();
        info!(
            "Running backtest for {}: {} price points, sensitivity {}",
            request.ticker,
            points.len(),
            request.sensitivity
        );

        let prices = request.prices.prices();
        let returns = ReturnSeries::from_prices(&prices);
        let regimes = self
            .classifier
            .classify(returns.as_slice(), request.sensitivity);

        let bear_days = regimes.iter().filter(|r| **r == Regime::Bear).count();
        debug!(
            "Classified {} returns: {} Bull, {} Bear",
            regimes.len(),
            regimes.len() - bear_days,
            bear_days
        );

        let outcome = self
            .simulator
            .simulate(&prices, returns.as_slice(), &regimes)?;

        let strategy = self.calculator.compute(&outcome.strategy_equity)?;
        let buy_and_hold = self.calculator.compute(&outcome.buy_and_hold_equity)?;

        let years = returns.len() as f64 / self.config.metrics.trading_days_per_year;
        let turnover = outcome.total_turnover / years;

        let chart_data = points
            .iter()
            .enumerate()
            .map(|(i, point)| ChartRow {
                date: point.date,
                price: point.price,
                regime: if i == 0 { Regime::Bull } else { regimes[i - 1] },
                allocation: outcome.allocations[i],
                strategy_equity: outcome.strategy_equity[i],
                buy_and_hold_equity: outcome.buy_and_hold_equity[i],
            })
            .collect();

        info!(
            "Backtest complete for {}: {} trades, strategy {:.2}% vs buy-and-hold {:.2}%",
            request.ticker,
            outcome.trade_count,
            strategy.cumulative_return * 100.0,
            buy_and_hold.cumulative_return * 100.0
        );

        Ok(BacktestResult {
            ticker: request.ticker.clone(),
            sensitivity: request.sensitivity,
            metrics: PerformanceMetrics {
                strategy: StrategyMetrics {
                    performance: strategy,
                    turnover,
                    trade_count: outcome.trade_count,
                },
                buy_and_hold,
            },
            chart_data,
            start_price: prices[0],
            end_price: prices[prices.len() - 1],
        })
    }
}

/// Run a backtest with the default configuration.
pub fn run_backtest(request: &BacktestRequest) -> Result<BacktestResult, BacktestError> {
    BacktestEngine::default().run(request)
}
