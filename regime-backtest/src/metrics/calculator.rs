//! Performance metrics calculator.
//!
//! Computes return, risk and drawdown statistics from an equity curve
//! normalized to a fixed starting value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Equity curve needs at least 2 points, got {len}")]
    TooShort { len: usize },

    #[error("Equity must be positive, got {value} at index {index}")]
    NonPositiveEquity { index: usize, value: f64 },

    #[error("Cannot annualize a cumulative return of {cumulative_return} (terminal wealth below zero)")]
    NegativeTerminalWealth { cumulative_return: f64 },
}

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Value every equity curve starts from.
    pub initial_equity: f64,
    /// Annual risk-free rate subtracted in the Sharpe ratio.
    pub risk_free_rate: f64,
    /// Trading days per year, used for annualization.
    pub trading_days_per_year: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            initial_equity: 100.0,
            risk_free_rate: 0.02,
            trading_days_per_year: 252.0,
        }
    }
}

/// Metrics for a single equity curve. All values are fractions, not percentages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SinglePerformanceMetrics {
    pub cumulative_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

/// Strategy metrics, extended with trading activity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyMetrics {
    #[serde(flatten)]
    pub performance: SinglePerformanceMetrics,
    /// Annualized sum of absolute allocation changes.
    pub turnover: f64,
    pub trade_count: usize,
}

/// Strategy and benchmark metrics side by side.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub strategy: StrategyMetrics,
    pub buy_and_hold: SinglePerformanceMetrics,
}

impl PerformanceMetrics {
    /// Strategy cumulative return minus benchmark cumulative return.
    pub fn excess_return(&self) -> f64 {
        self.strategy.performance.cumulative_return - self.buy_and_hold.cumulative_return
    }
}

/// Drawdown analysis details. Indices refer to positions in the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    pub max_drawdown: f64,
    pub peak_index: usize,
    pub trough_index: usize,
    /// First index at or above the peak after the trough, if any.
    pub recovery_index: Option<usize>,
    /// Number of distinct stretches spent below a running peak.
    pub drawdown_periods: usize,
}

/// Metrics calculator.
#[derive(Debug, Clone, Default)]
pub struct MetricsCalculator {
    config: MetricsConfig,
}

impl MetricsCalculator {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Calculate all metrics for an equity curve.
    pub fn compute(&self, equity: &[f64]) -> Result<SinglePerformanceMetrics, MetricsError> {
        if equity.len() < 2 {
            return Err(MetricsError::TooShort { len: equity.len() });
        }
        if let Some((index, &value)) = equity.iter().enumerate().find(|(_, v)| !(**v > 0.0)) {
            return Err(MetricsError::NonPositiveEquity { index, value });
        }

        let base = self.config.initial_equity;
        let last = equity[equity.len() - 1];
        let cumulative_return = (last - base) / base;
        let annualized_return = self.annualized_return(cumulative_return, equity.len())?;

        let volatility = self.annualized_volatility(&Self::daily_returns(equity));
        let sharpe_ratio = self.sharpe_ratio(annualized_return, volatility);
        let max_drawdown = Self::max_drawdown(equity);

        Ok(SinglePerformanceMetrics {
            cumulative_return,
            annualized_return,
            volatility,
            sharpe_ratio,
            max_drawdown,
        })
    }

    /// Compound a cumulative return over `points` observations into a yearly rate.
    pub fn annualized_return(
        &self,
        cumulative_return: f64,
        points: usize,
    ) -> Result<f64, MetricsError> {
        let growth = 1.0 + cumulative_return;
        if growth < 0.0 {
            return Err(MetricsError::NegativeTerminalWealth { cumulative_return });
        }
        if points == 0 {
            return Err(MetricsError::TooShort { len: points });
        }

        let years = points as f64 / self.config.trading_days_per_year;
        Ok(growth.powf(1.0 / years) - 1.0)
    }

    /// Step-to-step returns of an equity curve.
    pub fn daily_returns(equity: &[f64]) -> Vec<f64> {
        equity.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect()
    }

    /// Annualized volatility from the population variance of daily returns.
    pub fn annualized_volatility(&self, returns: &[f64]) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        (variance * self.config.trading_days_per_year).sqrt()
    }

    /// Excess return per unit of volatility; zero when volatility is zero.
    pub fn sharpe_ratio(&self, annualized_return: f64, volatility: f64) -> f64 {
        if volatility > 0.0 {
            (annualized_return - self.config.risk_free_rate) / volatility
        } else {
            0.0
        }
    }

    /// Largest peak-to-trough decline as a fraction of the peak.
    pub fn max_drawdown(equity: &[f64]) -> f64 {
        Self::analyze_drawdown(equity).max_drawdown
    }

    /// Analyze drawdown from equity curve.
    pub fn analyze_drawdown(equity: &[f64]) -> DrawdownAnalysis {
        let mut analysis = DrawdownAnalysis {
            max_drawdown: 0.0,
            peak_index: 0,
            trough_index: 0,
            recovery_index: None,
            drawdown_periods: 0,
        };

        let Some(&first) = equity.first() else {
            return analysis;
        };

        let mut peak = first;
        let mut peak_index = 0;
        let mut in_drawdown = false;

        for (i, &value) in equity.iter().enumerate() {
            if value > peak {
                peak = value;
                peak_index = i;
            }

            let drawdown = (peak - value) / peak;
            if drawdown > 0.0 && !in_drawdown {
                analysis.drawdown_periods += 1;
            }
            in_drawdown = drawdown > 0.0;

            if drawdown > analysis.max_drawdown {
                analysis.max_drawdown = drawdown;
                analysis.peak_index = peak_index;
                analysis.trough_index = i;
            }
        }

        if analysis.max_drawdown > 0.0 {
            let peak_value = equity[analysis.peak_index];
            analysis.recovery_index = equity
                .iter()
                .enumerate()
                .skip(analysis.trough_index + 1)
                .find(|(_, v)| **v >= peak_value)
                .map(|(i, _)| i);
        }

        analysis
    }
}
