//! Parallel sensitivity sweep.
//!
//! Runs the same price history once per sensitivity and ranks the
//! settings by strategy Sharpe ratio.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backtest::{BacktestConfig, BacktestEngine, BacktestError, BacktestRequest, BacktestResult};

/// Condensed result of one sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepPoint {
    pub sensitivity: u32,
    pub cumulative_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub trade_count: usize,
    pub turnover: f64,
}

impl From<&BacktestResult> for SweepPoint {
    fn from(result: &BacktestResult) -> Self {
        let strategy = &result.metrics.strategy;
        Self {
            sensitivity: result.sensitivity,
            cumulative_return: strategy.performance.cumulative_return,
            annualized_return: strategy.performance.annualized_return,
            volatility: strategy.performance.volatility,
            sharpe_ratio: strategy.performance.sharpe_ratio,
            max_drawdown: strategy.performance.max_drawdown,
            trade_count: strategy.trade_count,
            turnover: strategy.turnover,
        }
    }
}

/// Sweep results, ordered by sensitivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    pub ticker: String,
    pub points: Vec<SweepPoint>,
    /// Buy-and-hold Sharpe ratio, identical for every sensitivity.
    pub buy_and_hold_sharpe: f64,
}

impl SweepResult {
    /// Highest strategy Sharpe ratio; ties go to the lowest sensitivity.
    pub fn best(&self) -> Option<&SweepPoint> {
        self.points.iter().fold(None, |best: Option<&SweepPoint>, p| match best {
            Some(b) if b.sharpe_ratio >= p.sharpe_ratio => Some(b),
            _ => Some(p),
        })
    }

    /// Generate a per-sensitivity table.
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Sensitivity sweep: {}\n\
             {:>5} {:>10} {:>10} {:>8} {:>8} {:>7}\n",
            self.ticker, "q", "return%", "vol%", "sharpe", "maxdd%", "trades"
        );
        for p in &self.points {
            out.push_str(&format!(
                "{:>5} {:>10.2} {:>10.2} {:>8.3} {:>8.2} {:>7}\n",
                p.sensitivity,
                p.cumulative_return * 100.0,
                p.volatility * 100.0,
                p.sharpe_ratio,
                p.max_drawdown * 100.0,
                p.trade_count
            ));
        }
        out.push_str(&format!("Buy & hold Sharpe: {:.3}\n", self.buy_and_hold_sharpe));
        if let Some(best) = self.best() {
            out.push_str(&format!(
                "Best sensitivity: {} (Sharpe {:.3})",
                best.sensitivity, best.sharpe_ratio
            ));
        }
        out
    }
}

/// Runs one backtest per sensitivity in parallel.
#[derive(Debug, Clone, Default)]
pub struct SensitivitySweep {
    engine: BacktestEngine,
}

impl SensitivitySweep {
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            engine: BacktestEngine::new(config),
        }
    }

    /// Sweep `sensitivities` over the prices of `template`.
    ///
    /// The template's own sensitivity is ignored. The first failing run
    /// fails the whole sweep.
    pub fn run(
        &self,
        template: &BacktestRequest,
        sensitivities: RangeInclusive<u32>,
    ) -> Result<SweepResult, BacktestError> {
        if sensitivities.is_empty() || *sensitivities.start() == 0 {
            return Err(BacktestError::InvalidInput(format!(
                "sensitivity range must be non-empty and start at 1 or above, got {}..={}",
                sensitivities.start(),
                sensitivities.end()
            )));
        }

        let values: Vec<u32> = sensitivities.collect();
        let total = values.len();
        let progress = AtomicUsize::new(0);
        info!(
            "Sweeping {} sensitivities for {} ({} price points)",
            total,
            template.ticker,
            template.prices.len()
        );

        let results: Vec<BacktestResult> = values
            .par_iter()
            .map(|&sensitivity| {
                let result = self.engine.run(&template.with_sensitivity(sensitivity));
                let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
                info!("  Sweep {}/{}: sensitivity {} done", done, total, sensitivity);
                result
            })
            .collect::<Result<_, _>>()?;

        let buy_and_hold_sharpe = results
            .first()
            .map(|r| r.metrics.buy_and_hold.sharpe_ratio)
            .unwrap_or(0.0);

        // par_iter().collect() keeps input order, so points are already sorted.
        let points: Vec<SweepPoint> = results.iter().map(SweepPoint::from).collect();

        let sweep = SweepResult {
            ticker: template.ticker.clone(),
            points,
            buy_and_hold_sharpe,
        };
        if let Some(best) = sweep.best() {
            info!(
                "Best sensitivity for {}: {} (Sharpe {:.3})",
                sweep.ticker, best.sensitivity, best.sharpe_ratio
            );
        }
        Ok(sweep)
    }
}
