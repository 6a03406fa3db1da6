//! Binary allocation simulator.
//!
//! Compounds daily returns into two equity curves: the regime strategy,
//! which holds the asset in Bull and cash in Bear, and a static
//! buy-and-hold benchmark.
//!
//! The regime at return index `i` gates the return at the same index `i`.
//! That regime is estimated from a window that already contains return `i`,
//! so the strategy trades on a same-day signal.

use crate::regime::Regime;

use super::engine::BacktestError;

/// Output of one simulation. All curves have one entry per price.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    pub strategy_equity: Vec<f64>,
    pub buy_and_hold_equity: Vec<f64>,
    /// Allocation per price; the first entry is the initial full allocation.
    pub allocations: Vec<f64>,
    pub trade_count: usize,
    /// Sum of absolute allocation changes.
    pub total_turnover: f64,
}

/// Equity curve simulator.
#[derive(Debug, Clone)]
pub struct Simulator {
    initial_equity: f64,
    trade_threshold: f64,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(100.0, 0.01)
    }
}

impl Simulator {
    /// `trade_threshold` is the smallest allocation change counted as a trade.
    pub fn new(initial_equity: f64, trade_threshold: f64) -> Self {
        Self {
            initial_equity,
            trade_threshold,
        }
    }

    /// Run the allocation policy over a price history.
    ///
    /// `returns` and `regimes` must both be one element shorter than `prices`.
    pub fn simulate(
        &self,
        prices: &[f64],
        returns: &[f64],
        regimes: &[Regime],
    ) -> Result<SimulationOutcome, BacktestError> {
        if prices.is_empty() {
            return Err(BacktestError::InvalidInput(
                "cannot simulate an empty price history".to_string(),
            ));
        }
        if returns.len() + 1 != prices.len() || regimes.len() != returns.len() {
            return Err(BacktestError::InvalidInput(format!(
                "length mismatch: {} prices, {} returns, {} regimes",
                prices.len(),
                returns.len(),
                regimes.len()
            )));
        }

        let n = prices.len();
        let mut strategy_equity = Vec::with_capacity(n);
        let mut buy_and_hold_equity = Vec::with_capacity(n);
        let mut allocations = Vec::with_capacity(n);

        let mut strategy = self.initial_equity;
        let mut buy_and_hold = self.initial_equity;
        strategy_equity.push(strategy);
        buy_and_hold_equity.push(buy_and_hold);
        allocations.push(1.0);

        let mut prev_allocation = 1.0;
        let mut trade_count = 0;
        let mut total_turnover = 0.0;

        for (&ret, regime) in returns.iter().zip(regimes) {
            let allocation = regime.allocation();

            let change = (allocation - prev_allocation).abs();
            if change > self.trade_threshold {
                trade_count += 1;
                total_turnover += change;
            }

            strategy *= 1.0 + ret * allocation;
            buy_and_hold *= 1.0 + ret;

            strategy_equity.push(strategy);
            buy_and_hold_equity.push(buy_and_hold);
            allocations.push(allocation);
            prev_allocation = allocation;
        }

        Ok(SimulationOutcome {
            strategy_equity,
            buy_and_hold_equity,
            allocations,
            trade_count,
            total_turnover,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReturnSeries;
    use Regime::*;

    const PRICES: [f64; 6] = [100.0, 102.0, 99.0, 101.0, 104.0, 103.0];

    fn returns() -> Vec<f64> {
        ReturnSeries::from_prices(&PRICES).as_slice().to_vec()
    }

    #[test]
    fn test_all_bull_tracks_buy_and_hold() {
        let outcome = Simulator::default()
            .simulate(&PRICES, &returns(), &[Bull; 5])
            .unwrap();
        assert_eq!(outcome.strategy_equity, outcome.buy_and_hold_equity);
        assert_eq!(outcome.trade_count, 0);
        assert_eq!(outcome.total_turnover, 0.0);
        assert_eq!(outcome.allocations, vec![1.0; 6]);
    }

    #[test]
    fn test_all_bear_stays_in_cash() {
        let outcome = Simulator::default()
            .simulate(&PRICES, &returns(), &[Bear; 5])
            .unwrap();
        assert!(outcome.strategy_equity.iter().all(|&e| e == 100.0));
        // Leaving the market at the first observation is one trade.
        assert_eq!(outcome.trade_count, 1);
        assert_eq!(outcome.total_turnover, 1.0);
        assert_eq!(outcome.allocations, vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let last = *outcome.buy_and_hold_equity.last().unwrap();
        assert!((last - 103.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_index_alignment() {
        // Bear on the one losing day avoids exactly that day's loss.
        let regimes = [Bull, Bear, Bull, Bull, Bull];
        let outcome = Simulator::default()
            .simulate(&PRICES, &returns(), &regimes)
            .unwrap();

        assert_eq!(outcome.strategy_equity[1], outcome.buy_and_hold_equity[1]);
        assert_eq!(outcome.strategy_equity[2], outcome.strategy_equity[1]);
        assert!(outcome.buy_and_hold_equity[2] < outcome.buy_and_hold_equity[1]);
        assert_eq!(outcome.trade_count, 2);
        assert_eq!(outcome.total_turnover, 2.0);
    }

    #[test]
    fn test_curve_lengths() {
        let outcome = Simulator::default()
            .simulate(&PRICES, &returns(), &[Bull, Bear, Bear, Bull, Bear])
            .unwrap();
        assert_eq!(outcome.strategy_equity.len(), PRICES.len());
        assert_eq!(outcome.buy_and_hold_equity.len(), PRICES.len());
        assert_eq!(outcome.allocations.len(), PRICES.len());
        assert_eq!(outcome.trade_count, 3);
    }

    #[test]
    fn test_single_price() {
        let outcome = Simulator::default().simulate(&[50.0], &[], &[]).unwrap();
        assert_eq!(outcome.strategy_equity, vec![100.0]);
        assert_eq!(outcome.trade_count, 0);
    }

    #[test]
    fn test_length_mismatch() {
        let err = Simulator::default()
            .simulate(&PRICES, &returns(), &[Bull; 4])
            .unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));

        let err = Simulator::default().simulate(&[], &[], &[]).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidInput(_)));
    }
}
