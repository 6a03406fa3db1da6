//! Bull/Bear regime classifier.
//!
//! Labels every return observation from the statistics of a lookback
//! window ending at (and including) that observation. This is a fixed
//! threshold rule, not a fitted state model.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Market regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    /// Calm or rising market, fully invested.
    Bull,
    /// Falling or turbulent market, fully in cash.
    Bear,
}

impl Regime {
    /// Fraction of capital held in the risky asset.
    pub fn allocation(&self) -> f64 {
        match self {
            Self::Bull => 1.0,
            Self::Bear => 0.0,
        }
    }

    pub fn is_bull(&self) -> bool {
        matches!(self, Self::Bull)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bull => "Bull",
            Self::Bear => "Bear",
        }
    }

    /// Description of the regime.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Bull => "Non-negative momentum, contained volatility",
            Self::Bear => "Negative momentum or elevated volatility",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regime classifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeClassifierConfig {
    /// Smallest lookback length regardless of sensitivity.
    pub min_window: usize,
    /// Lookback length added per unit of sensitivity.
    pub window_per_sensitivity: usize,
    /// Windows shorter than this are labelled Bull without estimation.
    pub min_observations: usize,
    /// Number of trailing returns summed into momentum.
    pub momentum_lookback: usize,
    /// Momentum strictly below this is Bear.
    pub momentum_threshold: f64,
    /// Annualized volatility strictly above this is Bear.
    pub volatility_threshold: f64,
    /// Annualization factor for daily variance.
    pub trading_days_per_year: f64,
}

impl Default for RegimeClassifierConfig {
    fn default() -> Self {
        Self {
            min_window: 20,
            window_per_sensitivity: 5,
            min_observations: 5,
            momentum_lookback: 10,
            momentum_threshold: -0.02,
            volatility_threshold: 0.30,
            trading_days_per_year: 252.0,
        }
    }
}

impl RegimeClassifierConfig {
    /// Lookback length `W` for a sensitivity. Windows hold up to `W + 1` returns.
    pub fn window_size(&self, sensitivity: u32) -> usize {
        self.min_window
            .max((sensitivity as usize).saturating_mul(self.window_per_sensitivity))
    }

    /// Apply the threshold rule. Either condition alone is sufficient for Bear.
    pub fn label(&self, annualized_volatility: f64, momentum: f64) -> Regime {
        if momentum < self.momentum_threshold || annualized_volatility > self.volatility_threshold
        {
            Regime::Bear
        } else {
            Regime::Bull
        }
    }
}

/// Statistics of one lookback window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub len: usize,
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    pub annualized_volatility: f64,
    pub momentum: f64,
}

/// Batch regime classifier.
#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier {
    config: RegimeClassifierConfig,
}

impl RegimeClassifier {
    /// Create a new classifier.
    pub fn new(config: RegimeClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegimeClassifierConfig {
        &self.config
    }

    /// Label every return. The output has the same length as `returns`.
    pub fn classify(&self, returns: &[f64], sensitivity: u32) -> Vec<Regime> {
        (0..returns.len())
            .map(|i| match self.window_stats(returns, i, sensitivity) {
                Some(stats) => self.config.label(stats.annualized_volatility, stats.momentum),
                None => Regime::Bull,
            })
            .collect()
    }

    /// Statistics of the window ending at `index`.
    ///
    /// Returns `None` when the window holds fewer than `min_observations`
    /// returns or `index` is out of range.
    pub fn window_stats(
        &self,
        returns: &[f64],
        index: usize,
        sensitivity: u32,
    ) -> Option<WindowStats> {
        if index >= returns.len() {
            return None;
        }

        let start = index.saturating_sub(self.config.window_size(sensitivity));
        let window = &returns[start..=index];
        if window.len() < self.config.min_observations {
            return None;
        }

        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let annualized_volatility = (variance * self.config.trading_days_per_year).sqrt();

        let tail = window.len().saturating_sub(self.config.momentum_lookback);
        let momentum = window[tail..].iter().sum::<f64>();

        Some(WindowStats {
            len: window.len(),
            mean,
            variance,
            annualized_volatility,
            momentum,
        })
    }
}

/// Statistics for a regime over a labelled history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeStats {
    pub regime: Regime,
    pub observations: usize,
    pub pct_of_total: f64,
    pub avg_return: f64,
    /// Number of contiguous runs of this regime.
    pub spells: usize,
}

impl RegimeStats {
    fn empty(regime: Regime) -> Self {
        Self {
            regime,
            observations: 0,
            pct_of_total: 0.0,
            avg_return: 0.0,
            spells: 0,
        }
    }
}

/// Summarize a labelled return history per regime.
///
/// `regimes` and `returns` are paired by index; extra elements of the
/// longer slice are ignored.
pub fn regime_stats(regimes: &[Regime], returns: &[f64]) -> HashMap<Regime, RegimeStats> {
    let mut stats: HashMap<Regime, RegimeStats> = HashMap::new();
    let mut previous: Option<Regime> = None;
    let mut total = 0usize;

    for (&regime, &ret) in regimes.iter().zip(returns) {
        let entry = stats
            .entry(regime)
            .or_insert_with(|| RegimeStats::empty(regime));
        entry.observations += 1;
        entry.avg_return += ret;
        if previous != Some(regime) {
            entry.spells += 1;
        }
        previous = Some(regime);
        total += 1;
    }

    for entry in stats.values_mut() {
        entry.avg_return /= entry.observations as f64;
        entry.pct_of_total = entry.observations as f64 / total as f64 * 100.0;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising_returns(n: usize) -> Vec<f64> {
        vec![0.001; n]
    }

    #[test]
    fn test_regime_allocation() {
        assert_eq!(Regime::Bull.allocation(), 1.0);
        assert_eq!(Regime::Bear.allocation(), 0.0);
        assert_eq!(Regime::Bear.to_string(), "Bear");
    }

    #[test]
    fn test_window_size() {
        let config = RegimeClassifierConfig::default();
        assert_eq!(config.window_size(1), 20);
        assert_eq!(config.window_size(3), 20);
        assert_eq!(config.window_size(4), 20);
        assert_eq!(config.window_size(5), 25);
        assert_eq!(config.window_size(10), 50);
    }

    #[test]
    fn test_short_windows_default_to_bull() {
        let classifier = RegimeClassifier::default();
        // Crashing returns, but the first four windows are too short to judge.
        let returns = vec![-0.1; 6];
        let regimes = classifier.classify(&returns, 1);
        assert_eq!(&regimes[..4], &[Regime::Bull; 4]);
        assert_eq!(regimes[4], Regime::Bear);
        assert_eq!(regimes[5], Regime::Bear);
    }

    #[test]
    fn test_calm_uptrend_is_bull() {
        let classifier = RegimeClassifier::default();
        let regimes = classifier.classify(&rising_returns(40), 3);
        assert!(regimes.iter().all(|r| *r == Regime::Bull));
    }

    #[test]
    fn test_negative_momentum_is_bear() {
        let classifier = RegimeClassifier::default();
        // Steady -0.3% per day: no volatility, momentum -0.03 once ten days accrue.
        let returns = vec![-0.003; 12];
        let regimes = classifier.classify(&returns, 1);
        // Momentum over 7 days is -0.021 (< -0.02).
        assert_eq!(regimes[5], Regime::Bull);
        assert_eq!(regimes[6], Regime::Bear);
        assert_eq!(regimes[11], Regime::Bear);
    }

    #[test]
    fn test_high_volatility_is_bear() {
        let classifier = RegimeClassifier::default();
        // Alternating +/-3% has zero-ish momentum and ~48% annualized volatility.
        let returns: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 0.03 } else { -0.03 })
            .collect();
        let stats = classifier.window_stats(&returns, 29, 1).unwrap();
        assert!(stats.momentum.abs() < 1e-12);
        assert!(stats.annualized_volatility > 0.30);
        assert_eq!(classifier.classify(&returns, 1)[29], Regime::Bear);
    }

    #[test]
    fn test_window_slides_at_w_plus_one() {
        let classifier = RegimeClassifier::default();
        let returns = rising_returns(60);
        assert_eq!(classifier.window_stats(&returns, 10, 1).unwrap().len, 11);
        assert_eq!(classifier.window_stats(&returns, 20, 1).unwrap().len, 21);
        assert_eq!(classifier.window_stats(&returns, 59, 1).unwrap().len, 21);
        assert_eq!(classifier.window_stats(&returns, 59, 10).unwrap().len, 51);
        assert!(classifier.window_stats(&returns, 3, 1).is_none());
        assert!(classifier.window_stats(&returns, 60, 1).is_none());
    }

    #[test]
    fn test_population_variance() {
        let classifier = RegimeClassifier::default();
        let returns = [0.01, -0.01, 0.01, -0.01, 0.01];
        let stats = classifier.window_stats(&returns, 4, 1).unwrap();
        let mean = 0.01 / 5.0;
        let expected = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 5.0;
        assert!((stats.mean - mean).abs() < 1e-15);
        assert!((stats.variance - expected).abs() < 1e-15);
    }

    #[test]
    fn test_output_length_matches_input() {
        let classifier = RegimeClassifier::default();
        assert!(classifier.classify(&[], 3).is_empty());
        assert_eq!(classifier.classify(&rising_returns(7), 3).len(), 7);
    }

    #[test]
    fn test_stats_calculation() {
        use Regime::*;
        let regimes = [Bull, Bull, Bear, Bear, Bull];
        let returns = [0.01, 0.03, -0.02, -0.04, 0.01];
        let stats = regime_stats(&regimes, &returns);

        let bull = &stats[&Bull];
        assert_eq!(bull.observations, 3);
        assert_eq!(bull.spells, 2);
        assert!((bull.pct_of_total - 60.0).abs() < 1e-9);
        assert!((bull.avg_return - 0.05 / 3.0).abs() < 1e-12);

        let bear = &stats[&Bear];
        assert_eq!(bear.observations, 2);
        assert_eq!(bear.spells, 1);
        assert!((bear.avg_return + 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_stats_empty() {
        assert!(regime_stats(&[], &[]).is_empty());
    }
}
