//! Streaming regime detection.
//!
//! [`RegimeDetector`] labels one return at a time, keeping running sums
//! over the lookback window instead of recomputing the window on every
//! step. Labels match [`RegimeClassifier::classify`](super::RegimeClassifier::classify)
//! on the same input.

use std::collections::VecDeque;

use super::classifier::{Regime, RegimeClassifierConfig, WindowStats};

/// Fixed-capacity window of returns with running sum and sum of squares.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    momentum_lookback: usize,
    values: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

impl RollingWindow {
    /// Create a window holding at most `capacity` values.
    ///
    /// Storage grows with the values pushed, not with `capacity`.
    pub fn new(capacity: usize, momentum_lookback: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            momentum_lookback,
            values: VecDeque::new(),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Append a value, evicting the oldest one once full.
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;

        if self.values.len() > self.capacity {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum / self.values.len() as f64
    }

    /// Population variance from the running sums, clamped at zero.
    pub fn variance(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let n = self.values.len() as f64;
        let mean = self.sum / n;
        (self.sum_sq / n - mean * mean).max(0.0)
    }

    /// Sum of the trailing `momentum_lookback` values.
    pub fn momentum(&self) -> f64 {
        let skip = self.values.len().saturating_sub(self.momentum_lookback);
        self.values.iter().skip(skip).sum()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }
}

/// Online regime detector for a single sensitivity.
///
/// Every label is kept in [`history`](Self::history) unless a limit is set
/// with [`with_history_limit`](Self::with_history_limit).
#[derive(Debug, Clone)]
pub struct RegimeDetector {
    config: RegimeClassifierConfig,
    window: RollingWindow,
    history: VecDeque<Regime>,
    history_limit: Option<usize>,
}

impl RegimeDetector {
    pub fn new(config: RegimeClassifierConfig, sensitivity: u32) -> Self {
        let capacity = config.window_size(sensitivity).saturating_add(1);
        let window = RollingWindow::new(capacity, config.momentum_lookback);
        Self {
            config,
            window,
            history: VecDeque::new(),
            history_limit: None,
        }
    }

    /// Keep only the most recent `limit` labels.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit.max(1));
        self.trim_history();
        self
    }

    fn trim_history(&mut self) {
        if let Some(limit) = self.history_limit {
            while self.history.len() > limit {
                self.history.pop_front();
            }
        }
    }

    /// Feed the next return and get its regime label.
    pub fn push(&mut self, ret: f64) -> Regime {
        self.window.push(ret);

        let regime = match self.stats() {
            Some(stats) => self.config.label(stats.annualized_volatility, stats.momentum),
            None => Regime::Bull,
        };

        self.history.push_back(regime);
        self.trim_history();
        regime
    }

    /// Statistics of the current window, if it is long enough to judge.
    pub fn stats(&self) -> Option<WindowStats> {
        if self.window.len() < self.config.min_observations {
            return None;
        }

        let variance = self.window.variance();
        Some(WindowStats {
            len: self.window.len(),
            mean: self.window.mean(),
            variance,
            annualized_volatility: (variance * self.config.trading_days_per_year).sqrt(),
            momentum: self.window.momentum(),
        })
    }

    /// Label a whole return history from scratch.
    ///
    /// Returns every label regardless of the history limit.
    pub fn analyze(&mut self, returns: &[f64]) -> Vec<Regime> {
        self.clear();
        returns.iter().map(|&ret| self.push(ret)).collect()
    }

    pub fn current_regime(&self) -> Option<Regime> {
        self.history.back().copied()
    }

    /// Retained labels, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = Regime> + '_ {
        self.history.iter().copied()
    }

    pub fn clear(&mut self) {
        self.window.clear();
        self.history.clear();
    }
}
