//! Core data types for regime backtesting.
//!
//! A backtest consumes one close price per trading day, in chronological
//! order, and derives simple daily returns from it. Gaps and holidays are
//! simply absent rows; nothing is interpolated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single close price on a trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Trading date
    pub date: NaiveDate,

    /// Close price
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Ordered close-price history for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Wrap an already ordered list of price points.
    pub fn new(points: Vec<PricePoint>) -> Self {
        Self { points }
    }

    /// Build a series from parallel date and price columns.
    ///
    /// Returns `None` when the columns have different lengths.
    pub fn from_columns(dates: &[NaiveDate], prices: &[f64]) -> Option<Self> {
        if dates.len() != prices.len() {
            return None;
        }
        let points = dates
            .iter()
            .zip(prices)
            .map(|(&date, &price)| PricePoint::new(date, price))
            .collect();
        Some(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// Close prices in order.
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    /// Trading dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Simple daily returns, one fewer than the number of prices.
    pub fn returns(&self) -> ReturnSeries {
        ReturnSeries::from_prices(&self.prices())
    }
}

impl FromIterator<PricePoint> for PriceSeries {
    fn from_iter<I: IntoIterator<Item = PricePoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Simple daily returns derived from a price series.
///
/// `returns[i] = (price[i + 1] - price[i]) / price[i]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReturnSeries {
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Derive returns from consecutive prices.
    pub fn from_prices(prices: &[f64]) -> Self {
        let values = prices
            .windows(2)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect();
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.values.iter()
    }
}
