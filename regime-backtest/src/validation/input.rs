//! Request validation at the backtest boundary.
//!
//! Checks run in order and the first failure is returned:
//! - Ticker is not blank
//! - Sensitivity is at least 1
//! - Enough price points (InsufficientData)
//! - Prices are finite and positive
//! - Dates strictly increase

use tracing::warn;

use crate::backtest::{BacktestConfig, BacktestError, BacktestRequest};
use crate::data::PricePoint;

/// Smallest sensitivity accepted by the core.
pub const MIN_SENSITIVITY: u32 = 1;

/// Validate a request before any computation.
pub fn validate_request(
    request: &BacktestRequest,
    config: &BacktestConfig,
) -> Result<(), BacktestError> {
    let result = check_ticker(&request.ticker)
        .and_then(|_| check_sensitivity(request.sensitivity))
        .and_then(|_| check_length(request.prices.len(), config.min_price_points))
        .and_then(|_| check_prices(request.prices.points()))
        .and_then(|_| check_dates(request.prices.points()));

    if let Err(e) = &result {
        warn!("Rejected backtest request for '{}': {}", request.ticker, e);
    }
    result
}

fn check_ticker(ticker: &str) -> Result<(), BacktestError> {
    if ticker.trim().is_empty() {
        return Err(BacktestError::InvalidInput(
            "ticker must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn check_sensitivity(sensitivity: u32) -> Result<(), BacktestError> {
    if sensitivity < MIN_SENSITIVITY {
        return Err(BacktestError::InvalidInput(format!(
            "sensitivity must be at least {}, got {}",
            MIN_SENSITIVITY, sensitivity
        )));
    }
    Ok(())
}

fn check_length(len: usize, min_points: usize) -> Result<(), BacktestError> {
    // Two prices are the least that yields a return.
    let required = min_points.max(2);
    if len < required {
        return Err(BacktestError::InsufficientData {
            required,
            actual: len,
        });
    }
    Ok(())
}

fn check_prices(points: &[PricePoint]) -> Result<(), BacktestError> {
    match points
        .iter()
        .enumerate()
        .find(|(_, p)| !(p.price.is_finite() && p.price > 0.0))
    {
        Some((i, p)) => Err(BacktestError::InvalidInput(format!(
            "price must be positive and finite, got {} on {} (index {})",
            p.price, p.date, i
        ))),
        None => Ok(()),
    }
}

fn check_dates(points: &[PricePoint]) -> Result<(), BacktestError> {
    match points.windows(2).find(|w| w[1].date <= w[0].date) {
        Some(w) => Err(BacktestError::InvalidInput(format!(
            "dates must be strictly increasing: {} follows {}",
            w[1].date, w[0].date
        ))),
        None => Ok(()),
    }
}
