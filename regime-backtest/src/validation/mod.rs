//! Validation of backtest requests.
//!
//! Rejects malformed input before any computation starts:
//! - Blank ticker, sensitivity below 1
//! - Fewer price points than the configured minimum
//! - Non-positive or non-finite prices
//! - Dates that do not strictly increase

pub mod input;

pub use input::{validate_request, MIN_SENSITIVITY};
