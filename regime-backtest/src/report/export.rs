//! Export of backtest results.
//!
//! - JSON: the full `BacktestResult`, camelCase keys
//! - CSV: one chart row per price point
//! - Bundle: both files under `<TICKER>_q<sensitivity>/`

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::backtest::BacktestResult;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Serialize a result to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// Read back a result written by [`export_json`].
pub fn import_json(json: &str) -> Result<BacktestResult, ReportError> {
    Ok(serde_json::from_str(json)?)
}

/// Export the chart rows as CSV.
///
/// Columns: date, price, regime, allocation, strategy_equity,
/// buy_and_hold_equity
pub fn export_chart_csv(result: &BacktestResult) -> Result<String, ReportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "date",
        "price",
        "regime",
        "allocation",
        "strategy_equity",
        "buy_and_hold_equity",
    ])?;

    for row in &result.chart_data {
        wtr.write_record([
            &row.date.format("%Y-%m-%d").to_string(),
            &format!("{:.6}", row.price),
            row.regime.as_str(),
            &format!("{:.1}", row.allocation),
            &format!("{:.6}", row.strategy_equity),
            &format!("{:.6}", row.buy_and_hold_equity),
        ])?;
    }

    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(data)?)
}

/// Write `result.json` and `chart.csv` under `<dir>/<TICKER>_q<sensitivity>/`.
///
/// Returns the created run directory. Existing files are overwritten.
pub fn save_report(result: &BacktestResult, dir: &Path) -> Result<PathBuf, ReportError> {
    let run_dir = dir.join(format!("{}_q{}", result.ticker, result.sensitivity));
    std::fs::create_dir_all(&run_dir)?;

    std::fs::write(run_dir.join("result.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("chart.csv"), export_chart_csv(result)?)?;

    info!("Saved report for {} to {}", result.ticker, run_dir.display());
    Ok(run_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::{run_backtest, BacktestRequest};
    use crate::data::{PricePoint, PriceSeries};
    use chrono::{Duration, NaiveDate};

    fn sample_result() -> BacktestResult {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut prices: Vec<f64> = (0..60).map(|i| 100.0 * 1.005_f64.powi(i)).collect();
        for p in prices.iter_mut().skip(30) {
            *p *= 0.8;
        }
        let series: PriceSeries = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(start + Duration::days(i as i64), p))
            .collect();
        run_backtest(&BacktestRequest::new("QQQ", 1, series)).unwrap()
    }

    #[test]
    fn test_chart_csv_layout() {
        let result = sample_result();
        let csv = export_chart_csv(&result).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "date,price,regime,allocation,strategy_equity,buy_and_hold_equity"
        );
        assert_eq!(lines.len(), result.chart_data.len() + 1);
        assert_eq!(lines[1], "2024-03-01,100.000000,Bull,1.0,100.000000,100.000000");
        assert!(lines.iter().any(|l| l.contains(",Bear,0.0,")));
    }

    #[test]
    fn test_json_round_trip() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        assert!(json.contains("\"chartData\""));
        assert!(json.contains("\"buyAndHold\""));

        let back = import_json(&json).unwrap();
        assert_eq!(back.ticker, result.ticker);
        assert_eq!(back.chart_data.len(), result.chart_data.len());
        assert_eq!(back.metrics.strategy.trade_count, result.metrics.strategy.trade_count);
    }

    #[test]
    fn test_import_rejects_garbage() {
        assert!(matches!(import_json("{not json"), Err(ReportError::Json(_))));
    }

    #[test]
    fn test_save_report_writes_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();

        let run_dir = save_report(&result, dir.path()).unwrap();
        assert_eq!(run_dir, dir.path().join("QQQ_q1"));

        let json = std::fs::read_to_string(run_dir.join("result.json")).unwrap();
        assert_eq!(import_json(&json).unwrap().sensitivity, 1);

        let csv = std::fs::read_to_string(run_dir.join("chart.csv")).unwrap();
        assert_eq!(csv.lines().count(), 61);

        // Saving again overwrites in place.
        assert_eq!(save_report(&result, dir.path()).unwrap(), run_dir);
    }
}
