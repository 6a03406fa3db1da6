//! Close-price loader for CSV and Parquet files.
//!
//! Reads a daily price history into a [`PriceSeries`]. The file needs a
//! date column and a close column; the first matching name from
//! [`DATE_COLUMNS`] and [`CLOSE_COLUMNS`] is used. Integer date columns
//! are read as unix seconds. Rows with a missing or out-of-range date, or
//! a missing, unparsable or non-finite close, are dropped. Row order is
//! preserved as found in the file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate};
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{PricePoint, PriceSeries};

/// Accepted date column names, in priority order.
pub const DATE_COLUMNS: &[&str] = &["date", "Date", "trade_date", "timestamp"];

/// Accepted close column names, in priority order.
pub const CLOSE_COLUMNS: &[&str] = &["close", "Close", "adj_close", "Adj Close", "price"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Missing column: expected one of {expected:?}, found {found:?}")]
    MissingColumn {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Csv,
    Parquet,
}

/// Loader for a single price history file.
pub struct PriceLoader {
    path: PathBuf,
}

impl PriceLoader {
    /// Create a loader for the given file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format(&self) -> Result<FileFormat, LoaderError> {
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("parquet") | Some("pq") => Ok(FileFormat::Parquet),
            _ => Err(LoaderError::UnsupportedFormat(
                self.path.display().to_string(),
            )),
        }
    }

    /// Scan the file lazily without selecting columns.
    pub fn load_lazy(&self) -> Result<LazyFrame, LoaderError> {
        if !self.path.exists() {
            return Err(LoaderError::FileNotFound(self.path.display().to_string()));
        }

        let lf = match self.format()? {
            FileFormat::Csv => LazyCsvReader::new(&self.path)
                .with_has_header(true)
                .finish()?,
            FileFormat::Parquet => {
                LazyFrame::scan_parquet(&self.path, ScanArgsParquet::default())?
            }
        };
        Ok(lf)
    }

    /// Load the file into a cleaned price series.
    pub fn load(&self) -> Result<PriceSeries, LoaderError> {
        let mut lf = self.load_lazy()?;
        let columns: Vec<String> = lf
            .collect_schema()?
            .iter_names()
            .map(|name| name.to_string())
            .collect();

        let date_col = pick_column(&columns, DATE_COLUMNS)?;
        let close_col = pick_column(&columns, CLOSE_COLUMNS)?;
        debug!(
            "Loading {} using columns '{}' and '{}'",
            self.path.display(),
            date_col,
            close_col
        );

        // Non-strict cast: textual nulls in the close column become nulls.
        let df = lf
            .select([
                col(date_col.as_str()).alias("date"),
                col(close_col.as_str()).cast(DataType::Float64).alias("close"),
            ])
            .collect()?;

        let series = dataframe_to_series(&df)?;
        debug!("Loaded {} price points", series.len());
        Ok(series)
    }
}

/// Pick the first candidate column present in the file.
fn pick_column(columns: &[String], candidates: &[&str]) -> Result<String, LoaderError> {
    candidates
        .iter()
        .find(|c| columns.iter().any(|name| name == *c))
        .map(|c| c.to_string())
        .ok_or_else(|| LoaderError::MissingColumn {
            expected: candidates.iter().map(|c| c.to_string()).collect(),
            found: columns.to_vec(),
        })
}

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_CE_DAYS: i32 = 719_163;

/// Convert days since Unix epoch to NaiveDate.
fn date_from_days(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_CE_DAYS)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// Convert unix seconds to the UTC calendar date.
fn date_from_unix_seconds(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

/// Parse a date string, accepting a trailing time component.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Read the `date` column as strings, unix seconds, or a temporal type.
fn read_dates(column: &Column) -> Result<Vec<Option<NaiveDate>>, LoaderError> {
    if let Ok(str_col) = column.str() {
        return Ok(str_col
            .into_iter()
            .map(|s| s.and_then(parse_date))
            .collect());
    }

    if column.dtype().is_integer() {
        let secs = column.cast(&DataType::Int64)?;
        return Ok(secs
            .i64()?
            .into_iter()
            .map(|s| s.and_then(date_from_unix_seconds))
            .collect());
    }

    let as_date = column.cast(&DataType::Date).map_err(|_| {
        LoaderError::InvalidData(format!(
            "date column has unexpected type {}",
            column.dtype()
        ))
    })?;
    let date_col = as_date.date()?;
    Ok(date_col
        .into_iter()
        .map(|d| d.and_then(date_from_days))
        .collect())
}

/// Convert a two-column (`date`, `close`) DataFrame into a price series.
fn dataframe_to_series(df: &DataFrame) -> Result<PriceSeries, LoaderError> {
    let dates = read_dates(df.column("date")?)?;
    let closes = df.column("close")?.f64()?;

    let mut points = Vec::with_capacity(df.height());
    let mut dropped = 0usize;

    for (date, close) in dates.into_iter().zip(closes.into_iter()) {
        match (date, close) {
            (Some(date), Some(price)) if price.is_finite() => {
                points.push(PricePoint::new(date, price));
            }
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!("Dropped {} rows with a missing or invalid date or close", dropped);
    }

    if points.is_empty() {
        return Err(LoaderError::InvalidData(
            "No valid price data found".to_string(),
        ));
    }

    Ok(PriceSeries::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_date_from_days() {
        assert_eq!(date_from_days(18262), NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(date_from_days(i32::MAX), None);
    }

    #[test]
    fn test_date_from_unix_seconds() {
        assert_eq!(
            date_from_unix_seconds(1_704_153_600),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        // Intraday seconds land on the same UTC day.
        assert_eq!(
            date_from_unix_seconds(1_704_153_600 + 86_399),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
        assert_eq!(date_from_unix_seconds(i64::MAX), None);
    }

    #[test]
    fn test_load_csv_unix_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "btc.csv",
            "timestamp,close\n1704153600,100.0\n1704240000,101.0\n",
        );

        let series = PriceLoader::new(&path).load().unwrap();
        assert_eq!(
            series.dates(),
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            ]
        );
        assert_eq!(series.prices(), vec![100.0, 101.0]);
    }

    #[test]
    fn test_load_csv_drops_out_of_range_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "far.csv",
            "timestamp,close\n1704153600,100.0\n9223372036854775807,101.0\n1704240000,102.0\n",
        );

        let series = PriceLoader::new(&path).load().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.prices(), vec![100.0, 102.0]);
    }

    #[test]
    fn test_parse_date_with_time() {
        assert_eq!(
            parse_date("2024-03-01T00:00:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(parse_date("not a date"), None);
    }

    #[test]
    fn test_pick_column_priority() {
        let columns = vec!["Close".to_string(), "close".to_string()];
        assert_eq!(pick_column(&columns, CLOSE_COLUMNS).unwrap(), "close");
    }

    #[test]
    fn test_pick_column_missing() {
        let columns = vec!["open".to_string()];
        let err = pick_column(&columns, CLOSE_COLUMNS).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn { .. }));
    }

    #[test]
    fn test_load_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "spy.csv",
            "date,close\n2024-01-02,100.0\n2024-01-03,101.5\n2024-01-04,99.25\n",
        );

        let series = PriceLoader::new(&path).load().unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.prices(), vec![100.0, 101.5, 99.25]);
        assert_eq!(
            series.first().unwrap().date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_load_csv_drops_missing_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "nvda.csv",
            "Date,Open,Close\n2024-01-02,1,100.0\n2024-01-03,1,\n2024-01-04,1,102.0\n",
        );

        let series = PriceLoader::new(&path).load().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.prices(), vec![100.0, 102.0]);
    }

    #[test]
    fn test_load_parquet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qqq.parquet");

        let mut df = df!(
            "date" => ["2024-01-02", "2024-01-03", "2024-01-04"],
            "close" => [400.0, 401.0, 402.5]
        )
        .unwrap();
        ParquetWriter::new(fs::File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        let series = PriceLoader::new(&path).load().unwrap();
        assert_eq!(series.prices(), vec![400.0, 401.0, 402.5]);
    }

    #[test]
    fn test_missing_file() {
        let err = PriceLoader::new("does/not/exist.csv").load().unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "prices.txt", "date,close\n");
        let err = PriceLoader::new(&path).load().unwrap_err();
        assert!(matches!(err, LoaderError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_all_rows_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "empty.csv", "date,close\nbad,\n");
        let err = PriceLoader::new(&path).load().unwrap_err();
        assert!(matches!(err, LoaderError::InvalidData(_)));
    }
}
