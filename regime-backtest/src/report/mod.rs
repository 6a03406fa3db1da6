//! Result export: JSON, chart CSV, and on-disk report bundles.

mod export;

pub use export::{export_chart_csv, export_json, import_json, save_report, ReportError};
