//! Layered configuration loading.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, else `config/default.toml` when present)
//! 3. `REGIME_` environment variables, with `__` between nested keys
//!    (e.g. `REGIME_CLASSIFIER__VOLATILITY_THRESHOLD=0.25`)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use tracing::debug;

use crate::backtest::BacktestConfig;

/// Config file used when none is given explicitly.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "REGIME";

/// Load a [`BacktestConfig`].
///
/// An explicit `path` must exist. The default path is optional, and
/// missing keys fall back to [`BacktestConfig::default`].
pub fn load_config(path: Option<&Path>) -> Result<BacktestConfig, ConfigError> {
    let (file, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    debug!("Loading configuration from {} (required: {})", file.display(), required);

    Config::builder()
        .add_source(File::from(file).required(required))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_toml(
            "min_price_points = 30\n\
             \n\
             [classifier]\n\
             volatility_threshold = 0.25\n",
        );
        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.min_price_points, 30);
        assert_eq!(config.trade_threshold, 0.01);
        assert_eq!(config.classifier.volatility_threshold, 0.25);
        assert_eq!(config.classifier.momentum_lookback, 10);
        assert_eq!(config.metrics.risk_free_rate, 0.02);
    }

    #[test]
    fn test_environment_overrides_file() {
        // No other test reads this key.
        let file = write_toml("[metrics]\ninitial_equity = 100.0\n");
        std::env::set_var("REGIME_METRICS__INITIAL_EQUITY", "250.5");
        let loaded = load_config(Some(file.path()));
        std::env::remove_var("REGIME_METRICS__INITIAL_EQUITY");

        let config = loaded.unwrap();
        assert_eq!(config.metrics.initial_equity, 250.5);
        assert_eq!(config.metrics.risk_free_rate, 0.02);
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_malformed_value_fails() {
        let file = write_toml("min_price_points = \"many\"\n");
        assert!(load_config(Some(file.path())).is_err());
    }
}
