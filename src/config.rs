//! Calculator configuration loaded from environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    calc::parse_number,
    types::{Decimal, MAX_PRECISION},
};

/// Startup configuration failures. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable present but unparseable.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// Numeric setting was zero or negative.
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    /// Precision beyond what the decimal type can hold.
    #[error("precision must not exceed {}", MAX_PRECISION)]
    PrecisionTooLarge,
    /// A configured directory could not be created.
    #[error("cannot create directory {}: {source}", path.display())]
    Directory {
        /// Directory path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Resolved calculator configuration.
#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    /// Root for the default directories.
    pub base_dir: PathBuf,
    /// Directory holding the log file.
    pub log_dir: PathBuf,
    /// Log file path.
    pub log_file: PathBuf,
    /// Directory holding the history table.
    pub history_dir: PathBuf,
    /// History table path.
    pub history_file: PathBuf,
    /// History capacity.
    pub max_history_size: usize,
    /// Undo retention bound.
    pub max_undo_depth: usize,
    /// Save after every calculation.
    pub auto_save: bool,
    /// Displayed decimal places.
    pub precision: u32,
    /// Largest accepted operand magnitude.
    pub max_input_value: Decimal,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self::with_base_dir(".")
    }
}

impl CalculatorConfig {
    /// Defaults rooted at `base`: `<base>/logs` and `<base>/history`.
    pub fn with_base_dir(base: impl Into<PathBuf>) -> Self {
        let base_dir = base.into();
        let log_dir = base_dir.join("logs");
        let history_dir = base_dir.join("history");
        Self {
            log_file: log_dir.join("calculator.log"),
            history_file: history_dir.join("calculator_history.csv"),
            base_dir,
            log_dir,
            history_dir,
            max_history_size: 1000,
            max_undo_depth: 100,
            auto_save: true,
            precision: 10,
            max_input_value: Decimal::MAX,
        }
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `CALCULATOR_BASE_DIR` - Root for the default directories (default: `.`)
    /// - `CALCULATOR_LOG_DIR` / `CALCULATOR_LOG_FILE` - Log location (default: `<base>/logs/calculator.log`)
    /// - `CALCULATOR_HISTORY_DIR` / `CALCULATOR_HISTORY_FILE` - History table (default: `<base>/history/calculator_history.csv`)
    /// - `CALCULATOR_MAX_HISTORY_SIZE` - History capacity (default: 1000)
    /// - `CALCULATOR_MAX_UNDO_DEPTH` - Undo retention (default: 100)
    /// - `CALCULATOR_AUTO_SAVE` - Save after each calculation (default: true)
    /// - `CALCULATOR_PRECISION` - Displayed decimal places (default: 10)
    /// - `CALCULATOR_MAX_INPUT_VALUE` - Largest operand magnitude (default: decimal maximum)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same resolution as [`CalculatorConfig::from_env`] over any lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_dir = read("CALCULATOR_BASE_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        let mut config = Self::with_base_dir(base_dir);

        if let Some(dir) = read("CALCULATOR_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        config.log_file = read("CALCULATOR_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.log_dir.join("calculator.log"));

        if let Some(dir) = read("CALCULATOR_HISTORY_DIR") {
            config.history_dir = PathBuf::from(dir);
        }
        config.history_file = read("CALCULATOR_HISTORY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| config.history_dir.join("calculator_history.csv"));

        if let Some(raw) = read("CALCULATOR_MAX_HISTORY_SIZE") {
            config.max_history_size = positive("CALCULATOR_MAX_HISTORY_SIZE", &raw)?;
        }
        if let Some(raw) = read("CALCULATOR_MAX_UNDO_DEPTH") {
            config.max_undo_depth = positive("CALCULATOR_MAX_UNDO_DEPTH", &raw)?;
        }
        if let Some(raw) = read("CALCULATOR_AUTO_SAVE") {
            config.auto_save = parse_bool(&raw).ok_or(ConfigError::Invalid {
                key: "CALCULATOR_AUTO_SAVE",
                value: raw,
            })?;
        }
        if let Some(raw) = read("CALCULATOR_PRECISION") {
            config.precision = positive("CALCULATOR_PRECISION", &raw)?;
        }
        if let Some(raw) = read("CALCULATOR_MAX_INPUT_VALUE") {
            config.max_input_value = parse_limit(&raw).ok_or(ConfigError::Invalid {
                key: "CALCULATOR_MAX_INPUT_VALUE",
                value: raw,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks every numeric bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history_size == 0 {
            return Err(ConfigError::NotPositive("max_history_size"));
        }
        if self.max_undo_depth == 0 {
            return Err(ConfigError::NotPositive("max_undo_depth"));
        }
        if self.precision == 0 {
            return Err(ConfigError::NotPositive("precision"));
        }
        if self.precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionTooLarge);
        }
        if self.max_input_value <= Decimal::ZERO {
            return Err(ConfigError::NotPositive("max_input_value"));
        }
        Ok(())
    }

    /// Creates the log and history directories.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        let log_parent = self.log_file.parent().unwrap_or(self.log_dir.as_path());
        let history_parent = self.history_file.parent().unwrap_or(self.history_dir.as_path());
        for dir in [self.log_dir.as_path(), self.history_dir.as_path(), log_parent, history_parent] {
            create_dir(dir)?;
        }
        Ok(())
    }
}

fn create_dir(dir: &Path) -> Result<(), ConfigError> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|source| ConfigError::Directory {
        path: dir.to_path_buf(),
        source,
    })
}

fn positive<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: TryFrom<i64>,
{
    let value: i64 = raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })?;
    if value <= 0 {
        return Err(ConfigError::NotPositive(key));
    }
    T::try_from(value).map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

// Positive magnitudes beyond the decimal range clamp to its maximum.
fn parse_limit(raw: &str) -> Option<Decimal> {
    if let Some(value) = parse_number(raw) {
        return Some(value);
    }
    match raw.parse::<f64>() {
        Ok(v) if v > 0.0 && v >= 7.9e28 => Some(Decimal::MAX),
        _ => None,
    }
}
