//! Calculation records and their flat tabular form.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{
    ops::{OperationError, OperationRegistry, UnknownOperation},
    types::{
        COL_OPERAND_A, COL_OPERAND_B, COL_OPERATION, COL_RESULT, COL_TIMESTAMP, Decimal,
        LEGACY_COL_OPERAND_A, LEGACY_COL_OPERAND_B, Timestamp, now,
    },
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Failures creating or rebuilding a [`Calculation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    /// Operation name is not registered.
    #[error(transparent)]
    UnknownOperation(#[from] UnknownOperation),
    /// Validation rejected the operands or arithmetic failed.
    #[error("calculation failed: {0}")]
    Failed(#[from] OperationError),
    /// A flat record is missing a field or holds an unparseable value.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// String-keyed row exchanged with the persistence layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlatRecord(BTreeMap<String, String>);

impl FlatRecord {
    /// Sets `column` to `value`, replacing any previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    /// Value stored under `column`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// First value found among `columns`, tried in order.
    pub fn get_any(&self, columns: &[&str]) -> Option<&str> {
        columns.iter().find_map(|c| self.get(c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for FlatRecord
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One evaluated operation.
///
/// The result is computed once in the constructor and never recomputed.
/// Equality ignores the timestamp.
#[derive(Debug, Clone)]
pub struct Calculation {
    operation: String,
    operand_a: Decimal,
    operand_b: Decimal,
    result: Decimal,
    timestamp: Timestamp,
}

impl Calculation {
    /// Resolves `operation` and evaluates it against the operands.
    pub fn new(
        registry: &OperationRegistry,
        operation: &str,
        operand_a: Decimal,
        operand_b: Decimal,
    ) -> Result<Self, CalculationError> {
        let desc = registry.resolve(operation)?;
        let result = desc.run(operand_a, operand_b)?;
        Ok(Self {
            operation: desc.name().to_string(),
            operand_a,
            operand_b,
            result,
            timestamp: now(),
        })
    }

    /// Rebuilds a record from a persisted row.
    ///
    /// The result is recomputed; a stored result that disagrees is logged and
    /// discarded. The stored timestamp is kept.
    pub fn from_row(registry: &OperationRegistry, row: &FlatRecord) -> Result<Self, CalculationError> {
        let operation = required(row, &[COL_OPERATION])?;
        let operand_a = parse_decimal(row, &[COL_OPERAND_A, LEGACY_COL_OPERAND_A])?;
        let operand_b = parse_decimal(row, &[COL_OPERAND_B, LEGACY_COL_OPERAND_B])?;
        let stored = parse_decimal(row, &[COL_RESULT])?;
        let timestamp = parse_timestamp(required(row, &[COL_TIMESTAMP])?)?;

        let mut calc = Self::new(registry, operation, operand_a, operand_b)?;
        calc.timestamp = timestamp;

        if calc.result != stored {
            warn!(
                operation = %calc.operation,
                stored = %stored,
                computed = %calc.result,
                "stored result differs from recomputed result; keeping recomputed"
            );
        }
        Ok(calc)
    }

    /// Flattens to the persisted column set.
    pub fn to_row(&self) -> FlatRecord {
        [
            (COL_OPERATION, self.operation.clone()),
            (COL_OPERAND_A, self.operand_a.to_string()),
            (COL_OPERAND_B, self.operand_b.to_string()),
            (COL_RESULT, self.result.to_string()),
            (COL_TIMESTAMP, format_timestamp(self.timestamp)),
        ]
        .into_iter()
        .collect()
    }

    /// Normalized operation name.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn operand_a(&self) -> Decimal {
        self.operand_a
    }

    pub fn operand_b(&self) -> Decimal {
        self.operand_b
    }

    pub fn result(&self) -> Decimal {
        self.result
    }

    /// Creation time, or the persisted time for loaded records.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Result rounded to `precision` places with trailing zeros removed.
    pub fn format_result(&self, precision: u32) -> String {
        self.result
            .round_dp(precision.min(crate::types::MAX_PRECISION))
            .normalize()
            .to_string()
    }
}

impl PartialEq for Calculation {
    fn eq(&self, other: &Self) -> bool {
        self.operation == other.operation
            && self.operand_a == other.operand_a
            && self.operand_b == other.operand_b
            && self.result == other.result
    }
}

impl Eq for Calculation {}

impl fmt::Display for Calculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}) = {}",
            self.operation, self.operand_a, self.operand_b, self.result
        )
    }
}

fn required<'a>(row: &'a FlatRecord, columns: &[&str]) -> Result<&'a str, CalculationError> {
    row.get_any(columns)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CalculationError::InvalidRecord(format!("missing field {:?}", columns[0])))
}

fn parse_decimal(row: &FlatRecord, columns: &[&str]) -> Result<Decimal, CalculationError> {
    let raw = required(row, columns)?;
    parse_number(raw).ok_or_else(|| {
        CalculationError::InvalidRecord(format!("field {:?} is not a number: {raw:?}", columns[0]))
    })
}

/// Parses plain or scientific decimal notation.
pub(crate) fn parse_number(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

pub(crate) fn format_timestamp(ts: Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<Timestamp, CalculationError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_local()))
        .map_err(|_| CalculationError::InvalidRecord(format!("bad timestamp: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_accepts_python_and_rfc3339_forms() {
        assert!(parse_timestamp("2025-10-06T12:30:45.123456").is_ok());
        assert!(parse_timestamp("2025-10-06T12:30:45").is_ok());
        assert!(parse_timestamp("2025-10-06 12:30:45.5").is_ok());
        assert!(parse_timestamp("2025-10-06T12:30:45+02:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn numbers_accept_scientific_notation() {
        assert_eq!(parse_number("1e3"), Some(Decimal::from(1000)));
        assert_eq!(parse_number("2.50"), Some(Decimal::new(25, 1)));
        assert_eq!(parse_number("abc"), None);
    }
}
