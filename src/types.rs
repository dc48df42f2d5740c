//! Shared primitive aliases and persisted column names.

use chrono::{NaiveDateTime, Timelike};

pub use rust_decimal::Decimal;

/// Local wall-clock time at which a calculation or snapshot was captured.
pub type Timestamp = NaiveDateTime;

/// Column holding the registered operation name.
pub const COL_OPERATION: &str = "operation";
/// Column holding the first operand.
pub const COL_OPERAND_A: &str = "operand_a";
/// Column holding the second operand.
pub const COL_OPERAND_B: &str = "operand_b";
/// Column holding the stored result.
pub const COL_RESULT: &str = "result";
/// Column holding the ISO-8601 timestamp.
pub const COL_TIMESTAMP: &str = "timestamp";

/// Legacy name accepted on read in place of [`COL_OPERAND_A`].
pub const LEGACY_COL_OPERAND_A: &str = "operand1";
/// Legacy name accepted on read in place of [`COL_OPERAND_B`].
pub const LEGACY_COL_OPERAND_B: &str = "operand2";

/// Column set and order written to history tables.
pub const COLUMNS: [&str; 5] = [
    COL_OPERATION,
    COL_OPERAND_A,
    COL_OPERAND_B,
    COL_RESULT,
    COL_TIMESTAMP,
];

/// Largest scale the decimal type can carry.
pub const MAX_PRECISION: u32 = 28;

/// Current local time truncated to microseconds, matching the persisted form.
pub fn now() -> Timestamp {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond((now.nanosecond() / 1_000) * 1_000)
        .unwrap_or(now)
}
