//! Persistence abstraction and CSV implementation.

/// CSV-backed table reader/writer.
pub mod csv;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    calc::FlatRecord,
    core::history::{HistoryError, HistoryStore},
    ops::OperationRegistry,
};

/// Save and load failures.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure on `path`.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Malformed table data.
    #[error("table format error: {0}")]
    Csv(#[from] ::csv::Error),
    /// A row could not be rebuilt into a calculation.
    #[error("history rebuild failed: {0}")]
    History(#[from] HistoryError),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Reads and writes flat tables of string-keyed rows.
///
/// A missing source is not an error for [`TableIo::read_table`]; it yields no
/// rows. Every other failure propagates.
pub trait TableIo: Send {
    /// Replaces `destination` with `rows`.
    fn write_table(&self, rows: &[FlatRecord], destination: &Path) -> PersistResult<()>;
    /// Reads every row of `source`, in file order.
    fn read_table(&self, source: &Path) -> PersistResult<Vec<FlatRecord>>;
}

pub fn save_history(io: &dyn TableIo, history: &HistoryStore, path: &Path) -> PersistResult<usize> {
    let rows: Vec<FlatRecord> = history.to_rows().collect();
    io.write_table(&rows, path)?;
    Ok(rows.len())
}

/// Replaces `history` with the rows in `path`. Fails without modifying
/// `history` if any row is unreadable.
pub fn load_history(
    io: &dyn TableIo,
    registry: &OperationRegistry,
    history: &mut HistoryStore,
    path: &Path,
) -> PersistResult<usize> {
    let rows = io.read_table(path)?;
    Ok(history.from_rows(registry, rows)?)
}
