use std::collections::VecDeque;

use thiserror::Error;
use tracing::debug;

use crate::{
    calc::{Calculation, CalculationError, FlatRecord},
    core::snapshot::Snapshot,
    ops::OperationRegistry,
};

/// Failures rebuilding history from rows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    /// A row could not be turned back into a calculation.
    #[error("row {index}: {source}")]
    InvalidRow {
        /// Zero-based row position.
        index: usize,
        /// Underlying record failure.
        #[source]
        source: CalculationError,
    },
}

/// Chronological calculation history with FIFO eviction.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    records: VecDeque<Calculation>,
    max_size: usize,
}

impl HistoryStore {
    /// Empty store holding at most `max_size` records (minimum 1).
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            records: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Appends `calc`, evicting from the front until within `max_size`.
    /// Returns the evicted records, oldest first.
    pub fn append(&mut self, calc: Calculation) -> Vec<Calculation> {
        self.records.push_back(calc);
        let mut evicted = Vec::new();
        while self.records.len() > self.max_size {
            if let Some(old) = self.records.pop_front() {
                evicted.push(old);
            }
        }
        if !evicted.is_empty() {
            debug!(evicted = evicted.len(), max = self.max_size, "history pruned");
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Serialized rows in stored order. Each call starts a fresh pass.
    pub fn to_rows(&self) -> impl Iterator<Item = FlatRecord> + '_ {
        self.records.iter().map(Calculation::to_row)
    }

    /// Replaces the contents with `rows`, in order. Nothing changes unless
    /// every row rebuilds.
    pub fn from_rows<I>(&mut self, registry: &OperationRegistry, rows: I) -> Result<usize, HistoryError>
    where
        I: IntoIterator<Item = FlatRecord>,
    {
        let mut loaded = VecDeque::new();
        for (index, row) in rows.into_iter().enumerate() {
            let calc = Calculation::from_row(registry, &row)
                .map_err(|source| HistoryError::InvalidRow { index, source })?;
            loaded.push_back(calc);
        }
        while loaded.len() > self.max_size {
            loaded.pop_front();
        }
        let count = loaded.len();
        self.records = loaded;
        Ok(count)
    }

    /// Swaps in the records captured by `snapshot`.
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.records = snapshot.into_records().into();
        while self.records.len() > self.max_size {
            self.records.pop_front();
        }
    }

    /// Records, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Calculation> + ExactSizeIterator + '_ {
        self.records.iter()
    }

    pub fn records(&self) -> Vec<Calculation> {
        self.records.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&Calculation> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
