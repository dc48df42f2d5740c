use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    calc::{Calculation, CalculationError, FlatRecord, format_timestamp, parse_timestamp},
    core::history::HistoryStore,
    ops::OperationRegistry,
    types::{Timestamp, now},
};

/// Version number for serialized snapshot envelopes.
pub const SNAPSHOT_FORMAT_VERSION: u16 = 1;

/// Empty-stack conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    /// Undo stack is empty.
    #[error("nothing to undo")]
    NothingToUndo,
    /// Redo stack is empty.
    #[error("nothing to redo")]
    NothingToRedo,
}

/// Failures encoding or decoding a snapshot envelope.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Malformed JSON.
    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),
    /// Envelope version this build cannot read.
    #[error("unsupported snapshot format: {0}")]
    UnsupportedVersion(u16),
    /// Capture time could not be parsed.
    #[error("snapshot timestamp: {0}")]
    Timestamp(CalculationError),
    /// A contained row could not be rebuilt.
    #[error("snapshot row {index}: {source}")]
    Row {
        /// Zero-based row position.
        index: usize,
        /// Underlying record failure.
        #[source]
        source: CalculationError,
    },
}

/// Owned copy of the history contents at one point in time.
///
/// Records are immutable values, so cloning the sequence is a full copy;
/// later changes to the live store never reach a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<Calculation>,
    captured_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u16,
    captured_at: String,
    rows: Vec<FlatRecord>,
}

impl Snapshot {
    /// Copies the current contents of `history`.
    pub fn capture(history: &HistoryStore) -> Self {
        Self {
            records: history.records(),
            captured_at: now(),
        }
    }

    pub fn records(&self) -> &[Calculation] {
        &self.records
    }

    /// Consumes the snapshot, yielding its records.
    pub fn into_records(self) -> Vec<Calculation> {
        self.records
    }

    pub fn captured_at(&self) -> Timestamp {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serializes to a versioned JSON envelope.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let env = SnapshotEnvelope {
            format_version: SNAPSHOT_FORMAT_VERSION,
            captured_at: format_timestamp(self.captured_at),
            rows: self.records.iter().map(Calculation::to_row).collect(),
        };
        Ok(serde_json::to_vec(&env)?)
    }

    /// Parses an envelope produced by [`Snapshot::encode`], recomputing each record.
    pub fn decode(registry: &OperationRegistry, payload: &[u8]) -> Result<Self, SnapshotError> {
        let env: SnapshotEnvelope = serde_json::from_slice(payload)?;
        if env.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(env.format_version));
        }
        let captured_at = parse_timestamp(&env.captured_at).map_err(SnapshotError::Timestamp)?;
        let records = env
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                Calculation::from_row(registry, row).map_err(|source| SnapshotError::Row { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            records,
            captured_at,
        })
    }
}

/// Undo/redo stacks of whole-history snapshots.
///
/// Undo and redo swap: the live history is captured onto the opposite stack
/// and the popped snapshot becomes the new live contents.
#[derive(Debug, Clone)]
pub struct UndoManager {
    undo: VecDeque<Snapshot>,
    redo: Vec<Snapshot>,
    max_depth: usize,
}

impl UndoManager {
    /// Empty stacks retaining at most `max_depth` undo snapshots (minimum 1).
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            max_depth: max_depth.max(1),
        }
    }

    /// Captures `history` without touching either stack.
    pub fn snapshot(history: &HistoryStore) -> Snapshot {
        Snapshot::capture(history)
    }

    /// Records the pre-mutation state and invalidates redo.
    pub fn save_state(&mut self, history: &HistoryStore) {
        self.push_undo(Self::snapshot(history));
        self.redo.clear();
    }

    /// Returns the state to restore; `current` moves onto the redo stack.
    pub fn undo(&mut self, current: &HistoryStore) -> Result<Snapshot, UndoError> {
        let prev = self.undo.pop_back().ok_or(UndoError::NothingToUndo)?;
        self.redo.push(Self::snapshot(current));
        Ok(prev)
    }

    /// Returns the state to restore; `current` moves onto the undo stack.
    pub fn redo(&mut self, current: &HistoryStore) -> Result<Snapshot, UndoError> {
        let next = self.redo.pop().ok_or(UndoError::NothingToRedo)?;
        self.push_undo(Self::snapshot(current));
        Ok(next)
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo.push_back(snapshot);
        while self.undo.len() > self.max_depth {
            self.undo.pop_front();
        }
    }
}
