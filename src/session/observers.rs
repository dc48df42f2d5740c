//! Post-calculation observers.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::{
    calc::Calculation,
    core::history::HistoryStore,
    persist::{PersistError, TableIo, save_history},
};

/// Handle returned by [`crate::session::Session::add_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// Failure inside an observer. Logged by the session, never propagated.
#[derive(Debug, Error)]
pub enum ObserverError {
    /// Auto-save could not write the history table.
    #[error("auto-save failed: {0}")]
    AutoSave(#[from] PersistError),
    /// Any other observer-specific failure.
    #[error("{0}")]
    Other(String),
}

/// Collaborator notified after every successful calculation.
pub trait Observer: Send {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Called with the new record and the history that now contains it.
    fn notify(&mut self, calc: &Calculation, history: &HistoryStore) -> Result<(), ObserverError>;
}

/// Writes one log line per calculation.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl Observer for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    fn notify(&mut self, calc: &Calculation, _history: &HistoryStore) -> Result<(), ObserverError> {
        info!(
            operation = %calc.operation(),
            operand_a = %calc.operand_a(),
            operand_b = %calc.operand_b(),
            result = %calc.result(),
            "calculation performed"
        );
        Ok(())
    }
}

/// Rewrites the history table after every calculation.
pub struct AutoSaveObserver {
    io: Box<dyn TableIo>,
    path: PathBuf,
}

impl AutoSaveObserver {
    /// Saves through `io` to `path`.
    pub fn new(io: Box<dyn TableIo>, path: impl Into<PathBuf>) -> Self {
        Self {
            io,
            path: path.into(),
        }
    }
}

impl Observer for AutoSaveObserver {
    fn name(&self) -> &str {
        "auto-save"
    }

    fn notify(&mut self, _calc: &Calculation, history: &HistoryStore) -> Result<(), ObserverError> {
        let rows = save_history(self.io.as_ref(), history, &self.path)?;
        info!(rows, path = %self.path.display(), "history auto-saved");
        Ok(())
    }
}
