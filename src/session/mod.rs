//! Session controller: owns the history, the undo stacks, and the observers.

/// Observer trait and the built-in logging/auto-save observers.
pub mod observers;

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    calc::{Calculation, CalculationError, parse_number},
    config::CalculatorConfig,
    core::{history::HistoryStore, snapshot::UndoManager},
    ops::{OperationError, OperationRegistry, UnknownOperation},
    persist::{PersistError, TableIo, csv::CsvTable, load_history, save_history},
    types::Decimal,
};

use observers::{AutoSaveObserver, LoggingObserver, Observer, ObserverId};

/// Rejected raw operand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Blank input.
    #[error("input cannot be empty")]
    Empty,
    /// Not a decimal number.
    #[error("invalid number format: {0}")]
    NotANumber(String),
    /// Magnitude above the configured limit or the decimal range.
    #[error("value {value} exceeds the maximum allowed limit ({max})")]
    TooLarge {
        /// Input as entered.
        value: String,
        /// Configured bound.
        max: Decimal,
    },
    /// Non-zero input below the smallest representable step.
    #[error("value {0} is too small to represent")]
    TooSmall(String),
}

/// Every failure a session reports to its caller. `Display` is the one-line
/// message shown to the user.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad operand input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    /// Operation name not registered.
    #[error("{0}")]
    UnknownOperation(UnknownOperation),
    /// Domain rule violation or arithmetic failure.
    #[error("operation error: {0}")]
    Operation(OperationError),
    /// Persisted data that does not describe a calculation.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    /// Save or load failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistError),
}

impl From<CalculationError> for SessionError {
    fn from(value: CalculationError) -> Self {
        match value {
            CalculationError::UnknownOperation(err) => Self::UnknownOperation(err),
            CalculationError::Failed(err) => Self::Operation(err),
            CalculationError::InvalidRecord(msg) => Self::InvalidRecord(msg),
        }
    }
}

/// Trims, parses, bounds-checks, and normalizes one raw operand.
pub fn parse_operand(raw: &str, max: Decimal) -> Result<Decimal, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Empty);
    }
    let Some(value) = parse_number(raw) else {
        return Err(out_of_range(raw, max));
    };
    if value.abs() > max {
        return Err(ValidationError::TooLarge {
            value: raw.to_string(),
            max,
        });
    }
    if value.is_zero() && has_nonzero_digit(raw) {
        return Err(ValidationError::TooSmall(raw.to_string()));
    }
    Ok(value.normalize())
}

// Well-formed numbers the decimal type cannot hold are range errors, not
// format errors.
fn out_of_range(raw: &str, max: Decimal) -> ValidationError {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() >= 1.0 => ValidationError::TooLarge {
            value: raw.to_string(),
            max,
        },
        Ok(v) if v.is_finite() && has_nonzero_digit(raw) => ValidationError::TooSmall(raw.to_string()),
        _ => ValidationError::NotANumber(raw.to_string()),
    }
}

fn has_nonzero_digit(raw: &str) -> bool {
    raw.split(['e', 'E'])
        .next()
        .is_some_and(|mantissa| mantissa.bytes().any(|b| (b'1'..=b'9').contains(&b)))
}

/// Limits and paths a session runs with.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// History capacity.
    pub max_history_size: usize,
    /// Undo retention bound.
    pub max_undo_depth: usize,
    /// Largest accepted operand magnitude.
    pub max_input_value: Decimal,
    /// Decimal places used when displaying results.
    pub precision: u32,
    /// Table read by `load` and written by `save`.
    pub history_file: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_history_size: 1000,
            max_undo_depth: 100,
            max_input_value: Decimal::MAX,
            precision: 10,
            history_file: PathBuf::from("calculator_history.csv"),
        }
    }
}

impl From<&CalculatorConfig> for SessionSettings {
    fn from(config: &CalculatorConfig) -> Self {
        Self {
            max_history_size: config.max_history_size,
            max_undo_depth: config.max_undo_depth,
            max_input_value: config.max_input_value,
            precision: config.precision,
            history_file: config.history_file.clone(),
        }
    }
}

/// Single-writer calculator session.
///
/// Each call runs to completion before the next; a multi-client front end
/// must hold one lock across a whole `execute` because the snapshot, append,
/// and redo invalidation are separate steps.
pub struct Session {
    registry: OperationRegistry,
    history: HistoryStore,
    undo: UndoManager,
    observers: Vec<(ObserverId, Box<dyn Observer>)>,
    next_observer_id: u64,
    table: Box<dyn TableIo>,
    settings: SessionSettings,
}

impl Session {
    /// Empty session with no observers.
    pub fn new(settings: SessionSettings, registry: OperationRegistry, table: Box<dyn TableIo>) -> Self {
        Self {
            history: HistoryStore::new(settings.max_history_size),
            undo: UndoManager::new(settings.max_undo_depth),
            registry,
            observers: Vec::new(),
            next_observer_id: 1,
            table,
            settings,
        }
    }

    /// Session over the built-in operations and a CSV history file, with
    /// logging (and auto-save when enabled) attached and the existing
    /// history loaded. A failed load is logged and leaves the history empty.
    pub fn open(config: &CalculatorConfig) -> Self {
        let mut session = Self::new(
            SessionSettings::from(config),
            OperationRegistry::with_builtins(),
            Box::new(CsvTable::new()),
        );
        session.add_observer(Box::new(LoggingObserver));
        if config.auto_save {
            session.add_observer(Box::new(AutoSaveObserver::new(
                Box::new(CsvTable::new()),
                config.history_file.clone(),
            )));
        }

        match load_history(
            session.table.as_ref(),
            &session.registry,
            &mut session.history,
            &session.settings.history_file,
        ) {
            Ok(count) => info!(count, path = %session.settings.history_file.display(), "history loaded"),
            Err(err) => {
                warn!(%err, "could not load existing history; starting empty");
                session.history.clear();
            }
        }
        info!(?config, "calculator session initialized");
        session
    }

    /// Validates operands, evaluates `operation`, records the result, and
    /// notifies observers. Nothing changes when any step before the append
    /// fails.
    pub fn execute(&mut self, operation: &str, a_raw: &str, b_raw: &str) -> Result<Calculation, SessionError> {
        let result = self.try_execute(operation, a_raw, b_raw);
        if let Err(err) = &result {
            warn!(operation, %err, "calculation rejected");
        }
        result
    }

    fn try_execute(&mut self, operation: &str, a_raw: &str, b_raw: &str) -> Result<Calculation, SessionError> {
        let max = self.settings.max_input_value;
        let a = parse_operand(a_raw, max)?;
        let b = parse_operand(b_raw, max)?;
        let calc = Calculation::new(&self.registry, operation, a, b)?;

        self.undo.save_state(&self.history);
        self.history.append(calc.clone());
        self.notify_observers(&calc);
        Ok(calc)
    }

    /// Restores the state before the last mutation. False when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.undo.undo(&self.history) {
            Ok(prev) => {
                self.history.restore(prev);
                info!(len = self.history.len(), "undo applied");
                true
            }
            Err(_) => false,
        }
    }

    /// Re-applies the last undone mutation. False when there is nothing to
    /// redo.
    pub fn redo(&mut self) -> bool {
        match self.undo.redo(&self.history) {
            Ok(next) => {
                self.history.restore(next);
                info!(len = self.history.len(), "redo applied");
                true
            }
            Err(_) => false,
        }
    }

    /// Empties the history. Undoable.
    pub fn clear(&mut self) {
        self.undo.save_state(&self.history);
        self.history.clear();
        info!("history cleared");
    }

    /// Writes the history table. Returns the row count.
    pub fn save(&self) -> Result<usize, SessionError> {
        let path = &self.settings.history_file;
        match save_history(self.table.as_ref(), &self.history, path) {
            Ok(rows) => {
                info!(rows, path = %path.display(), "history saved");
                Ok(rows)
            }
            Err(err) => {
                error!(%err, path = %path.display(), "failed to save history");
                Err(err.into())
            }
        }
    }

    /// Replaces the history with the table's contents. Undoable; the history
    /// is untouched when the load fails.
    pub fn load(&mut self) -> Result<usize, SessionError> {
        let path = self.settings.history_file.clone();
        let before = self.history.clone();
        match load_history(self.table.as_ref(), &self.registry, &mut self.history, &path) {
            Ok(count) => {
                self.undo.save_state(&before);
                info!(count, path = %path.display(), "history loaded");
                Ok(count)
            }
            Err(err) => {
                error!(%err, path = %path.display(), "failed to load history");
                Err(err.into())
            }
        }
    }

    /// Attaches an observer; returns the id used to remove it.
    pub fn add_observer(&mut self, observer: Box<dyn Observer>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        info!(observer = observer.name(), "observer added");
        self.observers.push((id, observer));
        id
    }

    /// Detaches an observer. False when `id` is not attached.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let Some(pos) = self.observers.iter().position(|(oid, _)| *oid == id) else {
            return false;
        };
        let (_, observer) = self.observers.remove(pos);
        info!(observer = observer.name(), "observer removed");
        true
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Mutable access for runtime registration.
    pub fn registry_mut(&mut self) -> &mut OperationRegistry {
        &mut self.registry
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.undo_len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undo.redo_len()
    }

    /// `calc`'s result at the session's display precision.
    pub fn format_result(&self, calc: &Calculation) -> String {
        calc.format_result(self.settings.precision)
    }

    fn notify_observers(&mut self, calc: &Calculation) {
        for (_, observer) in &mut self.observers {
            if let Err(err) = observer.notify(calc, &self.history) {
                error!(observer = observer.name(), %err, "observer failed");
            }
        }
    }
}
