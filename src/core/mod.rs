//! In-memory history store and snapshot-based undo/redo.

/// Bounded, ordered calculation history.
pub mod history;
/// Snapshots and the undo/redo stacks.
pub mod snapshot;
