use calclog::{
    calc::Calculation,
    core::{
        history::HistoryStore,
        snapshot::{UndoError, UndoManager},
    },
    ops::OperationRegistry,
    persist::csv::CsvTable,
    session::{Session, SessionSettings},
    types::Decimal,
};

fn add(registry: &OperationRegistry, a: i64, b: i64) -> Calculation {
    Calculation::new(registry, "add", Decimal::from(a), Decimal::from(b)).expect("add")
}

fn session() -> Session {
    Session::new(
        SessionSettings::default(),
        OperationRegistry::with_builtins(),
        Box::new(CsvTable::new()),
    )
}

fn results(session: &Session) -> Vec<Decimal> {
    session.history().iter().map(Calculation::result).collect()
}

#[test]
fn history_evicts_oldest_first() {
    let registry = OperationRegistry::with_builtins();
    let mut history = HistoryStore::new(2);

    assert!(history.append(add(&registry, 1, 1)).is_empty());
    assert!(history.append(add(&registry, 2, 2)).is_empty());
    let evicted = history.append(add(&registry, 3, 3));

    assert_eq!(evicted, vec![add(&registry, 1, 1)]);
    assert_eq!(history.records(), vec![add(&registry, 2, 2), add(&registry, 3, 3)]);
    assert_eq!(history.last().map(Calculation::result), Some(Decimal::from(6)));
    assert_eq!(HistoryStore::new(0).max_size(), 1);
}

#[test]
fn clear_is_idempotent() {
    let registry = OperationRegistry::with_builtins();
    let mut history = HistoryStore::new(10);
    history.append(add(&registry, 1, 2));
    history.clear();
    assert!(history.is_empty());
    history.clear();
    assert!(history.is_empty());
}

#[test]
fn snapshot_does_not_alias_live_history() {
    let registry = OperationRegistry::with_builtins();
    let mut history = HistoryStore::new(10);
    history.append(add(&registry, 1, 2));

    let snap = UndoManager::snapshot(&history);
    history.append(add(&registry, 3, 4));
    history.clear();

    assert!(!snap.is_empty());
    assert_eq!(snap.len(), 1);
    assert_eq!(snap.records()[0], add(&registry, 1, 2));
}

#[test]
fn manager_reports_empty_stacks() {
    let history = HistoryStore::new(10);
    let mut undo = UndoManager::new(10);
    assert_eq!(undo.undo(&history).unwrap_err(), UndoError::NothingToUndo);
    assert_eq!(undo.redo(&history).unwrap_err(), UndoError::NothingToRedo);
}

#[test]
fn manager_bounds_undo_depth() {
    let registry = OperationRegistry::with_builtins();
    let mut history = HistoryStore::new(100);
    let mut undo = UndoManager::new(3);
    for i in 0..10 {
        undo.save_state(&history);
        history.append(add(&registry, i, i));
    }
    assert_eq!(undo.undo_len(), 3);

    // the three most recent pre-mutation states survive
    let mut sizes = Vec::new();
    while let Ok(prev) = undo.undo(&history) {
        sizes.push(prev.len());
        history.restore(prev);
    }
    assert_eq!(sizes, vec![9, 8, 7]);
    assert_eq!(undo.redo_len(), 3);
}

#[test]
fn undo_restores_pre_mutation_state_and_redo_reapplies() {
    let mut session = session();
    session.execute("add", "1", "1").expect("a");
    session.execute("multiply", "2", "3").expect("b");

    assert!(session.undo());
    assert_eq!(results(&session), vec![Decimal::from(2)]);

    assert!(session.redo());
    assert_eq!(results(&session), vec![Decimal::from(2), Decimal::from(6)]);
}

#[test]
fn new_operation_after_undo_clears_redo() {
    let mut session = session();
    session.execute("add", "1", "1").expect("a");
    session.execute("add", "2", "2").expect("b");
    assert!(session.undo());
    assert_eq!(session.redo_depth(), 1);

    session.execute("add", "3", "3").expect("c");
    assert_eq!(session.redo_depth(), 0);
    assert!(!session.redo());
    assert_eq!(results(&session), vec![Decimal::from(2), Decimal::from(6)]);
}

#[test]
fn fresh_session_has_nothing_to_undo_or_redo() {
    let mut session = session();
    assert!(!session.undo());
    assert!(!session.redo());
    assert!(session.history().is_empty());
}

#[test]
fn undo_all_returns_to_empty() {
    let mut session = session();
    for i in 0..5 {
        session.execute("add", &i.to_string(), "1").expect("add");
    }
    let mut undone = 0;
    while session.undo() {
        undone += 1;
    }
    assert_eq!(undone, 5);
    assert!(session.history().is_empty());
}

#[test]
fn clear_can_be_undone() {
    let mut session = session();
    session.execute("add", "1", "2").expect("add");
    session.clear();
    assert!(session.history().is_empty());

    assert!(session.undo());
    assert_eq!(results(&session), vec![Decimal::from(3)]);
}
