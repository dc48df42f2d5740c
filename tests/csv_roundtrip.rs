use std::fmt::{self, Write as _};
use std::fs;
use std::sync::{Arc, Mutex};

use calclog::{
    calc::{Calculation, CalculationError, FlatRecord},
    core::{
        history::{HistoryError, HistoryStore},
        snapshot::{Snapshot, SnapshotError},
    },
    ops::OperationRegistry,
    persist::{PersistError, TableIo, csv::CsvTable, load_history, save_history},
    types::Decimal,
};
use tempfile::tempdir;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
};

#[derive(Clone, Default)]
struct EventCapture {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

struct FieldText(String);

impl Visit for FieldText {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut text = FieldText(String::new());
        event.record(&mut text);
        self.events
            .lock()
            .expect("lock")
            .push((*event.metadata().level(), text.0));
    }
}

fn warnings_during<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let capture = EventCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let out = tracing::subscriber::with_default(subscriber, f);
    let warnings = capture
        .events
        .lock()
        .expect("lock")
        .iter()
        .filter(|(level, _)| *level == Level::WARN)
        .map(|(_, text)| text.clone())
        .collect();
    (out, warnings)
}

fn add_row(stored: &str) -> FlatRecord {
    [
        ("operation", "add"),
        ("operand_a", "2"),
        ("operand_b", "3"),
        ("result", stored),
        ("timestamp", "2024-03-01T10:00:00"),
    ]
    .into_iter()
    .collect()
}

fn sample(registry: &OperationRegistry) -> HistoryStore {
    let mut history = HistoryStore::new(100);
    for (op, a, b) in [
        ("add", "2", "3"),
        ("divide", "1", "3"),
        ("power", "2", "10"),
        ("subtract", "-1.25", "0.75"),
    ] {
        let a = a.parse::<Decimal>().expect("a");
        let b = b.parse::<Decimal>().expect("b");
        history.append(Calculation::new(registry, op, a, b).expect("calc"));
    }
    history
}

#[test]
fn save_then_load_preserves_records_and_order() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("history.csv");
    let registry = OperationRegistry::with_builtins();
    let history = sample(&registry);

    let written = save_history(&CsvTable::new(), &history, &path).expect("save");
    assert_eq!(written, 4);

    let mut loaded = HistoryStore::new(100);
    let count = load_history(&CsvTable::new(), &registry, &mut loaded, &path).expect("load");
    assert_eq!(count, 4);
    assert_eq!(loaded.records(), history.records());
    let stamps: Vec<_> = loaded.iter().map(Calculation::timestamp).collect();
    let original: Vec<_> = history.iter().map(Calculation::timestamp).collect();
    assert_eq!(stamps, original);
}

#[test]
fn saved_file_has_canonical_header() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("history.csv");
    let registry = OperationRegistry::with_builtins();

    save_history(&CsvTable::new(), &sample(&registry), &path).expect("save");
    let text = fs::read_to_string(&path).expect("read");
    assert_eq!(
        text.lines().next(),
        Some("operation,operand_a,operand_b,result,timestamp")
    );
    assert!(text.lines().nth(1).expect("row").starts_with("add,2,3,5,"));
}

#[test]
fn missing_file_loads_as_empty() {
    let dir = tempdir().expect("tempdir");
    let rows = CsvTable::new()
        .read_table(&dir.path().join("absent.csv"))
        .expect("read");
    assert!(rows.is_empty());
}

#[test]
fn legacy_operand_columns_are_accepted() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("legacy.csv");
    fs::write(
        &path,
        "operation,operand1,operand2,result,timestamp\n\
         multiply,4,5,20,2024-03-01T10:00:00.000000\n",
    )
    .expect("write");

    let registry = OperationRegistry::with_builtins();
    let mut history = HistoryStore::new(10);
    load_history(&CsvTable::new(), &registry, &mut history, &path).expect("load");
    let calc = history.last().expect("row");
    assert_eq!(calc.operation(), "multiply");
    assert_eq!(calc.result(), Decimal::from(20));
    assert_eq!(calc.timestamp().to_string(), "2024-03-01 10:00:00");
}

#[test]
fn mismatched_stored_result_is_recomputed_with_warning() {
    let registry = OperationRegistry::with_builtins();

    let (calc, warnings) = warnings_during(|| Calculation::from_row(&registry, &add_row("10")));
    assert_eq!(calc.expect("row").result(), Decimal::from(5));
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("stored=10"), "{}", warnings[0]);
    assert!(warnings[0].contains("computed=5"), "{}", warnings[0]);

    let (calc, warnings) = warnings_during(|| Calculation::from_row(&registry, &add_row("5.0")));
    assert_eq!(calc.expect("row").result(), Decimal::from(5));
    assert!(warnings.is_empty());
}

#[test]
fn row_missing_a_field_is_invalid() {
    let registry = OperationRegistry::with_builtins();
    let row: FlatRecord = [("operation", "add"), ("operand_a", "2")].into_iter().collect();
    assert_eq!(row.len(), 2);
    assert!(!row.is_empty());
    assert!(matches!(
        Calculation::from_row(&registry, &row),
        Err(CalculationError::InvalidRecord(_))
    ));
}

#[test]
fn one_bad_row_fails_the_whole_load() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("bad.csv");
    fs::write(
        &path,
        "operation,operand_a,operand_b,result,timestamp\n\
         add,1,1,2,2024-03-01T10:00:00\n\
         divide,1,0,0,2024-03-01T10:00:01\n",
    )
    .expect("write");

    let registry = OperationRegistry::with_builtins();
    let mut history = sample(&registry);
    let before = history.records();

    let err = load_history(&CsvTable::new(), &registry, &mut history, &path).unwrap_err();
    assert!(matches!(
        err,
        PersistError::History(HistoryError::InvalidRow { index: 1, .. })
    ));
    assert_eq!(history.records(), before);
}

#[test]
fn load_trims_to_capacity_keeping_newest() {
    let registry = OperationRegistry::with_builtins();
    let source = sample(&registry);
    let mut small = HistoryStore::new(2);
    let count = small.from_rows(&registry, source.to_rows()).expect("rows");
    assert_eq!(count, 2);
    assert_eq!(small.records(), source.records()[2..].to_vec());
}

#[test]
fn snapshot_encodes_to_versioned_json() {
    let registry = OperationRegistry::with_builtins();
    let snap = Snapshot::capture(&sample(&registry));

    let bytes = snap.encode().expect("encode");
    let decoded = Snapshot::decode(&registry, &bytes).expect("decode");
    assert_eq!(decoded.records(), snap.records());
    assert_eq!(decoded.captured_at(), snap.captured_at());

    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(json["format_version"], 1);
    assert_eq!(json["rows"][0]["operation"], "add");
}

#[test]
fn snapshot_rejects_unknown_version() {
    let registry = OperationRegistry::with_builtins();
    let payload = br#"{"format_version":9,"captured_at":"2024-03-01T10:00:00","rows":[]}"#;
    assert!(matches!(
        Snapshot::decode(&registry, payload),
        Err(SnapshotError::UnsupportedVersion(9))
    ));
}
