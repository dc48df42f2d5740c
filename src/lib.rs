//! Decimal calculator with a bounded history, snapshot undo/redo, and CSV
//! persistence.
//!
//! # Examples
//!
//! In-memory usage with [`session::Session`]:
//! ```
//! use calclog::{
//!     ops::OperationRegistry,
//!     persist::csv::CsvTable,
//!     session::{Session, SessionSettings},
//! };
//!
//! let mut session = Session::new(
//!     SessionSettings::default(),
//!     OperationRegistry::with_builtins(),
//!     Box::new(CsvTable::new()),
//! );
//! let calc = session.execute("add", "2", "3").expect("add");
//! assert_eq!(calc.to_string(), "add(2, 3) = 5");
//! assert!(session.undo());
//! assert!(session.history().is_empty());
//! assert!(session.redo());
//! assert_eq!(session.history().len(), 1);
//! ```
//!
//! Registering an operation at runtime:
//! ```
//! use calclog::{ops::OperationRegistry, types::Decimal};
//!
//! let mut registry = OperationRegistry::with_builtins();
//! registry
//!     .register_fn("max", |a: Decimal, b: Decimal| Ok(a.max(b)), vec![])
//!     .expect("register");
//! let max = registry.resolve("MAX").expect("resolve");
//! assert_eq!(max.run(Decimal::ONE, Decimal::TWO), Ok(Decimal::TWO));
//! ```

/// Calculation records and their flat row form.
pub mod calc;
/// Environment-driven configuration.
pub mod config;
/// History store and undo/redo snapshots.
pub mod core;
/// Log-file subscriber setup.
pub mod logging;
/// Operation registry and built-in arithmetic.
pub mod ops;
/// Table persistence abstraction and CSV implementation.
pub mod persist;
/// Interactive command loop.
pub mod repl;
/// Session controller and observers.
pub mod session;
/// Shared primitive types and column names.
pub mod types;
