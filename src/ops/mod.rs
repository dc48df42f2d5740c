//! Operation registry: named binary decimal operations with pre-execution validation.

/// Built-in arithmetic operation set.
pub mod builtin;
/// Name-keyed registry and resolved descriptors.
pub mod registry;
/// Operation capability traits and the closure-backed extension point.
pub mod traits;

use thiserror::Error;

pub use builtin::Builtin;
pub use registry::{OperationDescriptor, OperationRegistry};
pub use traits::{FnOperation, Operation, Validator};

/// Domain-rule failures raised while validating or executing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Divisor (or percent base) was zero.
    #[error("division by zero")]
    DivisionByZero,
    /// Root degree was zero.
    #[error("zero root undefined")]
    ZeroRoot,
    /// Even or fractional root of a negative radicand.
    #[error("cannot take root of negative number")]
    NegativeRoot,
    /// Floating-point power produced a non-finite or unrepresentable value.
    #[error("power result invalid or too large")]
    PowerInvalid,
    /// Floating-point root produced a non-finite or unrepresentable value.
    #[error("root result invalid or too large")]
    RootInvalid,
    /// Decimal arithmetic exceeded the representable range.
    #[error("arithmetic overflow")]
    Overflow,
    /// A registered validator rejected the operands.
    #[error("{0}")]
    Rejected(String),
}

/// Lookup failure for a name that is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operation: {name}")]
pub struct UnknownOperation {
    /// Name as requested by the caller.
    pub name: String,
}

/// Registration-time failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Name was empty after trimming.
    #[error("invalid operation name: {0:?}")]
    InvalidName(String),
}
