use std::sync::Arc;

use crate::types::Decimal;

use super::OperationError;

/// Standalone operand check run before an operation executes.
pub type Validator = Arc<dyn Fn(Decimal, Decimal) -> Result<(), OperationError> + Send + Sync>;

/// Binary decimal operation with an optional validation capability.
///
/// Implementors must be pure: the same operands always yield the same result.
pub trait Operation: Send + Sync {
    /// Rejects operand pairs the operation cannot accept.
    fn validate(&self, _a: Decimal, _b: Decimal) -> Result<(), OperationError> {
        Ok(())
    }

    /// Computes the result. Callers run [`Operation::validate`] first.
    fn execute(&self, a: Decimal, b: Decimal) -> Result<Decimal, OperationError>;
}

/// Closure-backed operation used for runtime registration.
pub struct FnOperation<F> {
    func: F,
    validators: Vec<Validator>,
}

impl<F> FnOperation<F>
where
    F: Fn(Decimal, Decimal) -> Result<Decimal, OperationError> + Send + Sync,
{
    /// Wraps `func` with the given validators, run in order.
    pub fn new(func: F, validators: Vec<Validator>) -> Self {
        Self { func, validators }
    }
}

impl<F> Operation for FnOperation<F>
where
    F: Fn(Decimal, Decimal) -> Result<Decimal, OperationError> + Send + Sync,
{
    fn validate(&self, a: Decimal, b: Decimal) -> Result<(), OperationError> {
        for check in &self.validators {
            check(a, b)?;
        }
        Ok(())
    }

    fn execute(&self, a: Decimal, b: Decimal) -> Result<Decimal, OperationError> {
        (self.func)(a, b)
    }
}
