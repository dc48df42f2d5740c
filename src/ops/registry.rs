use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;
use tracing::debug;

use crate::types::Decimal;

use super::{
    Builtin, FnOperation, Operation, OperationError, RegistryError, UnknownOperation, Validator,
};

/// A registered operation bound to its normalized name.
#[derive(Clone)]
pub struct OperationDescriptor {
    name: String,
    op: Arc<dyn Operation>,
}

impl OperationDescriptor {
    /// Normalized registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs validation, then execution.
    pub fn run(&self, a: Decimal, b: Decimal) -> Result<Decimal, OperationError> {
        self.op.validate(a, b)?;
        self.op.execute(a, b)
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Case-insensitive mapping from operation names to behaviors.
///
/// Owned by the session and passed by reference to anything that resolves
/// names; there is no process-wide registry.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    entries: HashMap<String, OperationDescriptor>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every [`Builtin`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in Builtin::ALL {
            registry.insert(builtin.name().to_string(), Arc::new(builtin));
        }
        registry
    }

    /// Adds or silently replaces the entry under `name`.
    pub fn register<O>(&mut self, name: &str, op: O) -> Result<(), RegistryError>
    where
        O: Operation + 'static,
    {
        let key = normalize(name);
        if key.is_empty() {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        self.insert(key, Arc::new(op));
        Ok(())
    }

    /// Registers a closure with zero or more validators.
    pub fn register_fn<F>(
        &mut self,
        name: &str,
        func: F,
        validators: Vec<Validator>,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Decimal, Decimal) -> Result<Decimal, OperationError> + Send + Sync + 'static,
    {
        self.register(name, FnOperation::new(func, validators))
    }

    /// Exact lookup after case and whitespace normalization.
    pub fn resolve(&self, name: &str) -> Result<&OperationDescriptor, UnknownOperation> {
        self.entries
            .get(&normalize(name))
            .ok_or_else(|| UnknownOperation {
                name: name.to_string(),
            })
    }

    /// True when `name` resolves.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    /// All registered names, sorted.
    pub fn list(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, op: Arc<dyn Operation>) {
        let desc = OperationDescriptor {
            name: key.clone(),
            op,
        };
        if self.entries.insert(key.clone(), desc).is_some() {
            debug!(operation = %key, "replaced registered operation");
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
