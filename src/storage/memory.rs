use super::StorageEngine;
use crate::errors::DbError;
use crate::types::Operation;

/// Keeps the operation log in memory; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    ops: Vec<Operation>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl StorageEngine for MemoryStorage {
    fn append(&mut self, operation: &Operation) -> Result<(), DbError> {
        self.ops.push(operation.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Operation>, DbError> {
        Ok(self.ops.clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
