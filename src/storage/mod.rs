//! Operation log backends. Every mutation is appended here before it is applied in memory,
//! and `Engine::open` rebuilds collections by replaying `read_all`.

mod memory;
mod wal;

pub use memory::MemoryStorage;
pub use wal::{WalStorage, decode_frames, encode_frame};

use crate::errors::DbError;
use crate::types::Operation;

pub trait StorageEngine: Send + Sync {
    /// Durably record one operation.
    ///
    /// # Errors
    /// Returns an error if the operation cannot be encoded or written.
    fn append(&mut self, operation: &Operation) -> Result<(), DbError>;

    /// Every recorded operation, oldest first.
    ///
    /// # Errors
    /// Returns an error if the log cannot be read or is corrupt.
    fn read_all(&self) -> Result<Vec<Operation>, DbError>;

    /// Flush buffered writes. Backends without buffering do nothing.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    fn sync(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn describe(&self) -> String;
}
