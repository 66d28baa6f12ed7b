use crate::StoreError;

pub mod memory;

pub use memory::MemoryStore;

/// Key-value persistence the journal is built on.
///
/// Implementations hold string values under string keys. `delete` of a missing
/// key succeeds. A `write` may fail with [`StoreError::QuotaExceeded`] when the
/// backing medium is full.
pub trait KvStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
