use crate::{KvStore, StoreError};
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-process store with an optional byte quota, counted as key plus value lengths.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KvStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut m = self.entries.write();
        if let Some(limit) = self.quota {
            let used: usize = m
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            let available = limit.saturating_sub(used);
            if needed > available {
                return Err(StoreError::QuotaExceeded { needed, available });
            }
        }
        m.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_missing_is_none() {
        let s = MemoryStore::new();
        assert_eq!(s.read("nope").unwrap(), None);
        s.delete("nope").unwrap();
    }

    #[test]
    fn quota_counts_net_replacement() {
        let s = MemoryStore::with_quota(10);
        s.write("k", "123456789").unwrap();
        // replacing the same key only needs room for the new value
        s.write("k", "abcdefghi").unwrap();
        let err = s.write("k2", "x").unwrap_err();
        assert_eq!(err, StoreError::QuotaExceeded { needed: 3, available: 0 });
        assert_eq!(s.read("k").unwrap().as_deref(), Some("abcdefghi"));
    }
}
