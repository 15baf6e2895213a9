use std::collections::HashMap;

use crate::common::address::Address;

/// Which row family a key belongs to. The backend is free to map tables to
/// physical storage however it likes; keys are only unique per table.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum Table {
    /// address -> RLP-encoded account record
    AccountInfo,
    /// 32-byte slot -> 32-byte value, one table per account
    Storage(Address),
    /// keccak256(code) -> code bytes
    Code,
}

/// The durable key-value store under the journal. Only ever written through
/// `batch_write`/`batch_delete`, each of which must apply atomically.
pub trait Backend {
    fn get(&self, table: &Table, key: &[u8]) -> eyre::Result<Option<Vec<u8>>>;

    fn batch_write(&mut self, table: &Table, entries: Vec<(Vec<u8>, Vec<u8>)>)
    -> eyre::Result<()>;

    fn batch_delete(&mut self, table: &Table, keys: Vec<Vec<u8>>) -> eyre::Result<()>;
}

/// In-memory reference backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: HashMap<Table, HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count across every table, handy for asserting what a commit
    /// actually persisted.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(HashMap::len).sum()
    }

    pub fn contains(&self, table: &Table, key: &[u8]) -> bool {
        self.tables
            .get(table)
            .is_some_and(|rows| rows.contains_key(key))
    }
}

impl Backend for MemoryBackend {
    fn get(&self, table: &Table, key: &[u8]) -> eyre::Result<Option<Vec<u8>>> {
        Ok(self
            .tables
            .get(table)
            .and_then(|rows| rows.get(key))
            .cloned())
    }

    fn batch_write(
        &mut self,
        table: &Table,
        entries: Vec<(Vec<u8>, Vec<u8>)>,
    ) -> eyre::Result<()> {
        let rows = self.tables.entry(table.clone()).or_default();
        for (key, value) in entries {
            rows.insert(key, value);
        }
        Ok(())
    }

    fn batch_delete(&mut self, table: &Table, keys: Vec<Vec<u8>>) -> eyre::Result<()> {
        if let Some(rows) = self.tables.get_mut(table) {
            for key in keys {
                rows.remove(&key);
            }
        }
        Ok(())
    }
}
