use std::collections::HashMap;

use crate::common::{
    account::AccountRecord,
    address::Address,
    hash::{empty_code_hash, keccak256},
    word::Word,
};
use crate::db::{
    backend::{Backend, Table},
    overlay::Overlay,
};

/// Pending mutations of a committed transaction, read out of the overlay
/// root layers before `persist`. `None` marks a deletion.
#[derive(Debug, Default, PartialEq)]
pub struct StateDiff {
    pub accounts: Vec<(Address, Option<AccountRecord>)>,
    pub storage: Vec<(Address, Word, Option<Word>)>,
    pub code: Vec<(Word, Vec<u8>)>,
}

/// The journaled account database: one overlay for account records, one for
/// code rows, and one per touched account for its storage, all over a single
/// backend and checkpointed in lockstep.
pub struct AccountDB<B: Backend> {
    backend: B,
    info: Overlay,
    code: Overlay,
    storage: HashMap<Address, Overlay>,
    depth: usize,
}

impl<B: Backend> AccountDB<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            info: Overlay::new(Table::AccountInfo),
            code: Overlay::new(Table::Code),
            storage: HashMap::new(),
            depth: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn record(&self, address: &Address) -> eyre::Result<AccountRecord> {
        match self.info.get(&self.backend, &address.0)? {
            Some(encoded) => Ok(AccountRecord::from_rlp(&encoded)?),
            None => Ok(AccountRecord::default()),
        }
    }

    fn set_record(&mut self, address: &Address, record: &AccountRecord) {
        self.info.set(address.0.to_vec(), Some(record.to_rlp()));
    }

    //
    // balance / nonce
    //

    pub fn get_balance(&self, address: &Address) -> eyre::Result<Word> {
        Ok(self.record(address)?.balance)
    }

    pub fn set_balance(&mut self, address: &Address, balance: Word) -> eyre::Result<()> {
        let mut record = self.record(address)?;
        record.balance = balance;
        self.set_record(address, &record);
        Ok(())
    }

    pub fn get_nonce(&self, address: &Address) -> eyre::Result<u64> {
        Ok(self.record(address)?.nonce)
    }

    pub fn set_nonce(&mut self, address: &Address, nonce: u64) -> eyre::Result<()> {
        let mut record = self.record(address)?;
        record.nonce = nonce;
        self.set_record(address, &record);
        Ok(())
    }

    pub fn increment_nonce(&mut self, address: &Address) -> eyre::Result<()> {
        let nonce = self.get_nonce(address)?;
        self.set_nonce(address, nonce + 1)
    }

    //
    // code
    //

    pub fn get_code_hash(&self, address: &Address) -> eyre::Result<Word> {
        Ok(self.record(address)?.code_hash)
    }

    pub fn get_code(&self, address: &Address) -> eyre::Result<Vec<u8>> {
        let hash = self.get_code_hash(address)?;
        if hash == empty_code_hash() {
            return Ok(Vec::new());
        }
        self.code
            .get(&self.backend, &hash.into_bytes())?
            .ok_or_else(|| eyre::eyre!("missing code row for hash {hash:#x}"))
    }

    /// Store `code` under its hash and point the account record at it.
    pub fn set_code(&mut self, address: &Address, code: &[u8]) -> eyre::Result<()> {
        let hash = Word::from_bytes(&keccak256(code));
        if hash != empty_code_hash() {
            self.code.set(hash.into_bytes().to_vec(), Some(code.to_vec()));
        }
        let mut record = self.record(address)?;
        record.code_hash = hash;
        self.set_record(address, &record);
        Ok(())
    }

    //
    // storage
    //

    pub fn get_storage(&self, address: &Address, slot: &Word) -> eyre::Result<Word> {
        let key = slot.into_bytes();
        let value = match self.storage.get(address) {
            Some(overlay) => overlay.get(&self.backend, &key)?,
            None => self.backend.get(&Table::Storage(*address), &key)?,
        };
        Ok(value
            .map(|bytes| Word::from_bytes(&bytes))
            .unwrap_or_default())
    }

    /// Zero-valued slots are stored as deletions so they vanish from the
    /// backend on persist.
    pub fn set_storage(&mut self, address: &Address, slot: Word, value: Word) {
        let overlay = self.storage_overlay(address);
        let entry = if value.is_zero() {
            None
        } else {
            Some(value.into_bytes().to_vec())
        };
        overlay.set(slot.into_bytes().to_vec(), entry);
    }

    fn storage_overlay(&mut self, address: &Address) -> &mut Overlay {
        let depth = self.depth;
        self.storage
            .entry(*address)
            .or_insert_with(|| Overlay::new_at_depth(Table::Storage(*address), depth))
    }

    //
    // account lifecycle
    //

    pub fn account_exists(&self, address: &Address) -> eyre::Result<bool> {
        Ok(self.info.get(&self.backend, &address.0)?.is_some())
    }

    pub fn account_is_empty(&self, address: &Address) -> eyre::Result<bool> {
        Ok(self.record(address)?.is_empty())
    }

    pub fn has_code_or_nonce(&self, address: &Address) -> eyre::Result<bool> {
        Ok(self.record(address)?.has_code_or_nonce())
    }

    /// Remove the record and every pending storage write. Only accounts
    /// created within the current transaction are ever fully deleted, so
    /// the pending keys cover everything the account owns.
    pub fn delete_account(&mut self, address: &Address) -> eyre::Result<()> {
        let keys = self
            .storage
            .get(address)
            .map(Overlay::pending_keys)
            .unwrap_or_default();
        if !keys.is_empty() {
            let overlay = self.storage_overlay(address);
            for key in keys {
                overlay.set(key, None);
            }
        }
        self.info.set(address.0.to_vec(), None);
        Ok(())
    }

    //
    // checkpoints
    //

    pub fn checkpoint(&mut self) -> usize {
        self.depth += 1;
        self.info.checkpoint();
        self.code.checkpoint();
        for overlay in self.storage.values_mut() {
            overlay.checkpoint();
        }
        self.depth
    }

    pub fn commit(&mut self, id: usize) -> eyre::Result<()> {
        self.info.commit(id)?;
        self.code.commit(id)?;
        for overlay in self.storage.values_mut() {
            overlay.commit(id)?;
        }
        self.depth = id - 1;
        Ok(())
    }

    pub fn discard(&mut self, id: usize) -> eyre::Result<()> {
        self.info.discard(id)?;
        self.code.discard(id)?;
        for overlay in self.storage.values_mut() {
            overlay.discard(id)?;
        }
        self.depth = id - 1;
        Ok(())
    }

    /// Flush every overlay into the backend. Requires all checkpoints to be
    /// resolved first.
    pub fn persist(&mut self) -> eyre::Result<()> {
        self.info.persist(&mut self.backend)?;
        self.code.persist(&mut self.backend)?;
        for overlay in self.storage.values_mut() {
            overlay.persist(&mut self.backend)?;
        }
        self.storage.clear();
        Ok(())
    }

    /// Structured view of the pending root layers, sorted for determinism.
    pub fn pending_diff(&self) -> eyre::Result<StateDiff> {
        let mut diff = StateDiff::default();

        for (key, value) in self.info.root_layer() {
            let mut address = Address::default();
            address.0.copy_from_slice(key);
            let record = match value {
                Some(encoded) => Some(AccountRecord::from_rlp(encoded)?),
                None => None,
            };
            diff.accounts.push((address, record));
        }
        diff.accounts.sort_by_key(|(address, _)| *address);

        for (address, overlay) in &self.storage {
            for (key, value) in overlay.root_layer() {
                let slot = Word::from_bytes(key);
                let value = value.as_ref().map(|bytes| Word::from_bytes(bytes));
                diff.storage.push((*address, slot, value));
            }
        }
        diff.storage.sort_by_key(|(address, slot, _)| (*address, *slot));

        for (key, value) in self.code.root_layer() {
            if let Some(code) = value {
                diff.code.push((Word::from_bytes(key), code.clone()));
            }
        }
        diff.code.sort_by_key(|(hash, _)| *hash);

        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::addr;
    use crate::db::backend::MemoryBackend;

    fn db() -> AccountDB<MemoryBackend> {
        AccountDB::new(MemoryBackend::new())
    }

    #[test]
    fn test_untouched_account_is_absent() {
        let mut db = db();
        let a = addr("0x00000000000000000000000000000000000000aa");
        assert_eq!(db.get_balance(&a).unwrap(), Word::zero());
        assert!(!db.account_exists(&a).unwrap());

        // reads alone never materialize a record
        db.persist().unwrap();
        assert_eq!(db.backend().row_count(), 0);
    }

    #[test]
    fn test_code_round_trip() {
        let mut db = db();
        let a = addr("0x00000000000000000000000000000000000000aa");
        let code = vec![0x60, 0x01, 0x60, 0x02, 0x01];
        db.set_code(&a, &code).unwrap();
        assert_eq!(db.get_code(&a).unwrap(), code);
        assert_eq!(
            db.get_code_hash(&a).unwrap(),
            Word::from_bytes(&keccak256(&code))
        );
        assert!(db.has_code_or_nonce(&a).unwrap());
    }

    #[test]
    fn test_storage_zero_write_deletes() {
        let mut db = db();
        let a = addr("0x00000000000000000000000000000000000000aa");
        let slot = Word::one();

        db.set_storage(&a, slot, Word::from(0xabu8));
        assert_eq!(db.get_storage(&a, &slot).unwrap(), Word::from(0xabu8));

        db.set_storage(&a, slot, Word::zero());
        assert_eq!(db.get_storage(&a, &slot).unwrap(), Word::zero());

        db.persist().unwrap();
        assert!(!db.backend().contains(&Table::Storage(a), &slot.into_bytes()));
    }

    #[test]
    fn test_checkpoints_fan_out() {
        let mut db = db();
        let a = addr("0x00000000000000000000000000000000000000aa");
        db.set_balance(&a, Word::from(100u64)).unwrap();

        let cp = db.checkpoint();
        db.set_balance(&a, Word::from(50u64)).unwrap();
        db.set_code(&a, &[0x00]).unwrap();
        // storage overlay created inside the checkpoint must discard with it
        db.set_storage(&a, Word::one(), Word::one());

        db.discard(cp).unwrap();
        assert_eq!(db.get_balance(&a).unwrap(), Word::from(100u64));
        assert_eq!(db.get_code(&a).unwrap(), Vec::<u8>::new());
        assert_eq!(db.get_storage(&a, &Word::one()).unwrap(), Word::zero());
    }

    #[test]
    fn test_delete_account_clears_pending_state() {
        let mut db = db();
        let a = addr("0x00000000000000000000000000000000000000aa");
        db.set_balance(&a, Word::from(7u64)).unwrap();
        db.set_storage(&a, Word::one(), Word::from(9u64));

        db.delete_account(&a).unwrap();
        assert!(!db.account_exists(&a).unwrap());
        assert_eq!(db.get_storage(&a, &Word::one()).unwrap(), Word::zero());

        db.persist().unwrap();
        assert!(!db.backend().contains(&Table::AccountInfo, &a.0));
    }

    #[test]
    fn test_pending_diff() {
        let mut db = db();
        let a = addr("0x00000000000000000000000000000000000000aa");
        db.set_balance(&a, Word::from(5u64)).unwrap();
        db.set_storage(&a, Word::one(), Word::from(2u64));

        let diff = db.pending_diff().unwrap();
        assert_eq!(diff.accounts.len(), 1);
        assert_eq!(diff.accounts[0].0, a);
        assert_eq!(
            diff.accounts[0].1.as_ref().unwrap().balance,
            Word::from(5u64)
        );
        assert_eq!(diff.storage, vec![(a, Word::one(), Some(Word::from(2u64)))]);
    }
}
