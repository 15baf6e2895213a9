use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::common::{address::Address, block::BlockContext, word::Word};
use crate::db::{AccountDB, Backend, StateDiff, TransientDB};
use crate::decoder::Bytecode;
use crate::errors::VmError;

/// Transaction-level context for ORIGIN and GASPRICE.
#[derive(Clone, Debug, Default)]
pub struct TxContext {
    pub origin: Address,
    pub gas_price: Word,
}

/// A savepoint spanning the account and transient databases.
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint(usize);

/// The world a transaction executes against: immutable block context,
/// journaled accounts, transient storage, the set of addresses created in
/// this transaction (EIP-6780), and a cache of decoded bytecode keyed by
/// code hash so repeated frames skip the jumpdest analysis.
pub struct State<B: Backend> {
    pub block: BlockContext,
    pub tx: TxContext,
    accounts: AccountDB<B>,
    transient: TransientDB,
    created: HashSet<Address>,
    code_cache: HashMap<Word, Rc<Bytecode>>,
}

impl<B: Backend> State<B> {
    pub fn new(backend: B, block: BlockContext) -> Self {
        Self {
            block,
            tx: TxContext::default(),
            accounts: AccountDB::new(backend),
            transient: TransientDB::new(),
            created: HashSet::new(),
            code_cache: HashMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        self.accounts.backend()
    }

    /// Start a fresh transaction: new context, empty transient storage,
    /// empty created set.
    pub fn reset_transaction(&mut self, tx: TxContext) {
        self.tx = tx;
        self.transient.clear();
        self.created.clear();
        self.code_cache.clear();
    }

    /// Transaction-scoped structures die with the transaction, whether it
    /// committed or reverted.
    pub fn finish_transaction(&mut self) {
        self.transient.clear();
        self.created.clear();
    }

    //
    // checkpoints
    //

    pub fn checkpoint(&mut self) -> Checkpoint {
        let id = self.accounts.checkpoint();
        let transient_id = self.transient.checkpoint();
        debug_assert_eq!(id, transient_id);
        Checkpoint(id)
    }

    pub fn commit(&mut self, checkpoint: Checkpoint) -> eyre::Result<()> {
        self.accounts.commit(checkpoint.0)?;
        self.transient.commit(checkpoint.0)
    }

    pub fn revert(&mut self, checkpoint: Checkpoint) -> eyre::Result<()> {
        self.accounts.discard(checkpoint.0)?;
        self.transient.discard(checkpoint.0)
    }

    /// Flush the pending root into the backend. Call after the transaction
    /// committed; nothing reaches the backend without it.
    pub fn persist(&mut self) -> eyre::Result<()> {
        self.accounts.persist()
    }

    pub fn pending_diff(&self) -> eyre::Result<StateDiff> {
        self.accounts.pending_diff()
    }

    //
    // accounts
    //

    pub fn balance(&self, address: &Address) -> eyre::Result<Word> {
        self.accounts.get_balance(address)
    }

    pub fn set_balance(&mut self, address: &Address, balance: Word) -> eyre::Result<()> {
        self.accounts.set_balance(address, balance)
    }

    /// Move `value` between accounts, failing without side effects when the
    /// source cannot cover it.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        value: Word,
    ) -> Result<(), VmError> {
        let have = self.balance(from)?;
        if have < value {
            return Err(VmError::InsufficientBalance { have, need: value });
        }
        tracing::debug!(%from, %to, value = %value, "transfer");
        self.set_balance(from, have - value)?;
        let to_balance = self.balance(to)?;
        self.set_balance(to, to_balance + value)?;
        Ok(())
    }

    pub fn nonce(&self, address: &Address) -> eyre::Result<u64> {
        self.accounts.get_nonce(address)
    }

    pub fn set_nonce(&mut self, address: &Address, nonce: u64) -> eyre::Result<()> {
        self.accounts.set_nonce(address, nonce)
    }

    pub fn increment_nonce(&mut self, address: &Address) -> eyre::Result<()> {
        self.accounts.increment_nonce(address)
    }

    pub fn code(&self, address: &Address) -> eyre::Result<Vec<u8>> {
        self.accounts.get_code(address)
    }

    pub fn code_hash(&self, address: &Address) -> eyre::Result<Word> {
        self.accounts.get_code_hash(address)
    }

    pub fn set_code(&mut self, address: &Address, code: &[u8]) -> eyre::Result<()> {
        self.accounts.set_code(address, code)
    }

    pub fn account_exists(&self, address: &Address) -> eyre::Result<bool> {
        self.accounts.account_exists(address)
    }

    pub fn account_is_empty(&self, address: &Address) -> eyre::Result<bool> {
        self.accounts.account_is_empty(address)
    }

    pub fn has_code_or_nonce(&self, address: &Address) -> eyre::Result<bool> {
        self.accounts.has_code_or_nonce(address)
    }

    pub fn delete_account(&mut self, address: &Address) -> eyre::Result<()> {
        self.accounts.delete_account(address)
    }

    //
    // storage
    //

    pub fn storage(&self, address: &Address, slot: &Word) -> eyre::Result<Word> {
        let value = self.accounts.get_storage(address, slot)?;
        tracing::debug!(%address, slot = %slot, value = %value, "sload");
        Ok(value)
    }

    pub fn set_storage(&mut self, address: &Address, slot: Word, value: Word) {
        tracing::debug!(%address, slot = %slot, value = %value, "sstore");
        self.accounts.set_storage(address, slot, value);
    }

    pub fn transient_storage(&self, address: &Address, slot: &Word) -> Word {
        self.transient.get(address, slot)
    }

    pub fn set_transient_storage(&mut self, address: Address, slot: Word, value: Word) {
        self.transient.set(address, slot, value);
    }

    pub fn transient_is_clear(&self) -> bool {
        self.transient.is_clear()
    }

    //
    // created-in-this-transaction tracking (EIP-6780)
    //

    pub fn mark_created(&mut self, address: Address) {
        self.created.insert(address);
    }

    pub fn created_in_transaction(&self, address: &Address) -> bool {
        self.created.contains(address)
    }

    //
    // code cache
    //

    /// Decode `code`, memoized by its keccak hash for the lifetime of the
    /// transaction.
    pub fn bytecode(&mut self, code: &[u8]) -> Rc<Bytecode> {
        let hash = Word::from_bytes(&crate::common::hash::keccak256(code));
        self.code_cache
            .entry(hash)
            .or_insert_with(|| Rc::new(Bytecode::decode(code)))
            .clone()
    }
}
