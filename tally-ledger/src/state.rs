//! Ledger state and persistence
//!
//! [`LedgerState`] is the mutable "current" state from which checkpoints are
//! derived: balances, allowances, delegates, total supply, the per-delegate
//! voting-power histories, the global supply history, both nonce stores, and
//! the domain event journal. All mutation goes through the engine; this
//! module only offers reads, low-level writes, and snapshot persistence.

use crate::checkpoint::History;
use crate::events::Event;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tally_common::prelude::*;

/// Per-operation execution context: the serialized position in the global
/// operation order (block number) and the wall-clock time used by the
/// signature validity windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionContext {
    pub block_number: BlockNumber,
    pub timestamp: Timestamp,
}

impl ExecutionContext {
    pub fn new(block_number: BlockNumber, timestamp: Timestamp) -> Self {
        Self {
            block_number,
            timestamp,
        }
    }
}

/// Global ledger state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    pub(crate) total_supply: U256,
    pub(crate) balances: HashMap<Address, U256>,
    // owner -> spender -> amount
    pub(crate) allowances: HashMap<Address, HashMap<Address, U256>>,
    // account -> delegate; absent means no delegate
    pub(crate) delegates: HashMap<Address, Address>,
    // delegate -> voting power history
    pub(crate) voting_power: HashMap<Address, History>,
    pub(crate) supply_history: History,
    // owner -> next sequential nonce (signed approvals)
    pub(crate) permit_nonces: HashMap<Address, U256>,
    // authorizer -> consumed random nonces; write-once, never reset
    pub(crate) used_nonces: HashMap<Address, HashSet<B256>>,
    pub(crate) journal: Vec<Event>,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&owner)
            .and_then(|m| m.get(&spender))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// The delegate accruing this account's voting power; zero when unset
    pub fn delegate_of(&self, account: Address) -> Address {
        self.delegates.get(&account).copied().unwrap_or(Address::ZERO)
    }

    /// Current voting power of a delegate (most recent checkpoint)
    pub fn voting_power_of(&self, delegate: Address) -> U256 {
        self.voting_power
            .get(&delegate)
            .map(|h| h.latest())
            .unwrap_or(U256::ZERO)
    }

    /// Voting power of a delegate as of a past block
    pub fn voting_power_at(&self, delegate: Address, block: BlockNumber) -> U256 {
        self.voting_power
            .get(&delegate)
            .map(|h| h.lookup_at(block))
            .unwrap_or(U256::ZERO)
    }

    /// Total supply as of a past block
    pub fn total_supply_at(&self, block: BlockNumber) -> U256 {
        self.supply_history.lookup_at(block)
    }

    pub fn voting_history(&self, delegate: Address) -> Option<&History> {
        self.voting_power.get(&delegate)
    }

    pub fn supply_history(&self) -> &History {
        &self.supply_history
    }

    /// Current sequential nonce for the signed-approval path
    pub fn permit_nonce(&self, owner: Address) -> U256 {
        self.permit_nonces.get(&owner).copied().unwrap_or(U256::ZERO)
    }

    /// Read-then-increment of the sequential nonce, as a single step.
    /// Returns the value that was consumed.
    pub fn consume_permit_nonce(&mut self, owner: Address) -> U256 {
        let slot = self.permit_nonces.entry(owner).or_insert(U256::ZERO);
        let consumed = *slot;
        *slot += U256::from(1);
        consumed
    }

    pub fn is_nonce_used(&self, authorizer: Address, nonce: B256) -> bool {
        self.used_nonces
            .get(&authorizer)
            .map(|set| set.contains(&nonce))
            .unwrap_or(false)
    }

    /// Consume a random nonce; write-once, never reset
    pub fn mark_nonce_used(&mut self, authorizer: Address, nonce: B256) -> TokenResult<()> {
        let set = self.used_nonces.entry(authorizer).or_default();
        if !set.insert(nonce) {
            return Err(TokenError::NonceReused);
        }
        Ok(())
    }

    /// Consume a random nonce and journal the use
    pub fn record_authorization_used(
        &mut self,
        authorizer: Address,
        nonce: B256,
    ) -> TokenResult<()> {
        self.mark_nonce_used(authorizer, nonce)?;
        self.emit(Event::AuthorizationUsed { authorizer, nonce });
        Ok(())
    }

    /// Consume a random nonce, journaling a cancellation instead of a use
    pub fn record_authorization_canceled(
        &mut self,
        authorizer: Address,
        nonce: B256,
    ) -> TokenResult<()> {
        self.mark_nonce_used(authorizer, nonce)?;
        self.emit(Event::AuthorizationCanceled { authorizer, nonce });
        Ok(())
    }

    pub(crate) fn credit(&mut self, account: Address, value: U256) {
        let balance = self.balances.entry(account).or_insert(U256::ZERO);
        *balance += value;
    }

    pub(crate) fn debit(&mut self, account: Address, value: U256) {
        let balance = self.balances.entry(account).or_insert(U256::ZERO);
        *balance -= value;
    }

    pub(crate) fn set_allowance(&mut self, owner: Address, spender: Address, value: U256) {
        self.allowances.entry(owner).or_default().insert(spender, value);
    }

    pub(crate) fn set_delegate(&mut self, account: Address, delegate: Address) {
        if delegate == Address::ZERO {
            self.delegates.remove(&account);
        } else {
            self.delegates.insert(account, delegate);
        }
    }

    /// Record a domain event in the journal
    pub(crate) fn emit(&mut self, event: Event) {
        tracing::debug!(?event, "ledger event");
        self.journal.push(event);
    }

    /// Events recorded since the last drain, in emission order
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.journal)
    }

    pub fn pending_events(&self) -> &[Event] {
        &self.journal
    }

    pub fn account_count(&self) -> usize {
        self.balances.len()
    }
}

impl TokenSerialize for LedgerState {
    fn preferred_encoding() -> EncodingType {
        // Compact for frequent state persistence
        EncodingType::Bincode
    }
}

/// State database wrapper using tally-common database operations
pub struct StateStore {
    db: LedgerDatabase,
}

impl StateStore {
    pub fn open(path: &str) -> TokenResult<Self> {
        let db = LedgerDatabase::new(path)?;
        Ok(Self { db })
    }

    pub async fn load_state(&self) -> TokenResult<LedgerState> {
        match self.db.load_data("state", "ledger").await? {
            Some(state) => Ok(state),
            None => Ok(LedgerState::new()),
        }
    }

    pub async fn save_state(&self, state: &LedgerState) -> TokenResult<()> {
        self.db.store_data("state", "ledger", state).await
    }

    /// Persist the block counter alongside the snapshot
    pub fn save_block_number(&self, block: BlockNumber) -> TokenResult<()> {
        self.db.put_raw(b"meta:block", &block.to_le_bytes())
    }

    pub fn load_block_number(&self) -> TokenResult<BlockNumber> {
        match self.db.get_raw(b"meta:block")? {
            Some(bytes) if bytes.len() == 8 => {
                let mut array = [0u8; 8];
                array.copy_from_slice(&bytes);
                Ok(BlockNumber::from_le_bytes(array))
            }
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn nonce_stores_are_independent() {
        let mut state = LedgerState::new();
        let owner = Address::repeat_byte(1);

        assert_eq!(state.permit_nonce(owner), U256::ZERO);
        assert_eq!(state.consume_permit_nonce(owner), U256::ZERO);
        assert_eq!(state.consume_permit_nonce(owner), U256::from(1));
        assert_eq!(state.permit_nonce(owner), U256::from(2));

        let nonce = B256::repeat_byte(7);
        assert!(!state.is_nonce_used(owner, nonce));
        state.mark_nonce_used(owner, nonce).unwrap();
        assert!(state.is_nonce_used(owner, nonce));
        assert!(matches!(
            state.mark_nonce_used(owner, nonce),
            Err(TokenError::NonceReused)
        ));
        // Random nonces do not advance the sequential counter
        assert_eq!(state.permit_nonce(owner), U256::from(2));
    }

    #[test]
    fn delegate_zero_clears_the_entry() {
        let mut state = LedgerState::new();
        let holder = Address::repeat_byte(1);
        let delegate = Address::repeat_byte(2);

        state.set_delegate(holder, delegate);
        assert_eq!(state.delegate_of(holder), delegate);
        state.set_delegate(holder, Address::ZERO);
        assert_eq!(state.delegate_of(holder), Address::ZERO);
        assert!(state.delegates.is_empty());
    }

    #[tokio::test]
    async fn snapshot_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::open(temp_dir.path().join("state").to_str().unwrap()).unwrap();

        let mut state = LedgerState::new();
        let holder = Address::repeat_byte(3);
        state.credit(holder, U256::from(1_000u64));
        state.total_supply = U256::from(1_000u64);
        state
            .supply_history
            .append_or_merge(1, U256::from(1_000u64), crate::checkpoint::Adjust::Add)
            .unwrap();
        state.consume_permit_nonce(holder);

        store.save_state(&state).await.unwrap();
        store.save_block_number(42).unwrap();

        let loaded = store.load_state().await.unwrap();
        assert_eq!(loaded, state);
        assert_eq!(store.load_block_number().unwrap(), 42);
    }

    #[tokio::test]
    async fn missing_snapshot_loads_fresh_state() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::open(temp_dir.path().join("empty").to_str().unwrap()).unwrap();
        let loaded = store.load_state().await.unwrap();
        assert_eq!(loaded, LedgerState::new());
        assert_eq!(store.load_block_number().unwrap(), 0);
    }
}
