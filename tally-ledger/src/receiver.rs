//! Callback notification adapter
//!
//! Transfer and approval operations can notify the counterparty when it
//! implements the receiver/spender capability. A callback must return the
//! exact well-known acknowledgement selector for its signature; anything
//! else (or an error) fails the whole enclosing operation.
//!
//! All currency-affecting state is committed before a callback runs, so a
//! reentrant call into the ledger observes the in-progress operation's
//! effects as already applied, never a torn intermediate state.
//!
//! Parties with no registered callback are plain accounts: the safe call
//! variants treat the missing capability as success.

use crate::state::{ExecutionContext, LedgerState};
use std::collections::HashMap;
use std::sync::Arc;
use tally_common::prelude::*;

/// 4-byte selector for a callback function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// Acknowledgement a transfer receiver must return
pub fn transfer_ack() -> [u8; 4] {
    selector("onTransferReceived(address,address,uint256,bytes)")
}

/// Acknowledgement an approval spender must return
pub fn approval_ack() -> [u8; 4] {
    selector("onApprovalReceived(address,uint256,bytes)")
}

/// Receiver capability notified after an inbound transfer
pub trait TransferReceiver {
    fn on_transfer_received(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        operator: Address,
        from: Address,
        value: U256,
        data: &[u8],
    ) -> TokenResult<[u8; 4]>;
}

/// Spender capability notified after an approval
pub trait ApprovalReceiver {
    fn on_approval_received(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        owner: Address,
        value: U256,
        data: &[u8],
    ) -> TokenResult<[u8; 4]>;
}

/// Registered callback implementations, keyed by the party's address
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    transfer_receivers: HashMap<Address, Arc<dyn TransferReceiver + Send + Sync>>,
    approval_receivers: HashMap<Address, Arc<dyn ApprovalReceiver + Send + Sync>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_transfer_receiver(
        &mut self,
        party: Address,
        receiver: Arc<dyn TransferReceiver + Send + Sync>,
    ) {
        self.transfer_receivers.insert(party, receiver);
    }

    pub fn register_approval_receiver(
        &mut self,
        party: Address,
        receiver: Arc<dyn ApprovalReceiver + Send + Sync>,
    ) {
        self.approval_receivers.insert(party, receiver);
    }

    pub fn transfer_receiver(
        &self,
        party: Address,
    ) -> Option<Arc<dyn TransferReceiver + Send + Sync>> {
        self.transfer_receivers.get(&party).cloned()
    }

    pub fn approval_receiver(
        &self,
        party: Address,
    ) -> Option<Arc<dyn ApprovalReceiver + Send + Sync>> {
        self.approval_receivers.get(&party).cloned()
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("transfer_receivers", &self.transfer_receivers.len())
            .field("approval_receivers", &self.approval_receivers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_are_stable_and_distinct() {
        assert_eq!(transfer_ack(), selector("onTransferReceived(address,address,uint256,bytes)"));
        assert_ne!(transfer_ack(), approval_ack());
        assert_ne!(transfer_ack(), [0u8; 4]);
    }
}
