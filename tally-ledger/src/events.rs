//! Domain events emitted by the token engine
//!
//! Events are the durable audit log consumed by external indexers. Every
//! state change emits its events exactly once; a rolled-back operation
//! leaves no events behind. The zero address stands in for "no party"
//! (mint sources, burn destinations, cleared delegates).

use serde::{Deserialize, Serialize};
use tally_common::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Standard two-party transfer record
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    /// Transfer record carrying the executing party for auditability
    TransferExecuted {
        executor: Address,
        from: Address,
        to: Address,
        value: U256,
    },
    /// Standard two-field approval record
    Approval {
        owner: Address,
        spender: Address,
        value: U256,
    },
    /// Approval record carrying both old and new value for audit reconstruction
    ApprovalUpdated {
        owner: Address,
        spender: Address,
        old_value: U256,
        value: U256,
    },
    Minted {
        by: Address,
        to: Address,
        value: U256,
    },
    Burnt {
        by: Address,
        from: Address,
        value: U256,
    },
    DelegateChanged {
        source: Address,
        old_delegate: Address,
        new_delegate: Address,
    },
    VotingPowerChanged {
        by: Address,
        target: Address,
        old_power: U256,
        new_power: U256,
    },
    /// A random nonce was consumed by a signature-authorized operation
    AuthorizationUsed {
        authorizer: Address,
        nonce: B256,
    },
    /// A random nonce was invalidated without being spent
    AuthorizationCanceled {
        authorizer: Address,
        nonce: B256,
    },
}
