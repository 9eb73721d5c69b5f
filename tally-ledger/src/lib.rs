//! # Tally Ledger
//!
//! The checkpointed balance and voting-power ledger at the core of Tally.
//!
//! ## Architecture Overview
//!
//! The ledger is built around three pieces:
//!
//! ### [`checkpoint::History`] - Fixed-Width Checkpoint Store
//! - Append-only (block, value) sequences, one per delegate plus one for
//!   total supply
//! - Same-block updates coalesce into the in-progress entry
//! - Point-in-time queries via rightmost-at-or-before binary search
//!
//! ### [`state::LedgerState`] - Current State
//! - Balances, allowances, delegates, total supply
//! - Sequential and random-nonce replay protection stores
//! - Domain event journal and RocksDB snapshot persistence
//!
//! ### [`engine::Engine`] - Transfer/Mint/Burn Engine
//! - Validate-then-mutate operations; failures leave no partial state
//! - Voting-power propagation into the checkpoint store
//! - Role/feature gating through an injected [`roles::RoleOracle`]
//! - Callback notification with commit-before-notify ordering
//!
//! ## Example Usage
//!
//! ```no_run
//! use tally_ledger::prelude::*;
//! use tally_common::prelude::*;
//!
//! # fn example(meta: TokenMeta) -> TokenResult<()> {
//! let engine = Engine::new(meta, StaticRoles::permissive());
//! let mut state = LedgerState::new();
//! let ctx = ExecutionContext::new(1, 1_700_000_000);
//!
//! let minter = Address::repeat_byte(9);
//! let holder = Address::repeat_byte(1);
//! engine.mint(&mut state, &ctx, minter, holder, U256::from(1_000u64))?;
//! engine.delegate(&mut state, &ctx, holder, holder)?;
//! assert_eq!(state.voting_power_of(holder), U256::from(1_000u64));
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod engine;
pub mod events;
pub mod gating;
pub mod receiver;
pub mod state;

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::checkpoint::{Adjust, Checkpoint, History};
    pub use crate::engine::Engine;
    pub use crate::events::Event;
    pub use crate::gating::{features, roles, RoleOracle, StaticRoles};
    pub use crate::receiver::{
        approval_ack, selector, transfer_ack, ApprovalReceiver, CallbackRegistry, TransferReceiver,
    };
    pub use crate::state::{ExecutionContext, LedgerState, StateStore};
}

pub use engine::Engine;
pub use state::{ExecutionContext, LedgerState, StateStore};

/// Tally Ledger crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
