//! Transfer/mint/burn/delegate engine
//!
//! Validates and applies every balance-changing operation, derives
//! voting-power deltas, and emits domain events. Operations are atomic:
//! every validation runs before the first write, so a failed operation
//! leaves no partial state behind. The callback-carrying variants commit
//! all effects first, invoke the counterparty, and restore a pre-operation
//! snapshot if the callback declines.

use crate::checkpoint::Adjust;
use crate::events::Event;
use crate::gating::{features, roles, RoleOracle};
use crate::receiver::{approval_ack, transfer_ack, CallbackRegistry};
use crate::state::{ExecutionContext, LedgerState};
use std::sync::Arc;
use tally_common::prelude::*;
use tracing::debug;

/// The token engine. Holds the static token identity, the injected
/// capability oracle, and the callback registry; all dynamic state lives in
/// the [`LedgerState`] passed to each operation.
#[derive(Debug, Clone)]
pub struct Engine<R: RoleOracle> {
    meta: TokenMeta,
    oracle: R,
    callbacks: CallbackRegistry,
}

impl<R: RoleOracle> Engine<R> {
    pub fn new(meta: TokenMeta, oracle: R) -> Self {
        Self {
            meta,
            oracle,
            callbacks: CallbackRegistry::new(),
        }
    }

    pub fn with_callbacks(meta: TokenMeta, oracle: R, callbacks: CallbackRegistry) -> Self {
        Self {
            meta,
            oracle,
            callbacks,
        }
    }

    pub fn meta(&self) -> &TokenMeta {
        &self.meta
    }

    pub fn oracle(&self) -> &R {
        &self.oracle
    }

    pub fn callbacks_mut(&mut self) -> &mut CallbackRegistry {
        &mut self.callbacks
    }

    /// Move `value` from `from` to `to`, executed by `executor`.
    ///
    /// When the executor is not the holder the movement consumes allowance
    /// (unless the allowance is the unlimited sentinel, which is never
    /// decremented). Self-transfers are permitted and still validate balance
    /// sufficiency; zero-value transfers are valid no-ops that still emit
    /// the full event pair.
    pub fn transfer(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        executor: Address,
        from: Address,
        to: Address,
        value: U256,
    ) -> TokenResult<()> {
        if executor == from {
            if !self.oracle.is_feature_enabled(features::TRANSFERS) {
                return Err(TokenError::authorization("transfers are disabled"));
            }
        } else if !self.oracle.is_feature_enabled(features::TRANSFERS_ON_BEHALF) {
            return Err(TokenError::authorization("transfers on behalf are disabled"));
        }

        if to == Address::ZERO || to == self.meta.ledger_address {
            return Err(TokenError::InvalidRecipient);
        }

        // Validate everything before the first write
        let mut new_allowance = None;
        if executor != from {
            let current = state.allowance(from, executor);
            if current < value {
                return Err(TokenError::AllowanceExceeded);
            }
            if current != UNLIMITED_ALLOWANCE && !value.is_zero() {
                new_allowance = Some(current - value);
            }
        }
        if state.balance_of(from) < value {
            return Err(TokenError::InsufficientBalance);
        }

        if let Some(allowance) = new_allowance {
            state.set_allowance(from, executor, allowance);
        }

        if !value.is_zero() {
            let from_delegate = state.delegate_of(from);
            let to_delegate = state.delegate_of(to);
            state.debit(from, value);
            state.credit(to, value);
            self.move_voting_power(state, ctx, executor, from_delegate, to_delegate, value)?;
        }

        state.emit(Event::TransferExecuted {
            executor,
            from,
            to,
            value,
        });
        state.emit(Event::Transfer { from, to, value });
        debug!(%executor, %from, %to, %value, "transfer applied");
        Ok(())
    }

    /// Transfer, then notify the recipient's receiver capability.
    ///
    /// Effects are committed before the callback runs; a declined or
    /// misbehaving callback rolls the whole operation back, nested effects
    /// included. Recipients without a registered receiver are plain
    /// accounts and the notification is skipped as success.
    pub fn transfer_and_call(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        executor: Address,
        from: Address,
        to: Address,
        value: U256,
        data: &[u8],
    ) -> TokenResult<()> {
        if !self.oracle.is_feature_enabled(features::CALLBACK_TRANSFERS) {
            return Err(TokenError::authorization("callback transfers are disabled"));
        }

        let Some(receiver) = self.callbacks.transfer_receiver(to) else {
            // Plain account: nothing to notify
            return self.transfer(state, ctx, executor, from, to, value);
        };

        let snapshot = state.clone();
        self.transfer(state, ctx, executor, from, to, value)?;

        match receiver.on_transfer_received(state, ctx, executor, from, value, data) {
            Ok(ack) if ack == transfer_ack() => Ok(()),
            Ok(_) => {
                *state = snapshot;
                Err(TokenError::callback_rejected(
                    "transfer receiver returned an unexpected acknowledgement",
                ))
            }
            Err(e) => {
                *state = snapshot;
                Err(TokenError::callback_rejected(e.to_string()))
            }
        }
    }

    /// Set `spender`'s allowance over `owner`'s tokens to exactly `value`.
    ///
    /// Unconditional overwrite; callers wanting atomic adjustment relative
    /// to the current value use [`Self::increase_allowance`] /
    /// [`Self::decrease_allowance`].
    pub fn approve(
        &self,
        state: &mut LedgerState,
        owner: Address,
        spender: Address,
        value: U256,
    ) -> TokenResult<()> {
        if spender == Address::ZERO {
            return Err(TokenError::InvalidSpender);
        }

        let old_value = state.allowance(owner, spender);
        state.set_allowance(owner, spender, value);
        state.emit(Event::ApprovalUpdated {
            owner,
            spender,
            old_value,
            value,
        });
        state.emit(Event::Approval {
            owner,
            spender,
            value,
        });
        Ok(())
    }

    /// Approve, then notify the spender's approval capability. Same
    /// commit-then-notify and rollback contract as [`Self::transfer_and_call`].
    pub fn approve_and_call(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        owner: Address,
        spender: Address,
        value: U256,
        data: &[u8],
    ) -> TokenResult<()> {
        if !self.oracle.is_feature_enabled(features::CALLBACK_APPROVALS) {
            return Err(TokenError::authorization("callback approvals are disabled"));
        }

        let Some(receiver) = self.callbacks.approval_receiver(spender) else {
            // Plain account: nothing to notify
            return self.approve(state, owner, spender, value);
        };

        let snapshot = state.clone();
        self.approve(state, owner, spender, value)?;

        match receiver.on_approval_received(state, ctx, owner, value, data) {
            Ok(ack) if ack == approval_ack() => Ok(()),
            Ok(_) => {
                *state = snapshot;
                Err(TokenError::callback_rejected(
                    "approval receiver returned an unexpected acknowledgement",
                ))
            }
            Err(e) => {
                *state = snapshot;
                Err(TokenError::callback_rejected(e.to_string()))
            }
        }
    }

    /// Raise the allowance by `delta`; a zero or overflowing raise fails
    pub fn increase_allowance(
        &self,
        state: &mut LedgerState,
        owner: Address,
        spender: Address,
        delta: U256,
    ) -> TokenResult<()> {
        let current = state.allowance(owner, spender);
        let raised = current.checked_add(delta).ok_or(TokenError::Overflow)?;
        if delta.is_zero() {
            return Err(TokenError::Overflow);
        }
        self.approve(state, owner, spender, raised)
    }

    /// Lower the allowance by `delta`; a zero or excessive cut fails
    pub fn decrease_allowance(
        &self,
        state: &mut LedgerState,
        owner: Address,
        spender: Address,
        delta: U256,
    ) -> TokenResult<()> {
        let current = state.allowance(owner, spender);
        if delta.is_zero() || delta > current {
            return Err(TokenError::Underflow);
        }
        self.approve(state, owner, spender, current - delta)
    }

    /// Create `value` new tokens for `to`.
    ///
    /// Requires the supply-creator role. Total supply is capped at
    /// 2^192 - 1 so every balance and voting power fits the checkpoint
    /// layout; that ceiling is the binding constraint, tighter than the
    /// 256-bit overflow check that precedes it.
    pub fn mint(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        by: Address,
        to: Address,
        value: U256,
    ) -> TokenResult<()> {
        if !self.oracle.is_operator_in_role(by, roles::SUPPLY_CREATOR) {
            return Err(TokenError::authorization("missing supply creator role"));
        }
        if to == Address::ZERO {
            return Err(TokenError::InvalidRecipient);
        }
        let new_supply = state
            .total_supply
            .checked_add(value)
            .ok_or(TokenError::Overflow)?;
        if value.is_zero() {
            return Err(TokenError::Overflow);
        }
        if new_supply > VOTING_SUPPLY_CEILING {
            return Err(TokenError::SupplyCeilingExceeded);
        }

        state.total_supply = new_supply;
        state.credit(to, value);
        state
            .supply_history
            .append_or_merge(ctx.block_number, value, Adjust::Add)?;
        let to_delegate = state.delegate_of(to);
        self.move_voting_power(state, ctx, by, Address::ZERO, to_delegate, value)?;

        state.emit(Event::Minted { by, to, value });
        state.emit(Event::Transfer {
            from: Address::ZERO,
            to,
            value,
        });
        debug!(%by, %to, %value, new_supply = %state.total_supply, "minted");
        Ok(())
    }

    /// Destroy `value` tokens held by `from`.
    ///
    /// Open to the supply-destroyer role unconditionally; otherwise the
    /// self-burn / burn-on-behalf features gate the call, and burning on
    /// behalf consumes allowance exactly like a transfer.
    pub fn burn(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        by: Address,
        from: Address,
        value: U256,
    ) -> TokenResult<()> {
        let destroyer = self.oracle.is_operator_in_role(by, roles::SUPPLY_DESTROYER);
        let mut new_allowance = None;
        if !destroyer {
            if by == from {
                if !self.oracle.is_feature_enabled(features::OWN_BURNS) {
                    return Err(TokenError::authorization("self burns are disabled"));
                }
            } else {
                if !self.oracle.is_feature_enabled(features::BURNS_ON_BEHALF) {
                    return Err(TokenError::authorization("burns on behalf are disabled"));
                }
                let current = state.allowance(from, by);
                if current < value {
                    return Err(TokenError::AllowanceExceeded);
                }
                if current != UNLIMITED_ALLOWANCE && !value.is_zero() {
                    new_allowance = Some(current - value);
                }
            }
        }

        if value.is_zero() {
            return Err(TokenError::ZeroValue);
        }
        if from == Address::ZERO {
            return Err(TokenError::InvalidSource);
        }
        if state.balance_of(from) < value {
            return Err(TokenError::InsufficientBalance);
        }

        if let Some(allowance) = new_allowance {
            state.set_allowance(from, by, allowance);
        }

        let from_delegate = state.delegate_of(from);
        state.debit(from, value);
        state.total_supply -= value;
        state
            .supply_history
            .append_or_merge(ctx.block_number, value, Adjust::Subtract)?;
        self.move_voting_power(state, ctx, by, from_delegate, Address::ZERO, value)?;

        state.emit(Event::Burnt { by, from, value });
        state.emit(Event::Transfer {
            from,
            to: Address::ZERO,
            value,
        });
        debug!(%by, %from, %value, new_supply = %state.total_supply, "burnt");
        Ok(())
    }

    /// Point `source`'s voting power at `new_delegate`.
    ///
    /// The zero delegate is valid and means "no delegate": the account's
    /// balance stops accruing anywhere.
    pub fn delegate(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        source: Address,
        new_delegate: Address,
    ) -> TokenResult<()> {
        if !self.oracle.is_feature_enabled(features::DELEGATIONS) {
            return Err(TokenError::authorization("delegations are disabled"));
        }
        self.apply_delegate(state, ctx, source, new_delegate)
    }

    /// Delegation driven by a signed authorization rather than the holder
    /// acting directly; gated on its own feature bit.
    pub fn delegate_on_behalf(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        source: Address,
        new_delegate: Address,
    ) -> TokenResult<()> {
        if !self.oracle.is_feature_enabled(features::DELEGATIONS_ON_BEHALF) {
            return Err(TokenError::authorization("delegations on behalf are disabled"));
        }
        self.apply_delegate(state, ctx, source, new_delegate)
    }

    fn apply_delegate(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        source: Address,
        new_delegate: Address,
    ) -> TokenResult<()> {
        // The account's whole balance is the quantum that moves
        let quantum = state.balance_of(source);
        let old_delegate = state.delegate_of(source);

        state.set_delegate(source, new_delegate);
        state.emit(Event::DelegateChanged {
            source,
            old_delegate,
            new_delegate,
        });
        self.move_voting_power(state, ctx, source, old_delegate, new_delegate, quantum)?;
        debug!(%source, %old_delegate, %new_delegate, %quantum, "delegate changed");
        Ok(())
    }

    /// The single point where balance changes propagate into the
    /// checkpoint store. No-op when the endpoints coincide or the value is
    /// zero; the zero address on either side means "no delegate" and that
    /// side is skipped.
    fn move_voting_power(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        by: Address,
        from_delegate: Address,
        to_delegate: Address,
        value: U256,
    ) -> TokenResult<()> {
        if from_delegate == to_delegate || value.is_zero() {
            return Ok(());
        }

        if from_delegate != Address::ZERO {
            let (old_power, new_power) = state
                .voting_power
                .entry(from_delegate)
                .or_default()
                .append_or_merge(ctx.block_number, value, Adjust::Subtract)?;
            state.emit(Event::VotingPowerChanged {
                by,
                target: from_delegate,
                old_power,
                new_power,
            });
        }

        if to_delegate != Address::ZERO {
            let (old_power, new_power) = state
                .voting_power
                .entry(to_delegate)
                .or_default()
                .append_or_merge(ctx.block_number, value, Adjust::Add)?;
            state.emit(Event::VotingPowerChanged {
                by,
                target: to_delegate,
                old_power,
                new_power,
            });
        }

        Ok(())
    }

    /// Register a transfer receiver capability for a party
    pub fn register_transfer_receiver(
        &mut self,
        party: Address,
        receiver: Arc<dyn crate::receiver::TransferReceiver + Send + Sync>,
    ) {
        self.callbacks.register_transfer_receiver(party, receiver);
    }

    /// Register an approval receiver capability for a party
    pub fn register_approval_receiver(
        &mut self,
        party: Address,
        receiver: Arc<dyn crate::receiver::ApprovalReceiver + Send + Sync>,
    ) {
        self.callbacks.register_approval_receiver(party, receiver);
    }
}
