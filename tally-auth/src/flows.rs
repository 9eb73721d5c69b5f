//! Signature-authorized operation flows
//!
//! Four flows share the structured-digest and signer-derivation primitives
//! but differ in nonce and timing semantics:
//!
//! - **Signed approval**: sequential per-owner nonce embedded in the digest,
//!   read and advanced as one step, strict-before deadline.
//! - **Transfer / receive by authorization**: client-chosen random nonces in
//!   the write-once used-nonce set, `(valid_after, valid_before)` window.
//!   Receive additionally restricts submission to the payee.
//! - **Cancel authorization**: burns a random nonce without spending it.
//! - **Delegation by authorization**: the recovered signer *is* the
//!   delegating party; there is no claimed-party field to compare against.
//!
//! The two nonce models are deliberately distinct components: sequential
//! nonces are ordering-dependent, random nonces are order-independent, and
//! collapsing them would silently change one flow's replay guarantees.

use crate::digest::{
    hash_struct, type_hash, word_from_address, word_from_u256, word_from_u64, Domain,
};
use crate::signature::{derive_signer, RecoverableSignature, SignatureRecovery};
use serde::{Deserialize, Serialize};
use tally_common::prelude::*;
use tally_ledger::prelude::*;
use tracing::debug;

const SIGNED_APPROVAL_TYPE: &str =
    "Permit(address owner,address spender,uint256 value,uint256 nonce,uint256 deadline)";
const TRANSFER_AUTHORIZATION_TYPE: &str = "TransferWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";
const RECEIVE_AUTHORIZATION_TYPE: &str = "ReceiveWithAuthorization(address from,address to,uint256 value,uint256 validAfter,uint256 validBefore,bytes32 nonce)";
const CANCEL_AUTHORIZATION_TYPE: &str = "CancelAuthorization(address authorizer,bytes32 nonce)";
const DELEGATION_TYPE: &str = "Delegation(address delegate,bytes32 nonce,uint256 expiry)";

/// A signed allowance grant (sequential-nonce path)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedApproval {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    /// Signature is dead once the timestamp reaches this bound
    pub deadline: Timestamp,
}

/// A signed transfer order (random-nonce path), shared by the transfer and
/// receive flows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferAuthorization {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    /// Not submittable until strictly after this timestamp
    pub valid_after: Timestamp,
    /// Dead once the timestamp reaches this bound
    pub valid_before: Timestamp,
    pub nonce: B256,
}

/// A signed delegation order. Deliberately carries no delegator field: the
/// recovered signer is the delegating party by construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationAuthorization {
    pub delegate: Address,
    pub nonce: B256,
    pub expiry: Timestamp,
}

/// Entry point for all signature-authorized operations. Wraps the token
/// engine with digest construction, signer derivation, replay protection,
/// and validity-window checks.
#[derive(Debug, Clone)]
pub struct AuthGateway<R: RoleOracle, S: SignatureRecovery> {
    engine: Engine<R>,
    recovery: S,
    domain: Domain,
}

impl<R: RoleOracle, S: SignatureRecovery> AuthGateway<R, S> {
    /// The signing domain is derived from the engine's token metadata so
    /// digests are always bound to this deployment.
    pub fn new(engine: Engine<R>, recovery: S) -> Self {
        let domain = Domain::for_token(engine.meta());
        Self {
            engine,
            recovery,
            domain,
        }
    }

    pub fn engine(&self) -> &Engine<R> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<R> {
        &mut self.engine
    }

    pub fn recovery(&self) -> &S {
        &self.recovery
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Digest a wallet must sign for [`Self::signed_approval`], embedding
    /// the owner's current sequential nonce
    pub fn signed_approval_digest(&self, state: &LedgerState, message: &SignedApproval) -> B256 {
        let struct_hash = hash_struct(
            type_hash(SIGNED_APPROVAL_TYPE),
            &[
                word_from_address(message.owner),
                word_from_address(message.spender),
                word_from_u256(message.value),
                word_from_u256(state.permit_nonce(message.owner)),
                word_from_u64(message.deadline),
            ],
        );
        self.domain.digest(struct_hash)
    }

    /// Digest a wallet must sign for [`Self::transfer_with_authorization`]
    pub fn transfer_authorization_digest(&self, message: &TransferAuthorization) -> B256 {
        self.domain
            .digest(Self::authorization_struct_hash(TRANSFER_AUTHORIZATION_TYPE, message))
    }

    /// Digest a wallet must sign for [`Self::receive_with_authorization`]
    pub fn receive_authorization_digest(&self, message: &TransferAuthorization) -> B256 {
        self.domain
            .digest(Self::authorization_struct_hash(RECEIVE_AUTHORIZATION_TYPE, message))
    }

    /// Digest a wallet must sign for [`Self::cancel_authorization`]
    pub fn cancel_authorization_digest(&self, authorizer: Address, nonce: B256) -> B256 {
        let struct_hash = hash_struct(
            type_hash(CANCEL_AUTHORIZATION_TYPE),
            &[word_from_address(authorizer), nonce],
        );
        self.domain.digest(struct_hash)
    }

    /// Digest a wallet must sign for [`Self::delegate_with_authorization`]
    pub fn delegation_digest(&self, message: &DelegationAuthorization) -> B256 {
        let struct_hash = hash_struct(
            type_hash(DELEGATION_TYPE),
            &[
                word_from_address(message.delegate),
                message.nonce,
                word_from_u64(message.expiry),
            ],
        );
        self.domain.digest(struct_hash)
    }

    fn authorization_struct_hash(type_sig: &str, message: &TransferAuthorization) -> B256 {
        hash_struct(
            type_hash(type_sig),
            &[
                word_from_address(message.from),
                word_from_address(message.to),
                word_from_u256(message.value),
                word_from_u64(message.valid_after),
                word_from_u64(message.valid_before),
                message.nonce,
            ],
        )
    }

    /// Set an allowance on the strength of the owner's signature.
    ///
    /// The digest embeds the owner's current sequential nonce; a successful
    /// call advances it, so each signature is usable exactly once and only
    /// in order.
    pub fn signed_approval(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        message: &SignedApproval,
        signature: &RecoverableSignature,
    ) -> TokenResult<()> {
        if !self
            .engine
            .oracle()
            .is_feature_enabled(features::SIGNED_APPROVALS)
        {
            return Err(TokenError::authorization("signed approvals are disabled"));
        }
        if ctx.timestamp >= message.deadline {
            return Err(TokenError::SignatureExpired);
        }

        let digest = self.signed_approval_digest(state, message);
        let signer = derive_signer(&self.recovery, digest, signature)?;
        if signer != message.owner {
            return Err(TokenError::InvalidSignature);
        }

        self.engine
            .approve(state, message.owner, message.spender, message.value)?;
        let consumed = state.consume_permit_nonce(message.owner);
        debug!(owner = %message.owner, spender = %message.spender, nonce = %consumed, "signed approval applied");
        Ok(())
    }

    /// Execute a transfer on the strength of the holder's signature.
    /// Anyone may submit the order inside its validity window.
    pub fn transfer_with_authorization(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        message: &TransferAuthorization,
        signature: &RecoverableSignature,
    ) -> TokenResult<()> {
        if !self
            .engine
            .oracle()
            .is_feature_enabled(features::SIGNED_TRANSFERS)
        {
            return Err(TokenError::authorization("signed transfers are disabled"));
        }
        let digest = self.transfer_authorization_digest(message);
        self.execute_authorized_transfer(state, ctx, message, signature, digest)
    }

    /// Pull a transfer addressed to the caller. Identical to
    /// [`Self::transfer_with_authorization`] except that only the stated
    /// recipient may submit it, closing the front-running window on orders
    /// whose payee matters.
    pub fn receive_with_authorization(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        caller: Address,
        message: &TransferAuthorization,
        signature: &RecoverableSignature,
    ) -> TokenResult<()> {
        if !self
            .engine
            .oracle()
            .is_feature_enabled(features::SIGNED_RECEPTIONS)
        {
            return Err(TokenError::authorization("signed receptions are disabled"));
        }
        if caller != message.to {
            return Err(TokenError::access_denied(
                "only the stated recipient may submit this order",
            ));
        }
        let digest = self.receive_authorization_digest(message);
        self.execute_authorized_transfer(state, ctx, message, signature, digest)
    }

    fn execute_authorized_transfer(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        message: &TransferAuthorization,
        signature: &RecoverableSignature,
        digest: B256,
    ) -> TokenResult<()> {
        if ctx.timestamp <= message.valid_after {
            return Err(TokenError::NotYetValid);
        }
        if ctx.timestamp >= message.valid_before {
            return Err(TokenError::SignatureExpired);
        }
        if state.is_nonce_used(message.from, message.nonce) {
            return Err(TokenError::NonceReused);
        }

        let signer = derive_signer(&self.recovery, digest, signature)?;
        if signer != message.from {
            return Err(TokenError::InvalidSignature);
        }

        // The engine call is all-or-nothing; the nonce is only burned once
        // the transfer has actually been applied.
        self.engine.transfer(
            state,
            ctx,
            message.from,
            message.from,
            message.to,
            message.value,
        )?;
        state.record_authorization_used(message.from, message.nonce)?;
        debug!(from = %message.from, to = %message.to, value = %message.value, "authorized transfer applied");
        Ok(())
    }

    /// Invalidate a random nonce without spending it. Lets an authorizer
    /// withdraw an order that has left their hands but not yet been
    /// submitted.
    pub fn cancel_authorization(
        &self,
        state: &mut LedgerState,
        authorizer: Address,
        nonce: B256,
        signature: &RecoverableSignature,
    ) -> TokenResult<()> {
        if state.is_nonce_used(authorizer, nonce) {
            return Err(TokenError::NonceReused);
        }

        let digest = self.cancel_authorization_digest(authorizer, nonce);
        let signer = derive_signer(&self.recovery, digest, signature)?;
        if signer != authorizer {
            return Err(TokenError::InvalidSignature);
        }

        state.record_authorization_canceled(authorizer, nonce)?;
        debug!(%authorizer, "authorization cancelled");
        Ok(())
    }

    /// Reassign voting power on the strength of a signature. The recovered
    /// signer is the delegating party; the message names only the delegate.
    pub fn delegate_with_authorization(
        &self,
        state: &mut LedgerState,
        ctx: &ExecutionContext,
        message: &DelegationAuthorization,
        signature: &RecoverableSignature,
    ) -> TokenResult<()> {
        if ctx.timestamp >= message.expiry {
            return Err(TokenError::SignatureExpired);
        }

        let digest = self.delegation_digest(message);
        let signer = derive_signer(&self.recovery, digest, signature)?;

        if state.is_nonce_used(signer, message.nonce) {
            return Err(TokenError::NonceReused);
        }

        self.engine
            .delegate_on_behalf(state, ctx, signer, message.delegate)?;
        state.record_authorization_used(signer, message.nonce)?;
        debug!(%signer, delegate = %message.delegate, "authorized delegation applied");
        Ok(())
    }
}
