//! # Tally RPC - JSON-RPC API Server
//!
//! This crate provides the JSON-RPC 2.0 API for Tally ledger nodes. It
//! enables external clients to query the ledger and submit
//! signature-authorized operations over standard HTTP requests.
//!
//! ## API Overview
//!
//! ### Token and Account Queries
//! - **`tally_tokenInfo`**: Token metadata, total supply, current block
//! - **`tally_getAccount`**: Balance, delegate, voting power, permit nonce
//! - **`tally_allowance`**: Spender allowance for an owner
//!
//! ### Historical Queries
//! - **`tally_votingPowerAt`**: A delegate's voting power at a past block
//! - **`tally_totalSupplyAt`**: Total supply at a past block
//!
//! Historical queries only accept blocks strictly before the current one;
//! the in-progress block is not yet final and may still coalesce.
//!
//! ### Transaction Operations
//! - **`tally_submitTransferAuthorization`**: Submit a signed transfer
//!   order. The signature authorizes the movement, so any client may relay
//!   an order it holds.
//!
//! ## Security Considerations
//!
//! - All binary data (addresses, nonces, signatures) is hex-encoded
//! - Request validation happens before any state access
//! - Rate limiting should be implemented at the HTTP layer

use jsonrpsee::{core::RpcResult, proc_macros::rpc, server::ServerBuilder};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tally_auth::prelude::{RecoverableSignature, TransferAuthorization};
use tally_common::prelude::*;

/// Token metadata and ledger-wide state snapshot
#[derive(Serialize, Deserialize, Clone)]
pub struct TokenInfo {
    /// Human-readable token name
    pub name: String,
    /// Ticker symbol
    pub symbol: String,
    /// Display decimals
    pub decimals: u8,
    /// Numeric chain identifier bound into signed digests
    pub chain_id: u64,
    /// The ledger's own address (hex-encoded)
    pub ledger_address: String,
    /// Current total supply in base units (decimal string)
    pub total_supply: String,
    /// Current block number of the execution context
    pub current_block: BlockNumber,
    /// Number of accounts with recorded balances
    pub accounts: usize,
}

/// Request to retrieve account information
#[derive(Serialize, Deserialize, Clone)]
pub struct GetAccountRequest {
    /// Account address as a hex-encoded string (with or without 0x prefix)
    pub address: String,
}

/// Account state information
#[derive(Serialize, Deserialize, Clone)]
pub struct AccountInfo {
    /// Account balance in base units (decimal string)
    pub balance: String,
    /// Delegate accruing this account's voting power; hex-encoded, absent
    /// when the account has no delegate
    pub delegate: Option<String>,
    /// Current voting power accrued *to* this address as a delegate
    pub voting_power: String,
    /// Next sequential nonce for signed approvals (decimal string)
    pub permit_nonce: String,
}

/// Request for a spender's allowance over an owner's tokens
#[derive(Serialize, Deserialize, Clone)]
pub struct AllowanceRequest {
    pub owner: String,
    pub spender: String,
}

/// Request for a delegate's voting power at a past block
#[derive(Serialize, Deserialize, Clone)]
pub struct VotingPowerAtRequest {
    pub delegate: String,
    /// Must be strictly less than the current block
    pub block: BlockNumber,
}

/// Request for the total supply at a past block
#[derive(Serialize, Deserialize, Clone)]
pub struct TotalSupplyAtRequest {
    /// Must be strictly less than the current block
    pub block: BlockNumber,
}

/// Request to submit a signed transfer order
#[derive(Serialize, Deserialize, Clone)]
pub struct SubmitTransferAuthorizationRequest {
    /// Token holder whose signature authorizes the movement (hex)
    pub from: String,
    /// Recipient (hex)
    pub to: String,
    /// Amount in base units (decimal string)
    pub value: String,
    /// Order is not submittable until strictly after this timestamp
    pub valid_after: Timestamp,
    /// Order is dead once this timestamp is reached
    pub valid_before: Timestamp,
    /// Client-chosen random nonce (hex-encoded 32 bytes)
    pub nonce: String,
    /// Recoverable signature over the order digest (hex-encoded 65 bytes)
    pub signature: String,
}

/// Response to a submitted transfer order
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SubmitAuthorizationResponse {
    /// Block the operation was applied in
    pub block: BlockNumber,
    /// Nonce consumed by the operation (hex-encoded)
    pub nonce: String,
}

/// Main Tally ledger JSON-RPC API trait
///
/// All methods are async and return [`RpcResult`] which automatically
/// handles JSON-RPC error responses and serialization.
#[rpc(server)]
pub trait TokenApi {
    /// Get token metadata and ledger-wide state
    #[method(name = "tally_tokenInfo")]
    async fn token_info(&self) -> RpcResult<TokenInfo>;

    /// Query account information by address
    #[method(name = "tally_getAccount")]
    async fn get_account(&self, req: GetAccountRequest) -> RpcResult<AccountInfo>;

    /// Query a spender's allowance over an owner's tokens
    #[method(name = "tally_allowance")]
    async fn allowance(&self, req: AllowanceRequest) -> RpcResult<String>;

    /// Query a delegate's voting power at a past block
    ///
    /// # Errors
    ///
    /// Rejects blocks at or past the current block; only finalized points
    /// in the ordering may be queried.
    #[method(name = "tally_votingPowerAt")]
    async fn voting_power_at(&self, req: VotingPowerAtRequest) -> RpcResult<String>;

    /// Query the total supply at a past block
    ///
    /// # Errors
    ///
    /// Rejects blocks at or past the current block, like
    /// `tally_votingPowerAt`.
    #[method(name = "tally_totalSupplyAt")]
    async fn total_supply_at(&self, req: TotalSupplyAtRequest) -> RpcResult<String>;

    /// Submit a signed transfer order for immediate application
    ///
    /// # Errors
    ///
    /// Returns an error when the order is malformed, outside its validity
    /// window, replayed, carries an unrecoverable or mismatched signature,
    /// or fails the ledger's business rules.
    #[method(name = "tally_submitTransferAuthorization")]
    async fn submit_transfer_authorization(
        &self,
        req: SubmitTransferAuthorizationRequest,
    ) -> RpcResult<SubmitAuthorizationResponse>;
}

/// Configuration for the JSON-RPC server
pub struct RpcConfig {
    /// Socket address to bind the server to (IP:port)
    pub listen_addr: SocketAddr,
}

/// Start the JSON-RPC server with the provided API implementation
///
/// Creates and starts an HTTP server that hosts the JSON-RPC endpoints.
/// This function runs until the server is stopped or encounters a fatal
/// error.
pub async fn start_server<T: TokenApiServer>(config: RpcConfig, api_impl: T) -> TokenResult<()> {
    let server = ServerBuilder::default()
        .build(config.listen_addr)
        .await
        .map_err(|e| TokenError::validation(format!("failed to build server: {}", e)))?;

    let addr = server
        .local_addr()
        .map_err(|e| TokenError::validation(format!("failed to get local address: {}", e)))?;
    let handle = server.start(api_impl.into_rpc());

    tracing::info!("RPC server listening on {}", addr);

    handle.stopped().await;
    Ok(())
}

// Validation helpers for RPC request types

fn parse_b256(hex_str: &str, field: &str) -> TokenResult<B256> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(stripped)
        .map_err(|e| TokenError::validation(format!("invalid hex in {}: {}", field, e)))?;
    if bytes.len() != 32 {
        return Err(TokenError::validation(format!(
            "{} must be 32 bytes, got {}",
            field,
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

impl GetAccountRequest {
    /// Validates the address format and returns the parsed address
    pub fn validate(&self) -> TokenResult<Address> {
        parse_address(&self.address)
    }
}

impl AllowanceRequest {
    /// Validates both address fields
    pub fn validate(&self) -> TokenResult<(Address, Address)> {
        Ok((parse_address(&self.owner)?, parse_address(&self.spender)?))
    }
}

impl VotingPowerAtRequest {
    /// Validates the delegate address; the block bound is checked against
    /// the live state by the server implementation
    pub fn validate(&self) -> TokenResult<Address> {
        parse_address(&self.delegate)
    }
}

impl SubmitTransferAuthorizationRequest {
    /// Validates all fields and assembles the authorization message and
    /// signature for the gateway
    pub fn validate(&self) -> TokenResult<(TransferAuthorization, RecoverableSignature)> {
        let message = TransferAuthorization {
            from: parse_address(&self.from)?,
            to: parse_address(&self.to)?,
            value: parse_amount(&self.value)?,
            valid_after: self.valid_after,
            valid_before: self.valid_before,
            nonce: parse_b256(&self.nonce, "nonce")?,
        };

        let stripped = self.signature.strip_prefix("0x").unwrap_or(&self.signature);
        let bytes = hex::decode(stripped)
            .map_err(|e| TokenError::validation(format!("invalid hex in signature: {}", e)))?;
        let signature = RecoverableSignature::from_bytes(&bytes)?;

        Ok((message, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_request_validation() {
        let good = GetAccountRequest {
            address: "0x00000000000000000000000000000000000000a1".to_string(),
        };
        assert!(good.validate().is_ok());

        let bad = GetAccountRequest {
            address: "not-an-address".to_string(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn submit_request_validation() {
        let req = SubmitTransferAuthorizationRequest {
            from: format!("0x{}", "11".repeat(20)),
            to: format!("0x{}", "22".repeat(20)),
            value: "1000".to_string(),
            valid_after: 0,
            valid_before: 10_000,
            nonce: format!("0x{}", "44".repeat(32)),
            signature: format!("0x{}", "07".repeat(65)),
        };
        let (message, signature) = req.validate().unwrap();
        assert_eq!(message.value, U256::from(1000));
        assert_eq!(signature.v, 0x07);

        let short_sig = SubmitTransferAuthorizationRequest {
            signature: "0xdeadbeef".to_string(),
            ..req.clone()
        };
        assert!(short_sig.validate().is_err());

        let short_nonce = SubmitTransferAuthorizationRequest {
            nonce: "0x4444".to_string(),
            ..req
        };
        assert!(short_nonce.validate().is_err());
    }
}
