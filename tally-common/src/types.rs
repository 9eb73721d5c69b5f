//tally-common/src/types.rs
//! Common type definitions and constants used throughout Tally

use serde::{Deserialize, Serialize};

pub use alloy_primitives::{keccak256, Address, B256, U256};

/// Block height of the execution context; checkpoint sequence numbers
/// are drawn from this counter
pub type BlockNumber = u64;

/// Timestamp in seconds since Unix epoch
pub type Timestamp = u64;

/// Ceiling on total supply: 2^192 - 1.
///
/// Checkpoint values are stored in a 64+192-bit layout, so every quantity
/// that can end up in a checkpoint (any balance, any voting power, the total
/// supply) must stay below this bound. Enforced once, at mint time.
pub const VOTING_SUPPLY_CEILING: U256 = U256::from_limbs([u64::MAX, u64::MAX, u64::MAX, 0]);

/// Allowance sentinel meaning "unlimited"; never decremented on use
pub const UNLIMITED_ALLOWANCE: U256 = U256::MAX;

/// Static token metadata and domain-binding parameters.
///
/// `chain_id` and `ledger_address` are folded into every structured-data
/// digest so signatures cannot be replayed across deployments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMeta {
    /// Human-readable token name (e.g. "Tally Governance Token")
    pub name: String,
    /// Ticker symbol (e.g. "TLY")
    pub symbol: String,
    /// Display decimals
    pub decimals: u8,
    /// Numeric chain/network identifier
    pub chain_id: u64,
    /// The ledger's own address; also an invalid transfer recipient
    pub ledger_address: Address,
}

impl TokenMeta {
    /// Protocol version string folded into the signing domain
    pub const VERSION: &'static str = "1";
}

/// Parse a `0x`-prefixed or bare hex string into an [`Address`]
pub fn parse_address(s: &str) -> Result<Address, crate::error::TokenError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped)
        .map_err(|e| crate::error::TokenError::validation(format!("invalid hex: {}", e)))?;
    if bytes.len() != Address::len_bytes() {
        return Err(crate::error::TokenError::validation(format!(
            "invalid address length: expected {}, got {}",
            Address::len_bytes(),
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

/// Parse a decimal string into a [`U256`] amount
pub fn parse_amount(s: &str) -> Result<U256, crate::error::TokenError> {
    s.parse::<U256>()
        .map_err(|e| crate::error::TokenError::validation(format!("invalid amount: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supply_ceiling_is_192_bits() {
        // 2^192 - 1: exactly the low 192 bits set
        assert_eq!(VOTING_SUPPLY_CEILING.bit_len(), 192);
        assert_eq!(VOTING_SUPPLY_CEILING.count_ones(), 192);
        assert!(VOTING_SUPPLY_CEILING < UNLIMITED_ALLOWANCE);
        assert!(VOTING_SUPPLY_CEILING
            .checked_add(U256::from(1))
            .is_some_and(|next| next.count_ones() == 1));
    }

    #[test]
    fn parse_address_accepts_both_forms() {
        let plain = "00000000000000000000000000000000000000a1";
        let prefixed = format!("0x{}", plain);
        assert_eq!(parse_address(plain).unwrap(), parse_address(&prefixed).unwrap());
        assert!(parse_address("0xdeadbeef").is_err());
    }

    #[test]
    fn parse_amount_decimal() {
        assert_eq!(parse_amount("10000000").unwrap(), U256::from(10_000_000u64));
        assert!(parse_amount("not-a-number").is_err());
    }
}
