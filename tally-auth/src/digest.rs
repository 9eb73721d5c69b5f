//! Domain-separated structured-data digests
//!
//! Every signed message is reduced to a 32-byte digest built from two
//! halves: a domain separator binding the protocol name, version, chain id,
//! and the ledger's own address, and a type-tagged struct hash over the
//! message fields encoded as 32-byte words. The chain id and ledger address
//! in the separator are what stop a signature from being replayed against
//! another deployment or another network.

use tally_common::prelude::*;

/// Hash of a type signature string, tagging each struct hash
pub fn type_hash(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// Struct hash: keccak over the type hash followed by the encoded fields
pub fn hash_struct(type_hash: B256, fields: &[B256]) -> B256 {
    let mut buf = Vec::with_capacity(32 * (fields.len() + 1));
    buf.extend_from_slice(type_hash.as_slice());
    for field in fields {
        buf.extend_from_slice(field.as_slice());
    }
    keccak256(&buf)
}

/// Encode an address as a left-padded 32-byte word
pub fn word_from_address(address: Address) -> B256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    B256::from(word)
}

/// Encode a 256-bit amount as a big-endian 32-byte word
pub fn word_from_u256(value: U256) -> B256 {
    B256::from(value.to_be_bytes::<32>())
}

/// Encode a 64-bit scalar as a big-endian 32-byte word
pub fn word_from_u64(value: u64) -> B256 {
    word_from_u256(U256::from(value))
}

/// The signing domain of one ledger deployment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    name: String,
    version: String,
    chain_id: u64,
    ledger_address: Address,
}

impl Domain {
    const TYPE: &'static str =
        "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

    pub fn new(name: impl Into<String>, version: impl Into<String>, chain_id: u64, ledger_address: Address) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            ledger_address,
        }
    }

    /// Domain for a token deployment described by its metadata
    pub fn for_token(meta: &TokenMeta) -> Self {
        Self::new(
            meta.name.clone(),
            TokenMeta::VERSION,
            meta.chain_id,
            meta.ledger_address,
        )
    }

    /// The domain separator hash
    pub fn separator(&self) -> B256 {
        hash_struct(
            type_hash(Self::TYPE),
            &[
                keccak256(self.name.as_bytes()),
                keccak256(self.version.as_bytes()),
                word_from_u64(self.chain_id),
                word_from_address(self.ledger_address),
            ],
        )
    }

    /// Final signed digest: `keccak256(0x19 ‖ 0x01 ‖ separator ‖ struct_hash)`
    pub fn digest(&self, struct_hash: B256) -> B256 {
        let mut buf = [0u8; 66];
        buf[0] = 0x19;
        buf[1] = 0x01;
        buf[2..34].copy_from_slice(self.separator().as_slice());
        buf[34..66].copy_from_slice(struct_hash.as_slice());
        keccak256(buf)
    }
}
