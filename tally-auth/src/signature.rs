//! Recoverable signatures and the recovery collaborator boundary
//!
//! The ledger never implements curve arithmetic itself; identity recovery
//! from a digest and signature is an external collaborator consumed through
//! the [`SignatureRecovery`] trait. What this module does own is the
//! signature's data shape and its malleability guard: the `s` component must
//! lie in the canonical lower half of the curve order, so a third party
//! cannot derive a second valid signature for the same digest.

use tally_common::prelude::*;

/// Upper bound of the canonical `s` range (half the secp256k1 group order)
const HALF_ORDER: U256 = U256::from_limbs([
    0xDFE9_2F46_681B_20A0,
    0x5D57_6E73_57A4_501D,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

/// A 65-byte recoverable signature split into its components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: B256,
    pub s: B256,
    pub v: u8,
}

impl RecoverableSignature {
    pub fn new(r: B256, s: B256, v: u8) -> Self {
        Self { r, s, v }
    }

    /// Parse the `r ‖ s ‖ v` wire form
    pub fn from_bytes(bytes: &[u8]) -> TokenResult<Self> {
        if bytes.len() != 65 {
            return Err(TokenError::InvalidSignature);
        }
        Ok(Self {
            r: B256::from_slice(&bytes[0..32]),
            s: B256::from_slice(&bytes[32..64]),
            v: bytes[64],
        })
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0..32].copy_from_slice(self.r.as_slice());
        out[32..64].copy_from_slice(self.s.as_slice());
        out[64] = self.v;
        out
    }

    /// Malleability guard: `0 < s <= n/2`
    pub fn has_canonical_s(&self) -> bool {
        let s = U256::from_be_bytes(self.s.0);
        !s.is_zero() && s <= HALF_ORDER
    }
}

/// External signature-recovery collaborator.
///
/// Implementations take a 32-byte digest and a recoverable signature and
/// return the signing identity, or an error when no identity can be
/// recovered.
pub trait SignatureRecovery {
    fn recover(&self, digest: B256, signature: &RecoverableSignature) -> TokenResult<Address>;
}

/// Validate the signature shape and resolve the signing identity.
///
/// Fails with `InvalidSignature` when the malleability guard rejects the
/// signature, when recovery fails, or when recovery yields the null
/// identity.
pub fn derive_signer<S: SignatureRecovery>(
    recovery: &S,
    digest: B256,
    signature: &RecoverableSignature,
) -> TokenResult<Address> {
    if !signature.has_canonical_s() {
        return Err(TokenError::InvalidSignature);
    }
    let signer = recovery
        .recover(digest, signature)
        .map_err(|_| TokenError::InvalidSignature)?;
    if signer == Address::ZERO {
        return Err(TokenError::InvalidSignature);
    }
    Ok(signer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn low_s_signature() -> RecoverableSignature {
        RecoverableSignature::new(B256::repeat_byte(1), B256::from(U256::from(7).to_be_bytes::<32>()), 27)
    }

    #[test]
    fn wire_roundtrip() {
        let sig = low_s_signature();
        let bytes = sig.to_bytes();
        assert_eq!(RecoverableSignature::from_bytes(&bytes).unwrap(), sig);
        assert!(RecoverableSignature::from_bytes(&bytes[..64]).is_err());
    }

    #[test]
    fn canonical_s_guard() {
        assert!(low_s_signature().has_canonical_s());

        let zero_s = RecoverableSignature::new(B256::repeat_byte(1), B256::ZERO, 27);
        assert!(!zero_s.has_canonical_s());

        let high_s = RecoverableSignature::new(B256::repeat_byte(1), B256::repeat_byte(0xff), 27);
        assert!(!high_s.has_canonical_s());

        let boundary = RecoverableSignature::new(
            B256::repeat_byte(1),
            B256::from(HALF_ORDER.to_be_bytes::<32>()),
            27,
        );
        assert!(boundary.has_canonical_s());
        let past = RecoverableSignature::new(
            B256::repeat_byte(1),
            B256::from((HALF_ORDER + U256::from(1)).to_be_bytes::<32>()),
            27,
        );
        assert!(!past.has_canonical_s());
    }

    struct FixedRecovery(Address);

    impl SignatureRecovery for FixedRecovery {
        fn recover(&self, _digest: B256, _signature: &RecoverableSignature) -> TokenResult<Address> {
            Ok(self.0)
        }
    }

    #[test]
    fn derive_signer_rejects_null_identity_and_high_s() {
        let digest = B256::repeat_byte(5);

        let recovered =
            derive_signer(&FixedRecovery(Address::repeat_byte(2)), digest, &low_s_signature());
        assert_eq!(recovered.unwrap(), Address::repeat_byte(2));

        assert!(matches!(
            derive_signer(&FixedRecovery(Address::ZERO), digest, &low_s_signature()),
            Err(TokenError::InvalidSignature)
        ));

        let high_s = RecoverableSignature::new(B256::repeat_byte(1), B256::repeat_byte(0xff), 27);
        assert!(matches!(
            derive_signer(&FixedRecovery(Address::repeat_byte(2)), digest, &high_s),
            Err(TokenError::InvalidSignature)
        ));
    }
}
