//! # Tally Auth
//!
//! The signature authorization subsystem of the Tally token ledger.
//!
//! Behalf-based operations enter the token engine through this crate: a
//! wallet signs a domain-separated structured-data digest offline, and any
//! party (or, for receptions, the payee specifically) submits it. The
//! subsystem derives the signing identity, enforces replay protection and
//! validity windows, and delegates to the engine.
//!
//! ## Components
//!
//! - [`digest`]: domain separators, type hashes, and 32-byte-word encoding
//! - [`signature`]: the recoverable signature shape, the canonical-range
//!   malleability guard, and the external [`signature::SignatureRecovery`]
//!   collaborator boundary
//! - [`flows`]: the four authorized flows behind [`flows::AuthGateway`]

pub mod digest;
pub mod flows;
pub mod signature;

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::digest::Domain;
    pub use crate::flows::{
        AuthGateway, DelegationAuthorization, SignedApproval, TransferAuthorization,
    };
    pub use crate::signature::{derive_signer, RecoverableSignature, SignatureRecovery};
}

pub use flows::AuthGateway;
pub use signature::{RecoverableSignature, SignatureRecovery};

/// Tally Auth crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
