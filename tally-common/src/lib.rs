//! # Tally Common
//!
//! Common utilities, traits, and standardized patterns for the Tally token
//! ledger. This crate serves as the single source of truth for all shared
//! functionality across the Tally workspace, preventing code duplication and
//! circular dependencies.
//!
//! ## Modules
//!
//! - **types**: Common type definitions and constants
//! - **error**: Standardized error taxonomy
//! - **serialization**: Standardized data encoding/decoding patterns
//! - **database**: Database operation patterns
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_common::prelude::*;
//!
//! let amount = U256::from(1_000u64);
//! assert!(amount < VOTING_SUPPLY_CEILING);
//! ```

pub mod database;
pub mod error;
pub mod serialization;
pub mod types;

/// Re-export commonly used types and traits
pub mod prelude {
    pub use crate::database::{DatabaseOps, LedgerDatabase};
    pub use crate::error::{TokenError, TokenResult};
    pub use crate::serialization::{EncodingType, TokenSerialize};
    pub use crate::types::{
        keccak256, parse_address, parse_amount, Address, BlockNumber, Timestamp, TokenMeta, B256,
        U256, UNLIMITED_ALLOWANCE, VOTING_SUPPLY_CEILING,
    };

    // Re-export essential external crates
    pub use anyhow::Result;
}

/// Tally Common crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
