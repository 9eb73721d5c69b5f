// lib.rs - Tally Node Library
//! # Tally Node
//!
//! Node wiring for the Tally token ledger: configuration, persistent state,
//! genesis initialization, and the JSON-RPC server.
//!
//! ## Example
//!
//! ```no_run
//! use tally_node::{DevRecovery, NodeConfig, TokenNode};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = NodeConfig::default();
//!     let node = Arc::new(TokenNode::new(config, DevRecovery).await?);
//!     node.run().await
//! }
//! ```

/// Configuration module
pub mod config;

/// Node implementation
pub mod node;

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::config::{GenesisMint, NodeConfig, RoleGrant};
    pub use crate::node::{DevRecovery, TokenNode, TokenRpcHandler};
}

pub use config::NodeConfig;
pub use node::{DevRecovery, TokenNode};

/// Tally Node crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
