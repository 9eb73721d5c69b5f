// config.rs - Configuration for tally-node
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tally_common::prelude::*;
use tally_ledger::prelude::{features, StaticRoles};

/// A role grant for one privileged operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleGrant {
    /// Operator address (hex)
    pub operator: String,
    /// Role bitmask granted to the operator
    pub roles: u32,
}

/// One genesis mint applied when the database is initialized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisMint {
    /// Recipient address (hex)
    pub to: String,
    /// Amount in base units (decimal string)
    pub value: String,
}

// Scalar fields come before the token table and grant arrays so the struct
// serializes cleanly to TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Path to the state database
    pub db_path: String,

    /// RPC server port
    pub rpc_port: u16,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Enabled feature bitmask (see tally-ledger feature constants)
    pub features: u32,

    /// Token metadata and digest domain-binding parameters
    pub token: TokenMeta,

    /// Privileged role grants
    pub role_grants: Vec<RoleGrant>,

    /// Mints applied once, when the database is first initialized
    pub genesis_mints: Vec<GenesisMint>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            db_path: "./tally_db".to_string(),
            rpc_port: 8545,
            log_level: "info".to_string(),
            features: features::ALL,
            token: TokenMeta {
                name: "Tally Governance Token".to_string(),
                symbol: "TLY".to_string(),
                decimals: 18,
                chain_id: 1,
                ledger_address: Address::repeat_byte(0xee),
            },
            role_grants: Vec::new(),
            genesis_mints: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> TokenResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| TokenError::config(format!("invalid config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> TokenResult<()> {
        if self.rpc_port == 0 {
            return Err(TokenError::config("rpc_port must be greater than 0"));
        }
        if self.token.name.is_empty() || self.token.symbol.is_empty() {
            return Err(TokenError::config("token name and symbol cannot be empty"));
        }
        if self.token.ledger_address == Address::ZERO {
            return Err(TokenError::config("ledger_address cannot be the zero address"));
        }

        for grant in &self.role_grants {
            parse_address(&grant.operator)
                .map_err(|e| TokenError::config(format!("bad role grant operator: {}", e)))?;
        }

        let mut genesis_total = U256::ZERO;
        for mint in &self.genesis_mints {
            parse_address(&mint.to)
                .map_err(|e| TokenError::config(format!("bad genesis recipient: {}", e)))?;
            let value = parse_amount(&mint.value)
                .map_err(|e| TokenError::config(format!("bad genesis amount: {}", e)))?;
            genesis_total = genesis_total
                .checked_add(value)
                .ok_or_else(|| TokenError::config("genesis mints overflow"))?;
        }
        if genesis_total > VOTING_SUPPLY_CEILING {
            return Err(TokenError::config(
                "genesis mints exceed the supply ceiling",
            ));
        }

        Ok(())
    }

    /// Build the capability oracle described by this configuration
    pub fn static_roles(&self) -> TokenResult<StaticRoles> {
        let mut oracle = StaticRoles::new(self.features);
        for grant in &self.role_grants {
            let operator = parse_address(&grant.operator)?;
            oracle = oracle.grant(operator, grant.roles);
        }
        Ok(oracle)
    }

    /// Get the database path as PathBuf
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_ledger::prelude::{roles, RoleOracle};

    #[test]
    fn default_config_is_valid() {
        assert!(NodeConfig::default().validate().is_ok());
    }

    #[test]
    fn validation_catches_bad_fields() {
        let mut config = NodeConfig::default();
        config.rpc_port = 0;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.token.ledger_address = Address::ZERO;
        assert!(config.validate().is_err());

        let mut config = NodeConfig::default();
        config.genesis_mints.push(GenesisMint {
            to: "nonsense".to_string(),
            value: "10".to_string(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn static_roles_reflect_grants() {
        let mut config = NodeConfig::default();
        config.role_grants.push(RoleGrant {
            operator: format!("0x{}", "09".repeat(20)),
            roles: roles::SUPPLY_CREATOR,
        });
        let oracle = config.static_roles().unwrap();
        assert!(oracle.is_operator_in_role(Address::repeat_byte(9), roles::SUPPLY_CREATOR));
        assert!(!oracle.is_operator_in_role(Address::repeat_byte(8), roles::SUPPLY_CREATOR));
    }

    #[test]
    fn toml_roundtrip() {
        let config = NodeConfig::default();
        let raw = toml::to_string(&config).unwrap();
        let parsed: NodeConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.rpc_port, config.rpc_port);
        assert_eq!(parsed.token.symbol, config.token.symbol);
    }
}
