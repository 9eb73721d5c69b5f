//! Role and feature gating
//!
//! Mutating operations are gated on boolean capability checks answered by an
//! injected [`RoleOracle`]. The ledger never mutates role or feature state
//! itself; membership lives wherever the oracle implementation keeps it.

use std::collections::HashMap;
use tally_common::prelude::*;

/// Feature bits controlling which public operations are live
pub mod features {
    /// Token holders may transfer their own tokens
    pub const TRANSFERS: u32 = 0x0000_0001;
    /// Approved operators may transfer tokens on holders' behalf
    pub const TRANSFERS_ON_BEHALF: u32 = 0x0000_0002;
    /// Token holders may burn their own tokens
    pub const OWN_BURNS: u32 = 0x0000_0004;
    /// Approved operators may burn tokens on holders' behalf
    pub const BURNS_ON_BEHALF: u32 = 0x0000_0008;
    /// Token holders may delegate their voting power
    pub const DELEGATIONS: u32 = 0x0000_0010;
    /// Voting power may be delegated via signed authorizations
    pub const DELEGATIONS_ON_BEHALF: u32 = 0x0000_0020;
    /// Allowances may be set via signed approvals (sequential nonces)
    pub const SIGNED_APPROVALS: u32 = 0x0000_0040;
    /// Transfers may be executed via signed authorizations (random nonces)
    pub const SIGNED_TRANSFERS: u32 = 0x0000_0080;
    /// Payees may pull signed transfers addressed to them
    pub const SIGNED_RECEPTIONS: u32 = 0x0000_0100;
    /// Transfers may notify receiver callbacks
    pub const CALLBACK_TRANSFERS: u32 = 0x0000_0200;
    /// Approvals may notify spender callbacks
    pub const CALLBACK_APPROVALS: u32 = 0x0000_0400;

    /// Every feature bit set
    pub const ALL: u32 = 0x0000_07FF;
}

/// Permission bits granted to privileged operators
pub mod roles {
    /// May create new supply (mint)
    pub const SUPPLY_CREATOR: u32 = 0x0001_0000;
    /// May destroy supply without holding an allowance (burn)
    pub const SUPPLY_DESTROYER: u32 = 0x0002_0000;
}

/// Capability-lookup service consumed by the engine.
///
/// Implementations answer boolean gate questions only; the engine depends on
/// this interface and never on a concrete authorization backend.
pub trait RoleOracle {
    /// Does the acting sender hold the given role?
    fn is_sender_in_role(&self, sender: Address, role: u32) -> bool {
        self.is_operator_in_role(sender, role)
    }

    /// Does an arbitrary operator hold the given role?
    fn is_operator_in_role(&self, operator: Address, role: u32) -> bool;

    /// Is the given feature bit enabled globally?
    fn is_feature_enabled(&self, feature: u32) -> bool;
}

/// Config-driven oracle: a global feature mask plus per-address role grants.
#[derive(Debug, Clone, Default)]
pub struct StaticRoles {
    features: u32,
    default_roles: u32,
    grants: HashMap<Address, u32>,
}

impl StaticRoles {
    pub fn new(features: u32) -> Self {
        Self {
            features,
            default_roles: 0,
            grants: HashMap::new(),
        }
    }

    /// Everything enabled and every address holds every role; test/dev use
    pub fn permissive() -> Self {
        Self {
            features: features::ALL,
            default_roles: roles::SUPPLY_CREATOR | roles::SUPPLY_DESTROYER,
            grants: HashMap::new(),
        }
    }

    pub fn grant(mut self, operator: Address, role_mask: u32) -> Self {
        *self.grants.entry(operator).or_insert(0) |= role_mask;
        self
    }
}

impl RoleOracle for StaticRoles {
    fn is_operator_in_role(&self, operator: Address, role: u32) -> bool {
        let granted = self.default_roles | self.grants.get(&operator).copied().unwrap_or(0);
        granted & role == role
    }

    fn is_feature_enabled(&self, feature: u32) -> bool {
        self.features & feature == feature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_roles_answer_grants() {
        let minter = Address::repeat_byte(1);
        let outsider = Address::repeat_byte(2);
        let oracle = StaticRoles::new(features::TRANSFERS).grant(minter, roles::SUPPLY_CREATOR);

        assert!(oracle.is_operator_in_role(minter, roles::SUPPLY_CREATOR));
        assert!(!oracle.is_operator_in_role(minter, roles::SUPPLY_DESTROYER));
        assert!(!oracle.is_operator_in_role(outsider, roles::SUPPLY_CREATOR));
        assert!(oracle.is_sender_in_role(minter, roles::SUPPLY_CREATOR));

        assert!(oracle.is_feature_enabled(features::TRANSFERS));
        assert!(!oracle.is_feature_enabled(features::OWN_BURNS));
    }

    #[test]
    fn permissive_oracle_allows_everything() {
        let oracle = StaticRoles::permissive();
        let anyone = Address::repeat_byte(9);
        assert!(oracle.is_operator_in_role(anyone, roles::SUPPLY_CREATOR));
        assert!(oracle.is_feature_enabled(features::ALL));
    }
}
