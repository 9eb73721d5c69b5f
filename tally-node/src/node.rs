//! Node wiring: database, genesis, engine, and the RPC server handler

use crate::config::NodeConfig;
use jsonrpsee::core::RpcResult;
use jsonrpsee::types::error::{ErrorObjectOwned, INTERNAL_ERROR_CODE, INVALID_PARAMS_CODE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tally_auth::prelude::*;
use tally_common::prelude::*;
use tally_ledger::prelude::*;
use tally_rpc::{
    AccountInfo, AllowanceRequest, GetAccountRequest, SubmitAuthorizationResponse,
    SubmitTransferAuthorizationRequest, TokenApiServer, TokenInfo, TotalSupplyAtRequest,
    VotingPowerAtRequest,
};
use tokio::sync::RwLock;
use tracing::{error, info};

/// Development-only recovery scheme: the trailing 20 bytes of the
/// signature's `r` word name the signer, so devnet clients can exercise the
/// authorized flows without a curve backend. Production deployments inject
/// a real recovery implementation instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevRecovery;

impl SignatureRecovery for DevRecovery {
    fn recover(&self, _digest: B256, signature: &RecoverableSignature) -> TokenResult<Address> {
        if signature.r == B256::ZERO {
            return Err(TokenError::InvalidSignature);
        }
        Ok(Address::from_slice(&signature.r.as_slice()[12..]))
    }
}

/// A running ledger node: persistent state, the gated engine behind the
/// authorization gateway, and the block counter that orders operations.
pub struct TokenNode<S: SignatureRecovery> {
    config: NodeConfig,
    store: StateStore,
    state: Arc<RwLock<LedgerState>>,
    gateway: AuthGateway<StaticRoles, S>,
    block: AtomicU64,
}

impl<S: SignatureRecovery + Send + Sync + 'static> TokenNode<S> {
    pub async fn new(config: NodeConfig, recovery: S) -> TokenResult<Self> {
        config.validate()?;

        let store = StateStore::open(&config.db_path)?;
        let mut state = store.load_state().await?;
        let mut block = store.load_block_number()?;

        // First boot: apply genesis mints through the real engine so the
        // supply invariant and checkpoint histories hold from block one.
        if block == 0 && !config.genesis_mints.is_empty() {
            block = 1;
            let genesis_engine = Engine::new(config.token.clone(), StaticRoles::permissive());
            let ctx = ExecutionContext::new(block, now_seconds());
            for mint in &config.genesis_mints {
                let to = parse_address(&mint.to)?;
                let value = parse_amount(&mint.value)?;
                genesis_engine.mint(&mut state, &ctx, config.token.ledger_address, to, value)?;
            }
            for event in state.drain_events() {
                info!(?event, "genesis event");
            }
            store.save_state(&state).await?;
            store.save_block_number(block)?;
            info!(supply = %state.total_supply(), "genesis state initialized");
        }

        let oracle = config.static_roles()?;
        let engine = Engine::new(config.token.clone(), oracle);
        let gateway = AuthGateway::new(engine, recovery);

        info!("Initialized Tally node");
        info!("  - Token: {} ({})", config.token.name, config.token.symbol);
        info!("  - Chain id: {}", config.token.chain_id);
        info!("  - Current block: {}", block);
        info!("  - Total supply: {}", state.total_supply());
        info!("  - Accounts: {}", state.account_count());

        Ok(Self {
            config,
            store,
            state: Arc::new(RwLock::new(state)),
            gateway,
            block: AtomicU64::new(block),
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn gateway(&self) -> &AuthGateway<StaticRoles, S> {
        &self.gateway
    }

    /// Current block number; past blocks are strictly below this
    pub fn current_block(&self) -> BlockNumber {
        self.block.load(Ordering::SeqCst)
    }

    /// Allocate the execution context for one mutating operation
    fn next_ctx(&self) -> ExecutionContext {
        let block = self.block.fetch_add(1, Ordering::SeqCst) + 1;
        ExecutionContext::new(block, now_seconds())
    }

    /// Persist the state snapshot and drain the event journal to the log
    async fn commit(&self, state: &mut LedgerState, block: BlockNumber) -> TokenResult<()> {
        for event in state.drain_events() {
            info!(?event, block, "ledger event");
        }
        self.store.save_state(state).await?;
        self.store.save_block_number(block)?;
        Ok(())
    }

    /// Serve the JSON-RPC API until the server is stopped
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let rpc_config = tally_rpc::RpcConfig {
            listen_addr: ([127, 0, 0, 1], self.config.rpc_port).into(),
        };
        let handler = TokenRpcHandler { node: self.clone() };

        info!("Starting RPC server on port {}", self.config.rpc_port);
        if let Err(e) = tally_rpc::start_server(rpc_config, handler).await {
            error!("RPC server error: {}", e);
            return Err(anyhow::anyhow!("RPC server error: {}", e));
        }
        Ok(())
    }
}

fn now_seconds() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn rpc_err(err: TokenError) -> ErrorObjectOwned {
    let code = match err {
        TokenError::Validation(_) | TokenError::Json(_) => INVALID_PARAMS_CODE,
        _ => INTERNAL_ERROR_CODE,
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

/// RPC handler bridging the API trait onto the node
pub struct TokenRpcHandler<S: SignatureRecovery> {
    node: Arc<TokenNode<S>>,
}

// Implement RPC API on the handler
#[async_trait::async_trait]
impl<S: SignatureRecovery + Send + Sync + 'static> TokenApiServer for TokenRpcHandler<S> {
    async fn token_info(&self) -> RpcResult<TokenInfo> {
        let state = self.node.state.read().await;
        let meta = &self.node.config.token;
        Ok(TokenInfo {
            name: meta.name.clone(),
            symbol: meta.symbol.clone(),
            decimals: meta.decimals,
            chain_id: meta.chain_id,
            ledger_address: meta.ledger_address.to_string(),
            total_supply: state.total_supply().to_string(),
            current_block: self.node.current_block(),
            accounts: state.account_count(),
        })
    }

    async fn get_account(&self, req: GetAccountRequest) -> RpcResult<AccountInfo> {
        let address = req.validate().map_err(rpc_err)?;
        let state = self.node.state.read().await;
        let delegate = state.delegate_of(address);
        Ok(AccountInfo {
            balance: state.balance_of(address).to_string(),
            delegate: (delegate != Address::ZERO).then(|| delegate.to_string()),
            voting_power: state.voting_power_of(address).to_string(),
            permit_nonce: state.permit_nonce(address).to_string(),
        })
    }

    async fn allowance(&self, req: AllowanceRequest) -> RpcResult<String> {
        let (owner, spender) = req.validate().map_err(rpc_err)?;
        let state = self.node.state.read().await;
        Ok(state.allowance(owner, spender).to_string())
    }

    async fn voting_power_at(&self, req: VotingPowerAtRequest) -> RpcResult<String> {
        let delegate = req.validate().map_err(rpc_err)?;
        // Only finalized blocks may be queried; the in-progress one can
        // still coalesce.
        if req.block >= self.node.current_block() {
            return Err(rpc_err(TokenError::validation(
                "block must be strictly in the past",
            )));
        }
        let state = self.node.state.read().await;
        Ok(state.voting_power_at(delegate, req.block).to_string())
    }

    async fn total_supply_at(&self, req: TotalSupplyAtRequest) -> RpcResult<String> {
        if req.block >= self.node.current_block() {
            return Err(rpc_err(TokenError::validation(
                "block must be strictly in the past",
            )));
        }
        let state = self.node.state.read().await;
        Ok(state.total_supply_at(req.block).to_string())
    }

    async fn submit_transfer_authorization(
        &self,
        req: SubmitTransferAuthorizationRequest,
    ) -> RpcResult<SubmitAuthorizationResponse> {
        let (message, signature) = req.validate().map_err(rpc_err)?;

        let mut state = self.node.state.write().await;
        let ctx = self.node.next_ctx();
        self.node
            .gateway
            .transfer_with_authorization(&mut state, &ctx, &message, &signature)
            .map_err(rpc_err)?;
        self.node
            .commit(&mut state, ctx.block_number)
            .await
            .map_err(rpc_err)?;

        Ok(SubmitAuthorizationResponse {
            block: ctx.block_number,
            nonce: format!("0x{}", hex::encode(message.nonce)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisMint;
    use tempfile::tempdir;

    fn config_with_genesis(db_path: &str) -> NodeConfig {
        let mut config = NodeConfig::default();
        config.db_path = db_path.to_string();
        config.genesis_mints.push(GenesisMint {
            to: format!("0x{}", "11".repeat(20)),
            value: "10000000".to_string(),
        });
        config
    }

    #[tokio::test]
    async fn genesis_applies_once_and_survives_restart() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("node_db");
        let db_path = db_path.to_str().unwrap();

        let node = TokenNode::new(config_with_genesis(db_path), DevRecovery)
            .await
            .unwrap();
        let holder = Address::repeat_byte(0x11);
        {
            let state = node.state.read().await;
            assert_eq!(state.total_supply(), U256::from(10_000_000u64));
            assert_eq!(state.balance_of(holder), U256::from(10_000_000u64));
            assert_eq!(state.supply_history().len(), 1);
        }
        assert_eq!(node.current_block(), 1);
        drop(node);

        // Reopening must not mint again
        let node = TokenNode::new(config_with_genesis(db_path), DevRecovery)
            .await
            .unwrap();
        let state = node.state.read().await;
        assert_eq!(state.total_supply(), U256::from(10_000_000u64));
        assert_eq!(state.supply_history().len(), 1);
    }

    #[tokio::test]
    async fn authorized_transfer_via_dev_recovery() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("node_db");
        let config = config_with_genesis(db_path.to_str().unwrap());

        let node = Arc::new(TokenNode::new(config, DevRecovery).await.unwrap());
        let handler = TokenRpcHandler { node: node.clone() };

        let holder = Address::repeat_byte(0x11);
        let payee = Address::repeat_byte(0x22);

        // Under DevRecovery the r word names the signer
        let mut r = [0u8; 32];
        r[12..].copy_from_slice(holder.as_slice());
        let signature = RecoverableSignature::new(
            B256::from(r),
            B256::from(U256::from(7).to_be_bytes::<32>()),
            27,
        );

        let req = SubmitTransferAuthorizationRequest {
            from: holder.to_string(),
            to: payee.to_string(),
            value: "2500".to_string(),
            valid_after: 0,
            valid_before: u64::MAX,
            nonce: format!("0x{}", "44".repeat(32)),
            signature: format!("0x{}", hex::encode(signature.to_bytes())),
        };

        let response = handler.submit_transfer_authorization(req.clone()).await.unwrap();
        assert_eq!(response.block, 2);
        {
            let state = node.state.read().await;
            assert_eq!(state.balance_of(payee), U256::from(2500u64));
        }

        // Replaying the identical order fails
        let err = handler.submit_transfer_authorization(req).await.unwrap_err();
        assert!(err.message().contains("nonce"));
    }

    #[tokio::test]
    async fn historical_queries_reject_the_in_progress_block() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("node_db");
        let config = config_with_genesis(db_path.to_str().unwrap());

        let node = Arc::new(TokenNode::new(config, DevRecovery).await.unwrap());
        let handler = TokenRpcHandler { node: node.clone() };

        // Block 1 is still in progress right after genesis
        let err = handler
            .total_supply_at(TotalSupplyAtRequest { block: 1 })
            .await
            .unwrap_err();
        assert!(err.message().contains("past"));

        let supply = handler
            .total_supply_at(TotalSupplyAtRequest { block: 0 })
            .await
            .unwrap();
        assert_eq!(supply, "0");
    }
}
