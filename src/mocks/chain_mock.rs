use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::blockchain::registry::ChainNetwork;
use crate::blockchain::relayer::RelayerClient;
use crate::blockchain::rpc::ChainReader;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::CallStep;

/// 모든 체인에서 같은 잔액. 모르는 토큰은 잔액 0, decimals 18
pub struct MockChainReader {
    native: Mutex<U256>,
    tokens: Mutex<HashMap<Address, U256>>,
    decimals: Mutex<HashMap<Address, u8>>,
}

impl MockChainReader {
    pub fn new() -> Self {
        Self {
            native: Mutex::new(U256::ZERO),
            tokens: Mutex::new(HashMap::new()),
            decimals: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_native_balance(&self, value: U256) {
        *self.native.lock().unwrap_or_else(|p| p.into_inner()) = value;
    }

    pub fn set_token_balance(&self, token: Address, value: U256) {
        self.tokens.lock().unwrap_or_else(|p| p.into_inner()).insert(token, value);
    }

    pub fn set_token_decimals(&self, token: Address, decimals: u8) {
        self.decimals.lock().unwrap_or_else(|p| p.into_inner()).insert(token, decimals);
    }
}

impl Default for MockChainReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn native_balance(&self, _network: &ChainNetwork, _owner: Address) -> OrchestratorResult<U256> {
        Ok(*self.native.lock().unwrap_or_else(|p| p.into_inner()))
    }

    async fn token_balance(&self, _network: &ChainNetwork, token: Address, _owner: Address) -> OrchestratorResult<U256> {
        let tokens = self.tokens.lock().unwrap_or_else(|p| p.into_inner());
        Ok(tokens.get(&token).copied().unwrap_or(U256::ZERO))
    }

    async fn token_decimals(&self, _network: &ChainNetwork, token: Address) -> OrchestratorResult<u8> {
        let decimals = self.decimals.lock().unwrap_or_else(|p| p.into_inner());
        Ok(decimals.get(&token).copied().unwrap_or(18))
    }
}

/// 서명 대신 relay 된 호출을 기록
pub struct MockRelayer {
    sent: Mutex<Vec<(u64, CallStep)>>,
}

impl MockRelayer {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// 전송 순서대로 (chain id, call)
    pub fn sent(&self) -> Vec<(u64, CallStep)> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Default for MockRelayer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelayerClient for MockRelayer {
    async fn send_call(
        &self,
        network: &ChainNetwork,
        step: &CallStep,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<String> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }
        let mut sent = self.sent.lock().unwrap_or_else(|p| p.into_inner());
        sent.push((network.chain_id, step.clone()));
        let hash = format!("0x{:064x}", 0xfeed_0000u64 + sent.len() as u64);
        info!("🎭 {} relay 호출 기록: {}", network.name, hash);
        Ok(hash)
    }

    fn address(&self) -> String {
        "0x000000000000000000000000000000000000dead".to_string()
    }
}
