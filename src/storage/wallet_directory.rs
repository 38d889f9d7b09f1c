use std::collections::HashMap;

use alloy::primitives::Address;
use tracing::debug;

use crate::blockchain::registry::{ChainNetwork, ChainRegistry};
use crate::config::WalletConfig;
use crate::error::{EncodingError, OrchestratorError, OrchestratorResult};
use crate::types::WalletRef;
use crate::utils::validation::parse_address;

/// 소유자 식별자를 체인별 관리형 지갑으로 매핑
pub trait WalletDirectory: Send + Sync {
    fn resolve(&self, owner: &str, network: &ChainNetwork) -> OrchestratorResult<WalletRef>;
}

/// 시작 시 한 번 로드되는 디렉터리
#[derive(Debug, Clone, Default)]
pub struct InMemoryWalletDirectory {
    wallets: HashMap<(String, u64), WalletRef>,
}

impl InMemoryWalletDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, owner: &str, chain_id: u64, wallet_id: &str, address: Address) {
        self.wallets.insert(
            (owner.to_string(), chain_id),
            WalletRef {
                wallet_id: wallet_id.to_string(),
                address,
            },
        );
    }

    pub fn from_config(entries: &[WalletConfig], registry: &ChainRegistry) -> Result<Self, EncodingError> {
        let mut directory = Self::new();
        for entry in entries {
            let network = registry.resolve(&entry.network)?;
            let address = parse_address(&entry.address)?;
            directory.insert(&entry.owner, network.chain_id, &entry.wallet_id, address);
            debug!("👛 지갑 등록: {} @ {}", entry.owner, network.name);
        }
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

impl WalletDirectory for InMemoryWalletDirectory {
    fn resolve(&self, owner: &str, network: &ChainNetwork) -> OrchestratorResult<WalletRef> {
        self.wallets
            .get(&(owner.to_string(), network.chain_id))
            .cloned()
            .ok_or_else(|| OrchestratorError::WalletNotFound {
                owner: owner.to_string(),
                chain: network.name.clone(),
            })
    }
}
