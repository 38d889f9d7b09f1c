use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use futures::future::{join_all, try_join};
use ethers::{
    abi::Abi,
    contract::Contract,
    providers::{Http, Middleware, Provider},
    types::{H160, U256 as EthersU256},
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::registry::{ChainNetwork, ChainRegistry};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::storage::WalletDirectory;
use crate::types::{Asset, LendingProtocol};
use crate::utils::math::format_units;
use crate::utils::rate_limit::EndpointLimiter;

const ERC20_READ_ABI: &str = r#"[{"constant":true,"inputs":[{"name":"_owner","type":"address"}],"name":"balanceOf","outputs":[{"name":"balance","type":"uint256"}],"type":"function"},{"constant":true,"inputs":[],"name":"decimals","outputs":[{"name":"","type":"uint8"}],"type":"function"}]"#;

pub(crate) fn to_h160(address: Address) -> H160 {
    H160::from(address.into_array())
}

pub(crate) fn to_ethers_u256(value: U256) -> EthersU256 {
    EthersU256::from_big_endian(&value.to_be_bytes::<32>())
}

pub(crate) fn from_ethers_u256(value: EthersU256) -> U256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    U256::from_be_bytes(bytes)
}

/// 읽기 전용 체인 조회
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn native_balance(&self, network: &ChainNetwork, owner: Address) -> OrchestratorResult<U256>;

    /// ERC-20 `balanceOf` (aToken, comet 도 동일)
    async fn token_balance(&self, network: &ChainNetwork, token: Address, owner: Address) -> OrchestratorResult<U256>;

    /// ERC-20 `decimals()`
    async fn token_decimals(&self, network: &ChainNetwork, token: Address) -> OrchestratorResult<u8>;
}

/// 체인별 `Provider<Http>` 와 `EndpointLimiter` 한 쌍
pub struct ChainClient {
    pub provider: Arc<Provider<Http>>,
    pub limiter: EndpointLimiter,
}

/// 체인 ID 별 RPC 클라이언트 캐시. 조회기와 relayer가 같은 인스턴스를 공유한다
#[derive(Default)]
pub struct ChainClients {
    clients: RwLock<HashMap<u64, Arc<ChainClient>>>,
}

impl ChainClients {
    pub fn new() -> Self {
        Self::default()
    }

    /// 첫 사용 시 provider 생성
    pub async fn get(&self, network: &ChainNetwork) -> OrchestratorResult<Arc<ChainClient>> {
        if let Some(client) = self.clients.read().await.get(&network.chain_id) {
            return Ok(client.clone());
        }

        let provider = Provider::<Http>::try_from(network.rpc_url.as_str()).map_err(|e| rpc_error(network, e))?;
        let client = Arc::new(ChainClient {
            provider: Arc::new(provider),
            limiter: EndpointLimiter::with_defaults(&network.name),
        });
        debug!("🔌 RPC provider 생성: {} ({})", network.name, network.rpc_url);

        let mut clients = self.clients.write().await;
        Ok(clients.entry(network.chain_id).or_insert(client).clone())
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// 공유 `ChainClients` 위의 ethers 조회기
pub struct EthersChainReader {
    clients: Arc<ChainClients>,
    erc20: Abi,
}

impl EthersChainReader {
    pub fn new(clients: Arc<ChainClients>) -> OrchestratorResult<Self> {
        let erc20: Abi = serde_json::from_str(ERC20_READ_ABI).map_err(|e| OrchestratorError::Rpc {
            chain: "-".to_string(),
            message: format!("ERC-20 ABI: {}", e),
        })?;
        Ok(Self { clients, erc20 })
    }
}

pub(crate) fn rpc_error(network: &ChainNetwork, error: impl std::fmt::Display) -> OrchestratorError {
    OrchestratorError::Rpc {
        chain: network.name.clone(),
        message: error.to_string(),
    }
}

#[async_trait]
impl ChainReader for EthersChainReader {
    async fn native_balance(&self, network: &ChainNetwork, owner: Address) -> OrchestratorResult<U256> {
        let client = self.clients.get(network).await?;
        let _permit = client.limiter.acquire().await;
        let balance = client
            .provider
            .get_balance(to_h160(owner), None)
            .await
            .map_err(|e| rpc_error(network, e))?;
        Ok(from_ethers_u256(balance))
    }

    async fn token_balance(&self, network: &ChainNetwork, token: Address, owner: Address) -> OrchestratorResult<U256> {
        let client = self.clients.get(network).await?;
        let _permit = client.limiter.acquire().await;
        let contract = Contract::new(to_h160(token), self.erc20.clone(), client.provider.clone());
        let balance: EthersU256 = contract
            .method::<_, EthersU256>("balanceOf", to_h160(owner))
            .map_err(|e| rpc_error(network, e))?
            .call()
            .await
            .map_err(|e| rpc_error(network, e))?;
        Ok(from_ethers_u256(balance))
    }

    async fn token_decimals(&self, network: &ChainNetwork, token: Address) -> OrchestratorResult<u8> {
        let client = self.clients.get(network).await?;
        let _permit = client.limiter.acquire().await;
        let contract = Contract::new(to_h160(token), self.erc20.clone(), client.provider.clone());
        contract
            .method::<_, u8>("decimals", ())
            .map_err(|e| rpc_error(network, e))?
            .call()
            .await
            .map_err(|e| rpc_error(network, e))
    }
}

/// 한 체인의 자산 하나 잔액
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetBalance {
    pub chain: String,
    pub asset: Asset,
    pub raw: U256,
    pub formatted: String,
}

/// 렌딩 프로토콜에 공급된 수량
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LendingPosition {
    pub chain: String,
    pub protocol: LendingProtocol,
    pub asset: Asset,
    pub raw: U256,
    pub formatted: String,
}

/// 등록된 모든 체인에 대한 잔액/포지션 조회
pub struct BalanceReader {
    registry: ChainRegistry,
    reader: Arc<dyn ChainReader>,
    wallets: Arc<dyn WalletDirectory>,
}

impl BalanceReader {
    pub fn new(registry: ChainRegistry, reader: Arc<dyn ChainReader>, wallets: Arc<dyn WalletDirectory>) -> Self {
        Self {
            registry,
            reader,
            wallets,
        }
    }

    /// `owner` 의 한 체인, 한 자산 잔액
    pub async fn balance(&self, owner: &str, network: &str, asset: Asset) -> OrchestratorResult<AssetBalance> {
        let network = self.registry.resolve(network)?;
        let wallet = self.wallets.resolve(owner, network)?;
        self.read_asset(network, wallet.address, asset).await
    }

    async fn read_asset(&self, network: &ChainNetwork, holder: Address, asset: Asset) -> OrchestratorResult<AssetBalance> {
        let (raw, decimals) = match asset {
            Asset::Eth => (self.reader.native_balance(network, holder).await?, asset.decimals()),
            Asset::Usdc => self.read_token(network, network.usdc()?, holder).await?,
        };
        Ok(AssetBalance {
            chain: network.name.clone(),
            asset,
            raw,
            formatted: format_units(raw, decimals),
        })
    }

    // 잔액과 decimals 를 동시에 조회
    async fn read_token(&self, network: &ChainNetwork, token: Address, holder: Address) -> OrchestratorResult<(U256, u32)> {
        let (raw, decimals) = try_join(
            self.reader.token_balance(network, token, holder),
            self.reader.token_decimals(network, token),
        )
        .await?;
        Ok((raw, u32::from(decimals)))
    }

    /// `owner` 지갑이 있는 모든 체인의 네이티브 + USDC 를 동시에 조회.
    /// RPC 가 실패한 체인은 로그만 남기고 건너뜀
    pub async fn wallet_balances(&self, owner: &str) -> Vec<AssetBalance> {
        let mut lookups = Vec::new();
        for network in self.registry.all() {
            let Ok(wallet) = self.wallets.resolve(owner, network) else {
                continue;
            };
            let holder = wallet.address;
            for asset in Asset::all() {
                lookups.push(async move { (network, asset, self.read_asset(network, holder, asset).await) });
            }
        }

        let mut balances = Vec::new();
        for (network, asset, result) in join_all(lookups).await {
            match result {
                Ok(balance) => balances.push(balance),
                Err(e) => warn!("⚠️ {} {} 잔액 조회 실패: {}", network.name, asset, e),
            }
        }
        info!("💰 {} 잔액 {}건 조회", owner, balances.len());
        balances
    }

    /// 체인별 Aave aToken, Compound comet 잔액
    pub async fn lending_positions(&self, owner: &str) -> Vec<LendingPosition> {
        let mut lookups = Vec::new();
        for network in self.registry.all() {
            let Ok(wallet) = self.wallets.resolve(owner, network) else {
                continue;
            };

            let sources = [
                (LendingProtocol::Aave, Asset::Eth, network.contracts.aave_aweth),
                (LendingProtocol::Aave, Asset::Usdc, network.contracts.aave_ausdc),
                (LendingProtocol::Compound, Asset::Eth, network.contracts.compound_weth_comet),
                (LendingProtocol::Compound, Asset::Usdc, network.contracts.compound_usdc_comet),
            ];
            for (protocol, asset, token) in sources {
                let Some(token) = token else { continue };
                let holder = wallet.address;
                lookups.push(async move {
                    let result = self.read_token(network, token, holder).await;
                    (network, protocol, asset, result)
                });
            }
        }

        let mut positions = Vec::new();
        for (network, protocol, asset, result) in join_all(lookups).await {
            match result {
                Ok((raw, decimals)) => positions.push(LendingPosition {
                    chain: network.name.clone(),
                    protocol,
                    asset,
                    raw,
                    formatted: format_units(raw, decimals),
                }),
                Err(e) => warn!("⚠️ {} {} {} 포지션 조회 실패: {}", network.name, protocol, asset, e),
            }
        }
        positions
    }
}
