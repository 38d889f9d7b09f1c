use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::constants::*;
use crate::error::EncodingError;

/// 한 체인에 배포된 컨트랙트 주소. 모두 선택 항목이며
/// `ChainNetwork` 의 접근자가 빈 값을 `MissingAddress` 로 바꾼다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub usdc: Option<Address>,
    pub token_messenger: Option<Address>,
    pub message_transmitter: Option<Address>,
    pub aave_pool: Option<Address>,
    pub aave_weth_gateway: Option<Address>,
    pub aave_aweth: Option<Address>,
    pub aave_ausdc: Option<Address>,
    pub compound_usdc_comet: Option<Address>,
    pub compound_weth_comet: Option<Address>,
    pub weth: Option<Address>,
}

impl ContractAddresses {
    /// 비어 있는 칸을 `other` 로 채움
    fn merge_from(&mut self, other: &ContractAddresses) {
        macro_rules! take {
            ($($field:ident),*) => {
                $( if other.$field.is_some() { self.$field = other.$field; } )*
            };
        }
        take!(
            usdc,
            token_messenger,
            message_transmitter,
            aave_pool,
            aave_weth_gateway,
            aave_aweth,
            aave_ausdc,
            compound_usdc_comet,
            compound_weth_comet,
            weth
        );
    }
}

/// 지원 체인 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainNetwork {
    /// 논리 이름, 예: "base sepolia"
    pub name: String,
    pub aliases: Vec<String>,
    pub chain_id: u64,
    /// CCTP 도메인. 브리지 불가 체인은 None
    pub cctp_domain: Option<u32>,
    /// 관리형 지갑 블록체인 코드, 예: "BASE-SEPOLIA"
    pub wallet_blockchain: Option<String>,
    pub rpc_url: String,
    /// 이 체인의 관리형 지갑이 executeBatch 를 받는지
    pub supports_batch: bool,
    pub contracts: ContractAddresses,
}

impl ChainNetwork {
    fn require(&self, value: Option<Address>, contract: &'static str) -> Result<Address, EncodingError> {
        value.ok_or_else(|| EncodingError::MissingAddress {
            chain: self.name.clone(),
            contract,
        })
    }

    pub fn usdc(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.usdc, "USDC")
    }

    pub fn token_messenger(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.token_messenger, "CCTP TokenMessenger")
    }

    pub fn message_transmitter(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.message_transmitter, "CCTP MessageTransmitter")
    }

    pub fn aave_pool(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.aave_pool, "aave pool")
    }

    pub fn aave_weth_gateway(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.aave_weth_gateway, "aave WETH gateway")
    }

    pub fn aave_aweth(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.aave_aweth, "aave aWETH")
    }

    pub fn aave_ausdc(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.aave_ausdc, "aave aUSDC")
    }

    pub fn compound_usdc_comet(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.compound_usdc_comet, "compound USDC comet")
    }

    pub fn compound_weth_comet(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.compound_weth_comet, "compound WETH comet")
    }

    pub fn weth(&self) -> Result<Address, EncodingError> {
        self.require(self.contracts.weth, "WETH")
    }

    pub fn cctp_domain(&self) -> Result<u32, EncodingError> {
        self.cctp_domain.ok_or_else(|| EncodingError::MissingAddress {
            chain: self.name.clone(),
            contract: "CCTP domain",
        })
    }

    fn matches(&self, key: &str) -> bool {
        self.name == key || self.aliases.iter().any(|a| a == key)
    }
}

/// 지원 체인의 불변 조회 테이블. 시작 시 한 번 만들고
/// `Arc` 뒤에서 공유한다.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    networks: Arc<Vec<ChainNetwork>>,
    by_chain_id: Arc<HashMap<u64, usize>>,
}

impl ChainRegistry {
    pub fn new(networks: Vec<ChainNetwork>) -> Self {
        let by_chain_id = networks
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.chain_id, idx))
            .collect();
        Self {
            networks: Arc::new(networks),
            by_chain_id: Arc::new(by_chain_id),
        }
    }

    /// 내장 Sepolia 테스트넷 테이블
    pub fn testnet() -> Self {
        Self::new(testnet_networks())
    }

    /// 설정 덮어쓰기가 적용된 테스트넷 테이블. 체인 ID 나 이름이 기존 항목과
    /// 일치하면 지정한 필드만 바꾸고, 그 밖의 항목은
    /// 새 체인으로 추가한다.
    pub fn with_overrides(overrides: &[NetworkConfig]) -> Result<Self, EncodingError> {
        let mut networks = testnet_networks();

        for cfg in overrides {
            let key = cfg.name.trim().to_lowercase();
            let existing = networks
                .iter_mut()
                .find(|n| Some(n.chain_id) == cfg.chain_id || n.matches(&key));

            match existing {
                Some(network) => {
                    debug!("🔧 네트워크 설정 덮어쓰기: {}", network.name);
                    apply_override(network, cfg);
                }
                None => {
                    let chain_id = cfg.chain_id.ok_or_else(|| {
                        EncodingError::UnknownNetwork(format!("{} (new network needs chain_id)", cfg.name))
                    })?;
                    let mut network = ChainNetwork {
                        name: key,
                        aliases: Vec::new(),
                        chain_id,
                        cctp_domain: None,
                        wallet_blockchain: None,
                        rpc_url: String::new(),
                        supports_batch: true,
                        contracts: ContractAddresses::default(),
                    };
                    apply_override(&mut network, cfg);
                    info!("➕ 네트워크 추가: {} ({})", network.name, network.chain_id);
                    networks.push(network);
                }
            }
        }

        Ok(Self::new(networks))
    }

    /// 논리 이름, 별칭 (대소문자 무시) 또는 숫자 체인 ID 문자열로 조회
    pub fn resolve(&self, name: &str) -> Result<&ChainNetwork, EncodingError> {
        let key = name.trim().to_lowercase();
        if let Some(network) = self.networks.iter().find(|n| n.matches(&key)) {
            return Ok(network);
        }
        if let Ok(chain_id) = key.parse::<u64>() {
            if let Some(network) = self.by_chain_id(chain_id) {
                return Ok(network);
            }
        }
        Err(EncodingError::UnknownNetwork(name.to_string()))
    }

    pub fn by_chain_id(&self, chain_id: u64) -> Option<&ChainNetwork> {
        self.by_chain_id
            .get(&chain_id)
            .and_then(|idx| self.networks.get(*idx))
    }

    pub fn all(&self) -> &[ChainNetwork] {
        &self.networks
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

fn apply_override(network: &mut ChainNetwork, cfg: &NetworkConfig) {
    if let Some(chain_id) = cfg.chain_id {
        network.chain_id = chain_id;
    }
    for alias in &cfg.aliases {
        let alias = alias.trim().to_lowercase();
        if !network.aliases.contains(&alias) {
            network.aliases.push(alias);
        }
    }
    if cfg.cctp_domain.is_some() {
        network.cctp_domain = cfg.cctp_domain;
    }
    if cfg.wallet_blockchain.is_some() {
        network.wallet_blockchain = cfg.wallet_blockchain.clone();
    }
    if let Some(rpc_url) = &cfg.rpc_url {
        network.rpc_url = rpc_url.clone();
    }
    if let Some(supports_batch) = cfg.supports_batch {
        network.supports_batch = supports_batch;
    }
    network.contracts.merge_from(&cfg.contracts);
}

fn cctp_contracts(usdc: Address) -> ContractAddresses {
    ContractAddresses {
        usdc: Some(usdc),
        token_messenger: Some(TOKEN_MESSENGER_V2),
        message_transmitter: Some(MESSAGE_TRANSMITTER_V2),
        ..Default::default()
    }
}

fn network(
    name: &str,
    aliases: &[&str],
    chain_id: u64,
    domain: u32,
    wallet_blockchain: Option<&str>,
    rpc_url: &str,
    contracts: ContractAddresses,
) -> ChainNetwork {
    ChainNetwork {
        name: name.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        chain_id,
        cctp_domain: Some(domain),
        wallet_blockchain: wallet_blockchain.map(str::to_string),
        rpc_url: rpc_url.to_string(),
        supports_batch: true,
        contracts,
    }
}

fn testnet_networks() -> Vec<ChainNetwork> {
    vec![
        network(
            "ethereum sepolia",
            &["ethereum", "eth sepolia", "sepolia"],
            ETH_SEPOLIA_CHAIN_ID,
            ETH_SEPOLIA_DOMAIN,
            Some("ETH-SEPOLIA"),
            ETH_SEPOLIA_RPC,
            ContractAddresses {
                aave_pool: Some(AAVE_POOL_ETH_SEPOLIA),
                ..cctp_contracts(USDC_ETH_SEPOLIA)
            },
        ),
        network(
            "avalanche fuji",
            &["avalanche", "avax", "fuji"],
            AVAX_FUJI_CHAIN_ID,
            AVAX_FUJI_DOMAIN,
            Some("AVAX-FUJI"),
            AVAX_FUJI_RPC,
            cctp_contracts(USDC_AVAX_FUJI),
        ),
        network(
            "base sepolia",
            &["base"],
            BASE_SEPOLIA_CHAIN_ID,
            BASE_SEPOLIA_DOMAIN,
            Some("BASE-SEPOLIA"),
            BASE_SEPOLIA_RPC,
            ContractAddresses {
                compound_usdc_comet: Some(COMPOUND_USDC_COMET_BASE_SEPOLIA),
                compound_weth_comet: Some(COMPOUND_WETH_COMET_BASE_SEPOLIA),
                weth: Some(WETH_BASE_SEPOLIA),
                ..cctp_contracts(USDC_BASE_SEPOLIA)
            },
        ),
        network(
            "sonic blaze",
            &["sonic"],
            SONIC_BLAZE_CHAIN_ID,
            SONIC_BLAZE_DOMAIN,
            None,
            SONIC_BLAZE_RPC,
            cctp_contracts(USDC_SONIC_BLAZE),
        ),
        network(
            "linea sepolia",
            &["linea"],
            LINEA_SEPOLIA_CHAIN_ID,
            LINEA_SEPOLIA_DOMAIN,
            None,
            LINEA_SEPOLIA_RPC,
            cctp_contracts(USDC_LINEA_SEPOLIA),
        ),
        network(
            "arbitrum sepolia",
            &["arbitrum", "arb sepolia"],
            ARBITRUM_SEPOLIA_CHAIN_ID,
            ARBITRUM_SEPOLIA_DOMAIN,
            Some("ARB-SEPOLIA"),
            ARBITRUM_SEPOLIA_RPC,
            ContractAddresses {
                aave_pool: Some(AAVE_POOL_ARBITRUM_SEPOLIA),
                aave_weth_gateway: Some(AAVE_WETH_GATEWAY_ARBITRUM_SEPOLIA),
                aave_aweth: Some(AAVE_AWETH_ARBITRUM_SEPOLIA),
                aave_ausdc: Some(AAVE_AUSDC_ARBITRUM_SEPOLIA),
                ..cctp_contracts(USDC_ARBITRUM_SEPOLIA)
            },
        ),
        network(
            "optimism sepolia",
            &["optimism", "op sepolia"],
            OPTIMISM_SEPOLIA_CHAIN_ID,
            OPTIMISM_SEPOLIA_DOMAIN,
            Some("OP-SEPOLIA"),
            OPTIMISM_SEPOLIA_RPC,
            ContractAddresses {
                aave_pool: Some(AAVE_POOL_OPTIMISM_SEPOLIA),
                aave_weth_gateway: Some(AAVE_WETH_GATEWAY_OPTIMISM_SEPOLIA),
                aave_aweth: Some(AAVE_AWETH_OPTIMISM_SEPOLIA),
                aave_ausdc: Some(AAVE_AUSDC_OPTIMISM_SEPOLIA),
                ..cctp_contracts(USDC_OPTIMISM_SEPOLIA)
            },
        ),
    ]
}
