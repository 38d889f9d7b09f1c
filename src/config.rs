use std::collections::HashMap;
use std::env;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::blockchain::registry::{ChainRegistry, ContractAddresses};
use crate::bridges::mint_policy::{MintPolicy, MintStrategy};
use crate::constants::*;
use crate::execution::submitter::PollPolicy;
use crate::storage::InMemoryWalletDirectory;
use crate::utils::rate_limit::EndpointLimiter;
use crate::utils::validation::parse_address;

/// 내장 체인 테이블에 대한 덮어쓰기 또는 추가. 이름, 별칭, 체인 ID 로 매칭하며
/// 비워 둔 필드는 내장 값을 유지한다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub name: String,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub cctp_domain: Option<u32>,
    /// 관리형 지갑 API 가 쓰는 블록체인 식별자 ("BASE-SEPOLIA")
    #[serde(default)]
    pub wallet_blockchain: Option<String>,
    #[serde(default)]
    pub rpc_url: Option<String>,
    #[serde(default)]
    pub supports_batch: Option<bool>,
    #[serde(default)]
    pub contracts: ContractAddresses,
}

/// 관리형 지갑 하나: 체인별 소유자
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub owner: String,
    pub network: String,
    pub wallet_id: String,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleConfig {
    pub base_url: String,
    pub api_key: String,
    /// 사전 등록된 entity secret 암호문
    pub entity_secret_ciphertext: String,
    pub max_in_flight: usize,
    pub min_spacing_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for CircleConfig {
    fn default() -> Self {
        Self {
            base_url: CIRCLE_API_BASE_URL.to_string(),
            api_key: String::new(),
            entity_secret_ciphertext: String::new(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            min_spacing_ms: DEFAULT_MIN_SPACING.as_millis() as u64,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationConfig {
    pub base_url: String,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
    pub max_in_flight: usize,
    pub min_spacing_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            base_url: IRIS_SANDBOX_BASE_URL.to_string(),
            poll_interval_secs: ATTESTATION_POLL_INTERVAL.as_secs(),
            timeout_secs: ATTESTATION_POLL_TIMEOUT.as_secs(),
            max_in_flight: 4,
            min_spacing_ms: 250,
            request_timeout_secs: 30,
        }
    }
}

/// 관리형 지갑 트랜잭션 상태 폴링
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    pub timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: TX_POLL_INTERVAL.as_millis() as u64,
            timeout_secs: TX_POLL_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub finality_threshold: u32,
    /// 목적지 네트워크 -> "managed_wallet" | "relayer"
    pub mint_policy: HashMap<String, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let mut mint_policy = HashMap::new();
        mint_policy.insert("linea sepolia".to_string(), MintStrategy::Relayer.to_string());
        Self {
            finality_threshold: DEFAULT_FINALITY_THRESHOLD,
            mint_policy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayerConfig {
    pub private_key: Option<String>,
    pub confirmation_timeout_secs: u64,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            confirmation_timeout_secs: RELAYER_CONFIRMATION_TIMEOUT.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub circle: CircleConfig,
    pub attestation: AttestationConfig,
    pub polling: PollingConfig,
    pub bridge: BridgeConfig,
    pub relayer: RelayerConfig,
    pub networks: Vec<NetworkConfig>,
    pub wallets: Vec<WalletConfig>,
    pub monitoring: MonitoringConfig,
}

const DEFAULT_CONFIG_PATH: &str = "config/default";
const ENV_PREFIX: &str = "CROSSLEND";

impl Config {
    /// `.env`, TOML 파일 (경로가 없으면 선택적인 `config/default.toml`),
    /// 그다음 `CROSSLEND__SECTION__KEY` 환경 변수 순으로 적용
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("⚠️ .env 로드 실패: {}", e);
            }
        }

        let file = match path {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_PATH).required(false),
        };

        let mut cfg: Config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration ({})", path.unwrap_or(DEFAULT_CONFIG_PATH)))?
            .try_deserialize()
            .context("invalid configuration")?;

        cfg.apply_legacy_env();
        info!("⚙️ 설정 로드 완료: {}개 네트워크 오버라이드, {}개 지갑", cfg.networks.len(), cfg.wallets.len());
        Ok(cfg)
    }

    /// `CIRCLE_API_KEY` 형식의 기존 변수로 비어 있는 값을 채운다
    fn apply_legacy_env(&mut self) {
        if self.circle.api_key.is_empty() {
            if let Ok(key) = env::var("CIRCLE_API_KEY") {
                self.circle.api_key = key;
            }
        }
        if self.circle.entity_secret_ciphertext.is_empty() {
            if let Ok(ciphertext) = env::var("CIRCLE_ENTITY_SECRET_CIPHERTEXT") {
                self.circle.entity_secret_ciphertext = ciphertext;
            }
        }
        if self.relayer.private_key.is_none() {
            self.relayer.private_key = env::var("RELAYER_PRIVATE_KEY").ok().filter(|k| !k.is_empty());
        }
    }

    /// 구조 검증. 여기서의 실패는 모두 시작 시 치명적
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_ms == 0 {
            return Err(anyhow!("polling.interval_ms must be greater than 0"));
        }
        if self.polling.timeout_secs * 1000 < self.polling.interval_ms {
            return Err(anyhow!("polling.timeout_secs must cover at least one poll interval"));
        }
        if self.attestation.poll_interval_secs == 0 {
            return Err(anyhow!("attestation.poll_interval_secs must be greater than 0"));
        }
        if self.attestation.timeout_secs < self.attestation.poll_interval_secs {
            return Err(anyhow!("attestation.timeout_secs must cover at least one poll interval"));
        }
        if self.bridge.finality_threshold == 0 {
            return Err(anyhow!("bridge.finality_threshold must be greater than 0"));
        }
        if self.circle.max_in_flight == 0 || self.attestation.max_in_flight == 0 {
            return Err(anyhow!("max_in_flight must be greater than 0"));
        }

        let registry = self.registry()?;
        let policy = self.mint_policy(&registry)?;
        self.wallet_directory(&registry)?;

        if let Some(key) = &self.relayer.private_key {
            let hex_key = key.trim_start_matches("0x");
            if hex_key.len() != 64 || hex::decode(hex_key).is_err() {
                return Err(anyhow!("relayer.private_key must be 32 hex-encoded bytes"));
            }
        } else if policy.uses_relayer() {
            warn!("⚠️ relayer 민트 정책이 있지만 relayer.private_key가 없습니다");
        }

        Ok(())
    }

    /// 실제 서비스 연동에 필요한 자격 증명 검증
    pub fn validate_credentials(&self) -> Result<()> {
        if self.circle.api_key.trim().is_empty() {
            return Err(anyhow!("circle.api_key must be configured"));
        }
        if self.circle.entity_secret_ciphertext.trim().is_empty() {
            return Err(anyhow!("circle.entity_secret_ciphertext must be configured"));
        }
        let registry = self.registry()?;
        if self.mint_policy(&registry)?.uses_relayer() && self.relayer.private_key.is_none() {
            return Err(anyhow!("mint policy uses the relayer but relayer.private_key is not set"));
        }
        Ok(())
    }

    pub fn registry(&self) -> Result<ChainRegistry> {
        ChainRegistry::with_overrides(&self.networks).context("invalid [[networks]] override")
    }

    pub fn mint_policy(&self, registry: &ChainRegistry) -> Result<MintPolicy> {
        let mut policy = MintPolicy::managed_only();
        for (network, strategy) in &self.bridge.mint_policy {
            let chain = registry
                .resolve(network)
                .with_context(|| format!("bridge.mint_policy: unknown network {}", network))?;
            let strategy: MintStrategy = strategy
                .parse()
                .with_context(|| format!("bridge.mint_policy.{}", network))?;
            policy = policy.with(chain.chain_id, strategy);
        }
        Ok(policy)
    }

    pub fn wallet_directory(&self, registry: &ChainRegistry) -> Result<InMemoryWalletDirectory> {
        for wallet in &self.wallets {
            parse_address(&wallet.address)
                .with_context(|| format!("wallet {} on {}: bad address", wallet.owner, wallet.network))?;
        }
        InMemoryWalletDirectory::from_config(&self.wallets, registry).context("invalid [[wallets]] entry")
    }

    pub fn tx_poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.polling.interval_ms),
            timeout: Duration::from_secs(self.polling.timeout_secs),
        }
    }

    pub fn attestation_poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.attestation.poll_interval_secs),
            timeout: Duration::from_secs(self.attestation.timeout_secs),
        }
    }

    pub fn circle_limiter(&self) -> EndpointLimiter {
        EndpointLimiter::new(
            "circle",
            self.circle.max_in_flight,
            Duration::from_millis(self.circle.min_spacing_ms),
        )
    }

    pub fn attestation_limiter(&self) -> EndpointLimiter {
        EndpointLimiter::new(
            "iris",
            self.attestation.max_in_flight,
            Duration::from_millis(self.attestation.min_spacing_ms),
        )
    }

    pub fn relayer_confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.relayer.confirmation_timeout_secs)
    }

    #[cfg(test)]
    pub fn load_test_config() -> Self {
        let mut config = Self::default();
        config.circle.api_key = "TEST_API_KEY:abc:def".to_string();
        config.circle.entity_secret_ciphertext = "c2VjcmV0".to_string();
        config.relayer.private_key =
            Some("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string());
        config.wallets = vec![WalletConfig {
            owner: "alice".to_string(),
            network: "base".to_string(),
            wallet_id: "w-base".to_string(),
            address: "0x1111111111111111111111111111111111111111".to_string(),
        }];
        config
    }
}
