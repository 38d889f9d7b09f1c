use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::blockchain::registry::ChainRegistry;
use crate::blockchain::relayer::{EthersRelayer, RelayerClient};
use crate::blockchain::rpc::{BalanceReader, ChainClients, ChainReader, EthersChainReader};
use crate::bridges::attestation::{AttestationRetriever, IrisAttestationClient};
use crate::bridges::cctp::{CctpTransferOrchestrator, MintReceipt};
use crate::bridges::mint_policy::MintPolicy;
use crate::bridges::traits::AttestationSource;
use crate::config::Config;
use crate::error::{EncodingError, OrchestratorError, OrchestratorResult};
use crate::execution::submitter::{PollPolicy, Submission, TransactionSubmitter};
use crate::execution::wallet_api::{CircleWalletClient, ManagedWalletApi, StaticCiphertext};
use crate::mocks::{MockAttestationSource, MockChainReader, MockRelayer, MockWalletApi};
use crate::protocols::lending::LendingOrchestrator;
use crate::storage::WalletDirectory;
use crate::types::{
    Asset, Operation, OperationKind, OperationOutcome, TransferRequest, TxHandle, TxState,
};
use crate::utils::abi::CallEncoder;
use crate::utils::math::to_base_units;
use crate::utils::validation::parse_address;

/// 엔진이 사용하는 외부 서비스
pub struct EngineServices {
    pub wallet_api: Arc<dyn ManagedWalletApi>,
    pub attestations: Arc<dyn AttestationSource>,
    pub relayer: Option<Arc<dyn RelayerClient>>,
    pub chain_reader: Arc<dyn ChainReader>,
}

impl EngineServices {
    /// 프로세스 내 대체 구현: 모든 트랜잭션이 확정되고 attestation 은
    /// 두 번째 조회에서 준비됨
    pub fn mock() -> Self {
        Self {
            wallet_api: Arc::new(MockWalletApi::new()),
            attestations: Arc::new(MockAttestationSource::complete_after(1)),
            relayer: Some(Arc::new(MockRelayer::new())),
            chain_reader: Arc::new(MockChainReader::new()),
        }
    }

    /// Circle 지갑, Iris attestation, ethers RPC
    pub fn live(config: &Config) -> Result<Self> {
        config.validate_credentials()?;

        let wallet_api = CircleWalletClient::new(
            &config.circle.base_url,
            &config.circle.api_key,
            Box::new(StaticCiphertext::new(config.circle.entity_secret_ciphertext.clone())),
            config.circle_limiter(),
            Duration::from_secs(config.circle.request_timeout_secs),
        )
        .context("failed to build managed-wallet client")?;

        let attestations = IrisAttestationClient::new(
            &config.attestation.base_url,
            config.attestation_limiter(),
            Duration::from_secs(config.attestation.request_timeout_secs),
        )
        .context("failed to build attestation client")?;

        // 잔액 조회와 relayer 가 체인별 provider, limiter 를 공유
        let chain_clients = Arc::new(ChainClients::new());
        let relayer: Option<Arc<dyn RelayerClient>> = match &config.relayer.private_key {
            Some(key) => Some(Arc::new(
                EthersRelayer::new(key, chain_clients.clone(), config.relayer_confirmation_timeout())
                    .context("invalid relayer key")?,
            )),
            None => None,
        };

        Ok(Self {
            wallet_api: Arc::new(wallet_api),
            attestations: Arc::new(attestations),
            relayer,
            chain_reader: Arc::new(EthersChainReader::new(chain_clients)?),
        })
    }
}

/// 단일 진입점: 작업 하나를 실행하고 항상
/// `OperationOutcome` 으로 응답
pub struct OperationEngine {
    registry: ChainRegistry,
    encoder: CallEncoder,
    submitter: Arc<TransactionSubmitter>,
    wallets: Arc<dyn WalletDirectory>,
    bridge: CctpTransferOrchestrator,
    lending: LendingOrchestrator,
    balances: BalanceReader,
}

impl OperationEngine {
    pub fn new(
        registry: ChainRegistry,
        encoder: CallEncoder,
        wallets: Arc<dyn WalletDirectory>,
        mint_policy: MintPolicy,
        services: EngineServices,
        tx_policy: PollPolicy,
        attestation_policy: PollPolicy,
    ) -> Self {
        let submitter = Arc::new(TransactionSubmitter::new(services.wallet_api, encoder, tx_policy));
        let retriever = Arc::new(AttestationRetriever::new(services.attestations, attestation_policy));

        let bridge = CctpTransferOrchestrator::new(
            registry.clone(),
            encoder,
            submitter.clone(),
            retriever,
            wallets.clone(),
            mint_policy,
            services.relayer,
        );
        let lending = LendingOrchestrator::new(registry.clone(), encoder, submitter.clone(), wallets.clone());
        let balances = BalanceReader::new(registry.clone(), services.chain_reader, wallets.clone());

        Self {
            registry,
            encoder,
            submitter,
            wallets,
            bridge,
            lending,
            balances,
        }
    }

    pub fn from_config(config: &Config, mock: bool) -> Result<Self> {
        config.validate()?;

        let registry = config.registry()?;
        let wallets = Arc::new(config.wallet_directory(&registry)?);
        let mint_policy = config.mint_policy(&registry)?;
        let services = if mock {
            info!("🎭 Mock 모드로 엔진 구성");
            EngineServices::mock()
        } else {
            EngineServices::live(config)?
        };

        info!("🔧 OperationEngine 초기화: {}개 체인, {}개 지갑", registry.len(), wallets.len());
        Ok(Self::new(
            registry,
            CallEncoder::with_finality_threshold(config.bridge.finality_threshold),
            wallets,
            mint_policy,
            services,
            config.tx_poll_policy(),
            config.attestation_poll_policy(),
        ))
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn balances(&self) -> &BalanceReader {
        &self.balances
    }

    pub async fn execute(&self, operation: Operation, cancel: &CancellationToken) -> OperationOutcome {
        let kind = operation.kind();
        info!("🚀 {} 시작", kind);

        let outcome = match &operation {
            Operation::CctpBridge(request) => match self.bridge.transfer(request, cancel).await {
                Ok(receipt) => {
                    let relayed_tx_hash = match &receipt.mint {
                        MintReceipt::Relayer { tx_hash } => Some(tx_hash.clone()),
                        MintReceipt::ManagedWallet(_) => None,
                    };
                    OperationOutcome::Succeeded {
                        kind,
                        transactions: receipt.transactions(),
                        relayed_tx_hash,
                        stages: receipt.history.iter().map(|r| r.stage.to_string()).collect(),
                    }
                }
                Err(failure) => {
                    if let Some(burn) = &failure.burn_tx_hash {
                        error!(burn_tx_hash = %burn, "🔥 소각 완료 후 실패: 수동 정산 필요");
                    }
                    OperationOutcome::Failed {
                        kind,
                        reason: failure.to_string(),
                        last_stage: failure.stage.as_str().to_string(),
                        last_tx: failure.last_tx,
                    }
                }
            },
            Operation::Transfer(request) => settle(kind, self.transfer(request, cancel).await),
            Operation::LendSupply(request) => settle(
                kind,
                self.lending.supply(request, cancel).await.map(|r| r.transactions),
            ),
            Operation::LendWithdraw(request) => settle(
                kind,
                self.lending.withdraw(request, cancel).await.map(|r| r.transactions),
            ),
        };

        match &outcome {
            OperationOutcome::Succeeded { .. } => info!("✅ {} 완료", kind),
            OperationOutcome::Failed { reason, .. } => warn!("❌ {} 실패: {}", kind, reason),
        }
        outcome
    }

    /// 네이티브 자산은 지갑 전송 엔드포인트로, USDC 는 ERC-20
    /// `transfer` 호출로
    async fn transfer(&self, request: &TransferRequest, cancel: &CancellationToken) -> OrchestratorResult<Vec<TxHandle>> {
        let network = self.registry.resolve(&request.network)?;
        let destination = parse_address(&request.destination)?;
        let amount = to_base_units(request.amount, request.asset.decimals())?;
        let wallet = self.wallets.resolve(&request.owner, network)?;

        let handle = match request.asset {
            Asset::Eth => {
                let blockchain = network
                    .wallet_blockchain
                    .as_deref()
                    .ok_or_else(|| EncodingError::MissingAddress {
                        chain: network.name.clone(),
                        contract: "wallet blockchain id",
                    })?;
                self.submitter
                    .submit_native_transfer(&wallet, blockchain, destination, &request.amount.normalize().to_string(), cancel)
                    .await?
            }
            Asset::Usdc => {
                let step = self.encoder.erc20_transfer(network.usdc()?, destination, amount);
                self.submitter.submit(&Submission::Call(step), &wallet, cancel).await?
            }
        };
        Ok(vec![handle])
    }
}

/// 단일 단계 작업: 단계 이력 없음. 지갑 API 에 무언가 도달하기 전까지
/// 실패 단계는 INIT
fn settle(kind: OperationKind, result: OrchestratorResult<Vec<TxHandle>>) -> OperationOutcome {
    match result {
        Ok(transactions) => OperationOutcome::Succeeded {
            kind,
            transactions,
            relayed_tx_hash: None,
            stages: Vec::new(),
        },
        Err(e) => {
            let last_stage = match &e {
                OrchestratorError::Encoding(_)
                | OrchestratorError::WalletNotFound { .. }
                | OrchestratorError::InvalidOperation(_) => "INIT",
                _ => "SUBMITTED",
            };
            OperationOutcome::Failed {
                kind,
                reason: e.to_string(),
                last_stage: last_stage.to_string(),
                last_tx: failed_handle(&e),
            }
        }
    }
}

fn failed_handle(error: &OrchestratorError) -> Option<TxHandle> {
    match error {
        OrchestratorError::Execution { tx_id, state, .. } => {
            let mut handle = TxHandle::submitted(tx_id.clone());
            handle.advance(TxState::Failed(state.clone()));
            Some(handle)
        }
        OrchestratorError::PartialSequenceFailure { source, .. } => failed_handle(source),
        _ => None,
    }
}
