use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::attestation::AttestationRetriever;
use super::mint_policy::{MintPolicy, MintStrategy};
use super::state::{StageRecord, TransferStage, TransferStateMachine};
use crate::blockchain::registry::{ChainNetwork, ChainRegistry};
use crate::blockchain::relayer::RelayerClient;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::execution::submitter::{Submission, TransactionSubmitter};
use crate::storage::WalletDirectory;
use crate::types::{Asset, Attestation, Batch, BridgeRequest, TxHandle, WalletRef};
use crate::utils::abi::CallEncoder;
use crate::utils::math::to_base_units;

pub const REASON_VALIDATION: &str = "validation failed";
pub const REASON_APPROVAL: &str = "approval failed";
pub const REASON_BURN: &str = "burn failed";
pub const REASON_ATTESTATION: &str = "attestation failed";
pub const REASON_MINT: &str = "mint failed";

/// 목적지 체인에서 mint 가 처리된 방식
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MintReceipt {
    ManagedWallet(TxHandle),
    Relayer { tx_hash: String },
}

/// 완료된 전송
#[derive(Debug, Clone)]
pub struct TransferReceipt {
    /// 배치 미지원 체인에서의 별도 approve 트랜잭션
    pub approve: Option<TxHandle>,
    pub burn: TxHandle,
    pub attestation: Attestation,
    pub mint: MintReceipt,
    pub history: Vec<StageRecord>,
}

impl TransferReceipt {
    pub fn transactions(&self) -> Vec<TxHandle> {
        let mut handles: Vec<TxHandle> = self.approve.iter().cloned().collect();
        handles.push(self.burn.clone());
        if let MintReceipt::ManagedWallet(handle) = &self.mint {
            handles.push(handle.clone());
        }
        handles
    }
}

/// 실패한 전송: 도달한 단계, 중단 사유, 이미 온체인에 반영된 것
#[derive(Debug, Error)]
#[error("{reason}: {source}")]
pub struct TransferFailure {
    pub stage: TransferStage,
    pub reason: String,
    #[source]
    pub source: OrchestratorError,
    pub last_tx: Option<TxHandle>,
    /// 소각 이후 설정됨. 수동 정산에 필요
    pub burn_tx_hash: Option<String>,
    pub history: Vec<StageRecord>,
}

/// 첫 제출 전에 모두 해석된 값
struct TransferPlan<'a> {
    source: &'a ChainNetwork,
    destination: &'a ChainNetwork,
    burn_batch: Batch,
    source_wallet: WalletRef,
    mint: MintTarget,
}

enum MintTarget {
    Wallet(WalletRef),
    Relayer(Arc<dyn RelayerClient>),
}

/// approve -> burn -> attest -> mint
pub struct CctpTransferOrchestrator {
    registry: ChainRegistry,
    encoder: CallEncoder,
    submitter: Arc<TransactionSubmitter>,
    attestations: Arc<AttestationRetriever>,
    wallets: Arc<dyn WalletDirectory>,
    mint_policy: MintPolicy,
    relayer: Option<Arc<dyn RelayerClient>>,
}

impl CctpTransferOrchestrator {
    pub fn new(
        registry: ChainRegistry,
        encoder: CallEncoder,
        submitter: Arc<TransactionSubmitter>,
        attestations: Arc<AttestationRetriever>,
        wallets: Arc<dyn WalletDirectory>,
        mint_policy: MintPolicy,
        relayer: Option<Arc<dyn RelayerClient>>,
    ) -> Self {
        Self {
            registry,
            encoder,
            submitter,
            attestations,
            wallets,
            mint_policy,
            relayer,
        }
    }

    fn plan(&self, request: &BridgeRequest) -> OrchestratorResult<TransferPlan<'_>> {
        let source = self.registry.resolve(&request.source_network)?;
        let destination = self.registry.resolve(&request.destination_network)?;
        if source.chain_id == destination.chain_id {
            return Err(OrchestratorError::InvalidOperation(format!(
                "source and destination are both {}",
                source.name
            )));
        }

        let amount = to_base_units(request.amount, Asset::Usdc.decimals())?;
        let burn_batch = self
            .encoder
            .approve_and_burn(source, destination, amount, &request.destination)?;
        // 소각 이후가 아니라 지금 실패
        destination.message_transmitter()?;
        source.cctp_domain()?;

        let source_wallet = self.wallets.resolve(&request.owner, source)?;
        let mint = match self.mint_policy.strategy_for(destination.chain_id) {
            MintStrategy::ManagedWallet => MintTarget::Wallet(self.wallets.resolve(&request.owner, destination)?),
            MintStrategy::Relayer => match &self.relayer {
                Some(relayer) => MintTarget::Relayer(relayer.clone()),
                None => {
                    return Err(OrchestratorError::Relayer(format!(
                        "{} mints through the relayer but no relayer key is configured",
                        destination.name
                    )))
                }
            },
        };

        Ok(TransferPlan {
            source,
            destination,
            burn_batch,
            source_wallet,
            mint,
        })
    }

    pub async fn transfer(
        &self,
        request: &BridgeRequest,
        cancel: &CancellationToken,
    ) -> Result<TransferReceipt, TransferFailure> {
        let mut machine = TransferStateMachine::new();

        let plan = match self.plan(request) {
            Ok(plan) => plan,
            Err(e) => return Err(fail(&mut machine, REASON_VALIDATION, e, None, None)),
        };
        info!(
            from = %plan.source.name,
            to = %plan.destination.name,
            amount = %request.amount,
            "🌉 CCTP 전송 시작"
        );

        // Init -> Approved -> Burned
        let (approve, burn) = if plan.source.supports_batch {
            match self
                .submitter
                .submit(&Submission::Batch(plan.burn_batch.clone()), &plan.source_wallet, cancel)
                .await
            {
                Ok(handle) => {
                    advance(&mut machine, TransferStage::Approved);
                    advance(&mut machine, TransferStage::Burned);
                    (None, handle)
                }
                Err(e) => return Err(fail(&mut machine, REASON_BURN, e, None, None)),
            }
        } else {
            let steps = plan.burn_batch.steps();
            let approve = match self
                .submitter
                .submit(&Submission::Call(steps[0].clone()), &plan.source_wallet, cancel)
                .await
            {
                Ok(handle) => handle,
                Err(e) => return Err(fail(&mut machine, REASON_APPROVAL, e, None, None)),
            };
            advance(&mut machine, TransferStage::Approved);

            match self
                .submitter
                .submit(&Submission::Call(steps[1].clone()), &plan.source_wallet, cancel)
                .await
            {
                Ok(handle) => {
                    advance(&mut machine, TransferStage::Burned);
                    (Some(approve), handle)
                }
                Err(e) => {
                    let partial = OrchestratorError::PartialSequenceFailure {
                        completed: 1,
                        failed_step: 1,
                        source: Box::new(e),
                    };
                    return Err(fail(&mut machine, REASON_BURN, partial, Some(approve), None));
                }
            }
        };

        let Some(burn_hash) = burn.tx_hash.clone() else {
            let e = OrchestratorError::Submission(format!("burn {} confirmed without a tx hash", burn.tx_id));
            return Err(fail(&mut machine, REASON_ATTESTATION, e, Some(burn), None));
        };
        warn!(
            burn_tx_hash = %burn_hash,
            "🔒 burn 확정: 자금이 커밋됨, 이후 실패 시 수동 정산 필요"
        );

        // Burned -> Attested
        let domain = plan.source.cctp_domain.unwrap_or_default();
        let attestation = match self.attestations.retrieve(domain, &burn_hash, cancel).await {
            Ok(attestation) => attestation,
            Err(e) => {
                return Err(fail(&mut machine, REASON_ATTESTATION, e, Some(burn), Some(burn_hash)));
            }
        };
        advance(&mut machine, TransferStage::Attested);

        // Attested -> Minted
        let mint = match self.mint(&plan, &attestation, cancel).await {
            Ok(mint) => mint,
            Err(e) => return Err(fail(&mut machine, REASON_MINT, e, Some(burn), Some(burn_hash))),
        };
        advance(&mut machine, TransferStage::Minted);
        info!(to = %plan.destination.name, "🎉 CCTP 전송 완료");

        Ok(TransferReceipt {
            approve,
            burn,
            attestation,
            mint,
            history: machine.history().to_vec(),
        })
    }

    async fn mint(
        &self,
        plan: &TransferPlan<'_>,
        attestation: &Attestation,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<MintReceipt> {
        let step = self.encoder.receive_message(plan.destination, attestation)?;
        match &plan.mint {
            MintTarget::Wallet(wallet) => {
                let handle = self.submitter.submit(&Submission::Call(step), wallet, cancel).await?;
                Ok(MintReceipt::ManagedWallet(handle))
            }
            MintTarget::Relayer(relayer) => {
                info!(relayer = %relayer.address(), "📡 relayer로 mint 전송");
                let tx_hash = relayer.send_call(plan.destination, &step, cancel).await?;
                Ok(MintReceipt::Relayer { tx_hash })
            }
        }
    }
}

fn advance(machine: &mut TransferStateMachine, stage: TransferStage) {
    // 여기서는 항상 순서대로만 진행
    if let Err(e) = machine.transition(stage) {
        error!("❌ 상태 머신이 전이를 거부함: {}", e);
    }
}

fn fail(
    machine: &mut TransferStateMachine,
    reason: &str,
    source: OrchestratorError,
    last_tx: Option<TxHandle>,
    burn_tx_hash: Option<String>,
) -> TransferFailure {
    let stage = machine.current().clone();
    machine.fail(reason);
    error!(stage = %stage, "❌ CCTP 전송 실패 ({}): {}", reason, source);
    TransferFailure {
        stage,
        reason: reason.to_string(),
        source,
        last_tx,
        burn_tx_hash,
        history: machine.history().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::submitter::PollPolicy;
    use crate::mocks::{MockAttestationSource, MockRelayer, MockWalletApi};
    use crate::storage::InMemoryWalletDirectory;
    use crate::utils::abi::{IMessageTransmitterV2, ITokenMessengerV2, IBatchExecutor};
    use alloy::primitives::{address, Address};
    use alloy::sol_types::SolCall;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::time::Duration;

    const WALLET: Address = address!("5555555555555555555555555555555555555555");
    const RECIPIENT: &str = "0x6666666666666666666666666666666666666666";

    struct Harness {
        api: Arc<MockWalletApi>,
        attestations: Arc<MockAttestationSource>,
        relayer: Arc<MockRelayer>,
        orchestrator: CctpTransferOrchestrator,
    }

    fn harness(registry: ChainRegistry, with_relayer: bool) -> Harness {
        let api = Arc::new(MockWalletApi::new());
        let attestations = Arc::new(MockAttestationSource::complete_after(1));
        let relayer = Arc::new(MockRelayer::new());

        let mut directory = InMemoryWalletDirectory::new();
        for network in registry.all() {
            directory.insert("alice", network.chain_id, &format!("w-{}", network.chain_id), WALLET);
        }

        let fast = PollPolicy {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(5),
        };
        let submitter = Arc::new(TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast));
        let retriever = Arc::new(AttestationRetriever::new(attestations.clone(), fast));
        let relayer_client: Option<Arc<dyn RelayerClient>> = if with_relayer {
            Some(relayer.clone())
        } else {
            None
        };

        let orchestrator = CctpTransferOrchestrator::new(
            registry,
            CallEncoder::new(),
            submitter,
            retriever,
            Arc::new(directory),
            MintPolicy::default(),
            relayer_client,
        );
        Harness {
            api,
            attestations,
            relayer,
            orchestrator,
        }
    }

    fn request(from: &str, to: &str, amount: &str) -> BridgeRequest {
        BridgeRequest {
            source_network: from.to_string(),
            destination_network: to.to_string(),
            amount: Decimal::from_str(amount).unwrap(),
            owner: "alice".to_string(),
            destination: RECIPIENT.to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batched_transfer_reaches_minted() {
        let h = harness(ChainRegistry::testnet(), true);

        let receipt = h
            .orchestrator
            .transfer(&request("ethereum sepolia", "base", "1"), &CancellationToken::new())
            .await
            .unwrap();

        let stages: Vec<_> = receipt.history.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(stages, vec!["INIT", "APPROVED", "BURNED", "ATTESTED", "MINTED"]);
        assert!(receipt.approve.is_none());
        assert!(matches!(receipt.mint, MintReceipt::ManagedWallet(_)));

        let sent = h.api.executions();
        assert_eq!(sent.len(), 2);
        // 소각 배치는 지갑 자신으로, mint 는 transmitter 로
        assert_eq!(sent[0].contract_address, WALLET);
        let batch = IBatchExecutor::executeBatchCall::abi_decode_raw(&sent[0].call_data[4..]).unwrap();
        assert_eq!(batch.calls.len(), 2);
        let burn = ITokenMessengerV2::depositForBurnWithHookCall::abi_decode_raw(&batch.calls[1].data[4..]).unwrap();
        assert_eq!(burn.maxFee, alloy::primitives::U256::from(999_999u64));
        assert!(CallEncoder::matches::<IMessageTransmitterV2::receiveMessageCall>(&sent[1].call_data));

        // mint 는 목적지 지갑으로 제출
        assert_eq!(sent[1].wallet_id, format!("w-{}", crate::constants::BASE_SEPOLIA_CHAIN_ID));
        assert_eq!(h.attestations.last_domain(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_linea_mint_goes_through_relayer() {
        let h = harness(ChainRegistry::testnet(), true);

        let receipt = h
            .orchestrator
            .transfer(&request("base", "linea", "2.5"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(receipt.mint, MintReceipt::Relayer { .. }));
        assert_eq!(h.relayer.sent().len(), 1);
        // 관리형 지갑으로는 소각 배치만 나감
        assert_eq!(h.api.executions().len(), 1);
    }

    #[tokio::test]
    async fn test_relayer_missing_is_caught_before_burn() {
        let h = harness(ChainRegistry::testnet(), false);

        let failure = h
            .orchestrator
            .transfer(&request("base", "linea", "1"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.reason, REASON_VALIDATION);
        assert_eq!(failure.stage, TransferStage::Init);
        assert!(h.api.executions().is_empty());
    }

    #[tokio::test]
    async fn test_bad_recipient_fails_before_submission() {
        let h = harness(ChainRegistry::testnet(), true);
        let mut req = request("base", "optimism", "1");
        req.destination = "0x1234".to_string();

        let failure = h.orchestrator.transfer(&req, &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(failure.source, OrchestratorError::Encoding(_)));
        assert!(h.api.executions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_burn_failure_stops_before_attestation() {
        let h = harness(ChainRegistry::testnet(), true);
        h.api.fail_execution_at(0);

        let failure = h
            .orchestrator
            .transfer(&request("base", "optimism", "1"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.reason, REASON_BURN);
        assert_eq!(failure.stage, TransferStage::Init);
        assert!(failure.burn_tx_hash.is_none());
        assert_eq!(h.attestations.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbatched_chain_sends_approve_then_burn() {
        let overrides = vec![crate::config::NetworkConfig {
            name: "base".to_string(),
            supports_batch: Some(false),
            ..Default::default()
        }];
        let h = harness(ChainRegistry::with_overrides(&overrides).unwrap(), true);

        let receipt = h
            .orchestrator
            .transfer(&request("base", "arbitrum", "3"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(receipt.approve.is_some());
        assert_eq!(receipt.transactions().len(), 3);
        assert_eq!(h.api.executions().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbatched_burn_failure_is_partial() {
        let overrides = vec![crate::config::NetworkConfig {
            name: "base".to_string(),
            supports_batch: Some(false),
            ..Default::default()
        }];
        let h = harness(ChainRegistry::with_overrides(&overrides).unwrap(), true);
        h.api.fail_execution_at(1);

        let failure = h
            .orchestrator
            .transfer(&request("base", "arbitrum", "3"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(failure.reason, REASON_BURN);
        assert_eq!(failure.stage, TransferStage::Approved);
        assert!(matches!(
            failure.source,
            OrchestratorError::PartialSequenceFailure { completed: 1, .. }
        ));
        assert!(failure.last_tx.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mint_failure_keeps_burn_hash() {
        let h = harness(ChainRegistry::testnet(), true);
        h.api.fail_execution_at(1);

        let failure = h
            .orchestrator
            .transfer(&request("base", "optimism", "1"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(failure.reason, REASON_MINT);
        assert_eq!(failure.stage, TransferStage::Attested);
        assert!(failure.burn_tx_hash.is_some());
        let last = failure.history.last().unwrap();
        assert_eq!(last.stage, TransferStage::Failed(REASON_MINT.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attestation_timeout_is_attestation_failure() {
        let mut h = harness(ChainRegistry::testnet(), true);
        let never = Arc::new(MockAttestationSource::never_complete());
        let fast = PollPolicy {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(30),
        };
        h.orchestrator.attestations = Arc::new(AttestationRetriever::new(never, fast));

        let failure = h
            .orchestrator
            .transfer(&request("base", "optimism", "1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(failure.reason, REASON_ATTESTATION);
        assert!(matches!(failure.source, OrchestratorError::AttestationTimeout { .. }));
        // mint 시도 없음
        assert_eq!(h.api.executions().len(), 1);
    }

    #[tokio::test]
    async fn test_same_chain_is_rejected() {
        let h = harness(ChainRegistry::testnet(), true);
        let failure = h
            .orchestrator
            .transfer(&request("base", "base sepolia", "1"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(failure.source, OrchestratorError::InvalidOperation(_)));
    }
}
