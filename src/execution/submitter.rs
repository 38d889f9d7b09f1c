use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::wallet_api::{ContractExecutionRequest, ManagedWalletApi, NativeTransferRequest};
use crate::constants::{FEE_LEVEL_CONTRACT_EXECUTION, FEE_LEVEL_TRANSFER, TX_POLL_INTERVAL, TX_POLL_TIMEOUT};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::{Batch, CallStep, TxHandle, TxState, WalletRef};
use crate::utils::abi::CallEncoder;
use crate::utils::math::wei_to_ether_string;

/// 전체 타임아웃이 있는 고정 간격 폴링
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: TX_POLL_INTERVAL,
            timeout: TX_POLL_TIMEOUT,
        }
    }
}

/// 관리형 지갑 트랜잭션 하나로 보낼 내용
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Call(CallStep),
    /// 모든 단계를 지갑 자신의 `executeBatch` 호출 하나로
    Batch(Batch),
}

/// 관리형 지갑 API 로 호출을 제출하고 종결 상태까지 대기.
///
/// FAILED 에 도달한 트랜잭션은 재시도하지 않는다. 에러 처리는
/// 호출자가 결정.
pub struct TransactionSubmitter {
    api: Arc<dyn ManagedWalletApi>,
    encoder: CallEncoder,
    policy: PollPolicy,
}

impl TransactionSubmitter {
    pub fn new(api: Arc<dyn ManagedWalletApi>, encoder: CallEncoder, policy: PollPolicy) -> Self {
        Self { api, encoder, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// 트랜잭션 하나를 제출하고 종결 상태까지 폴링
    pub async fn submit(
        &self,
        submission: &Submission,
        wallet: &WalletRef,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<TxHandle> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let (step, ref_id) = match submission {
            Submission::Call(step) => (step.clone(), None),
            Submission::Batch(batch) => {
                debug!(
                    steps = batch.len(),
                    value = %wei_to_ether_string(batch.total_value()),
                    "📦 executeBatch 구성 (내부 value 는 지갑 잔액에서 지불)"
                );
                (
                    self.encoder.execute_batch(wallet.address, batch),
                    Some("Batch execution".to_string()),
                )
            }
        };

        let request = ContractExecutionRequest {
            wallet_id: wallet.wallet_id.clone(),
            contract_address: step.target,
            call_data: step.data.clone(),
            amount: native_amount(step.value),
            fee_level: FEE_LEVEL_CONTRACT_EXECUTION.to_string(),
            ref_id,
        };

        let created = self.api.create_contract_execution(&request).await?;
        let tx_id = created
            .id
            .ok_or_else(|| OrchestratorError::Submission("Transaction ID not found in response".to_string()))?;
        info!(tx_id = %tx_id, wallet_id = %wallet.wallet_id, "📨 트랜잭션 제출 완료");

        self.wait_for_terminal(tx_id, created.state.as_deref(), cancel).await
    }

    /// 체인이 지원하면 배치를 원자적으로, 아니면 단계별로 제출
    pub async fn submit_batch(
        &self,
        batch: &Batch,
        wallet: &WalletRef,
        supports_batch: bool,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<Vec<TxHandle>> {
        if supports_batch || batch.len() == 1 {
            let submission = if batch.len() == 1 {
                Submission::Call(batch.steps()[0].clone())
            } else {
                Submission::Batch(batch.clone())
            };
            let handle = self.submit(&submission, wallet, cancel).await?;
            return Ok(vec![handle]);
        }
        self.submit_sequence(batch, wallet, cancel).await
    }

    /// 비원자적: 단계마다 트랜잭션 하나, 순서대로. 하나 이상 확정된 뒤의
    /// 실패는 `PartialSequenceFailure` 가 된다.
    pub async fn submit_sequence(
        &self,
        batch: &Batch,
        wallet: &WalletRef,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<Vec<TxHandle>> {
        let mut handles = Vec::with_capacity(batch.len());

        for (idx, step) in batch.steps().iter().enumerate() {
            debug!("➡️ 시퀀스 단계 {}/{}", idx + 1, batch.len());
            match self.submit(&Submission::Call(step.clone()), wallet, cancel).await {
                Ok(handle) => handles.push(handle),
                Err(e) if handles.is_empty() => return Err(e),
                Err(e) => {
                    warn!("⚠️ 시퀀스 {}단계 실패 ({}개 확정됨): {}", idx + 1, handles.len(), e);
                    return Err(OrchestratorError::PartialSequenceFailure {
                        completed: handles.len(),
                        failed_step: idx,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(handles)
    }

    /// 지갑 전송 엔드포인트를 통한 네이티브 자산 전송
    pub async fn submit_native_transfer(
        &self,
        wallet: &WalletRef,
        blockchain: &str,
        destination: Address,
        amount: &str,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<TxHandle> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        let request = NativeTransferRequest {
            wallet_id: wallet.wallet_id.clone(),
            blockchain: blockchain.to_string(),
            destination,
            amount: amount.to_string(),
            fee_level: FEE_LEVEL_TRANSFER.to_string(),
        };
        let created = self.api.create_transfer(&request).await?;
        let tx_id = created
            .id
            .ok_or_else(|| OrchestratorError::Submission("Transaction ID not found in response".to_string()))?;
        info!(tx_id = %tx_id, "💸 네이티브 전송 제출 완료");

        self.wait_for_terminal(tx_id, created.state.as_deref(), cancel).await
    }

    async fn wait_for_terminal(
        &self,
        tx_id: String,
        initial_state: Option<&str>,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<TxHandle> {
        let deadline = Instant::now() + self.policy.timeout;
        let mut handle = TxHandle::submitted(tx_id);
        if let Some(state) = initial_state {
            handle.advance(super::wallet_api::map_state(state));
        }

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                result = self.api.get_transaction(&handle.tx_id) => result,
            };

            match polled {
                Ok(status) => {
                    if status.tx_hash.is_some() {
                        handle.tx_hash = status.tx_hash.clone();
                    }
                    if handle.advance(status.tx_state()) {
                        debug!(tx_id = %handle.tx_id, state = %handle.state, "🔄 상태 변경");
                    }

                    match &handle.state {
                        TxState::Confirmed => {
                            info!(
                                tx_id = %handle.tx_id,
                                tx_hash = handle.tx_hash.as_deref().unwrap_or("-"),
                                "✅ 트랜잭션 확정"
                            );
                            return Ok(handle);
                        }
                        TxState::Failed(raw) => {
                            warn!(tx_id = %handle.tx_id, state = %raw, "❌ 트랜잭션 실패");
                            return Err(OrchestratorError::Execution {
                                tx_id: handle.tx_id.clone(),
                                state: raw.clone(),
                                reason: status.error_reason,
                            });
                        }
                        _ => {}
                    }
                }
                // 일시적 조회 실패는 마감 시각까지 계속 폴링
                Err(e) if is_transient_poll_error(&e) => {
                    warn!(tx_id = %handle.tx_id, "⚠️ 상태 조회 실패, 재시도: {}", e);
                }
                Err(e) => return Err(e),
            }

            if Instant::now() + self.policy.interval > deadline {
                return Err(OrchestratorError::TransactionTimeout {
                    tx_id: handle.tx_id.clone(),
                    waited: self.policy.timeout,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                _ = sleep(self.policy.interval) => {}
            }
        }
    }
}

fn native_amount(value: U256) -> Option<String> {
    if value.is_zero() {
        None
    } else {
        Some(wei_to_ether_string(value))
    }
}

fn is_transient_poll_error(error: &OrchestratorError) -> bool {
    match error {
        OrchestratorError::Http(_) => true,
        OrchestratorError::Api { status, .. } => *status == 404 || *status == 429 || *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockWalletApi;
    use alloy::primitives::{address, Bytes};

    fn wallet() -> WalletRef {
        WalletRef {
            wallet_id: "wallet-1".to_string(),
            address: address!("1111111111111111111111111111111111111111"),
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(10),
            timeout: Duration::from_secs(1),
        }
    }

    fn step(byte: u8) -> CallStep {
        CallStep::new(address!("2222222222222222222222222222222222222222"), Bytes::from(vec![byte; 4]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_polls_until_confirmed() {
        let api = Arc::new(MockWalletApi::new());
        api.script_states(&["INITIATED", "QUEUED", "SENT", "CONFIRMED"]);
        let submitter = TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast_policy());

        let handle = submitter
            .submit(&Submission::Call(step(1)), &wallet(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(handle.is_confirmed());
        assert!(handle.tx_hash.is_some());
        assert_eq!(api.executions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_state_is_not_retried() {
        let api = Arc::new(MockWalletApi::new());
        api.script_states(&["QUEUED", "FAILED"]);
        let submitter = TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast_policy());

        let err = submitter
            .submit(&Submission::Call(step(1)), &wallet(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Execution { ref state, .. } if state == "FAILED"));
        assert_eq!(api.executions().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_when_never_terminal() {
        let api = Arc::new(MockWalletApi::new());
        api.script_states(&["QUEUED"]);
        let submitter = TransactionSubmitter::new(api, CallEncoder::new(), fast_policy());

        let err = submitter
            .submit(&Submission::Call(step(1)), &wallet(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::TransactionTimeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_polling() {
        let api = Arc::new(MockWalletApi::new());
        api.script_states(&["QUEUED"]);
        let submitter = TransactionSubmitter::new(api, CallEncoder::new(), PollPolicy::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let err = submitter
            .submit(&Submission::Call(step(1)), &wallet(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_poll_errors_keep_polling() {
        for status in [503u16, 429] {
            let api = Arc::new(MockWalletApi::new());
            api.fail_polls_with(status, 2);
            let submitter = TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast_policy());

            let handle = submitter
                .submit(&Submission::Call(step(1)), &wallet(), &CancellationToken::new())
                .await
                .unwrap();

            assert!(handle.is_confirmed());
            assert_eq!(api.polls(), 3);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_poll_error_is_returned_at_once() {
        let api = Arc::new(MockWalletApi::new());
        api.fail_polls_with(400, 1);
        let submitter = TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast_policy());

        let err = submitter
            .submit(&Submission::Call(step(1)), &wallet(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OrchestratorError::Api { status: 400, .. }));
        assert_eq!(api.polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_poll_errors_still_hit_the_deadline() {
        let api = Arc::new(MockWalletApi::new());
        api.fail_polls_with(503, usize::MAX);
        let submitter = TransactionSubmitter::new(api, CallEncoder::new(), fast_policy());

        let err = submitter
            .submit(&Submission::Call(step(1)), &wallet(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::TransactionTimeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_id_is_submission_error() {
        let api = Arc::new(MockWalletApi::new());
        api.omit_ids();
        let submitter = TransactionSubmitter::new(api, CallEncoder::new(), fast_policy());

        let err = submitter
            .submit(&Submission::Call(step(1)), &wallet(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Submission(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_targets_wallet_with_execute_batch() {
        let api = Arc::new(MockWalletApi::new());
        let submitter = TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast_policy());
        let batch = Batch::new(vec![step(1), step(2)]).unwrap();

        let handles = submitter
            .submit_batch(&batch, &wallet(), true, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(handles.len(), 1);
        let sent = api.executions();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].contract_address, wallet().address);
        assert_eq!(sent[0].ref_id.as_deref(), Some("Batch execution"));
        assert_eq!(sent[0].fee_level, "HIGH");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_failure_after_first_step_is_partial() {
        let api = Arc::new(MockWalletApi::new());
        api.fail_execution_at(1);
        let submitter = TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast_policy());
        let batch = Batch::new(vec![step(1), step(2), step(3)]).unwrap();

        let err = submitter
            .submit_batch(&batch, &wallet(), false, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            OrchestratorError::PartialSequenceFailure { completed, failed_step, .. } => {
                assert_eq!(completed, 1);
                assert_eq!(failed_step, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        // 세 번째 단계는 제출되지 않음
        assert_eq!(api.executions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_value_is_sent_as_ether_string() {
        let api = Arc::new(MockWalletApi::new());
        let submitter = TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast_policy());
        let payable = CallStep::with_value(
            address!("2222222222222222222222222222222222222222"),
            U256::from(10_000_000_000_000_000u64),
            Bytes::from(vec![0xd0, 0xe3, 0x0d, 0xb0]),
        );

        submitter
            .submit(&Submission::Call(payable), &wallet(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(api.executions()[0].amount.as_deref(), Some("0.01"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_native_transfer_uses_medium_fee() {
        let api = Arc::new(MockWalletApi::new());
        let submitter = TransactionSubmitter::new(api.clone(), CallEncoder::new(), fast_policy());

        let handle = submitter
            .submit_native_transfer(
                &wallet(),
                "BASE-SEPOLIA",
                address!("3333333333333333333333333333333333333333"),
                "0.5",
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(handle.is_confirmed());
        let transfers = api.transfers();
        assert_eq!(transfers[0].fee_level, "MEDIUM");
        assert_eq!(transfers[0].amount, "0.5");
    }
}
