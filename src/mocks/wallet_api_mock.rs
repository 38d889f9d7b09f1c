use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::execution::wallet_api::{
    ContractExecutionRequest, CreatedTransaction, ManagedWalletApi, NativeTransferRequest, TransactionStatus,
};

#[derive(Default)]
struct MockLedger {
    /// 한 트랜잭션의 연속 조회 결과. 마지막 상태가 반복됨
    script: Vec<String>,
    cursors: HashMap<String, usize>,
    hashes: HashMap<String, String>,
    failing: HashSet<String>,
    fail_at: HashSet<usize>,
    omit_ids: bool,
    /// (HTTP status, 남은 횟수): 다음 상태 조회들이 이 status 로 실패
    poll_failure: Option<(u16, usize)>,
    polls: usize,
    executions: Vec<ContractExecutionRequest>,
    transfers: Vec<NativeTransferRequest>,
    next_id: u64,
}

/// 스크립트 가능한 관리형 지갑 API. 별도 설정이 없으면 첫 조회에서 CONFIRMED
pub struct MockWalletApi {
    ledger: Mutex<MockLedger>,
}

impl MockWalletApi {
    pub fn new() -> Self {
        info!("🎭 MockWalletApi 초기화 완료");
        Self {
            ledger: Mutex::new(MockLedger {
                script: vec!["CONFIRMED".to_string()],
                ..Default::default()
            }),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, MockLedger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 이후 생성되는 모든 트랜잭션에 적용할 조회 순서
    pub fn script_states(&self, states: &[&str]) {
        if states.is_empty() {
            return;
        }
        self.ledger().script = states.iter().map(|s| s.to_string()).collect();
    }

    /// 0부터 세는 index 번째 컨트랙트 실행은 FAILED 로 끝남
    pub fn fail_execution_at(&self, index: usize) {
        self.ledger().fail_at.insert(index);
    }

    /// 생성 응답에 트랜잭션 ID 를 넣지 않음
    pub fn omit_ids(&self) {
        self.ledger().omit_ids = true;
    }

    /// 다음 `times` 번의 상태 조회가 `Api { status }` 로 실패
    pub fn fail_polls_with(&self, status: u16, times: usize) {
        self.ledger().poll_failure = Some((status, times));
    }

    /// 지금까지의 상태 조회 횟수
    pub fn polls(&self) -> usize {
        self.ledger().polls
    }

    pub fn executions(&self) -> Vec<ContractExecutionRequest> {
        self.ledger().executions.clone()
    }

    pub fn transfers(&self) -> Vec<NativeTransferRequest> {
        self.ledger().transfers.clone()
    }

    fn register(ledger: &mut MockLedger, prefix: &str, fails: bool) -> CreatedTransaction {
        if ledger.omit_ids {
            return CreatedTransaction {
                id: None,
                state: Some("INITIATED".to_string()),
            };
        }
        ledger.next_id += 1;
        let id = format!("{}-{}", prefix, ledger.next_id);
        ledger.hashes.insert(id.clone(), format!("0x{:064x}", ledger.next_id));
        if fails {
            ledger.failing.insert(id.clone());
        }
        debug!("🎭 mock 트랜잭션 생성: {}", id);
        CreatedTransaction {
            id: Some(id),
            state: Some("INITIATED".to_string()),
        }
    }
}

impl Default for MockWalletApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ManagedWalletApi for MockWalletApi {
    async fn create_contract_execution(
        &self,
        request: &ContractExecutionRequest,
    ) -> OrchestratorResult<CreatedTransaction> {
        let mut ledger = self.ledger();
        let index = ledger.executions.len();
        ledger.executions.push(request.clone());
        let fails = ledger.fail_at.contains(&index);
        Ok(Self::register(&mut ledger, "mock-exec", fails))
    }

    async fn create_transfer(&self, request: &NativeTransferRequest) -> OrchestratorResult<CreatedTransaction> {
        let mut ledger = self.ledger();
        ledger.transfers.push(request.clone());
        Ok(Self::register(&mut ledger, "mock-transfer", false))
    }

    async fn get_transaction(&self, tx_id: &str) -> OrchestratorResult<TransactionStatus> {
        let mut ledger = self.ledger();
        ledger.polls += 1;

        if let Some((status, remaining)) = ledger.poll_failure {
            ledger.poll_failure = (remaining > 1).then_some((status, remaining - 1));
            if remaining > 0 {
                return Err(OrchestratorError::Api {
                    status,
                    message: format!("mock poll failure for {}", tx_id),
                });
            }
        }

        let Some(tx_hash) = ledger.hashes.get(tx_id).cloned() else {
            return Err(OrchestratorError::Api {
                status: 400,
                message: format!("unknown transaction {}", tx_id),
            });
        };

        if ledger.failing.contains(tx_id) {
            return Ok(TransactionStatus {
                id: tx_id.to_string(),
                state: "FAILED".to_string(),
                tx_hash: Some(tx_hash),
                error_reason: Some("mock execution failure".to_string()),
            });
        }

        let last = ledger.script.len().saturating_sub(1);
        let cursor = ledger.cursors.entry(tx_id.to_string()).or_insert(0);
        let position = (*cursor).min(last);
        *cursor += 1;
        let state = ledger.script.get(position).cloned().unwrap_or_else(|| "CONFIRMED".to_string());

        Ok(TransactionStatus {
            id: tx_id.to_string(),
            state,
            tx_hash: Some(tx_hash),
            error_reason: None,
        })
    }

    fn name(&self) -> &str {
        "mock-wallet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Bytes};

    fn execution() -> ContractExecutionRequest {
        ContractExecutionRequest {
            wallet_id: "w".to_string(),
            contract_address: address!("1111111111111111111111111111111111111111"),
            call_data: Bytes::from(vec![1, 2, 3, 4]),
            amount: None,
            fee_level: "HIGH".to_string(),
            ref_id: None,
        }
    }

    #[tokio::test]
    async fn test_script_is_per_transaction() {
        let api = MockWalletApi::new();
        api.script_states(&["QUEUED", "CONFIRMED"]);

        let first = api.create_contract_execution(&execution()).await.unwrap().id.unwrap();
        let second = api.create_contract_execution(&execution()).await.unwrap().id.unwrap();

        assert_eq!(api.get_transaction(&first).await.unwrap().state, "QUEUED");
        assert_eq!(api.get_transaction(&first).await.unwrap().state, "CONFIRMED");
        assert_eq!(api.get_transaction(&first).await.unwrap().state, "CONFIRMED");
        assert_eq!(api.get_transaction(&second).await.unwrap().state, "QUEUED");
    }

    #[tokio::test]
    async fn test_poll_failures_run_out() {
        let api = MockWalletApi::new();
        let id = api.create_contract_execution(&execution()).await.unwrap().id.unwrap();
        api.fail_polls_with(503, 2);

        assert!(matches!(api.get_transaction(&id).await, Err(OrchestratorError::Api { status: 503, .. })));
        assert!(matches!(api.get_transaction(&id).await, Err(OrchestratorError::Api { status: 503, .. })));
        assert_eq!(api.get_transaction(&id).await.unwrap().state, "CONFIRMED");
        assert_eq!(api.polls(), 3);
    }

    #[tokio::test]
    async fn test_unknown_transaction_is_api_error() {
        let api = MockWalletApi::new();
        let err = api.get_transaction("nope").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Api { status: 400, .. }));
    }
}
