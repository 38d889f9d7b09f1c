use std::time::Duration;

use alloy::primitives::{Address, Bytes};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::TxState;
use crate::utils::rate_limit::EndpointLimiter;

const CONTRACT_EXECUTION_PATH: &str = "/v1/w3s/developer/transactions/contractExecution";
const TRANSFER_PATH: &str = "/v1/w3s/developer/transactions/transfer";
const TRANSACTION_PATH: &str = "/v1/w3s/transactions";

/// 관리형 지갑 명의의 컨트랙트 실행 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractExecutionRequest {
    pub wallet_id: String,
    pub contract_address: Address,
    pub call_data: Bytes,
    /// ether 소수 문자열의 네이티브 value, 0 이면 None
    pub amount: Option<String>,
    pub fee_level: String,
    pub ref_id: Option<String>,
}

/// 지갑 전송 엔드포인트를 통한 네이티브 자산 전송
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTransferRequest {
    pub wallet_id: String,
    pub blockchain: String,
    pub destination: Address,
    /// 정수 단위 소수 수량 ("0.01")
    pub amount: String,
    pub fee_level: String,
}

/// 생성 호출 응답. 잘못된 응답이면 `id` 가 없을 수 있음
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedTransaction {
    pub id: Option<String>,
    pub state: Option<String>,
}

/// 상태 조회가 돌려준 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub error_reason: Option<String>,
}

impl TransactionStatus {
    pub fn tx_state(&self) -> TxState {
        map_state(&self.state)
    }
}

/// 공급자 상태 문자열 -> 엔진 상태
pub fn map_state(raw: &str) -> TxState {
    match raw.to_uppercase().as_str() {
        "CONFIRMED" | "COMPLETE" => TxState::Confirmed,
        "FAILED" | "CANCELLED" | "DENIED" => TxState::Failed(raw.to_uppercase()),
        "INITIATED" => TxState::Submitted,
        _ => TxState::Pending,
    }
}

/// 관리형 지갑 트랜잭션 API
#[async_trait]
pub trait ManagedWalletApi: Send + Sync {
    async fn create_contract_execution(
        &self,
        request: &ContractExecutionRequest,
    ) -> OrchestratorResult<CreatedTransaction>;

    async fn create_transfer(&self, request: &NativeTransferRequest) -> OrchestratorResult<CreatedTransaction>;

    async fn get_transaction(&self, tx_id: &str) -> OrchestratorResult<TransactionStatus>;

    fn name(&self) -> &str;
}

/// 모든 쓰기 요청에 붙는 entity secret 암호문의 출처
pub trait EntitySecretSource: Send + Sync {
    fn ciphertext(&self) -> OrchestratorResult<String>;
}

/// 설정에서 읽은 사전 등록 암호문
#[derive(Clone)]
pub struct StaticCiphertext(String);

impl StaticCiphertext {
    pub fn new(ciphertext: impl Into<String>) -> Self {
        Self(ciphertext.into())
    }
}

impl EntitySecretSource for StaticCiphertext {
    fn ciphertext(&self) -> OrchestratorResult<String> {
        if self.0.is_empty() {
            return Err(OrchestratorError::Submission(
                "entity secret ciphertext is not configured".to_string(),
            ));
        }
        Ok(self.0.clone())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContractExecutionBody<'a> {
    idempotency_key: String,
    entity_secret_ciphertext: String,
    wallet_id: &'a str,
    contract_address: String,
    call_data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<&'a str>,
    fee_level: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferBody<'a> {
    idempotency_key: String,
    entity_secret_ciphertext: String,
    wallet_id: &'a str,
    blockchain: &'a str,
    /// 네이티브 자산이면 비어 있음
    token_address: &'a str,
    destination_address: String,
    amounts: Vec<&'a str>,
    fee_level: &'a str,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TransactionEnvelope {
    transaction: Option<TransactionStatus>,
}

/// Circle developer-controlled 지갑 클라이언트
pub struct CircleWalletClient {
    client: Client,
    base_url: String,
    api_key: String,
    entity_secret: Box<dyn EntitySecretSource>,
    limiter: EndpointLimiter,
}

impl std::fmt::Debug for CircleWalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircleWalletClient")
            .field("base_url", &self.base_url)
            .field("limiter", &self.limiter.name())
            .finish()
    }
}

impl CircleWalletClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        entity_secret: Box<dyn EntitySecretSource>,
        limiter: EndpointLimiter,
        request_timeout: Duration,
    ) -> OrchestratorResult<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;

        info!("🔌 Circle 지갑 API 클라이언트 초기화: {}", base_url);
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            entity_secret,
            limiter,
        })
    }

    fn headers(&self) -> OrchestratorResult<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| OrchestratorError::Submission(format!("invalid API key header: {}", e)))?;
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    async fn post_create<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> OrchestratorResult<CreatedTransaction> {
        let url = format!("{}{}", self.base_url, path);
        let _permit = self.limiter.acquire().await;

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("⚠️ Circle API 오류 {}: {}", status, message);
            return Err(OrchestratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<CreatedTransaction> = response.json().await?;
        Ok(envelope.data.unwrap_or(CreatedTransaction { id: None, state: None }))
    }
}

#[async_trait]
impl ManagedWalletApi for CircleWalletClient {
    async fn create_contract_execution(
        &self,
        request: &ContractExecutionRequest,
    ) -> OrchestratorResult<CreatedTransaction> {
        let body = ContractExecutionBody {
            idempotency_key: Uuid::new_v4().to_string(),
            entity_secret_ciphertext: self.entity_secret.ciphertext()?,
            wallet_id: &request.wallet_id,
            contract_address: format!("{:#x}", request.contract_address),
            call_data: format!("0x{}", hex::encode(&request.call_data)),
            amount: request.amount.as_deref(),
            fee_level: &request.fee_level,
            ref_id: request.ref_id.as_deref(),
        };
        debug!(
            wallet_id = %request.wallet_id,
            contract = %body.contract_address,
            "📤 contract execution 요청"
        );
        self.post_create(CONTRACT_EXECUTION_PATH, &body).await
    }

    async fn create_transfer(&self, request: &NativeTransferRequest) -> OrchestratorResult<CreatedTransaction> {
        let body = TransferBody {
            idempotency_key: Uuid::new_v4().to_string(),
            entity_secret_ciphertext: self.entity_secret.ciphertext()?,
            wallet_id: &request.wallet_id,
            blockchain: &request.blockchain,
            token_address: "",
            destination_address: format!("{:#x}", request.destination),
            amounts: vec![request.amount.as_str()],
            fee_level: &request.fee_level,
        };
        debug!(wallet_id = %request.wallet_id, amount = %request.amount, "📤 transfer 요청");
        self.post_create(TRANSFER_PATH, &body).await
    }

    async fn get_transaction(&self, tx_id: &str) -> OrchestratorResult<TransactionStatus> {
        let url = format!("{}{}/{}", self.base_url, TRANSACTION_PATH, tx_id);
        let _permit = self.limiter.acquire().await;

        let response = self.client.get(&url).headers(self.headers()?).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<TransactionEnvelope> = response.json().await?;
        envelope
            .data
            .and_then(|d| d.transaction)
            .ok_or_else(|| OrchestratorError::Api {
                status: status.as_u16(),
                message: format!("transaction {} missing from response", tx_id),
            })
    }

    fn name(&self) -> &str {
        "circle"
    }
}
