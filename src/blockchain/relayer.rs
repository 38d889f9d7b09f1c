use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::Middleware,
    signers::{LocalWallet, Signer},
    types::TransactionRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::registry::ChainNetwork;
use super::rpc::{to_ethers_u256, to_h160, ChainClients};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::CallStep;

/// 관리형 지갑 밖의 전용 키로 호출을 전송
#[async_trait]
pub trait RelayerClient: Send + Sync {
    /// 서명, 전송 후 receipt 대기. tx hash 반환
    async fn send_call(
        &self,
        network: &ChainNetwork,
        step: &CallStep,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<String>;

    fn address(&self) -> String;
}

/// ethers `LocalWallet` 기반 relayer
pub struct EthersRelayer {
    wallet: LocalWallet,
    clients: Arc<ChainClients>,
    confirmation_timeout: Duration,
}

impl std::fmt::Debug for EthersRelayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthersRelayer")
            .field("address", &self.wallet.address())
            .finish()
    }
}

impl EthersRelayer {
    pub fn new(private_key: &str, clients: Arc<ChainClients>, confirmation_timeout: Duration) -> OrchestratorResult<Self> {
        let wallet: LocalWallet = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| OrchestratorError::Relayer(format!("Invalid private key: {}", e)))?;
        info!("🔑 Relayer 초기화 완료: {:?}", wallet.address());
        Ok(Self {
            wallet,
            clients,
            confirmation_timeout,
        })
    }
}

#[async_trait]
impl RelayerClient for EthersRelayer {
    async fn send_call(
        &self,
        network: &ChainNetwork,
        step: &CallStep,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<String> {
        if cancel.is_cancelled() {
            return Err(OrchestratorError::Cancelled);
        }

        // 조회기와 같은 provider, 같은 limiter
        let chain = self.clients.get(network).await?;
        let wallet = self.wallet.clone().with_chain_id(network.chain_id);
        let client = SignerMiddleware::new((*chain.provider).clone(), wallet);

        let tx = TransactionRequest::new()
            .to(to_h160(step.target))
            .data(ethers::types::Bytes::from(step.data.to_vec()))
            .value(to_ethers_u256(step.value));

        let pending = {
            let _permit = tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                permit = chain.limiter.acquire() => permit,
            };
            client
                .send_transaction(tx, None)
                .await
                .map_err(|e| OrchestratorError::Relayer(format!("send failed on {}: {}", network.name, e)))?
        };
        let tx_hash = format!("{:#x}", *pending);
        info!(chain = %network.name, tx_hash = %tx_hash, "📡 relayer 트랜잭션 전송");

        // 전송 이후 취소는 대기만 멈춘다. 트랜잭션은 이미 mempool 에 있음
        let receipt = tokio::select! {
            _ = cancel.cancelled() => {
                warn!(tx_hash = %tx_hash, "🛑 relayer receipt 대기 취소");
                return Err(OrchestratorError::Cancelled);
            }
            waited = tokio::time::timeout(self.confirmation_timeout, pending) => waited,
        }
        .map_err(|_| OrchestratorError::Relayer(format!("receipt for {} not seen in time", tx_hash)))?
        .map_err(|e| OrchestratorError::Relayer(format!("receipt query failed: {}", e)))?
        .ok_or_else(|| OrchestratorError::Relayer(format!("transaction {} dropped", tx_hash)))?;

        if receipt.status.map(|s| s.as_u64()) != Some(1) {
            warn!(tx_hash = %tx_hash, "❌ relayer 트랜잭션 revert");
            return Err(OrchestratorError::Relayer(format!("transaction {} reverted", tx_hash)));
        }
        Ok(tx_hash)
    }

    fn address(&self) -> String {
        format!("{:#x}", self.wallet.address())
    }
}
