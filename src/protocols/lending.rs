use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{aave, compound};
use crate::blockchain::registry::{ChainNetwork, ChainRegistry};
use crate::error::OrchestratorResult;
use crate::execution::submitter::TransactionSubmitter;
use crate::storage::WalletDirectory;
use crate::types::{Batch, LendingProtocol, LendingRequest, TxHandle, WalletRef};
use crate::utils::abi::CallEncoder;
use crate::utils::math::to_base_units;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LendingDirection {
    Supply,
    Withdraw,
}

impl fmt::Display for LendingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LendingDirection::Supply => write!(f, "supply"),
            LendingDirection::Withdraw => write!(f, "withdraw"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LendingReceipt {
    pub protocol: LendingProtocol,
    pub direction: LendingDirection,
    pub network: String,
    pub transactions: Vec<TxHandle>,
}

/// 작업당 배치 하나로 공급/출금. 부분 단계 복구 없음:
/// 실패한 배치는 그대로 보고
pub struct LendingOrchestrator {
    registry: ChainRegistry,
    encoder: CallEncoder,
    submitter: Arc<TransactionSubmitter>,
    wallets: Arc<dyn WalletDirectory>,
}

impl LendingOrchestrator {
    pub fn new(
        registry: ChainRegistry,
        encoder: CallEncoder,
        submitter: Arc<TransactionSubmitter>,
        wallets: Arc<dyn WalletDirectory>,
    ) -> Self {
        Self {
            registry,
            encoder,
            submitter,
            wallets,
        }
    }

    pub async fn supply(&self, request: &LendingRequest, cancel: &CancellationToken) -> OrchestratorResult<LendingReceipt> {
        self.execute(request, LendingDirection::Supply, cancel).await
    }

    pub async fn withdraw(&self, request: &LendingRequest, cancel: &CancellationToken) -> OrchestratorResult<LendingReceipt> {
        self.execute(request, LendingDirection::Withdraw, cancel).await
    }

    /// 네트워크 접근 없이 해석과 인코딩만 수행
    pub fn prepare(
        &self,
        request: &LendingRequest,
        direction: LendingDirection,
    ) -> OrchestratorResult<(&ChainNetwork, WalletRef, Batch)> {
        let network = self.registry.resolve(&request.network)?;
        let amount = to_base_units(request.amount, request.asset.decimals())?;
        let wallet = self.wallets.resolve(&request.owner, network)?;

        let batch = match (request.protocol, direction) {
            (LendingProtocol::Aave, LendingDirection::Supply) => {
                aave::supply_batch(&self.encoder, network, request.asset, amount, wallet.address)?
            }
            (LendingProtocol::Aave, LendingDirection::Withdraw) => {
                aave::withdraw_batch(&self.encoder, network, request.asset, amount, wallet.address)?
            }
            (LendingProtocol::Compound, LendingDirection::Supply) => {
                compound::supply_batch(&self.encoder, network, request.asset, amount)?
            }
            (LendingProtocol::Compound, LendingDirection::Withdraw) => {
                compound::withdraw_batch(&self.encoder, network, request.asset, amount)?
            }
        };
        Ok((network, wallet, batch))
    }

    async fn execute(
        &self,
        request: &LendingRequest,
        direction: LendingDirection,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<LendingReceipt> {
        let (network, wallet, batch) = self.prepare(request, direction)?;
        info!(
            protocol = %request.protocol,
            chain = %network.name,
            asset = %request.asset,
            amount = %request.amount,
            "🏦 {} 실행 ({}단계)",
            direction,
            batch.len()
        );

        let transactions = self
            .submitter
            .submit_batch(&batch, &wallet, network.supports_batch, cancel)
            .await?;

        Ok(LendingReceipt {
            protocol: request.protocol,
            direction,
            network: network.name.clone(),
            transactions,
        })
    }
}
