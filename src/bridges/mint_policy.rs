use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::LINEA_SEPOLIA_CHAIN_ID;
use crate::error::OrchestratorError;

/// 목적지 체인에서 `receiveMessage` 를 누가 제출하는지
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintStrategy {
    /// 목적지 관리형 지갑으로
    ManagedWallet,
    /// relayer 키로 서명해서 RPC 로 전송
    Relayer,
}

impl fmt::Display for MintStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintStrategy::ManagedWallet => write!(f, "managed_wallet"),
            MintStrategy::Relayer => write!(f, "relayer"),
        }
    }
}

impl FromStr for MintStrategy {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "managed_wallet" | "wallet" => Ok(MintStrategy::ManagedWallet),
            "relayer" => Ok(MintStrategy::Relayer),
            other => Err(OrchestratorError::InvalidOperation(format!("unknown mint strategy: {}", other))),
        }
    }
}

/// 목적지 체인 ID -> mint 전략. 없는 체인은 관리형 지갑 사용
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintPolicy {
    overrides: HashMap<u64, MintStrategy>,
}

impl MintPolicy {
    /// 모든 체인에서 관리형 지갑, relay 없음
    pub fn managed_only() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    pub fn with(mut self, chain_id: u64, strategy: MintStrategy) -> Self {
        self.overrides.insert(chain_id, strategy);
        self
    }

    pub fn strategy_for(&self, chain_id: u64) -> MintStrategy {
        self.overrides
            .get(&chain_id)
            .copied()
            .unwrap_or(MintStrategy::ManagedWallet)
    }

    pub fn uses_relayer(&self) -> bool {
        self.overrides.values().any(|s| *s == MintStrategy::Relayer)
    }
}

impl Default for MintPolicy {
    /// Linea Sepolia 는 relayer 로 mint
    fn default() -> Self {
        Self::managed_only().with(LINEA_SEPOLIA_CHAIN_ID, MintStrategy::Relayer)
    }
}
