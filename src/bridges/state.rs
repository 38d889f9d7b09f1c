use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{OrchestratorError, OrchestratorResult};

/// 소각-민트 전송 단계
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStage {
    Init,
    Approved,
    Burned,
    Attested,
    Minted,
    Failed(String),
}

impl TransferStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Approved => "APPROVED",
            Self::Burned => "BURNED",
            Self::Attested => "ATTESTED",
            Self::Minted => "MINTED",
            Self::Failed(_) => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Minted | Self::Failed(_))
    }
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "FAILED({})", reason),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// 기록된 전이 하나
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: TransferStage,
    pub at: DateTime<Utc>,
}

/// 앞으로만 진행하는 전송 상태 머신 (방문 이력 포함)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferStateMachine {
    current: TransferStage,
    history: Vec<StageRecord>,
}

impl TransferStateMachine {
    pub fn new() -> Self {
        Self {
            current: TransferStage::Init,
            history: vec![StageRecord {
                stage: TransferStage::Init,
                at: Utc::now(),
            }],
        }
    }

    /// 허용되는 이동: 한 단계 전진, 또는 종결 전 어느 단계에서든 Failed
    pub fn can_transition(from: &TransferStage, to: &TransferStage) -> bool {
        use TransferStage::*;

        matches!(
            (from, to),
            (Init, Approved)
                | (Approved, Burned)
                | (Burned, Attested)
                | (Attested, Minted)
                | (Init | Approved | Burned | Attested, Failed(_))
        )
    }

    pub fn transition(&mut self, to: TransferStage) -> OrchestratorResult<()> {
        if !Self::can_transition(&self.current, &to) {
            return Err(OrchestratorError::InvalidOperation(format!(
                "Invalid transfer transition: {} -> {}",
                self.current, to
            )));
        }
        debug!("🔀 transfer {} -> {}", self.current, to);
        self.history.push(StageRecord {
            stage: to.clone(),
            at: Utc::now(),
        });
        self.current = to;
        Ok(())
    }

    /// `reason` 과 함께 Failed 로 이동. 이미 종결이면 아무것도 안 함
    pub fn fail(&mut self, reason: &str) {
        if !self.current.is_terminal() {
            // 종결 전 단계에서는 항상 허용
            let _ = self.transition(TransferStage::Failed(reason.to_string()));
        }
    }

    pub fn current(&self) -> &TransferStage {
        &self.current
    }

    pub fn history(&self) -> &[StageRecord] {
        &self.history
    }

    /// 실패 전 마지막으로 도달한 단계
    pub fn last_good(&self) -> &TransferStage {
        self.history
            .iter()
            .rev()
            .map(|r| &r.stage)
            .find(|s| !matches!(s, TransferStage::Failed(_)))
            .unwrap_or(&TransferStage::Init)
    }

    pub fn stage_names(&self) -> Vec<String> {
        self.history.iter().map(|r| r.stage.to_string()).collect()
    }
}

impl Default for TransferStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
