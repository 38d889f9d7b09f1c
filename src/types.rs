use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, Bytes, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// 엔진이 다룰 수 있는 자산
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Asset {
    /// 지원하는 모든 체인의 네이티브 가스 토큰
    Eth,
    Usdc,
}

impl Asset {
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Eth => "ETH",
            Asset::Usdc => "USDC",
        }
    }

    pub fn decimals(&self) -> u32 {
        match self {
            Asset::Eth => 18,
            Asset::Usdc => 6,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Eth)
    }

    pub fn all() -> [Asset; 2] {
        [Asset::Eth, Asset::Usdc]
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Asset {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ETH" => Ok(Asset::Eth),
            "USDC" => Ok(Asset::Usdc),
            other => Err(EncodingError::UnsupportedAsset(other.to_string())),
        }
    }
}

/// 렌딩 프로토콜 계열
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LendingProtocol {
    /// 담보 풀 계열 (Aave v3 pool + WETH gateway)
    Aave,
    /// 머니 마켓 계열 (Compound v3 comet, 네이티브 자산은 먼저 래핑)
    Compound,
}

impl LendingProtocol {
    pub fn name(&self) -> &'static str {
        match self {
            LendingProtocol::Aave => "AAVE",
            LendingProtocol::Compound => "Compound",
        }
    }
}

impl fmt::Display for LendingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for LendingProtocol {
    type Err = EncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "aave" => Ok(LendingProtocol::Aave),
            "compound" => Ok(LendingProtocol::Compound),
            other => Err(EncodingError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// 컨트랙트 호출 하나: 대상, 네이티브 value, 인코딩된 call data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStep {
    pub target: Address,
    pub value: U256,
    pub data: Bytes,
}

impl CallStep {
    pub fn new(target: Address, data: Bytes) -> Self {
        Self {
            target,
            value: U256::ZERO,
            data,
        }
    }

    pub fn with_value(target: Address, value: U256, data: Bytes) -> Self {
        Self { target, value, data }
    }

    /// 인코딩된 호출의 4바이트 함수 selector
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(0..4).and_then(|s| s.try_into().ok())
    }
}

/// 비어 있지 않은 호출 목록. call data 순서대로 실행
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    steps: Vec<CallStep>,
}

impl Batch {
    pub fn new(steps: Vec<CallStep>) -> Result<Self, EncodingError> {
        if steps.is_empty() {
            return Err(EncodingError::EmptyBatch);
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[CallStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// 배치의 내부 호출들이 전달하는 네이티브 value 합계
    pub fn total_value(&self) -> U256 {
        self.steps.iter().fold(U256::ZERO, |acc, s| acc + s.value)
    }

    pub fn into_steps(self) -> Vec<CallStep> {
        self.steps
    }
}

/// 관리형 지갑 트랜잭션 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    Submitted,
    Pending,
    Confirmed,
    /// 원본 상태 문자열을 담은 종결 실패 (FAILED, DENIED 등)
    Failed(String),
}

impl TxState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Confirmed | TxState::Failed(_))
    }

    fn rank(&self) -> u8 {
        match self {
            TxState::Submitted => 0,
            TxState::Pending => 1,
            TxState::Confirmed | TxState::Failed(_) => 2,
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxState::Submitted => write!(f, "SUBMITTED"),
            TxState::Pending => write!(f, "PENDING"),
            TxState::Confirmed => write!(f, "CONFIRMED"),
            TxState::Failed(raw) => write!(f, "FAILED({})", raw),
        }
    }
}

/// 폴링하는 동안 submitter 가 추적하는 제출 핸들
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHandle {
    pub tx_id: String,
    pub tx_hash: Option<String>,
    pub state: TxState,
    pub submitted_at: DateTime<Utc>,
}

impl TxHandle {
    pub fn submitted(tx_id: impl Into<String>) -> Self {
        Self {
            tx_id: tx_id.into(),
            tx_hash: None,
            state: TxState::Submitted,
            submitted_at: Utc::now(),
        }
    }

    /// `next` 가 뒤로 가는 전이가 아니면 이동. 종결 상태는 바뀌지 않음.
    /// 상태가 바뀌었는지 반환
    pub fn advance(&mut self, next: TxState) -> bool {
        if self.state.is_terminal() || next.rank() < self.state.rank() || next == self.state {
            return false;
        }
        self.state = next;
        true
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TxState::Confirmed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationStatus {
    Pending,
    Complete,
}

/// attestation 서비스가 돌려준 소각 증명
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub message: Bytes,
    pub attestation: Bytes,
    pub status: AttestationStatus,
}

/// 단일 체인의 관리형 지갑
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRef {
    pub wallet_id: String,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub network: String,
    pub asset: Asset,
    pub amount: Decimal,
    pub owner: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub source_network: String,
    pub destination_network: String,
    pub amount: Decimal,
    pub owner: String,
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingRequest {
    pub protocol: LendingProtocol,
    pub network: String,
    pub asset: Asset,
    pub amount: Decimal,
    pub owner: String,
}

/// 파싱이 끝난 사용자 작업
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Transfer(TransferRequest),
    CctpBridge(BridgeRequest),
    LendSupply(LendingRequest),
    LendWithdraw(LendingRequest),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Transfer(_) => OperationKind::Transfer,
            Operation::CctpBridge(_) => OperationKind::CctpBridge,
            Operation::LendSupply(_) => OperationKind::LendSupply,
            Operation::LendWithdraw(_) => OperationKind::LendWithdraw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Transfer,
    CctpBridge,
    LendSupply,
    LendWithdraw,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Transfer => "transfer",
            OperationKind::CctpBridge => "cctp-bridge",
            OperationKind::LendSupply => "lend-supply",
            OperationKind::LendWithdraw => "lend-withdraw",
        };
        write!(f, "{}", name)
    }
}

/// 호출자에게 돌려주는 최종 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperationOutcome {
    Succeeded {
        kind: OperationKind,
        transactions: Vec<TxHandle>,
        /// 관리형 지갑 밖에서 보낸 mint 의 해시 (relayer 정책)
        relayed_tx_hash: Option<String>,
        stages: Vec<String>,
    },
    Failed {
        kind: OperationKind,
        reason: String,
        last_stage: String,
        last_tx: Option<TxHandle>,
    },
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Succeeded { .. })
    }

    /// 사람이 읽는 요약 ("Successful" / "Failed: <reason>")
    pub fn summary(&self) -> String {
        match self {
            OperationOutcome::Succeeded { .. } => "Successful".to_string(),
            OperationOutcome::Failed { reason, .. } => format!("Failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_asset_parsing_is_case_insensitive() {
        assert_eq!("eth".parse::<Asset>().unwrap(), Asset::Eth);
        assert_eq!(" USDC ".parse::<Asset>().unwrap(), Asset::Usdc);
        assert!(matches!(
            "DAI".parse::<Asset>(),
            Err(EncodingError::UnsupportedAsset(_))
        ));
        assert_eq!(Asset::Usdc.decimals(), 6);
        assert!(Asset::Eth.is_native());
    }

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("AAVE".parse::<LendingProtocol>().unwrap(), LendingProtocol::Aave);
        assert_eq!("compound".parse::<LendingProtocol>().unwrap(), LendingProtocol::Compound);
        assert!("maker".parse::<LendingProtocol>().is_err());
    }

    #[test]
    fn test_batch_rejects_empty_and_keeps_order() {
        assert_eq!(Batch::new(vec![]), Err(EncodingError::EmptyBatch));

        let a = CallStep::new(address!("0000000000000000000000000000000000000001"), Bytes::from(vec![1u8]));
        let b = CallStep::with_value(
            address!("0000000000000000000000000000000000000002"),
            U256::from(5u64),
            Bytes::from(vec![2u8]),
        );
        let batch = Batch::new(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(batch.steps(), &[a, b]);
        assert_eq!(batch.total_value(), U256::from(5u64));
    }

    #[test]
    fn test_tx_state_is_monotonic() {
        let mut handle = TxHandle::submitted("tx-1");
        assert!(handle.advance(TxState::Pending));
        assert!(!handle.advance(TxState::Submitted));
        assert_eq!(handle.state, TxState::Pending);

        assert!(handle.advance(TxState::Confirmed));
        assert!(!handle.advance(TxState::Failed("FAILED".into())));
        assert!(!handle.advance(TxState::Pending));
        assert!(handle.is_confirmed());
    }

    #[test]
    fn test_failed_state_is_terminal() {
        let mut handle = TxHandle::submitted("tx-2");
        assert!(handle.advance(TxState::Failed("DENIED".into())));
        assert!(!handle.advance(TxState::Confirmed));
        assert_eq!(handle.state.to_string(), "FAILED(DENIED)");
    }

    #[test]
    fn test_outcome_summary() {
        let ok = OperationOutcome::Succeeded {
            kind: OperationKind::CctpBridge,
            transactions: vec![],
            relayed_tx_hash: None,
            stages: vec![],
        };
        assert_eq!(ok.summary(), "Successful");

        let failed = OperationOutcome::Failed {
            kind: OperationKind::LendSupply,
            reason: "burn failed".to_string(),
            last_stage: "INIT".to_string(),
            last_tx: None,
        };
        assert!(!failed.is_success());
        assert_eq!(failed.summary(), "Failed: burn failed");
    }
}
