use std::time::Duration;

use thiserror::Error;

/// 로컬 call data 구성 실패. 네트워크로 무엇이든 보내기 전에
/// 항상 발생한다.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Missing {contract} address mapping for {chain}")]
    MissingAddress { chain: String, contract: &'static str },

    #[error("Unsupported asset: {0}")]
    UnsupportedAsset(String),

    #[error("Unsupported lending protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error("Batch must contain at least one call")]
    EmptyBatch,
}

/// 작업 실행 중 발생하는 에러. 엔진 경계에서 잡혀
/// 실패한 `OperationOutcome` 으로 변환된다.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Transaction {tx_id} failed with state: {state}{}", fmt_reason(.reason))]
    Execution {
        tx_id: String,
        state: String,
        reason: Option<String>,
    },

    #[error("Transaction {tx_id} did not reach a terminal state within {waited:?}")]
    TransactionTimeout { tx_id: String, waited: Duration },

    #[error("Attestation for {tx_hash} (domain {domain}) not complete within {waited:?}")]
    AttestationTimeout {
        domain: u32,
        tx_hash: String,
        waited: Duration,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Sequence failed at step {failed_step} after {completed} confirmed step(s): {source}")]
    PartialSequenceFailure {
        completed: usize,
        failed_step: usize,
        #[source]
        source: Box<OrchestratorError>,
    },

    #[error("No managed wallet for owner {owner} on {chain}")]
    WalletNotFound { owner: String, chain: String },

    #[error("Relayer error: {0}")]
    Relayer(String),

    #[error("RPC error on {chain}: {message}")]
    Rpc { chain: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl OrchestratorError {
    /// 작업 전체를 처음부터 다시 실행해도 되는지 여부
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrchestratorError::Submission(_)
                | OrchestratorError::Http(_)
                | OrchestratorError::Rpc { .. }
                | OrchestratorError::TransactionTimeout { .. }
                | OrchestratorError::AttestationTimeout { .. }
        )
    }
}

fn fmt_reason(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default()
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_address_message_names_mapping() {
        let err = EncodingError::MissingAddress {
            chain: "optimism sepolia".to_string(),
            contract: "compound WETH comet",
        };
        assert_eq!(
            err.to_string(),
            "Missing compound WETH comet address mapping for optimism sepolia"
        );
    }

    #[test]
    fn test_execution_error_carries_state() {
        let err = OrchestratorError::Execution {
            tx_id: "tx-1".to_string(),
            state: "FAILED".to_string(),
            reason: Some("EXECUTION_REVERTED".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Transaction tx-1 failed with state: FAILED (EXECUTION_REVERTED)"
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_encoding_error_converts() {
        let err: OrchestratorError = EncodingError::ZeroAmount.into();
        assert!(matches!(err, OrchestratorError::Encoding(EncodingError::ZeroAmount)));
        assert!(OrchestratorError::Submission("no id".into()).is_retryable());
    }
}
