use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::Bytes;
use async_trait::async_trait;
use tracing::debug;

use crate::bridges::traits::{AttestationPoll, AttestationSource};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::types::{Attestation, AttestationStatus};

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    CompleteAfter(usize),
    Never,
    Failing(u16),
}

/// 고정된 응답 패턴의 attestation 서비스
pub struct MockAttestationSource {
    behaviour: Behaviour,
    calls: AtomicUsize,
    last_domain: Mutex<Option<u32>>,
}

impl MockAttestationSource {
    fn with(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            calls: AtomicUsize::new(0),
            last_domain: Mutex::new(None),
        }
    }

    /// 처음 `pending` 번은 대기, 이후 완료
    pub fn complete_after(pending: usize) -> Self {
        Self::with(Behaviour::CompleteAfter(pending))
    }

    pub fn never_complete() -> Self {
        Self::with(Behaviour::Never)
    }

    /// 모든 조회가 이 HTTP status 로 실패
    pub fn failing(status: u16) -> Self {
        Self::with(Behaviour::Failing(status))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_domain(&self) -> Option<u32> {
        *self.last_domain.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl AttestationSource for MockAttestationSource {
    async fn fetch(&self, source_domain: u32, tx_hash: &str) -> OrchestratorResult<AttestationPoll> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_domain.lock().unwrap_or_else(|p| p.into_inner()) = Some(source_domain);
        debug!("🎭 attestation 조회 #{}: {} (도메인 {})", call + 1, tx_hash, source_domain);

        match self.behaviour {
            Behaviour::Failing(status) => Err(OrchestratorError::Api {
                status,
                message: "mock attestation service error".to_string(),
            }),
            Behaviour::CompleteAfter(pending) if call >= pending => Ok(AttestationPoll::Complete(Attestation {
                message: Bytes::from(tx_hash.as_bytes().to_vec()),
                attestation: Bytes::from(vec![0xaa; 65]),
                status: AttestationStatus::Complete,
            })),
            Behaviour::CompleteAfter(_) | Behaviour::Never => {
                Ok(AttestationPoll::Pending("pending_confirmations".to_string()))
            }
        }
    }

    fn name(&self) -> &str {
        "mock-attestation"
    }
}
