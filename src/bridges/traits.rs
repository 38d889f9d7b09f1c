use async_trait::async_trait;

use crate::error::OrchestratorResult;
use crate::types::Attestation;

/// attestation 조회 한 번의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationPoll {
    /// 아직 준비 안 됨. 문자열에 이유 (미색인, 컨펌 대기 등)
    Pending(String),
    Complete(Attestation),
}

/// (소스 도메인, 소스 tx hash) 로 조회하는 소각 attestation 서비스
#[async_trait]
pub trait AttestationSource: Send + Sync {
    /// 조회 한 번. Pending 은 에러가 아니고, 전송 오류와 예상 밖 HTTP
    /// 응답은 에러
    async fn fetch(&self, source_domain: u32, tx_hash: &str) -> OrchestratorResult<AttestationPoll>;

    fn name(&self) -> &str;
}
