use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Bytes;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::traits::{AttestationPoll, AttestationSource};
use crate::constants::{ATTESTATION_POLL_INTERVAL, ATTESTATION_POLL_TIMEOUT};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::execution::submitter::PollPolicy;
use crate::types::{Attestation, AttestationStatus};
use crate::utils::rate_limit::EndpointLimiter;

#[derive(Debug, Deserialize)]
struct IrisMessagesResponse {
    #[serde(default)]
    messages: Vec<IrisMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IrisMessage {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    attestation: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl IrisMessage {
    fn into_poll(self) -> OrchestratorResult<AttestationPoll> {
        let status = self.status.unwrap_or_default();
        if !status.eq_ignore_ascii_case("complete") {
            return Ok(AttestationPoll::Pending(format!("status {}", status)));
        }

        let (Some(message), Some(attestation)) = (self.message, self.attestation) else {
            return Ok(AttestationPoll::Pending("complete without payload".to_string()));
        };
        Ok(AttestationPoll::Complete(Attestation {
            message: decode_hex(&message)?,
            attestation: decode_hex(&attestation)?,
            status: AttestationStatus::Complete,
        }))
    }
}

fn decode_hex(value: &str) -> OrchestratorResult<Bytes> {
    let raw = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(raw)
        .map(Bytes::from)
        .map_err(|e| OrchestratorError::Api {
            status: 200,
            message: format!("attestation payload is not hex: {}", e),
        })
}

/// Circle Iris attestation API 클라이언트
#[derive(Debug, Clone)]
pub struct IrisAttestationClient {
    client: Client,
    base_url: String,
    limiter: EndpointLimiter,
}

impl IrisAttestationClient {
    pub fn new(base_url: &str, limiter: EndpointLimiter, request_timeout: Duration) -> OrchestratorResult<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter,
        })
    }

    fn messages_url(&self, source_domain: u32) -> String {
        format!("{}/v2/messages/{}", self.base_url, source_domain)
    }
}

#[async_trait]
impl AttestationSource for IrisAttestationClient {
    async fn fetch(&self, source_domain: u32, tx_hash: &str) -> OrchestratorResult<AttestationPoll> {
        let _permit = self.limiter.acquire().await;
        let response = self
            .client
            .get(self.messages_url(source_domain))
            .query(&[("transactionHash", tx_hash)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(AttestationPoll::Pending("not indexed yet".to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("⚠️ Iris rate limit (429), 다음 주기에 재시도");
            return Ok(AttestationPoll::Pending("rate limited".to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: IrisMessagesResponse = response.json().await?;
        match body.messages.into_iter().next() {
            Some(message) => message.into_poll(),
            None => Ok(AttestationPoll::Pending("no messages".to_string())),
        }
    }

    fn name(&self) -> &str {
        "iris"
    }
}

/// attestation 이 완료될 때까지 `AttestationSource` 를 폴링
pub struct AttestationRetriever {
    source: Arc<dyn AttestationSource>,
    policy: PollPolicy,
}

impl AttestationRetriever {
    pub fn new(source: Arc<dyn AttestationSource>, policy: PollPolicy) -> Self {
        Self { source, policy }
    }

    pub fn default_policy() -> PollPolicy {
        PollPolicy {
            interval: ATTESTATION_POLL_INTERVAL,
            timeout: ATTESTATION_POLL_TIMEOUT,
        }
    }

    pub async fn retrieve(
        &self,
        source_domain: u32,
        tx_hash: &str,
        cancel: &CancellationToken,
    ) -> OrchestratorResult<Attestation> {
        let deadline = Instant::now() + self.policy.timeout;
        info!(domain = source_domain, tx_hash = %tx_hash, "🔎 attestation 조회 시작");

        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                result = self.source.fetch(source_domain, tx_hash) => result?,
            };

            match polled {
                AttestationPoll::Complete(attestation) => {
                    info!(domain = source_domain, tx_hash = %tx_hash, "✅ attestation 완료");
                    return Ok(attestation);
                }
                AttestationPoll::Pending(reason) => {
                    debug!(tx_hash = %tx_hash, "⏳ attestation 대기 중: {}", reason);
                }
            }

            if Instant::now() + self.policy.interval > deadline {
                return Err(OrchestratorError::AttestationTimeout {
                    domain: source_domain,
                    tx_hash: tx_hash.to_string(),
                    waited: self.policy.timeout,
                });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(OrchestratorError::Cancelled),
                _ = sleep(self.policy.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockAttestationSource;

    fn policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_then_complete() {
        let source = Arc::new(MockAttestationSource::complete_after(3));
        let retriever = AttestationRetriever::new(source.clone(), policy());

        let attestation = retriever
            .retrieve(0, "0xburn", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(attestation.status, AttestationStatus::Complete);
        assert_eq!(source.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_when_never_complete() {
        let source = Arc::new(MockAttestationSource::never_complete());
        let retriever = AttestationRetriever::new(source, policy());

        let err = retriever
            .retrieve(6, "0xburn", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::AttestationTimeout { domain: 6, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_errors_propagate_immediately() {
        let source = Arc::new(MockAttestationSource::failing(500));
        let retriever = AttestationRetriever::new(source.clone(), policy());

        let err = retriever
            .retrieve(0, "0xburn", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Api { status: 500, .. }));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting() {
        let source = Arc::new(MockAttestationSource::never_complete());
        let retriever = AttestationRetriever::new(source, policy());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = retriever.retrieve(0, "0xburn", &cancel).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Cancelled));
    }

    #[test]
    fn test_iris_message_parsing() {
        let raw = r#"{"messages":[{"message":"0x0102","attestation":"0xaabb","eventNonce":"9","status":"complete"}]}"#;
        let body: IrisMessagesResponse = serde_json::from_str(raw).unwrap();
        let poll = body.messages.into_iter().next().unwrap().into_poll().unwrap();
        match poll {
            AttestationPoll::Complete(a) => {
                assert_eq!(a.message.as_ref(), &[0x01, 0x02]);
                assert_eq!(a.attestation.as_ref(), &[0xaa, 0xbb]);
            }
            other => panic!("expected complete, got {:?}", other),
        }
    }

    #[test]
    fn test_iris_pending_status() {
        let raw = r#"{"messages":[{"message":"0x","attestation":"PENDING","status":"pending_confirmations"}]}"#;
        let body: IrisMessagesResponse = serde_json::from_str(raw).unwrap();
        let poll = body.messages.into_iter().next().unwrap().into_poll().unwrap();
        assert!(matches!(poll, AttestationPoll::Pending(_)));

        let empty: IrisMessagesResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.messages.is_empty());
    }
}
