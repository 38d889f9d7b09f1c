use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::constants::{DEFAULT_MAX_IN_FLIGHT, DEFAULT_MIN_SPACING};

/// 같은 서비스와 통신하는 모든 흐름이 공유하는 엔드포인트별 limiter.
///
/// 세마포어로 동시 요청 수를 제한하고 요청 시작 사이에
/// 최소 간격을 둔다.
#[derive(Debug, Clone)]
pub struct EndpointLimiter {
    name: Arc<str>,
    permits: Arc<Semaphore>,
    min_spacing: Duration,
    next_slot: Arc<Mutex<Instant>>,
}

impl EndpointLimiter {
    pub fn new(name: &str, max_in_flight: usize, min_spacing: Duration) -> Self {
        Self {
            name: Arc::from(name),
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            min_spacing,
            next_slot: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn with_defaults(name: &str) -> Self {
        Self::new(name, DEFAULT_MAX_IN_FLIGHT, DEFAULT_MIN_SPACING)
    }

    /// 테스트와 mock 구성용 무제한 limiter
    pub fn unlimited(name: &str) -> Self {
        Self::new(name, Semaphore::MAX_PERMITS, Duration::ZERO)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 요청 슬롯 대기. permit 이 drop 되면 반환된다
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        // 세마포어는 닫히지 않음
        let permit = loop {
            if let Ok(p) = self.permits.clone().acquire_owned().await {
                break p;
            }
        };

        if !self.min_spacing.is_zero() {
            let start_at = {
                let mut next = self.next_slot.lock().await;
                let now = Instant::now();
                let start_at = if *next > now { *next } else { now };
                *next = start_at + self.min_spacing;
                start_at
            };
            if start_at > Instant::now() {
                debug!("⏳ {} 요청 간격 대기", self.name);
                sleep_until(start_at).await;
            }
        }

        permit
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
