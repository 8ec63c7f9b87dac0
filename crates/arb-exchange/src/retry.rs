//! 고정 간격 bounded 폴링 유틸리티.
//!
//! 비동기 최종 일관성 시스템(주문 체결, 청산 이력 반영)을 상대로
//! 인라인 sleep 루프 대신 이름 있는 타이밍 정책을 제공합니다.
//! 정책은 `(최대 시도 횟수, 간격)`으로 구성되어 테스트에서 축소할 수
//! 있습니다.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// 폴링 정책: 최대 시도 횟수와 시도 간 고정 대기 시간.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (1 이상)
    pub max_attempts: u32,
    /// 시도 간 대기 시간
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// 단일 시도 (대기 없음).
    pub const fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// 조건을 만족하는 후보가 나올 때까지 고정 간격으로 폴링.
///
/// 각 시도마다 `operation(attempt)`이 후보를 내놓으면 `accept`로
/// 판정합니다. 수락되면 즉시 반환하고, 수락되지 않은 후보는 기억해 두었다가
/// 시도 횟수를 소진하면 best-effort 폴백으로 반환합니다. 어떤 시도도
/// 후보를 내지 못했으면 `None`입니다.
///
/// 시도 횟수는 최소 1로 클램프됩니다.
pub async fn poll_until<T, F, Fut, P>(policy: &RetryPolicy, operation: F, accept: P) -> Option<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Option<T>>,
    P: Fn(&T) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut fallback: Option<T> = None;

    for attempt in 1..=max_attempts {
        if let Some(candidate) = operation(attempt).await {
            if accept(&candidate) {
                debug!(attempt, max_attempts, "폴링 성공");
                return Some(candidate);
            }
            fallback = Some(candidate);
        }

        if attempt < max_attempts {
            debug!(
                attempt,
                max_attempts,
                delay_ms = policy.delay.as_millis() as u64,
                "조건 불만족, 다음 시도 대기"
            );
            tokio::time::sleep(policy.delay).await;
        }
    }

    fallback
}
