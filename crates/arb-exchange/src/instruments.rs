//! 인스트루먼트 메타데이터 캐시.
//!
//! 심볼별 계약 제약(lot size, 최소 수량 등)의 read-through 캐시입니다.
//! 미스 시 공개 인스트루먼트 엔드포인트에서 조회해 영구 저장합니다.
//! 계약 스펙은 드물게 바뀌므로 만료 없이 프로세스 수명 동안 유지합니다.
//!
//! 동시 미스로 같은 심볼을 두 번 조회하는 경합은 무해합니다 —
//! 조회 결과가 멱등이므로 마지막 쓰기가 남아도 값은 같습니다.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use arb_core::InstrumentInfo;

use crate::client::OkxRestClient;
use crate::error::ExchangeError;

/// 심볼별 인스트루먼트 정보 read-through 캐시.
///
/// 수명: 프로세스당 1개, `Arc`로 공유, 동시 사용 안전.
pub struct InstrumentCache {
    client: Arc<OkxRestClient>,
    cache: RwLock<HashMap<String, InstrumentInfo>>,
}

impl InstrumentCache {
    pub fn new(client: Arc<OkxRestClient>) -> Self {
        Self {
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// 인스트루먼트 정보 조회 (캐시 우선).
    pub async fn get(&self, symbol: &str) -> Result<InstrumentInfo, ExchangeError> {
        if let Some(cached) = self.cache.read().await.get(symbol) {
            debug!(symbol, "인스트루먼트 캐시 히트");
            return Ok(cached.clone());
        }

        let info = self.client.fetch_instrument(symbol).await?;

        let mut guard = self.cache.write().await;
        guard.insert(symbol.to_string(), info.clone());
        Ok(info)
    }

    /// 캐시된 심볼 수 (점검용).
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }
}
