//! 포지션 영속화 추상화.
//!
//! 실행 엔진과 동기화 작업은 이 trait을 통해서만 포지션을 읽고 씁니다.
//! 프로덕션에서는 DB 기반 구현을 주입하고, 테스트와 단독 실행에는
//! `InMemoryPositionStore`를 사용합니다.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::position::{Position, PositionStatus};

/// 포지션 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 백엔드 에러 (DB 연결 실패 등)
    #[error("저장소 백엔드 에러: {0}")]
    Backend(String),
}

/// 포지션 저장소 trait.
///
/// `save`는 `position_id` 기준 upsert입니다. 닫힌 포지션도 통계를 위해
/// 삭제하지 않습니다.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// 포지션 저장 (upsert).
    async fn save(&self, position: Position) -> Result<(), StoreError>;

    /// 포지션 ID로 조회.
    async fn find(&self, position_id: &str) -> Result<Option<Position>, StoreError>;

    /// 심볼의 OPEN 포지션 조회 (심볼당 최대 1개 가정).
    async fn find_open_by_symbol(&self, symbol: &str) -> Result<Option<Position>, StoreError>;

    /// 모든 OPEN 포지션 조회.
    async fn open_positions(&self) -> Result<Vec<Position>, StoreError>;
}

/// 메모리 기반 포지션 저장소.
///
/// 프로세스당 하나를 만들어 `Arc`로 공유합니다. 동시 읽기/단일 쓰기는
/// `RwLock`이 보장합니다.
#[derive(Debug, Default)]
pub struct InMemoryPositionStore {
    positions: RwLock<HashMap<String, Position>>,
}

impl InMemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 전체 포지션 수 (테스트/점검용).
    pub async fn len(&self) -> usize {
        self.positions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.positions.read().await.is_empty()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn save(&self, position: Position) -> Result<(), StoreError> {
        let mut guard = self.positions.write().await;
        guard.insert(position.position_id.clone(), position);
        Ok(())
    }

    async fn find(&self, position_id: &str) -> Result<Option<Position>, StoreError> {
        let guard = self.positions.read().await;
        Ok(guard.get(position_id).cloned())
    }

    async fn find_open_by_symbol(&self, symbol: &str) -> Result<Option<Position>, StoreError> {
        let guard = self.positions.read().await;
        Ok(guard
            .values()
            .find(|p| p.symbol == symbol && p.status == PositionStatus::Open)
            .cloned())
    }

    async fn open_positions(&self) -> Result<Vec<Position>, StoreError> {
        let guard = self.positions.read().await;
        Ok(guard
            .values()
            .filter(|p| p.status == PositionStatus::Open)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::domain::position::{CloseOutcome, PositionSide};

    fn sample(symbol: &str, id: &str) -> Position {
        Position::open_from_fill(
            Some(id.to_string()),
            None,
            symbol,
            PositionSide::Long,
            dec!(1),
            dec!(100),
            dec!(2),
            dec!(50),
            dec!(0.05),
            "ord-1",
        )
    }

    #[tokio::test]
    async fn save_and_find() {
        let store = InMemoryPositionStore::new();
        store.save(sample("BTC-USDT-SWAP", "p-1")).await.unwrap();

        let found = store.find("p-1").await.unwrap();
        assert!(found.is_some());
        assert!(store.find("p-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_is_upsert() {
        let store = InMemoryPositionStore::new();
        let mut position = sample("BTC-USDT-SWAP", "p-1");
        store.save(position.clone()).await.unwrap();

        position.current_price = dec!(110);
        store.save(position).await.unwrap();

        assert_eq!(store.len().await, 1);
        let found = store.find("p-1").await.unwrap().unwrap();
        assert_eq!(found.current_price, dec!(110));
    }

    #[tokio::test]
    async fn open_filters_exclude_closed() {
        let store = InMemoryPositionStore::new();
        store.save(sample("BTC-USDT-SWAP", "p-1")).await.unwrap();

        let mut closed = sample("ETH-USDT-SWAP", "p-2");
        closed.apply_close(&CloseOutcome {
            realized_pnl: dec!(1),
            realized_pnl_percent: dec!(1),
            combined_fee: dec!(0.1),
            funding_fee: Decimal::ZERO,
            closing_price: dec!(101),
        });
        store.save(closed).await.unwrap();

        let open = store.open_positions().await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].position_id, "p-1");

        assert!(store
            .find_open_by_symbol("ETH-USDT-SWAP")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_open_by_symbol("BTC-USDT-SWAP")
            .await
            .unwrap()
            .is_some());
    }
}
