//! 포지션 동기화 작업.
//!
//! 거래소 라이브 포지션 스냅샷을 주기적으로 당겨와 로컬 OPEN 포지션의
//! 가변 필드(마크 가격, PnL, 수량, 수수료, 증거금)만 덮어씁니다.
//!
//! 정책:
//! - 로컬 레코드가 없는 거래소 포지션은 무시 (자동 편입 금지)
//! - 거래소 스냅샷에 없는 로컬 포지션은 그대로 둠 (자동 청산 금지 —
//!   청산은 오직 명시적 close 전이로만)
//!
//! 같은 심볼에 대한 동기화와 진입/청산이 경합할 수 있으나, 둘 다 같은
//! 거래소 소스에서 파생된 값을 쓰므로 마지막 쓰기 승리로 충분합니다.

use std::sync::Arc;

use tracing::{debug, error, info};

use arb_core::{PositionStore, SyncSnapshot};
use arb_exchange::{parse_decimal, OkxPositionData, OkxRestClient};

/// 거래소 스냅샷 → 로컬 포지션 동기화 작업.
///
/// 스케줄러(크론 등)에서 주기적으로 호출되는 독립 플로우입니다.
pub struct PositionSyncJob {
    client: Arc<OkxRestClient>,
    store: Arc<dyn PositionStore>,
}

impl PositionSyncJob {
    pub fn new(client: Arc<OkxRestClient>, store: Arc<dyn PositionStore>) -> Self {
        Self { client, store }
    }

    /// 모든 로컬 OPEN 포지션 동기화. 갱신된 포지션 수를 반환.
    pub async fn sync_all(&self) -> usize {
        self.sync_internal(None).await
    }

    /// 지정한 심볼들만 동기화. 갱신된 포지션 수를 반환.
    pub async fn sync_symbols(&self, symbols: &[String]) -> usize {
        self.sync_internal(Some(symbols)).await
    }

    async fn sync_internal(&self, filter: Option<&[String]>) -> usize {
        let snapshot = match self.client.positions(None).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("포지션 스냅샷 조회 실패: {e}");
                return 0;
            }
        };
        debug!(count = snapshot.len(), "거래소 포지션 스냅샷 수신");

        let mut updated = 0;
        for record in &snapshot {
            if record.inst_id.is_empty() {
                debug!("instId가 빈 포지션 레코드 건너뜀");
                continue;
            }
            if let Some(symbols) = filter {
                if !symbols.iter().any(|s| s == &record.inst_id) {
                    continue;
                }
            }

            if self.apply_record(record).await {
                updated += 1;
            }
        }

        info!(updated, total = snapshot.len(), "포지션 동기화 완료");
        updated
    }

    /// 스냅샷 레코드 하나를 매칭되는 로컬 OPEN 포지션에 반영.
    async fn apply_record(&self, record: &OkxPositionData) -> bool {
        let mut position = match self.store.find_open_by_symbol(&record.inst_id).await {
            Ok(Some(position)) => position,
            Ok(None) => {
                // 로컬에서 추적하지 않는 거래소 포지션 — 편입하지 않음
                debug!(symbol = %record.inst_id, "매칭되는 로컬 포지션 없음, 무시");
                return false;
            }
            Err(e) => {
                error!(symbol = %record.inst_id, "로컬 포지션 조회 실패: {e}");
                return false;
            }
        };

        let snapshot = SyncSnapshot {
            mark_price: parse_decimal(&record.mark_px),
            unrealized_pnl: parse_decimal(&record.upl),
            unrealized_pnl_ratio: parse_decimal(&record.upl_ratio),
            realized_pnl: parse_decimal(&record.realized_pnl),
            entry_price: parse_decimal(&record.avg_px),
            size: parse_decimal(&record.pos),
            opening_fees: parse_decimal(&record.fee),
            funding_fees: parse_decimal(&record.funding_fee),
            margin: parse_decimal(&record.margin),
        };

        if !position.apply_sync_snapshot(&snapshot) {
            return false;
        }

        match self.store.save(position.clone()).await {
            Ok(()) => {
                debug!(
                    symbol = %record.inst_id,
                    position_id = %position.position_id,
                    mark_price = %position.current_price,
                    unrealized_pnl = %position.unrealized_pnl,
                    size = %position.size,
                    "포지션 동기화 반영"
                );
                true
            }
            Err(e) => {
                error!(symbol = %record.inst_id, "동기화 포지션 저장 실패: {e}");
                false
            }
        }
    }
}
