//! 포지션 도메인 모델.
//!
//! 거래소 포지션의 로컬 영속 레코드입니다. 상태 변경은 이름 있는
//! 전이 함수(`apply_sync_snapshot`, `apply_close` 등)를 통해서만 이루어지며,
//! 각 전이는 불변식을 보존합니다:
//!
//! - OPEN 동안 `size > 0`
//! - 상태 전이는 OPEN → CLOSED 단방향
//! - 실제 거래소 posId가 설정된 뒤에는 임시 ID로 되돌리지 않음
//! - 수수료 필드는 항상 절댓값 (부호는 경계에서 제거)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// 임시 포지션 ID 접두사.
///
/// 거래소가 실제 posId를 돌려주지 못한 경우에만 사용하는 로컬 생성 ID입니다.
pub const PLACEHOLDER_ID_PREFIX: &str = "temp_";

// =============================================================================
// 열거형
// =============================================================================

/// 포지션 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// 시장가 진입 주문의 side 값 ("buy" / "sell").
    pub fn entry_order_side(&self) -> &'static str {
        match self {
            PositionSide::Long => "buy",
            PositionSide::Short => "sell",
        }
    }

    /// 청산 주문의 side 값 (진입과 반대 방향).
    pub fn exit_order_side(&self) -> &'static str {
        match self {
            PositionSide::Long => "sell",
            PositionSide::Short => "buy",
        }
    }

    /// Hedge 모드에서 주문에 태깅하는 posSide 값.
    pub fn pos_side(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// 포지션 상태. CLOSED는 종료 상태이며 재개방은 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

// =============================================================================
// Position
// =============================================================================

/// 거래소 포지션의 로컬 영속 레코드.
///
/// 진입 주문 확인 직후 생성·저장되며, 동기화 작업(시세/PnL 필드)과
/// 청산 작업(종료 필드)에 의해서만 변경됩니다. 닫힌 포지션도 통계를 위해
/// 삭제하지 않고 보관합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 거래소가 부여한 포지션 ID. 복구 전까지는 `temp_` 접두사의 임시 ID.
    pub position_id: String,
    /// 이 포지션을 소유한 트레이딩 페어 ID.
    pub trading_pair_id: Option<i64>,
    /// 인스트루먼트 심볼 (예: "BTC-USDT-SWAP")
    pub symbol: String,
    /// 포지션 방향
    pub side: PositionSide,
    /// 계약 수량 (항상 양수)
    pub size: Decimal,
    /// 평균 진입가
    pub entry_price: Decimal,
    /// 청산 체결가 (닫힌 뒤에만 존재)
    pub closing_price: Option<Decimal>,
    /// 현재 마크 가격
    pub current_price: Decimal,
    /// 레버리지
    pub leverage: Decimal,
    /// 배정된 증거금 (USDT)
    pub allocated_amount: Decimal,
    /// 미실현 PnL (USDT)
    pub unrealized_pnl: Decimal,
    /// 미실현 PnL (%)
    pub unrealized_pnl_percent: Decimal,
    /// 실현 PnL (USDT)
    pub realized_pnl: Decimal,
    /// 실현 PnL (%)
    pub realized_pnl_percent: Decimal,
    /// 진입 수수료 (절댓값)
    pub opening_fees: Decimal,
    /// 청산 수수료 (절댓값)
    pub closing_fees: Decimal,
    /// 펀딩 수수료 (절댓값)
    pub funding_fees: Decimal,
    /// 진입+청산 합산 수수료 (절댓값)
    pub open_close_fees: Decimal,
    /// 진입+청산+펀딩 합산 수수료 (절댓값)
    pub open_close_funding_fees: Decimal,
    /// 포지션 상태
    pub status: PositionStatus,
    /// 진입 주문의 거래소 주문 ID
    pub external_order_id: String,
    /// 개설 시각
    pub opened_at: DateTime<Utc>,
    /// 마지막 갱신 시각
    pub last_updated_at: DateTime<Utc>,
}

/// 동기화 작업이 덮어쓰는 가변 필드 묶음.
///
/// 거래소 스냅샷에서 누락된 필드는 `None`으로 두면 기존 값이 유지됩니다.
#[derive(Debug, Clone, Default)]
pub struct SyncSnapshot {
    pub mark_price: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    /// 거래소가 주는 비율값 (0.02 = 2%). 저장 시 ×100.
    pub unrealized_pnl_ratio: Option<Decimal>,
    pub realized_pnl: Option<Decimal>,
    pub entry_price: Option<Decimal>,
    pub size: Option<Decimal>,
    pub opening_fees: Option<Decimal>,
    pub funding_fees: Option<Decimal>,
    pub margin: Option<Decimal>,
}

/// 청산 정합 결과. 거래소 청산 이력 레코드에서 복사되는 종료 필드 묶음.
#[derive(Debug, Clone)]
pub struct CloseOutcome {
    /// 실현 PnL (USDT, 수수료 차감 후)
    pub realized_pnl: Decimal,
    /// 실현 PnL 비율 (%)
    pub realized_pnl_percent: Decimal,
    /// 거래소가 보고한 진입+청산 합산 수수료
    pub combined_fee: Decimal,
    /// 누적 펀딩 수수료
    pub funding_fee: Decimal,
    /// 청산 체결가
    pub closing_price: Decimal,
}

impl Position {
    /// 임시 포지션 ID 생성 (`temp_` + UUID 앞 8자).
    pub fn placeholder_id() -> String {
        let uuid = Uuid::new_v4().to_string();
        format!("{}{}", PLACEHOLDER_ID_PREFIX, &uuid[..8])
    }

    /// 임시 ID 여부 판정.
    pub fn is_placeholder_id(id: &str) -> bool {
        id.starts_with(PLACEHOLDER_ID_PREFIX)
    }

    /// 체결 결과로부터 새 OPEN 포지션 생성.
    ///
    /// `position_id`가 비었거나 "N/A"이면 임시 ID를 생성합니다.
    /// 진입 시점에는 현재가 = 진입가입니다.
    #[allow(clippy::too_many_arguments)]
    pub fn open_from_fill(
        position_id: Option<String>,
        trading_pair_id: Option<i64>,
        symbol: impl Into<String>,
        side: PositionSide,
        size: Decimal,
        entry_price: Decimal,
        leverage: Decimal,
        allocated_amount: Decimal,
        opening_fees: Decimal,
        external_order_id: impl Into<String>,
    ) -> Self {
        let symbol = symbol.into();
        let position_id = match position_id {
            Some(id) if !id.is_empty() && id != "N/A" => id,
            _ => {
                let id = Self::placeholder_id();
                warn!(symbol = %symbol, placeholder = %id, "거래소 posId 미확보, 임시 ID 사용");
                id
            }
        };

        let now = Utc::now();
        Self {
            position_id,
            trading_pair_id,
            symbol,
            side,
            size,
            entry_price,
            closing_price: None,
            current_price: entry_price,
            leverage,
            allocated_amount,
            unrealized_pnl: Decimal::ZERO,
            unrealized_pnl_percent: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            realized_pnl_percent: Decimal::ZERO,
            opening_fees: opening_fees.abs(),
            closing_fees: Decimal::ZERO,
            funding_fees: Decimal::ZERO,
            open_close_fees: Decimal::ZERO,
            open_close_funding_fees: Decimal::ZERO,
            status: PositionStatus::Open,
            external_order_id: external_order_id.into(),
            opened_at: now,
            last_updated_at: now,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// 거래소 posId 할당.
    ///
    /// 이미 실제 ID가 설정된 포지션에 임시 ID를 덮어쓰는 시도는 무시합니다.
    pub fn assign_exchange_position_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if Self::is_placeholder_id(&id) && !Self::is_placeholder_id(&self.position_id) {
            warn!(
                current = %self.position_id,
                rejected = %id,
                "실제 posId를 임시 ID로 덮어쓰려는 시도 무시"
            );
            return;
        }
        self.position_id = id;
    }

    /// 동기화 스냅샷 반영.
    ///
    /// OPEN 포지션의 가변 필드만 덮어씁니다. CLOSED 포지션이면 아무것도
    /// 하지 않고 `false`를 반환합니다.
    pub fn apply_sync_snapshot(&mut self, snapshot: &SyncSnapshot) -> bool {
        if !self.is_open() {
            return false;
        }

        if let Some(mark_price) = snapshot.mark_price {
            self.current_price = mark_price;
        }
        if let Some(upl) = snapshot.unrealized_pnl {
            self.unrealized_pnl = upl;
        }
        if let Some(ratio) = snapshot.unrealized_pnl_ratio {
            // 0.02 -> 2%
            self.unrealized_pnl_percent = ratio * Decimal::ONE_HUNDRED;
        }
        if let Some(realized) = snapshot.realized_pnl {
            self.realized_pnl = realized;
        }
        if let Some(entry_price) = snapshot.entry_price {
            self.entry_price = entry_price;
        }
        if let Some(size) = snapshot.size {
            self.size = size.abs();
        }
        if let Some(fee) = snapshot.opening_fees {
            self.opening_fees = fee.abs();
        }
        if let Some(funding) = snapshot.funding_fees {
            self.funding_fees = funding.abs();
        }
        if let Some(margin) = snapshot.margin {
            self.allocated_amount = margin;
        }

        self.last_updated_at = Utc::now();
        true
    }

    /// 청산 정합 결과 반영 후 CLOSED로 전이.
    ///
    /// 청산 수수료는 합산 수수료에서 진입 수수료를 뺀 값입니다. 리베이트로
    /// 합산 수수료가 진입 수수료보다 작아지면 0으로 클램프합니다.
    /// CLOSED 포지션에는 적용되지 않으며 `false`를 반환합니다.
    pub fn apply_close(&mut self, outcome: &CloseOutcome) -> bool {
        if !self.is_open() {
            warn!(
                position_id = %self.position_id,
                "이미 닫힌 포지션에 대한 청산 전이 무시"
            );
            return false;
        }

        let combined = outcome.combined_fee.abs();
        let closing = combined - self.opening_fees.abs();
        if closing < Decimal::ZERO {
            warn!(
                position_id = %self.position_id,
                combined = %combined,
                opening = %self.opening_fees,
                "합산 수수료가 진입 수수료보다 작음 (리베이트?), 청산 수수료 0으로 클램프"
            );
        }

        self.realized_pnl = outcome.realized_pnl;
        self.realized_pnl_percent = outcome.realized_pnl_percent;
        self.closing_fees = closing.max(Decimal::ZERO);
        self.open_close_fees = combined;
        self.funding_fees = outcome.funding_fee.abs();
        self.open_close_funding_fees = combined + outcome.funding_fee.abs();
        self.closing_price = Some(outcome.closing_price);
        self.unrealized_pnl = Decimal::ZERO;
        self.unrealized_pnl_percent = Decimal::ZERO;
        self.status = PositionStatus::Closed;
        self.last_updated_at = Utc::now();
        true
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn open_position() -> Position {
        Position::open_from_fill(
            Some("123456789".to_string()),
            Some(7),
            "BTC-USDT-SWAP",
            PositionSide::Long,
            dec!(10),
            dec!(50000),
            dec!(5),
            dec!(1000),
            dec!(-0.25), // 부호는 절댓값으로 정규화되어야 함
            "ord-1",
        )
    }

    #[test]
    fn open_from_fill_normalizes_fee_sign() {
        let position = open_position();
        assert_eq!(position.opening_fees, dec!(0.25));
        assert_eq!(position.current_price, position.entry_price);
        assert!(position.is_open());
    }

    #[test]
    fn open_from_fill_generates_placeholder_when_id_missing() {
        let position = Position::open_from_fill(
            None,
            None,
            "ETH-USDT-SWAP",
            PositionSide::Short,
            dec!(1),
            dec!(3000),
            dec!(3),
            dec!(500),
            dec!(0.1),
            "ord-2",
        );
        assert!(Position::is_placeholder_id(&position.position_id));

        let na = Position::open_from_fill(
            Some("N/A".to_string()),
            None,
            "ETH-USDT-SWAP",
            PositionSide::Short,
            dec!(1),
            dec!(3000),
            dec!(3),
            dec!(500),
            dec!(0.1),
            "ord-3",
        );
        assert!(Position::is_placeholder_id(&na.position_id));
    }

    #[test]
    fn placeholder_never_overwrites_real_id() {
        let mut position = open_position();
        position.assign_exchange_position_id(Position::placeholder_id());
        assert_eq!(position.position_id, "123456789");

        // 임시 -> 실제 방향 승격은 허용
        let mut temp = open_position();
        temp.position_id = Position::placeholder_id();
        temp.assign_exchange_position_id("987654321");
        assert_eq!(temp.position_id, "987654321");
    }

    #[test]
    fn sync_snapshot_updates_only_mutable_fields() {
        let mut position = open_position();
        let snapshot = SyncSnapshot {
            mark_price: Some(dec!(51000)),
            unrealized_pnl: Some(dec!(20)),
            unrealized_pnl_ratio: Some(dec!(0.02)),
            realized_pnl: Some(dec!(0.5)),
            size: Some(dec!(-10)),
            opening_fees: Some(dec!(-0.3)),
            funding_fees: Some(dec!(-0.05)),
            margin: Some(dec!(999)),
            ..Default::default()
        };

        assert!(position.apply_sync_snapshot(&snapshot));
        assert_eq!(position.current_price, dec!(51000));
        assert_eq!(position.unrealized_pnl, dec!(20));
        assert_eq!(position.unrealized_pnl_percent, dec!(2.00));
        assert_eq!(position.size, dec!(10));
        assert_eq!(position.opening_fees, dec!(0.3));
        assert_eq!(position.funding_fees, dec!(0.05));
        assert_eq!(position.allocated_amount, dec!(999));
        // 진입가는 스냅샷에 없으면 유지
        assert_eq!(position.entry_price, dec!(50000));
    }

    #[test]
    fn sync_snapshot_ignored_after_close() {
        let mut position = open_position();
        position.apply_close(&CloseOutcome {
            realized_pnl: dec!(5),
            realized_pnl_percent: dec!(0.5),
            combined_fee: dec!(0.6),
            funding_fee: Decimal::ZERO,
            closing_price: dec!(50500),
        });

        let snapshot = SyncSnapshot {
            mark_price: Some(dec!(60000)),
            ..Default::default()
        };
        assert!(!position.apply_sync_snapshot(&snapshot));
        assert_eq!(position.current_price, dec!(50000));
    }

    #[test]
    fn close_decomposes_fees_from_combined() {
        let mut position = open_position(); // opening_fees = 0.25
        let applied = position.apply_close(&CloseOutcome {
            realized_pnl: dec!(12.5),
            realized_pnl_percent: dec!(1.25),
            combined_fee: dec!(-0.65),
            funding_fee: dec!(-0.1),
            closing_price: dec!(50250),
        });

        assert!(applied);
        assert_eq!(position.status, PositionStatus::Closed);
        // closingFees = |combined| - |opening|
        assert_eq!(position.closing_fees, dec!(0.40));
        assert_eq!(position.open_close_fees, dec!(0.65));
        assert_eq!(position.funding_fees, dec!(0.1));
        assert_eq!(position.open_close_funding_fees, dec!(0.75));
        assert_eq!(position.closing_price, Some(dec!(50250)));
        assert_eq!(position.unrealized_pnl, Decimal::ZERO);
    }

    #[test]
    fn close_clamps_negative_fee_decomposition() {
        let mut position = open_position(); // opening_fees = 0.25
        position.apply_close(&CloseOutcome {
            realized_pnl: dec!(1),
            realized_pnl_percent: dec!(0.1),
            combined_fee: dec!(0.1), // 리베이트로 합산 수수료 < 진입 수수료
            funding_fee: Decimal::ZERO,
            closing_price: dec!(50100),
        });
        assert_eq!(position.closing_fees, Decimal::ZERO);
    }

    #[test]
    fn close_is_terminal() {
        let mut position = open_position();
        let outcome = CloseOutcome {
            realized_pnl: dec!(1),
            realized_pnl_percent: dec!(0.1),
            combined_fee: dec!(0.5),
            funding_fee: Decimal::ZERO,
            closing_price: dec!(50100),
        };
        assert!(position.apply_close(&outcome));

        // CLOSED -> OPEN 역전이는 존재하지 않으며, 재청산도 무시됨
        let second = CloseOutcome {
            realized_pnl: dec!(99),
            ..outcome
        };
        assert!(!position.apply_close(&second));
        assert_eq!(position.realized_pnl, dec!(1));
    }
}
