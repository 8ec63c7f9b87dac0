//! 거래 시도 결과 타입.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::Position;

/// 거래 작업 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOperation {
    OpenLong,
    OpenShort,
    ClosePosition,
}

impl std::fmt::Display for TradeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeOperation::OpenLong => write!(f, "OPEN_LONG"),
            TradeOperation::OpenShort => write!(f, "OPEN_SHORT"),
            TradeOperation::ClosePosition => write!(f, "CLOSE_POSITION"),
        }
    }
}

/// 단일 실행 시도(진입/청산/조회)의 결과.
///
/// 생성 후 불변입니다. 부분 체결 상태는 없으며, 시도 단위로
/// 종결된 성공 또는 종결된 실패 중 하나입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResult {
    /// 작업 성공 여부
    pub success: bool,
    /// 생성/청산된 포지션 ID
    pub position_id: Option<String>,
    /// 작업 종류
    pub operation: TradeOperation,
    /// 인스트루먼트 심볼
    pub symbol: String,
    /// 실제 체결 수량
    pub executed_size: Decimal,
    /// 체결 가격
    pub execution_price: Decimal,
    /// 수수료 (절댓값)
    pub fees: Decimal,
    /// 실현 PnL (청산 작업에만 의미 있음, USDT)
    pub pnl: Decimal,
    /// 실현 PnL (%)
    pub pnl_percent: Decimal,
    /// 거래소 주문 ID
    pub external_order_id: Option<String>,
    /// 성공 시 첨부되는 포지션 스냅샷
    pub position: Option<Position>,
    /// 실패 사유 (`success == false`일 때만 존재)
    pub error_message: Option<String>,
    /// 실행 시각
    pub executed_at: DateTime<Utc>,
}

impl TradeResult {
    /// 성공 결과 생성.
    pub fn success(
        operation: TradeOperation,
        symbol: impl Into<String>,
        executed_size: Decimal,
        execution_price: Decimal,
        fees: Decimal,
        external_order_id: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            position_id: None,
            operation,
            symbol: symbol.into(),
            executed_size,
            execution_price,
            fees: fees.abs(),
            pnl: Decimal::ZERO,
            pnl_percent: Decimal::ZERO,
            external_order_id: Some(external_order_id.into()),
            position: None,
            error_message: None,
            executed_at: Utc::now(),
        }
    }

    /// 실패 결과 생성.
    pub fn failure(
        operation: TradeOperation,
        symbol: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            position_id: None,
            operation,
            symbol: symbol.into(),
            executed_size: Decimal::ZERO,
            execution_price: Decimal::ZERO,
            fees: Decimal::ZERO,
            pnl: Decimal::ZERO,
            pnl_percent: Decimal::ZERO,
            external_order_id: None,
            position: None,
            error_message: Some(error_message.into()),
            executed_at: Utc::now(),
        }
    }

    /// 실현 PnL 설정 (청산 결과 빌드용).
    pub fn with_pnl(mut self, pnl: Decimal, pnl_percent: Decimal) -> Self {
        self.pnl = pnl;
        self.pnl_percent = pnl_percent;
        self
    }

    /// 포지션 첨부 (진입/청산 성공 결과 빌드용).
    pub fn with_position(mut self, position: Position) -> Self {
        self.position_id = Some(position.position_id.clone());
        self.position = Some(position);
        self
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn success_normalizes_fee_sign() {
        let result = TradeResult::success(
            TradeOperation::OpenLong,
            "BTC-USDT-SWAP",
            dec!(10),
            dec!(50000),
            dec!(-0.25),
            "ord-1",
        );
        assert!(result.success);
        assert_eq!(result.fees, dec!(0.25));
        assert!(result.error_message.is_none());
    }

    #[test]
    fn failure_carries_reason() {
        let result = TradeResult::failure(
            TradeOperation::ClosePosition,
            "BTC-USDT-SWAP",
            "Insufficient margin",
        );
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("Insufficient margin"));
        assert_eq!(result.executed_size, Decimal::ZERO);
        assert!(result.position.is_none());
    }
}
