//! 거래소 청산 이력 레코드.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 거래소 청산 원장(positions-history)의 읽기 전용 투영.
///
/// 청산 작업의 PnL 정합에만 소비되며 로컬에 영속화하지 않습니다.
/// 시각 필드는 거래소가 주는 밀리초 epoch 문자열을 그대로 보존합니다
/// (정렬 비교는 숫자 파싱 후 수행).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionHistoryRecord {
    /// 인스트루먼트 타입 (예: "SWAP")
    pub instrument_type: String,
    /// 인스트루먼트 심볼
    pub instrument_id: String,
    /// 거래소 포지션 ID
    pub position_id: String,
    /// 포지션 방향 문자열 (거래소 원본)
    pub position_side: String,
    /// 개설 수량
    pub open_size: Decimal,
    /// 청산 수량
    pub close_size: Decimal,
    /// 평균 개설가
    pub avg_open_price: Decimal,
    /// 평균 청산가
    pub avg_close_price: Decimal,
    /// 실현 PnL (수수료 차감 후)
    pub realized_pnl: Decimal,
    /// 총 PnL (수수료 차감 전)
    pub pnl: Decimal,
    /// PnL 비율
    pub pnl_ratio: Decimal,
    /// 개설 시각 (밀리초 epoch 문자열)
    pub open_time: String,
    /// 청산 시각 (밀리초 epoch 문자열)
    pub close_time: String,
    /// 통화
    pub currency: String,
    /// 레버리지
    pub leverage: Decimal,
    /// 증거금
    pub margin: Decimal,
    /// 합산 수수료 (진입+청산, 거래소 부호 그대로)
    pub fee: Decimal,
    /// 누적 펀딩 수수료 (거래소 부호 그대로)
    pub funding_fee: Decimal,
}

impl PositionHistoryRecord {
    /// 청산 시각이 채워진 레코드인지 확인.
    pub fn has_close_time(&self) -> bool {
        !self.close_time.is_empty() && self.close_time != "N/A"
    }

    /// 청산 시각을 밀리초 epoch으로 파싱 (비교용, 실패 시 0).
    pub fn close_time_millis(&self) -> i64 {
        self.close_time.parse().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_time_presence() {
        let mut record = PositionHistoryRecord::default();
        assert!(!record.has_close_time());

        record.close_time = "N/A".to_string();
        assert!(!record.has_close_time());

        record.close_time = "1756163527776".to_string();
        assert!(record.has_close_time());
        assert_eq!(record.close_time_millis(), 1756163527776);
    }
}
