//! 인스트루먼트 계약 메타데이터.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 심볼별 거래소 계약 제약.
///
/// 최초 사용 시 한 번 조회해 프로세스 수명 동안 재사용합니다.
/// 계약 스펙은 드물게 바뀌므로 스테일 허용이 설계상 트레이드오프입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentInfo {
    /// 인스트루먼트 심볼
    pub symbol: String,
    /// 수량 증분 단위 (lotSz)
    pub lot_size: Decimal,
    /// 최소 주문 수량 (minSz)
    pub min_size: Decimal,
    /// 최소 증거금 통화 금액 (minCcyAmt)
    pub min_ccy_amt: Decimal,
    /// 최소 조건부 가치 (minNotional)
    pub min_notional: Decimal,
    /// 계약당 기초자산 수량 (ctVal)
    pub contract_value: Decimal,
}
