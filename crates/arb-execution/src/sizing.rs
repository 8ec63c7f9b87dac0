//! 주문 수량 및 증거금 계산.
//!
//! USDT 예산 + 레버리지를 거래소 적법 계약 수량으로 변환합니다.
//! 모든 반올림은 거래소 그리드 쪽으로 내림(floor)입니다 — 예산을
//! 넘어서는 쪽으로 올림하는 일은 없습니다. 금액 연산은 전부
//! `Decimal` 고정소수점입니다. 레버리지와 수수료 곱셈은 반올림
//! 오차가 누적되기 때문입니다.

use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::debug;

use arb_core::InstrumentInfo;
use arb_exchange::{ExchangeError, InstrumentCache, OkxRestClient};

/// 수량 산정 실패.
///
/// 모든 변형은 구체적 사유를 담습니다. 던지는 예외가 아니라 타입으로
/// 반환되며, 호출자(엔진)가 실패 `TradeResult`로 변환합니다.
#[derive(Debug, Error)]
pub enum SizingError {
    /// 현재가 조회 실패
    #[error("현재가 조회 실패: {0}")]
    PriceUnavailable(String),

    /// 인스트루먼트 정보 조회 실패
    #[error("인스트루먼트 정보 조회 실패: {0}")]
    InstrumentUnavailable(String),

    /// 유효하지 않은 입력 (예산/레버리지/가격이 0 이하)
    #[error("유효하지 않은 수량 산정 입력: {0}")]
    InvalidInput(String),

    /// 최소 랏 비용이 예산 초과 — 거래소 하한 아래로는 주문을 내지 않음
    #[error("예산 부족: 최소 랏 비용 {min_lot_cost} USDT > 예산 {budget} USDT")]
    BudgetBelowMinimumLot {
        min_lot_cost: Decimal,
        budget: Decimal,
    },

    /// 필요 증거금이 거래소 최소 증거금 미만
    #[error("증거금 {margin} USDT가 최소 {min_ccy_amt} USDT 미만")]
    BelowMinimumMargin {
        margin: Decimal,
        min_ccy_amt: Decimal,
    },

    /// 조건부 가치가 거래소 최소 조건부 가치 미만
    #[error("조건부 가치 {notional} USDT가 최소 {min_notional} USDT 미만")]
    BelowMinimumNotional {
        notional: Decimal,
        min_notional: Decimal,
    },
}

/// 수량 산정 입력.
#[derive(Debug, Clone)]
pub struct SizingInputs {
    /// 증거금 예산 (USDT)
    pub budget: Decimal,
    /// 레버리지
    pub leverage: Decimal,
    /// 현재 마크 가격
    pub price: Decimal,
    /// 계약 제약
    pub instrument: InstrumentInfo,
}

/// 승인된 주문 수량과 파생 값.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizedOrder {
    /// 계약 수량 (lot grid의 정수배, >= minSz)
    pub contracts: Decimal,
    /// 조건부 가치 = contracts × ctVal × price
    pub notional: Decimal,
    /// 필요 증거금 = notional ÷ leverage (소수 2자리, half-up)
    pub required_margin: Decimal,
}

/// 예산/레버리지를 거래소 적법 계약 수량으로 변환 (순수 함수).
///
/// 1. 최소 랏 비용 `minSz × ctVal × price ÷ lev`가 예산을 넘으면 실패
/// 2. 최대 계약 수 `budget × lev ÷ (ctVal × price)`를 소수 8자리로 내림
/// 3. lot grid로 내림, `minSz` 미만이면 비용이 예산 안일 때만 `minSz`로 클램프
/// 4. 최소 증거금(`minCcyAmt`)과 최소 조건부 가치(`minNotional`) 재검증
pub fn size_order(inputs: &SizingInputs) -> Result<SizedOrder, SizingError> {
    let SizingInputs {
        budget,
        leverage,
        price,
        instrument,
    } = inputs;

    if *budget <= Decimal::ZERO {
        return Err(SizingError::InvalidInput(format!("예산 {budget} <= 0")));
    }
    if *leverage <= Decimal::ZERO {
        return Err(SizingError::InvalidInput(format!("레버리지 {leverage} <= 0")));
    }
    if *price <= Decimal::ZERO {
        return Err(SizingError::InvalidInput(format!("가격 {price} <= 0")));
    }

    let contract_value = instrument.contract_value;
    let lot_size = instrument.lot_size;
    let min_size = instrument.min_size;

    // 1. 최소 랏 비용 게이트
    let min_lot_cost = margin_cost(min_size, contract_value, *price, *leverage);
    if min_lot_cost > *budget {
        return Err(SizingError::BudgetBelowMinimumLot {
            min_lot_cost,
            budget: *budget,
        });
    }

    // 2. 예산 내 최대 계약 수 (소수 8자리 내림)
    let max_contracts = (*budget * *leverage / (contract_value * *price))
        .round_dp_with_strategy(8, RoundingStrategy::ToZero);

    // 3. lot grid로 내림
    let mut contracts = if lot_size > Decimal::ZERO {
        (max_contracts / lot_size).floor() * lot_size
    } else {
        max_contracts
    };

    // minSz 미만이면 비용이 예산에 들어갈 때만 minSz로 클램프
    if contracts < min_size {
        contracts = min_size;
        let clamped_cost = margin_cost(contracts, contract_value, *price, *leverage);
        if clamped_cost > *budget {
            return Err(SizingError::BudgetBelowMinimumLot {
                min_lot_cost: clamped_cost,
                budget: *budget,
            });
        }
    }

    let notional = contracts * contract_value * *price;
    let required_margin = margin_cost(contracts, contract_value, *price, *leverage);

    // 최종 비용이 예산을 넘지 않는지 재확인
    if required_margin > *budget {
        return Err(SizingError::BudgetBelowMinimumLot {
            min_lot_cost: required_margin,
            budget: *budget,
        });
    }

    // 4. 거래소 최소 요건 재검증
    if required_margin < instrument.min_ccy_amt {
        return Err(SizingError::BelowMinimumMargin {
            margin: required_margin,
            min_ccy_amt: instrument.min_ccy_amt,
        });
    }
    if notional < instrument.min_notional {
        return Err(SizingError::BelowMinimumNotional {
            notional,
            min_notional: instrument.min_notional,
        });
    }

    debug!(
        symbol = %instrument.symbol,
        contracts = %contracts,
        notional = %notional,
        required_margin = %required_margin,
        budget = %budget,
        "주문 수량 승인"
    );
    Ok(SizedOrder {
        contracts,
        notional,
        required_margin,
    })
}

/// 증거금 비용 = size × ctVal × price ÷ lev (소수 2자리, half-up).
fn margin_cost(size: Decimal, contract_value: Decimal, price: Decimal, leverage: Decimal) -> Decimal {
    (size * contract_value * price / leverage)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// 시세/인스트루먼트 조회가 결합된 수량 산정기.
pub struct OrderSizer {
    client: Arc<OkxRestClient>,
    instruments: Arc<InstrumentCache>,
}

impl OrderSizer {
    pub fn new(client: Arc<OkxRestClient>, instruments: Arc<InstrumentCache>) -> Self {
        Self {
            client,
            instruments,
        }
    }

    /// 심볼의 현재가와 계약 제약을 조회한 뒤 수량을 산정.
    pub async fn size(
        &self,
        symbol: &str,
        budget: Decimal,
        leverage: Decimal,
    ) -> Result<(SizedOrder, Decimal), SizingError> {
        let price = self
            .client
            .current_price(symbol)
            .await
            .map_err(|e| SizingError::PriceUnavailable(describe(&e)))?;

        let instrument = self
            .instruments
            .get(symbol)
            .await
            .map_err(|e| SizingError::InstrumentUnavailable(describe(&e)))?;

        let sized = size_order(&SizingInputs {
            budget,
            leverage,
            price,
            instrument,
        })?;
        Ok((sized, price))
    }
}

fn describe(error: &ExchangeError) -> String {
    error.to_string()
}
