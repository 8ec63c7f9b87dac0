//! 포지션 수명주기 엔진.
//!
//! 진입/청산 작업을 거래소에 대해 수행하고, 결과를 로컬 포지션 레코드로
//! 정합합니다. 거래소는 비동기 최종 일관성 시스템이므로 주문 직후의
//! 조회는 고정 대기 후 bounded 폴링으로 수행하며, 복구 실패는 전체
//! 작업을 중단시키지 않고 폴백 값으로 강등됩니다.
//!
//! 모든 작업은 실패를 `TradeResult::failure`로 반환합니다 — 이 경계
//! 밖으로 패닉이나 원시 에러가 새어 나가지 않고, 실패한 시도는 기존
//! 상태를 건드리지 않아 호출자가 안전하게 재시도할 수 있습니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use arb_core::{
    CloseOutcome, Position, PositionHistoryRecord, PositionSide, PositionStore, TradeOperation,
    TradeResult,
};
use arb_exchange::{
    parse_decimal, ExchangeError, InstrumentCache, MarketOrderRequest, OkxRestClient, RetryPolicy,
};

use crate::sizing::OrderSizer;

use arb_exchange::retry::poll_until;

// ==================== 설정 ====================

/// 엔진 타이밍 정책.
///
/// 체결/정합 대기는 호출 태스크 위의 명시적 지연입니다. 테스트에서는
/// 전부 0 근처로 줄일 수 있습니다.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 주문 제출 후 체결 상세 조회까지 대기
    pub order_settle_delay: Duration,
    /// 체결 후 라이브 포지션 반영까지 대기 (posId 복구용)
    pub position_lookup_delay: Duration,
    /// 청산 주문 후 청산 이력 반영까지 대기
    pub close_history_delay: Duration,
    /// 청산 이력 폴링 정책
    pub history_poll: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            order_settle_delay: Duration::from_secs(2),
            position_lookup_delay: Duration::from_secs(1),
            close_history_delay: Duration::from_secs(3),
            history_poll: RetryPolicy::new(3, Duration::from_secs(2)),
        }
    }
}

impl EngineConfig {
    /// 대기 없는 설정 (테스트용).
    pub fn immediate() -> Self {
        Self {
            order_settle_delay: Duration::ZERO,
            position_lookup_delay: Duration::ZERO,
            close_history_delay: Duration::ZERO,
            history_poll: RetryPolicy::new(3, Duration::ZERO),
        }
    }
}

// ==================== 엔진 ====================

/// 포지션 수명주기 엔진.
///
/// 수명: 프로세스당 1개, `Arc`로 공유. 서로 다른 심볼의 진입/청산은
/// 동시에 수행될 수 있습니다.
pub struct PositionEngine {
    client: Arc<OkxRestClient>,
    sizer: OrderSizer,
    store: Arc<dyn PositionStore>,
    config: EngineConfig,
}

impl PositionEngine {
    pub fn new(
        client: Arc<OkxRestClient>,
        instruments: Arc<InstrumentCache>,
        store: Arc<dyn PositionStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            sizer: OrderSizer::new(Arc::clone(&client), instruments),
            client,
            store,
            config,
        }
    }

    /// 롱 포지션 진입.
    pub async fn open_long(
        &self,
        trading_pair_id: Option<i64>,
        symbol: &str,
        budget: Decimal,
        leverage: Decimal,
    ) -> TradeResult {
        self.open_position(
            trading_pair_id,
            symbol,
            budget,
            leverage,
            TradeOperation::OpenLong,
            PositionSide::Long,
        )
        .await
    }

    /// 숏 포지션 진입.
    pub async fn open_short(
        &self,
        trading_pair_id: Option<i64>,
        symbol: &str,
        budget: Decimal,
        leverage: Decimal,
    ) -> TradeResult {
        self.open_position(
            trading_pair_id,
            symbol,
            budget,
            leverage,
            TradeOperation::OpenShort,
            PositionSide::Short,
        )
        .await
    }

    async fn open_position(
        &self,
        trading_pair_id: Option<i64>,
        symbol: &str,
        budget: Decimal,
        leverage: Decimal,
        operation: TradeOperation,
        side: PositionSide,
    ) -> TradeResult {
        info!(%operation, symbol, budget = %budget, leverage = %leverage, "포지션 진입 시작");

        // 사전 점검: 연결 + 가용 잔고
        if !self.client.check_connection().await {
            return fail(operation, symbol, "거래소 연결/자격증명 점검 실패");
        }
        match self.client.available_balance().await {
            Ok(available) if available < budget => {
                return fail(
                    operation,
                    symbol,
                    format!("가용 잔고 부족: {available} USDT < 예산 {budget} USDT"),
                );
            }
            Ok(_) => {}
            Err(e) => return fail(operation, symbol, failure_message(&e)),
        }

        // 수량 산정 (최소 랏/증거금/조건부 가치 검증 포함)
        let (sized, price) = match self.sizer.size(symbol, budget, leverage).await {
            Ok(result) => result,
            Err(e) => return fail(operation, symbol, e.to_string()),
        };
        debug!(
            symbol,
            contracts = %sized.contracts,
            notional = %sized.notional,
            required_margin = %sized.required_margin,
            price = %price,
            "수량 산정 완료"
        );

        // posSide 결정 (hedge 모드에서만 방향 태깅)
        let hedge = self.client.is_hedge_mode().await;
        let pos_side = if hedge { side.pos_side() } else { "net" };

        // 레버리지 설정은 best-effort: 실패해도 기존 레버리지로 계속
        if !self.client.set_leverage(symbol, leverage).await {
            warn!(symbol, leverage = %leverage, "레버리지 설정 실패, 현재 설정으로 계속");
        }

        // 시장가 주문
        let order_request = MarketOrderRequest {
            symbol: symbol.to_string(),
            side: side.entry_order_side().to_string(),
            pos_side: pos_side.to_string(),
            size: sized.contracts,
            leverage: Some(leverage),
            size_currency: None,
        };
        let order_id = match self.client.place_market_order(&order_request).await {
            Ok(id) => id,
            Err(e) => return fail(operation, symbol, failure_message(&e)),
        };

        // 체결 상세 조회 (고정 대기 후 1회)
        tokio::time::sleep(self.config.order_settle_delay).await;
        let detail = match self.client.order_detail(symbol, &order_id).await {
            Ok(detail) => detail,
            Err(e) => return fail(operation, symbol, failure_message(&e)),
        };

        let fill_size = parse_decimal(&detail.acc_fill_sz).unwrap_or(Decimal::ZERO);
        if fill_size <= Decimal::ZERO {
            return fail(
                operation,
                symbol,
                format!("주문 {order_id} 체결 수량이 0"),
            );
        }
        let fill_price = parse_decimal(&detail.avg_px).unwrap_or(Decimal::ZERO);
        let fee = parse_decimal(&detail.fee).unwrap_or(Decimal::ZERO).abs();

        // 실제 거래소 posId 복구 (실패해도 진입 자체는 성공으로 유지)
        tokio::time::sleep(self.config.position_lookup_delay).await;
        let recovered_id = self.recover_position_id(symbol, &order_id).await;
        if recovered_id.is_none() {
            warn!(symbol, order_id = %order_id, "거래소 posId 복구 실패, 임시 ID로 진행");
        }

        let position = Position::open_from_fill(
            recovered_id,
            trading_pair_id,
            symbol,
            side,
            fill_size,
            fill_price,
            leverage,
            budget,
            fee,
            order_id.clone(),
        );

        if let Err(e) = self.store.save(position.clone()).await {
            return fail(operation, symbol, format!("포지션 저장 실패: {e}"));
        }

        info!(
            %operation,
            symbol,
            position_id = %position.position_id,
            size = %position.size,
            entry_price = %position.entry_price,
            order_id = %order_id,
            "포지션 진입 완료"
        );

        TradeResult::success(operation, symbol, fill_size, fill_price, fee, order_id)
            .with_position(position)
    }

    /// 포지션 청산.
    ///
    /// 로컬에 존재하는 OPEN 포지션만 청산할 수 있습니다. 청산 이력 정합이
    /// 끝내 실패하면 청산 주문의 체결 상세를 폴백으로 사용합니다.
    /// 상태 전이는 영속화가 성공한 뒤에만 완료로 간주됩니다.
    pub async fn close_position(&self, position_id: &str) -> TradeResult {
        let operation = TradeOperation::ClosePosition;

        let mut position = match self.store.find(position_id).await {
            Ok(Some(position)) => position,
            Ok(None) => {
                return fail(
                    operation,
                    "UNKNOWN",
                    format!("포지션을 찾을 수 없음: {position_id}"),
                );
            }
            Err(e) => return fail(operation, "UNKNOWN", format!("포지션 조회 실패: {e}")),
        };
        let symbol = position.symbol.clone();

        if !position.is_open() {
            return fail(
                operation,
                &symbol,
                format!("포지션 {position_id}가 OPEN 상태가 아님"),
            );
        }

        // 반대 방향 시장가 주문으로 전량 청산
        let hedge = self.client.is_hedge_mode().await;
        let pos_side = if hedge {
            position.side.pos_side()
        } else {
            "net"
        };
        let order_request = MarketOrderRequest {
            symbol: symbol.clone(),
            side: position.side.exit_order_side().to_string(),
            pos_side: pos_side.to_string(),
            size: position.size,
            leverage: None,
            size_currency: base_currency(&symbol).map(str::to_string),
        };
        let order_id = match self.client.place_market_order(&order_request).await {
            Ok(id) => id,
            Err(e) => return fail(operation, &symbol, failure_message(&e)),
        };

        // 청산 주문 체결 상세
        tokio::time::sleep(self.config.order_settle_delay).await;
        let detail = match self.client.order_detail(&symbol, &order_id).await {
            Ok(detail) => detail,
            Err(e) => return fail(operation, &symbol, failure_message(&e)),
        };
        let close_size = parse_decimal(&detail.acc_fill_sz).unwrap_or(Decimal::ZERO);
        if close_size <= Decimal::ZERO {
            return fail(
                operation,
                &symbol,
                format!("청산 주문 {order_id} 체결 수량이 0"),
            );
        }
        let close_price = parse_decimal(&detail.avg_px).unwrap_or(Decimal::ZERO);

        // 청산 이력에서 권위 있는 PnL 정합 (bounded 폴링)
        tokio::time::sleep(self.config.close_history_delay).await;
        let client = Arc::clone(&self.client);
        let poll_symbol = symbol.clone();
        let target_id = position.position_id.clone();
        let record = resolve_closed_record(&self.config.history_poll, &target_id, move || {
            let client = Arc::clone(&client);
            let symbol = poll_symbol.clone();
            async move { client.positions_history(&symbol).await }
        })
        .await;

        let outcome = match record {
            Some(record) => {
                info!(
                    symbol = %symbol,
                    history_position_id = %record.position_id,
                    realized_pnl = %record.realized_pnl,
                    fee = %record.fee,
                    funding_fee = %record.funding_fee,
                    "청산 이력 레코드로 PnL 정합"
                );
                CloseOutcome {
                    realized_pnl: record.realized_pnl,
                    realized_pnl_percent: record.pnl_ratio,
                    combined_fee: record.fee,
                    funding_fee: record.funding_fee,
                    closing_price: close_price,
                }
            }
            None => {
                // 이력 미발견: 청산 주문 상세를 폴백으로 사용
                warn!(
                    symbol = %symbol,
                    position_id = %position.position_id,
                    "청산 이력을 찾지 못함, 주문 상세 기반 폴백 정합"
                );
                let close_fee = parse_decimal(&detail.fee).unwrap_or(Decimal::ZERO).abs();
                CloseOutcome {
                    realized_pnl: parse_decimal(&detail.pnl).unwrap_or(Decimal::ZERO),
                    realized_pnl_percent: position.realized_pnl_percent,
                    combined_fee: position.opening_fees + close_fee,
                    funding_fee: position.funding_fees,
                    closing_price: close_price,
                }
            }
        };

        position.apply_close(&outcome);

        // 영속화 성공 후에만 청산 완료
        if let Err(e) = self.store.save(position.clone()).await {
            return fail(operation, &symbol, format!("청산 포지션 저장 실패: {e}"));
        }

        info!(
            symbol = %symbol,
            position_id = %position.position_id,
            realized_pnl = %position.realized_pnl,
            closing_fees = %position.closing_fees,
            order_id = %order_id,
            "포지션 청산 완료"
        );

        TradeResult::success(
            operation,
            symbol.as_str(),
            close_size,
            close_price,
            position.open_close_funding_fees,
            order_id,
        )
        .with_pnl(position.realized_pnl, position.realized_pnl_percent)
        .with_position(position)
    }

    /// 실제 거래소 posId 복구 체인.
    ///
    /// (a) 주문 아카이브의 tradeId를 라이브 포지션 목록과 대조 →
    /// (b) 해당 심볼에서 가장 최근 갱신(uTime)된 포지션 →
    /// (c) 첫 레코드. 목록이 비어 있으면 `None` (임시 ID 경로).
    async fn recover_position_id(&self, symbol: &str, order_id: &str) -> Option<String> {
        let live = match self.client.positions(Some(symbol)).await {
            Ok(live) => live,
            Err(e) => {
                warn!(symbol, "라이브 포지션 조회 실패: {e}");
                return None;
            }
        };
        if live.is_empty() {
            debug!(symbol, "라이브 포지션 없음");
            return None;
        }

        // (a) tradeId 대조 — 가장 정확한 경로
        let trade_id = match self.client.order_from_archive(order_id).await {
            Ok(Some(archived)) if !archived.trade_id.is_empty() => Some(archived.trade_id),
            Ok(_) => None,
            Err(e) => {
                warn!(order_id, "주문 아카이브 조회 실패: {e}");
                None
            }
        };
        if let Some(trade_id) = trade_id {
            if let Some(matched) = live.iter().find(|p| p.trade_id == trade_id) {
                debug!(symbol, trade_id = %trade_id, pos_id = %matched.pos_id, "tradeId로 포지션 매칭");
                return valid_pos_id(&matched.pos_id);
            }
            debug!(symbol, trade_id = %trade_id, "tradeId 매칭 실패, 최신 포지션 폴백");
        }

        // (b) 가장 최근 갱신된 포지션
        let latest = live
            .iter()
            .max_by_key(|p| p.updated_at_millis())
            .or_else(|| live.first());
        latest.and_then(|p| valid_pos_id(&p.pos_id))
    }
}

// ==================== 헬퍼 ====================

/// 청산 이력에서 대상 posId와 정확히 일치하는 레코드를 bounded 폴링으로 찾는다.
///
/// 각 폴마다 정확히 일치하는 닫힌 레코드가 있으면 즉시 그것을,
/// 없으면 가장 최근에 닫힌 레코드를 후보로 봅니다. 시도 횟수를 모두
/// 소진하면 마지막 후보가 best-effort 폴백으로 반환됩니다 — 정합이
/// 청산을 무한정 막는 일은 없습니다.
pub async fn resolve_closed_record<F, Fut>(
    policy: &RetryPolicy,
    target_position_id: &str,
    fetch: F,
) -> Option<PositionHistoryRecord>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<PositionHistoryRecord>, ExchangeError>>,
{
    let target = target_position_id.to_string();
    let accept_target = target.clone();

    poll_until(
        policy,
        move |attempt| {
            let target = target.clone();
            let fut = fetch();
            async move {
                let records = match fut.await {
                    Ok(records) => records,
                    Err(e) => {
                        warn!(attempt, "청산 이력 조회 실패: {e}");
                        return None;
                    }
                };

                if let Some(exact) = records
                    .iter()
                    .find(|r| r.position_id == target && r.has_close_time())
                {
                    return Some(exact.clone());
                }

                // 폴백 후보: 가장 최근에 닫힌 레코드
                records
                    .into_iter()
                    .filter(|r| r.has_close_time())
                    .max_by_key(|r| r.close_time_millis())
            }
        },
        move |record| record.position_id == accept_target,
    )
    .await
}

/// 심볼에서 기초 통화 추출 ("BTC-USDT-SWAP" → "BTC").
fn base_currency(symbol: &str) -> Option<&str> {
    let base = symbol.split('-').next()?;
    if base.is_empty() || !symbol.contains('-') {
        warn!(symbol, "기초 통화를 추출할 수 없는 심볼");
        return None;
    }
    Some(base)
}

/// posId 문자열 유효성 검사.
fn valid_pos_id(pos_id: &str) -> Option<String> {
    if pos_id.is_empty() || pos_id == "N/A" {
        None
    } else {
        Some(pos_id.to_string())
    }
}

/// 거래소 에러를 실패 사유 문자열로 변환.
///
/// 프로토콜 에러는 거래소가 준 `msg`를 그대로 전달합니다.
fn failure_message(error: &ExchangeError) -> String {
    match error {
        ExchangeError::Api { msg, .. } => msg.clone(),
        other => other.to_string(),
    }
}

fn fail(operation: TradeOperation, symbol: &str, message: impl Into<String>) -> TradeResult {
    let message = message.into();
    warn!(%operation, symbol, reason = %message, "거래 작업 실패");
    TradeResult::failure(operation, symbol, message)
}

// ==================== 테스트 ====================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use super::*;

    fn history_record(position_id: &str, close_time: &str, realized_pnl: Decimal) -> PositionHistoryRecord {
        PositionHistoryRecord {
            instrument_id: "BTC-USDT-SWAP".to_string(),
            position_id: position_id.to_string(),
            close_time: close_time.to_string(),
            realized_pnl,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn exact_match_found_on_third_poll_wins_over_earlier_fallback() {
        // 시나리오 C: 처음 두 폴에는 대상 posId가 없고 세 번째에 나타남
        // → 이전 폴백이 아니라 세 번째 폴의 정확한 레코드를 사용
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let record = resolve_closed_record(&policy, "777", move || {
            let attempts = attempts_clone.clone();
            async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let mut records = vec![history_record("111", "1000", dec!(1))];
                if attempt >= 3 {
                    records.push(history_record("777", "2000", dec!(42)));
                }
                Ok(records)
            }
        })
        .await
        .expect("레코드를 찾아야 함");

        assert_eq!(record.position_id, "777");
        assert_eq!(record.realized_pnl, dec!(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_polls_fall_back_to_latest_closed_record() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let record = resolve_closed_record(&policy, "missing", || async {
            Ok(vec![
                history_record("111", "1000", dec!(1)),
                history_record("222", "3000", dec!(2)), // 가장 최근에 닫힘
                history_record("333", "2000", dec!(3)),
            ])
        })
        .await
        .expect("폴백 레코드를 반환해야 함");

        assert_eq!(record.position_id, "222");
    }

    #[tokio::test]
    async fn records_without_close_time_are_never_candidates() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let record = resolve_closed_record(&policy, "777", || async {
            Ok(vec![
                history_record("777", "N/A", dec!(1)), // 닫힌 시각 없음 → 제외
                history_record("111", "", dec!(2)),
            ])
        })
        .await;

        assert!(record.is_none());
    }

    #[tokio::test]
    async fn fetch_errors_yield_none_after_exhaustion() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let record = resolve_closed_record(&policy, "777", || async {
            Err(ExchangeError::Network("connection reset".to_string()))
        })
        .await;

        assert!(record.is_none());
    }

    #[test]
    fn base_currency_extraction() {
        assert_eq!(base_currency("BTC-USDT-SWAP"), Some("BTC"));
        assert_eq!(base_currency("ETH-USDT"), Some("ETH"));
        assert_eq!(base_currency("INVALID"), None);
        assert_eq!(base_currency(""), None);
    }

    #[test]
    fn api_errors_surface_exchange_message() {
        let error = ExchangeError::Api {
            code: "1".to_string(),
            msg: "Insufficient margin".to_string(),
        };
        assert_eq!(failure_message(&error), "Insufficient margin");

        let network = ExchangeError::Network("timeout".to_string());
        assert!(failure_message(&network).contains("timeout"));
    }
}
