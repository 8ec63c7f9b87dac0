//! OKX v5 REST 클라이언트.
//!
//! 실행 엔진이 사용하는 거래/계좌/공개 엔드포인트를 감쌉니다.
//! 프로세스당 하나를 만들어 `Arc`로 공유하며, 내부 `reqwest::Client`는
//! 동시 사용에 안전합니다. 전역 싱글턴은 두지 않습니다.
//!
//! 사설 호출은 매번 지오로케이션 게이트를 먼저 통과해야 하며,
//! 게이트가 거부하면 네트워크 I/O 없이 `ExchangeError::GeoBlocked`로
//! 끝납니다. 응답은 `code == "0"`일 때만 성공이고, 그 외에는 원문
//! body를 로깅한 뒤 `ExchangeError::Api`로 변환합니다.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use arb_core::{InstrumentInfo, PositionHistoryRecord};

use crate::error::ExchangeError;
use crate::geo::GeolocationGate;
use crate::sign::{self, HEADER_API_KEY, HEADER_PASSPHRASE, HEADER_SIGN, HEADER_TIMESTAMP};

// ==================== 엔드포인트 ====================

const TRADE_ORDER_ENDPOINT: &str = "/api/v5/trade/order";
const ORDERS_HISTORY_ENDPOINT: &str = "/api/v5/trade/orders-history-archive";
const POSITIONS_ENDPOINT: &str = "/api/v5/account/positions";
const POSITIONS_HISTORY_ENDPOINT: &str = "/api/v5/account/positions-history";
const BALANCE_ENDPOINT: &str = "/api/v5/account/balance";
const ACCOUNT_CONFIG_ENDPOINT: &str = "/api/v5/account/config";
const SET_LEVERAGE_ENDPOINT: &str = "/api/v5/account/set-leverage";
const MARKET_TICKER_ENDPOINT: &str = "/api/v5/market/ticker";
const PUBLIC_INSTRUMENTS_ENDPOINT: &str = "/api/v5/public/instruments";

const DEFAULT_BASE_URL: &str = "https://www.okx.com";

// ==================== 설정 ====================

/// OKX API 자격증명.
#[derive(Clone, Default)]
pub struct OkxCredentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
}

impl std::fmt::Debug for OkxCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OkxCredentials")
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .field("passphrase", &"***")
            .finish()
    }
}

impl OkxCredentials {
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            passphrase: passphrase.into(),
        }
    }

    /// 세 자격증명이 모두 설정되었는지.
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty() && !self.passphrase.is_empty()
    }
}

/// OKX 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct OkxConfig {
    pub credentials: OkxCredentials,
    /// 데모 트레이딩 계정 여부 (`x-simulated-trading` 헤더로 라우팅)
    pub sandbox: bool,
    pub base_url: String,
}

impl OkxConfig {
    pub fn new(credentials: OkxCredentials, sandbox: bool) -> Self {
        Self {
            credentials,
            sandbox,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// 환경변수에서 설정 로드.
    ///
    /// `OKX_API_KEY`, `OKX_API_SECRET`, `OKX_API_PASSPHRASE`,
    /// `OKX_API_SANDBOX` (기본 true)를 읽습니다. `.env` 파일이 있으면
    /// 먼저 로드합니다.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let credentials = OkxCredentials::new(
            std::env::var("OKX_API_KEY").unwrap_or_default(),
            std::env::var("OKX_API_SECRET").unwrap_or_default(),
            std::env::var("OKX_API_PASSPHRASE").unwrap_or_default(),
        );
        let sandbox = std::env::var("OKX_API_SANDBOX")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self::new(credentials, sandbox)
    }

    /// base URL 교체 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// ==================== 와이어 타입 ====================

/// OKX 공통 응답 봉투. `code == "0"`일 때만 성공.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct OkxEnvelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
struct OkxTicker {
    #[serde(default)]
    last: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OkxInstrumentRaw {
    #[serde(rename = "lotSz", default)]
    lot_sz: String,
    #[serde(rename = "minSz", default)]
    min_sz: String,
    #[serde(rename = "minCcyAmt", default)]
    min_ccy_amt: String,
    #[serde(rename = "minNotional", default)]
    min_notional: String,
    #[serde(rename = "ctVal", default)]
    ct_val: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OkxOrderAck {
    #[serde(rename = "ordId", default)]
    ord_id: String,
}

/// 주문 상세 (체결 조회 응답).
#[derive(Debug, Clone, Deserialize)]
pub struct OkxOrderDetail {
    #[serde(rename = "ordId", default)]
    pub ord_id: String,
    /// 평균 체결가 (미체결이면 빈 문자열)
    #[serde(rename = "avgPx", default)]
    pub avg_px: String,
    /// 누적 체결 수량 (SWAP은 계약 단위)
    #[serde(rename = "accFillSz", default)]
    pub acc_fill_sz: String,
    /// 누적 수수료 (플랫폼 부과분은 음수)
    #[serde(default)]
    pub fee: String,
    /// 청산 주문의 실현 손익 (그 외에는 0)
    #[serde(default)]
    pub pnl: String,
    #[serde(rename = "tradeId", default)]
    pub trade_id: String,
    #[serde(default)]
    pub state: String,
}

/// 라이브 포지션 스냅샷 (account/positions 응답).
#[derive(Debug, Clone, Deserialize)]
pub struct OkxPositionData {
    #[serde(rename = "instId", default)]
    pub inst_id: String,
    #[serde(rename = "posId", default)]
    pub pos_id: String,
    #[serde(rename = "posSide", default)]
    pub pos_side: String,
    #[serde(default)]
    pub pos: String,
    #[serde(rename = "avgPx", default)]
    pub avg_px: String,
    #[serde(rename = "markPx", default)]
    pub mark_px: String,
    #[serde(default)]
    pub upl: String,
    #[serde(rename = "uplRatio", default)]
    pub upl_ratio: String,
    #[serde(rename = "realizedPnl", default)]
    pub realized_pnl: String,
    #[serde(default)]
    pub lever: String,
    #[serde(default)]
    pub margin: String,
    #[serde(rename = "tradeId", default)]
    pub trade_id: String,
    #[serde(rename = "cTime", default)]
    pub c_time: String,
    #[serde(rename = "uTime", default)]
    pub u_time: String,
    #[serde(default)]
    pub fee: String,
    #[serde(rename = "fundingFee", default)]
    pub funding_fee: String,
}

impl OkxPositionData {
    /// uTime을 밀리초 epoch으로 파싱 (정렬용, 실패 시 0).
    pub fn updated_at_millis(&self) -> i64 {
        self.u_time.parse().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OkxPositionHistoryRaw {
    #[serde(rename = "instType", default)]
    inst_type: String,
    #[serde(rename = "instId", default)]
    inst_id: String,
    #[serde(rename = "posId", default)]
    pos_id: String,
    #[serde(rename = "posType", default)]
    pos_type: String,
    #[serde(rename = "openSize", default)]
    open_size: String,
    #[serde(rename = "closeSize", default)]
    close_size: String,
    #[serde(rename = "avgOpenPrice", default)]
    avg_open_price: String,
    #[serde(rename = "avgClosePrice", default)]
    avg_close_price: String,
    #[serde(rename = "realizedPnl", default)]
    realized_pnl: String,
    #[serde(default)]
    pnl: String,
    #[serde(rename = "pnlRatio", default)]
    pnl_ratio: String,
    #[serde(rename = "cTime", default)]
    c_time: String,
    #[serde(rename = "uTime", default)]
    u_time: String,
    #[serde(default)]
    ccy: String,
    #[serde(default)]
    lever: String,
    #[serde(default)]
    margin: String,
    #[serde(default)]
    fee: String,
    #[serde(rename = "fundingFee", default)]
    funding_fee: String,
}

impl From<OkxPositionHistoryRaw> for PositionHistoryRecord {
    fn from(raw: OkxPositionHistoryRaw) -> Self {
        PositionHistoryRecord {
            instrument_type: raw.inst_type,
            instrument_id: raw.inst_id,
            position_id: raw.pos_id,
            position_side: raw.pos_type,
            open_size: decimal_or_zero(&raw.open_size),
            close_size: decimal_or_zero(&raw.close_size),
            avg_open_price: decimal_or_zero(&raw.avg_open_price),
            avg_close_price: decimal_or_zero(&raw.avg_close_price),
            realized_pnl: decimal_or_zero(&raw.realized_pnl),
            pnl: decimal_or_zero(&raw.pnl),
            pnl_ratio: decimal_or_zero(&raw.pnl_ratio),
            open_time: raw.c_time,
            close_time: raw.u_time,
            currency: raw.ccy,
            leverage: decimal_or_zero(&raw.lever),
            margin: decimal_or_zero(&raw.margin),
            fee: decimal_or_zero(&raw.fee),
            funding_fee: decimal_or_zero(&raw.funding_fee),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OkxBalance {
    #[serde(default)]
    details: Vec<OkxBalanceDetail>,
}

#[derive(Debug, Deserialize)]
struct OkxBalanceDetail {
    #[serde(default)]
    ccy: String,
    #[serde(rename = "availBal", default)]
    avail_bal: String,
    #[serde(rename = "availEq", default)]
    avail_eq: String,
}

#[derive(Debug, Deserialize)]
struct OkxAccountConfig {
    #[serde(rename = "posMode", default)]
    pos_mode: String,
}

// ==================== 주문 요청 ====================

/// 시장가 주문 요청.
#[derive(Debug, Clone)]
pub struct MarketOrderRequest {
    pub symbol: String,
    /// "buy" 또는 "sell"
    pub side: String,
    /// "long" / "short" (hedge 모드) 또는 "net"
    pub pos_side: String,
    /// 주문 수량 (계약 단위, 또는 `size_currency` 지정 시 해당 통화 단위)
    pub size: Decimal,
    /// 진입 주문에만 포함하는 레버리지
    pub leverage: Option<Decimal>,
    /// `sz`의 단위 통화 (청산 주문에서 기초 통화 지정, szCcy)
    pub size_currency: Option<String>,
}

impl MarketOrderRequest {
    fn to_body(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "instId": self.symbol,
            "tdMode": "isolated",
            "side": self.side,
            "posSide": self.pos_side,
            "ordType": "market",
            "sz": self.size.to_string(),
        });
        if let Some(leverage) = self.leverage {
            body["lever"] = serde_json::Value::String(leverage.to_string());
        }
        if let Some(ccy) = &self.size_currency {
            body["szCcy"] = serde_json::Value::String(ccy.clone());
        }
        body
    }
}

// ==================== 숫자 파싱 ====================

/// 거래소 문자열 숫자 파싱. 빈 문자열/“N/A”/파싱 실패는 `None`.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    if value.is_empty() || value == "N/A" {
        return None;
    }
    value.parse().ok()
}

/// 파싱 실패 시 기본값으로 대체.
pub fn decimal_or(value: &str, default: Decimal) -> Decimal {
    parse_decimal(value).unwrap_or(default)
}

/// 파싱 실패 시 0.
pub fn decimal_or_zero(value: &str) -> Decimal {
    decimal_or(value, Decimal::ZERO)
}

// ==================== 클라이언트 ====================

/// OKX REST 클라이언트.
///
/// 수명: 프로세스당 1개, `Arc`로 공유, 동시 사용 안전.
pub struct OkxRestClient {
    http: reqwest::Client,
    config: OkxConfig,
    geo: Arc<dyn GeolocationGate>,
}

impl OkxRestClient {
    /// 새 클라이언트 생성.
    ///
    /// 연결 10초 / 전체 30초 타임아웃의 전용 `reqwest::Client`를 만듭니다.
    pub fn new(config: OkxConfig, geo: Arc<dyn GeolocationGate>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self { http, config, geo }
    }

    pub fn config(&self) -> &OkxConfig {
        &self.config
    }

    // ==================== 공개 엔드포인트 ====================

    /// 현재가 조회 (마켓 티커의 `last`).
    pub async fn current_price(&self, symbol: &str) -> Result<Decimal, ExchangeError> {
        let path = format!("{MARKET_TICKER_ENDPOINT}?instId={symbol}");
        let tickers: Vec<OkxTicker> = self.public_request(&path).await?;

        let ticker = tickers
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::EmptyResponse(format!("{symbol} 티커 없음")))?;
        parse_decimal(&ticker.last)
            .ok_or_else(|| ExchangeError::Parse(format!("{symbol} last 가격 파싱 실패")))
    }

    /// 인스트루먼트 계약 메타데이터 조회.
    ///
    /// 응답에 없는 필드는 안전한 기본값으로 채웁니다
    /// (lotSz/ctVal → 1, minSz/minCcyAmt/minNotional → 0).
    pub async fn fetch_instrument(&self, symbol: &str) -> Result<InstrumentInfo, ExchangeError> {
        let path = format!("{PUBLIC_INSTRUMENTS_ENDPOINT}?instType=SWAP&instId={symbol}");
        let instruments: Vec<OkxInstrumentRaw> = self.public_request(&path).await?;

        let raw = instruments
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::EmptyResponse(format!("인스트루먼트 {symbol} 없음")))?;

        let info = InstrumentInfo {
            symbol: symbol.to_string(),
            lot_size: decimal_or(&raw.lot_sz, Decimal::ONE),
            min_size: decimal_or_zero(&raw.min_sz),
            min_ccy_amt: decimal_or_zero(&raw.min_ccy_amt),
            min_notional: decimal_or_zero(&raw.min_notional),
            contract_value: decimal_or(&raw.ct_val, Decimal::ONE),
        };
        debug!(
            symbol,
            lot_size = %info.lot_size,
            min_size = %info.min_size,
            min_ccy_amt = %info.min_ccy_amt,
            min_notional = %info.min_notional,
            contract_value = %info.contract_value,
            "인스트루먼트 메타데이터 조회"
        );
        Ok(info)
    }

    // ==================== 거래 엔드포인트 ====================

    /// 시장가 주문 제출. 성공 시 거래소 주문 ID 반환.
    pub async fn place_market_order(
        &self,
        request: &MarketOrderRequest,
    ) -> Result<String, ExchangeError> {
        let body = request.to_body();
        info!(
            symbol = %request.symbol,
            side = %request.side,
            pos_side = %request.pos_side,
            size = %request.size,
            "시장가 주문 제출"
        );

        let acks: Vec<OkxOrderAck> = self
            .signed_request(Method::POST, TRADE_ORDER_ENDPOINT, Some(&body))
            .await?;

        let ack = acks
            .into_iter()
            .next()
            .filter(|a| !a.ord_id.is_empty())
            .ok_or_else(|| {
                ExchangeError::EmptyResponse("주문 응답에서 주문 ID를 얻지 못함".to_string())
            })?;
        Ok(ack.ord_id)
    }

    /// 주문 체결 상세 조회.
    pub async fn order_detail(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> Result<OkxOrderDetail, ExchangeError> {
        let path = format!("{TRADE_ORDER_ENDPOINT}?instId={symbol}&ordId={order_id}");
        let orders: Vec<OkxOrderDetail> = self.signed_request(Method::GET, &path, None).await?;

        orders.into_iter().next().ok_or_else(|| {
            ExchangeError::EmptyResponse(format!("주문 {order_id} 상세가 응답에 없음"))
        })
    }

    /// 주문 이력 아카이브에서 주문 조회 (tradeId 복구용).
    pub async fn order_from_archive(
        &self,
        order_id: &str,
    ) -> Result<Option<OkxOrderDetail>, ExchangeError> {
        let path = format!("{ORDERS_HISTORY_ENDPOINT}?ordId={order_id}");
        let orders: Vec<OkxOrderDetail> = self.signed_request(Method::GET, &path, None).await?;
        Ok(orders.into_iter().next())
    }

    // ==================== 계좌 엔드포인트 ====================

    /// 라이브 포지션 스냅샷 조회. 심볼을 주면 해당 인스트루먼트로 한정.
    pub async fn positions(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<OkxPositionData>, ExchangeError> {
        let path = match symbol {
            Some(symbol) => format!("{POSITIONS_ENDPOINT}?instId={symbol}"),
            None => POSITIONS_ENDPOINT.to_string(),
        };
        self.signed_request(Method::GET, &path, None).await
    }

    /// 청산 이력 조회 (PnL 정합용).
    pub async fn positions_history(
        &self,
        symbol: &str,
    ) -> Result<Vec<PositionHistoryRecord>, ExchangeError> {
        let path = format!("{POSITIONS_HISTORY_ENDPOINT}?instType=SWAP&instId={symbol}");
        let raw: Vec<OkxPositionHistoryRaw> = self.signed_request(Method::GET, &path, None).await?;
        Ok(raw.into_iter().map(PositionHistoryRecord::from).collect())
    }

    /// USDT 사용 가능 잔고 조회.
    pub async fn available_balance(&self) -> Result<Decimal, ExchangeError> {
        let balances: Vec<OkxBalance> = self
            .signed_request(Method::GET, BALANCE_ENDPOINT, None)
            .await?;

        let available = balances
            .iter()
            .flat_map(|b| b.details.iter())
            .find(|d| d.ccy == "USDT")
            .map(|d| {
                parse_decimal(&d.avail_bal)
                    .or_else(|| parse_decimal(&d.avail_eq))
                    .unwrap_or(Decimal::ZERO)
            })
            .unwrap_or(Decimal::ZERO);
        Ok(available)
    }

    /// 자격증명/연결 상태 프로브 (잔고 엔드포인트).
    pub async fn check_connection(&self) -> bool {
        if !self.config.credentials.is_complete() {
            warn!("OKX API 자격증명이 설정되지 않음");
            return false;
        }

        match self
            .signed_request::<serde_json::Value>(Method::GET, BALANCE_ENDPOINT, None)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                error!("OKX 연결 확인 실패: {e}");
                false
            }
        }
    }

    /// Hedge(long/short) 모드 여부 확인.
    ///
    /// 확인에 실패하면 Net 모드로 간주합니다.
    pub async fn is_hedge_mode(&self) -> bool {
        match self
            .signed_request::<OkxAccountConfig>(Method::GET, ACCOUNT_CONFIG_ENDPOINT, None)
            .await
        {
            Ok(configs) => match configs.first() {
                Some(config) => {
                    let hedge = config.pos_mode == "long_short_mode";
                    debug!(pos_mode = %config.pos_mode, hedge, "포지션 모드 확인");
                    hedge
                }
                None => {
                    warn!("계정 설정 응답이 비어 있음, Net 모드로 간주");
                    false
                }
            },
            Err(e) => {
                error!("포지션 모드 확인 실패, Net 모드로 간주: {e}");
                false
            }
        }
    }

    /// 인스트루먼트 레버리지 설정 (isolated).
    ///
    /// 실패는 경고만 남기고 `false`를 반환합니다 — 진입 흐름은 기존
    /// 레버리지로 계속됩니다.
    pub async fn set_leverage(&self, symbol: &str, leverage: Decimal) -> bool {
        let body = serde_json::json!({
            "instId": symbol,
            "lever": leverage.to_string(),
            "mgnMode": "isolated",
        });

        match self
            .signed_request::<serde_json::Value>(Method::POST, SET_LEVERAGE_ENDPOINT, Some(&body))
            .await
        {
            Ok(_) => {
                debug!(symbol, leverage = %leverage, "레버리지 설정 완료");
                true
            }
            Err(e) => {
                warn!(symbol, leverage = %leverage, "레버리지 설정 실패: {e}");
                false
            }
        }
    }

    // ==================== 요청 실행 ====================

    /// 서명된 사설 요청 실행.
    ///
    /// 경로에는 쿼리스트링이 포함되어야 하며, 서명 메시지에도 그대로
    /// 들어갑니다.
    async fn signed_request<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Vec<T>, ExchangeError> {
        if !self.geo.is_allowed().await {
            error!(endpoint = path_and_query, "지오로케이션 차단으로 사설 호출 거부");
            return Err(ExchangeError::GeoBlocked);
        }

        let credentials = &self.config.credentials;
        if !credentials.is_complete() {
            return Err(ExchangeError::MissingCredentials(
                "key/secret/passphrase 중 하나 이상이 비어 있음".to_string(),
            ));
        }

        let body_text = body.map(|b| b.to_string()).unwrap_or_default();
        let timestamp = sign::timestamp_now();
        let signature = sign::sign(
            &credentials.secret_key,
            &timestamp,
            method.as_str(),
            path_and_query,
            &body_text,
        );
        if signature.is_empty() {
            return Err(ExchangeError::SignatureFailed);
        }

        let url = format!("{}{}", self.config.base_url, path_and_query);
        let mut builder = self
            .http
            .request(method, &url)
            .header(HEADER_API_KEY, &credentials.api_key)
            .header(HEADER_SIGN, signature)
            .header(HEADER_TIMESTAMP, timestamp)
            .header(HEADER_PASSPHRASE, &credentials.passphrase);

        if self.config.sandbox {
            builder = builder.header("x-simulated-trading", "1");
        }
        if body.is_some() {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body_text);
        }

        self.execute(builder, path_and_query).await
    }

    /// 공개 요청 실행 (서명/지오 게이트 없음).
    async fn public_request<T: DeserializeOwned>(
        &self,
        path_and_query: &str,
    ) -> Result<Vec<T>, ExchangeError> {
        let url = format!("{}{}", self.config.base_url, path_and_query);
        let builder = self.http.get(&url);
        self.execute(builder, path_and_query).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<Vec<T>, ExchangeError> {
        let response = builder
            .send()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| ExchangeError::Network(e.to_string()))?;

        if !status.is_success() {
            error!(endpoint, status = status.as_u16(), body = %body_text, "HTTP 에러 응답");
            return Err(ExchangeError::Http {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let envelope: OkxEnvelope<T> = serde_json::from_str(&body_text).map_err(|e| {
            error!(endpoint, body = %body_text, "응답 파싱 실패: {e}");
            ExchangeError::Parse(e.to_string())
        })?;

        if envelope.code != "0" {
            error!(endpoint, body = %body_text, "거래소 에러 응답");
            return Err(ExchangeError::Api {
                code: envelope.code,
                msg: envelope.msg,
            });
        }

        Ok(envelope.data)
    }
}

// ==================== 테스트 ====================
