//! OKX 거래소 커넥터.
//!
//! 서명된 REST 요청 빌더, 거래 엔드포인트 클라이언트, 인스트루먼트
//! 메타데이터 캐시, 지오로케이션 게이트, 재시도 유틸리티를 제공합니다.
//!
//! # 구조
//!
//! ```text
//! OkxRestClient
//! ├── sign      - HMAC-SHA256 요청 서명 (순수 함수)
//! ├── geo       - 사설 호출 전 지오로케이션 게이트
//! ├── client    - REST 엔드포인트 (주문/포지션/잔고/설정)
//! ├── instruments - 심볼별 계약 메타데이터 read-through 캐시
//! └── retry     - 고정 간격 bounded 폴링 유틸리티
//! ```

pub mod client;
pub mod error;
pub mod geo;
pub mod instruments;
pub mod retry;
pub mod sign;

pub use client::{
    parse_decimal, MarketOrderRequest, OkxConfig, OkxCredentials, OkxOrderDetail, OkxPositionData,
    OkxRestClient,
};
pub use error::ExchangeError;
pub use geo::{AllowAll, GeolocationGate, IpGeolocationGate};
pub use instruments::InstrumentCache;
pub use retry::{poll_until, RetryPolicy};
