//! 포지션 실행 레이어.
//!
//! 추상적인 거래 의도("심볼 S에 Nx 레버리지로 $X 롱 진입")를 거래소
//! 규격에 맞는 주문으로 바꾸고, 포지션 수명주기를 추적하며, 로컬 상태를
//! 거래소의 권위 있는 레코드와 정합합니다.
//!
//! # 구조
//!
//! ```text
//! PositionEngine (engine)
//! ├── OrderSizer (sizing)     - 예산+레버리지 → 거래소 적법 계약 수량
//! ├── OkxRestClient           - 주문/조회/정합 REST 호출
//! ├── InstrumentCache         - 계약 제약 캐시
//! └── PositionStore           - 포지션 영속화
//! PositionSyncJob (sync)      - 거래소 스냅샷 → 로컬 OPEN 포지션 갱신
//! ```

pub mod engine;
pub mod sizing;
pub mod sync;

pub use engine::{resolve_closed_record, EngineConfig, PositionEngine};
pub use sizing::{size_order, OrderSizer, SizedOrder, SizingError, SizingInputs};
pub use sync::PositionSyncJob;
