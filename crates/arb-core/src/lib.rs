//! 스탯아브 실행 엔진의 핵심 도메인 모델.
//!
//! 거래소 중립적인 포지션/체결 타입과 영속화 추상화를 제공합니다.
//! 네트워크나 거래소별 와이어 포맷에 대한 의존성은 없습니다.

pub mod domain;
pub mod store;

pub use domain::{
    history::PositionHistoryRecord,
    instrument::InstrumentInfo,
    position::{CloseOutcome, Position, PositionSide, PositionStatus, SyncSnapshot},
    trade::{TradeOperation, TradeResult},
};
pub use store::{InMemoryPositionStore, PositionStore, StoreError};
