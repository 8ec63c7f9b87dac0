//! 거래소 커넥터 에러 타입.

use thiserror::Error;

/// OKX REST 호출 에러.
///
/// 프로토콜 실패(`Api`, `Http`, `Parse`)와 호출 전 차단(`GeoBlocked`,
/// `MissingCredentials`, `SignatureFailed`)을 구분합니다. 후자는 네트워크
/// I/O 없이 발생하며 재시도 대상이 아닙니다.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// 지오로케이션 게이트가 사설 호출을 차단함
    #[error("지오로케이션 차단: 사설 API 호출이 허용되지 않는 위치입니다")]
    GeoBlocked,

    /// API 자격증명 미설정
    #[error("API 자격증명 미설정: {0}")]
    MissingCredentials(String),

    /// 요청 서명 생성 실패
    #[error("요청 서명 생성 실패")]
    SignatureFailed,

    /// 네트워크 에러 (연결 실패, 타임아웃 등)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// HTTP 비정상 상태 코드
    #[error("HTTP 에러 {status}: {body}")]
    Http { status: u16, body: String },

    /// 거래소 프로토콜 에러 (code != "0")
    #[error("거래소 API 에러 (code={code}): {msg}")]
    Api { code: String, msg: String },

    /// 응답 파싱 실패
    #[error("응답 파싱 실패: {0}")]
    Parse(String),

    /// 기대한 데이터가 응답에 없음 (빈 data 배열 등)
    #[error("빈 응답: {0}")]
    EmptyResponse(String),
}

impl ExchangeError {
    /// 일시적 오류로 보고 재시도할 수 있는지.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::Network(_) => true,
            ExchangeError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// 재시도해도 결과가 달라지지 않는 치명적 오류인지.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExchangeError::GeoBlocked
                | ExchangeError::MissingCredentials(_)
                | ExchangeError::SignatureFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ExchangeError::Network("timeout".to_string()).is_retryable());
        assert!(ExchangeError::Http {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!ExchangeError::Http {
            status: 404,
            body: String::new()
        }
        .is_retryable());
        assert!(!ExchangeError::Api {
            code: "1".to_string(),
            msg: "Insufficient margin".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn fatal_classification() {
        assert!(ExchangeError::GeoBlocked.is_fatal());
        assert!(ExchangeError::SignatureFailed.is_fatal());
        assert!(!ExchangeError::Network("x".to_string()).is_fatal());
    }
}
