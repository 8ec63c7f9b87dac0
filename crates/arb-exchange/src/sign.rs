//! OKX 요청 서명 빌더.
//!
//! 서명은 `base64(HMAC-SHA256(secret, timestamp + method + path + body))`로,
//! 동일 입력에 대해 항상 동일한 서명이 나오는 순수 함수입니다. GET 요청의
//! body는 빈 문자열이며, path에는 쿼리스트링이 포함됩니다.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

/// 사설 호출에 필요한 인증 헤더 이름.
pub const HEADER_API_KEY: &str = "OK-ACCESS-KEY";
pub const HEADER_SIGN: &str = "OK-ACCESS-SIGN";
pub const HEADER_TIMESTAMP: &str = "OK-ACCESS-TIMESTAMP";
pub const HEADER_PASSPHRASE: &str = "OK-ACCESS-PASSPHRASE";

/// 밀리초 단위로 잘린 ISO-8601 UTC 타임스탬프.
///
/// 예: `2026-01-01T12:00:00.123Z`
pub fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// 요청 서명 생성.
///
/// MAC 생성에 실패하면 에러를 로깅하고 빈 문자열을 반환합니다.
/// 호출자는 빈 서명을 해당 작업의 하드 실패로 취급해야 하며,
/// 맹목적으로 재시도해서는 안 됩니다.
pub fn sign(secret: &str, timestamp: &str, method: &str, request_path: &str, body: &str) -> String {
    let message = format!("{timestamp}{method}{request_path}{body}");

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!(method, request_path, "HMAC 초기화 실패: {e}");
            return String::new();
        }
    };
    mac.update(message.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";
    const TS: &str = "2024-01-01T00:00:00.000Z";

    #[test]
    fn known_vector_get() {
        let signature = sign(SECRET, TS, "GET", "/api/v5/account/balance", "");
        assert_eq!(signature, "a7mndkXijy+T0/hr8LSERYbJM1x53cAuRl/pI6BdFx4=");
    }

    #[test]
    fn known_vector_post_with_body() {
        let signature = sign(
            SECRET,
            TS,
            "POST",
            "/api/v5/trade/order",
            r#"{"instId":"BTC-USDT-SWAP"}"#,
        );
        assert_eq!(signature, "jPIe/Yg4i+p903bCwXrugxcR5OjwJ0B6TK1j3slPw9g=");
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = sign(SECRET, TS, "GET", "/api/v5/account/positions", "");
        let b = sign(SECRET, TS, "GET", "/api/v5/account/positions", "");
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn any_input_change_alters_signature() {
        let base = sign(SECRET, TS, "GET", "/api/v5/account/balance", "");
        assert_ne!(base, sign(SECRET, TS, "POST", "/api/v5/account/balance", ""));
        assert_ne!(base, sign(SECRET, TS, "GET", "/api/v5/account/config", ""));
        assert_ne!(
            base,
            sign(SECRET, "2024-01-01T00:00:00.001Z", "GET", "/api/v5/account/balance", "")
        );
        assert_ne!(base, sign("other-secret", TS, "GET", "/api/v5/account/balance", ""));
    }

    #[test]
    fn timestamp_is_millisecond_iso8601() {
        let ts = timestamp_now();
        // 2026-01-01T12:00:00.123Z 형태
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[19..20], ".");
    }
}
