//! 지오로케이션 게이트.
//!
//! VPN이 꺼진 채로 차단 지역에서 사설 API를 호출하는 사고를 막습니다.
//! 모든 사설 호출 직전에 `is_allowed()`를 확인하며, `false`면 네트워크
//! I/O 없이 해당 작업을 실패시킵니다.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

/// 지오로케이션 확인 결과 캐시 유지 시간.
const VERDICT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// 사설 API 호출 허용 여부 게이트.
#[async_trait]
pub trait GeolocationGate: Send + Sync {
    /// 현재 위치에서 사설 호출이 허용되는지.
    async fn is_allowed(&self) -> bool;
}

/// 항상 허용하는 게이트 (테스트/지역 제약 없는 환경용).
#[derive(Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl GeolocationGate for AllowAll {
    async fn is_allowed(&self) -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
struct CountryResponse {
    #[serde(rename = "countryCode")]
    country_code: Option<String>,
}

/// IP 기반 국가 확인 게이트.
///
/// `ip-api.com`에서 현재 IP의 국가 코드를 조회해 차단 목록과 대조합니다.
/// 확인 결과는 5분간 캐시됩니다. 조회 자체가 실패하면 경고를 남기고
/// 허용합니다 — 지오 체크 장애가 거래를 막아서는 안 됩니다.
pub struct IpGeolocationGate {
    http: reqwest::Client,
    lookup_url: String,
    blocked_countries: Vec<String>,
    cached: RwLock<Option<(String, Instant)>>,
}

impl IpGeolocationGate {
    /// 기본 게이트 생성 (미국 차단).
    pub fn new() -> Self {
        Self::with_lookup_url("http://ip-api.com/json/?fields=countryCode")
    }

    /// 조회 URL 지정 생성 (테스트용).
    pub fn with_lookup_url(lookup_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            lookup_url: lookup_url.into(),
            blocked_countries: vec!["US".to_string()],
            cached: RwLock::new(None),
        }
    }

    /// 마지막으로 확인된 국가 코드.
    pub async fn last_known_country(&self) -> Option<String> {
        self.cached.read().await.as_ref().map(|(c, _)| c.clone())
    }

    fn is_blocked(&self, country: &str) -> bool {
        self.blocked_countries.iter().any(|c| c == country)
    }

    async fn lookup_country(&self) -> Option<String> {
        let response = match self.http.get(&self.lookup_url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("지오로케이션 조회 실패: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "지오로케이션 조회 HTTP 에러");
            return None;
        }

        match response.json::<CountryResponse>().await {
            Ok(body) => body.country_code,
            Err(e) => {
                warn!("지오로케이션 응답 파싱 실패: {e}");
                None
            }
        }
    }
}

impl Default for IpGeolocationGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GeolocationGate for IpGeolocationGate {
    async fn is_allowed(&self) -> bool {
        // 캐시된 판정 확인 (5분)
        if let Some((country, checked_at)) = self.cached.read().await.clone() {
            if checked_at.elapsed() < VERDICT_CACHE_TTL {
                if self.is_blocked(&country) {
                    error!(country = %country, "차단 지역 (캐시), 사설 호출 거부");
                    return false;
                }
                debug!(country = %country, "지오로케이션 확인 (캐시): 허용");
                return true;
            }
        }

        let Some(country) = self.lookup_country().await else {
            // 확인 불가 시 허용 (네트워크 문제로 거래를 막지 않음)
            warn!("국가를 확인하지 못함, 호출 허용");
            return true;
        };

        *self.cached.write().await = Some((country.clone(), Instant::now()));

        if self.is_blocked(&country) {
            error!(country = %country, "차단 지역 감지! VPN 연결을 확인하세요");
            false
        } else {
            debug!(country = %country, "지오로케이션 확인: 허용");
            true
        }
    }
}
