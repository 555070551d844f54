//! 해자 등급 오라클 계약.
//!
//! 정성 평가(해자 내러티브) 서비스는 외부 협력자입니다. 크롤러의
//! hot path에서는 절대 오라클을 직접 호출하지 않으며, cache에 있는
//! 등급만 기회주의적으로 소비합니다. cache miss면 스코어링은 마진
//! 기반 추정 경로로 넘어갑니다.

use async_trait::async_trait;

use screener_core::MoatRating;

use crate::cache::{cache_get_or_miss, Cache, CacheKey};
use crate::error::Result;

/// 해자 등급 오라클 계약.
///
/// 구현은 이 crate 밖에 있습니다 (AI 내러티브 서비스 등).
#[async_trait]
pub trait MoatOracle: Send + Sync {
    /// 종목의 해자 등급 생성/조회.
    ///
    /// `context`는 평가에 참고할 자유 형식 텍스트입니다 (섹터, 사업
    /// 설명 등).
    async fn get_rating(&self, symbol: &str, context: &str) -> Result<MoatRating>;
}

/// cache에 있는 해자 등급을 best-effort로 조회.
///
/// cache 오류와 miss 모두 None을 반환합니다. 오라클 호출로 블로킹하지
/// 않습니다.
pub async fn cached_moat_rating(cache: &dyn Cache, symbol: &str) -> Option<MoatRating> {
    cache_get_or_miss::<MoatRating>(cache, &CacheKey::moat(symbol)).await
}
