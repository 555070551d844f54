//! 심볼 유니버스.
//!
//! 스코어링 대상 심볼 목록을 제공합니다. 라이브 소스는 외부
//! 협력자이므로 계약(trait)만 정의하고, 약 2일의 cache와 라이브
//! 소스 장애 시 사용할 durable fallback 목록을 데코레이터로
//! 제공합니다.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{cache_get_or_miss, cache_put_best_effort, Cache, CacheKey, CacheTtl};
use crate::error::Result;

/// 심볼 유니버스 계약.
#[async_trait]
pub trait SymbolUniverse: Send + Sync {
    /// 전체 심볼 목록 조회.
    async fn list_symbols(&self) -> Result<Vec<String>>;
}

/// 고정 심볼 목록.
///
/// 설정 파일/환경변수로 주어진 워치리스트나 fallback 목록에
/// 사용합니다.
pub struct StaticUniverse {
    symbols: Vec<String>,
}

impl StaticUniverse {
    /// 심볼 목록으로 생성.
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }
}

#[async_trait]
impl SymbolUniverse for StaticUniverse {
    async fn list_symbols(&self) -> Result<Vec<String>> {
        Ok(self.symbols.clone())
    }
}

/// cache + fallback이 결합된 유니버스 데코레이터.
///
/// 조회 순서:
/// 1. cache (`universe:all`, TTL 2일)
/// 2. 내부 라이브 소스 — 성공 시 cache에 기록
/// 3. durable fallback 목록 — 라이브 소스 장애 시
pub struct CachedUniverse {
    inner: Arc<dyn SymbolUniverse>,
    cache: Arc<dyn Cache>,
    fallback: Vec<String>,
}

impl CachedUniverse {
    /// 라이브 소스, cache, fallback 목록으로 생성.
    pub fn new(
        inner: Arc<dyn SymbolUniverse>,
        cache: Arc<dyn Cache>,
        fallback: Vec<String>,
    ) -> Self {
        Self {
            inner,
            cache,
            fallback,
        }
    }
}

#[async_trait]
impl SymbolUniverse for CachedUniverse {
    async fn list_symbols(&self) -> Result<Vec<String>> {
        let key = CacheKey::universe();

        if let Some(symbols) = cache_get_or_miss::<Vec<String>>(self.cache.as_ref(), &key).await {
            if !symbols.is_empty() {
                return Ok(symbols);
            }
        }

        match self.inner.list_symbols().await {
            Ok(symbols) if !symbols.is_empty() => {
                cache_put_best_effort(
                    self.cache.as_ref(),
                    &key,
                    &symbols,
                    CacheTtl::UNIVERSE_SECS,
                )
                .await;
                Ok(symbols)
            }
            Ok(_) => {
                warn!("라이브 심볼 소스가 빈 목록 반환, fallback 사용");
                Ok(self.fallback.clone())
            }
            Err(e) => {
                warn!(error = %e, "라이브 심볼 소스 장애, fallback 사용");
                info!(count = self.fallback.len(), "fallback 심볼 목록 사용");
                Ok(self.fallback.clone())
            }
        }
    }
}
