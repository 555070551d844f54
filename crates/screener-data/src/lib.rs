//! 시장 데이터 수집과 영속화 레이어.
//!
//! 이 crate는 스코어링 파이프라인의 모든 I/O 경계를 담당합니다:
//! - 시장 데이터 프로바이더 추상화와 primary/fallback 선택 (provider)
//! - 짧은 TTL의 cache-aside 레이어 (cache)
//! - 점수 영속화 계약과 PostgreSQL 구현 (store)
//! - 심볼 유니버스 (universe)
//! - 해자 등급 오라클 계약 (moat)

pub mod cache;
pub mod error;
pub mod moat;
pub mod provider;
pub mod store;
pub mod universe;

pub use cache::{cache_get_or_miss, cache_put_best_effort, Cache, CacheKey, CacheTtl, NullCache, RedisCache};
pub use error::{DataError, Result};
pub use moat::{cached_moat_rating, MoatOracle};
pub use provider::{
    DataSourceSelector, FmpProvider, MarketDataProvider, MarketSnapshot, YahooProvider,
};
pub use store::{PgScoreStore, ScoreStore};
pub use universe::{CachedUniverse, StaticUniverse, SymbolUniverse};
