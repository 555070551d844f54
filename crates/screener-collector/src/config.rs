//! 환경변수 기반 설정 모듈.

use std::time::Duration;

use crate::Result;

/// 라이브 유니버스 장애 시 사용하는 durable fallback 워치리스트.
const DEFAULT_WATCHLIST: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "TSLA", "BRK-B", "JPM", "V", "UNH", "XOM",
    "JNJ", "PG", "MA", "HD", "COST", "ORCL", "KO", "PEP",
];

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// Redis URL (없으면 cache 없이 동작)
    pub redis_url: Option<String>,
    /// FMP API 키 (없으면 fallback 프로바이더만 사용)
    pub fmp_api_key: Option<String>,
    /// 스코어링 대상 심볼 목록
    pub watchlist: Vec<String>,
    /// 크롤링 설정
    pub crawl: CrawlConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 크롤링 설정
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// 배치당 심볼 수 (배치 내 동시 처리 한도)
    pub batch_size: usize,
    /// 배치 간 딜레이 (밀리초)
    pub batch_delay_ms: u64,
    /// 점수 신선도 기준 (시간)
    pub staleness_hours: i64,
    /// 심볼당 최대 시도 횟수
    pub max_attempts: u32,
    /// 일시적 오류 재시도 딜레이 (밀리초, 고정)
    pub retry_delay_ms: u64,
    /// 요청 한도 초과 백오프 기준 딜레이 (밀리초, 지수 증가)
    pub rate_limit_delay_ms: u64,
    /// OHLCV lookback 일수
    pub lookback_days: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay_ms: 2_000,
            staleness_hours: 24,
            max_attempts: 3,
            retry_delay_ms: 500,
            rate_limit_delay_ms: 2_000,
            lookback_days: 90,
        }
    }
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            crate::error::CollectorError::Config(
                "DATABASE_URL 환경변수가 설정되지 않았습니다".to_string(),
            )
        })?;

        let watchlist = std::env::var("SCREENER_SYMBOLS")
            .ok()
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            database_url,
            redis_url: std::env::var("REDIS_URL").ok(),
            fmp_api_key: std::env::var("FMP_API_KEY").ok(),
            watchlist,
            crawl: CrawlConfig {
                batch_size: env_var_parse("CRAWL_BATCH_SIZE", 10),
                batch_delay_ms: env_var_parse("CRAWL_BATCH_DELAY_MS", 2_000),
                staleness_hours: env_var_parse("SCORE_STALENESS_HOURS", 24),
                max_attempts: env_var_parse("CRAWL_MAX_ATTEMPTS", 3),
                retry_delay_ms: env_var_parse("CRAWL_RETRY_DELAY_MS", 500),
                rate_limit_delay_ms: env_var_parse("CRAWL_RATE_LIMIT_DELAY_MS", 2_000),
                lookback_days: env_var_parse("PRICE_LOOKBACK_DAYS", 90),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 60),
            },
        })
    }
}

impl CrawlConfig {
    /// 배치 간 딜레이를 Duration으로 반환
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// 일시적 오류 재시도 딜레이 (고정)
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// 요청 한도 초과 백오프 딜레이.
    ///
    /// 기준 딜레이 × 2^(attempt-1), 상한 60초.
    pub fn rate_limit_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay_ms = self
            .rate_limit_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(60_000);
        Duration::from_millis(delay_ms)
    }
}

impl DaemonConfig {
    /// 워크플로우 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crawl_defaults() {
        let config = CrawlConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.staleness_hours, 24);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.lookback_days, 90);
    }

    #[test]
    fn test_rate_limit_backoff_doubles() {
        let config = CrawlConfig {
            rate_limit_delay_ms: 1_000,
            ..Default::default()
        };

        assert_eq!(config.rate_limit_backoff(1), Duration::from_millis(1_000));
        assert_eq!(config.rate_limit_backoff(2), Duration::from_millis(2_000));
        assert_eq!(config.rate_limit_backoff(3), Duration::from_millis(4_000));
    }

    #[test]
    fn test_rate_limit_backoff_capped() {
        let config = CrawlConfig {
            rate_limit_delay_ms: 2_000,
            ..Default::default()
        };

        // 상한 60초
        assert_eq!(config.rate_limit_backoff(10), Duration::from_secs(60));
        assert_eq!(config.rate_limit_backoff(100), Duration::from_secs(60));
    }

    #[test]
    fn test_flat_retry_delay() {
        let config = CrawlConfig::default();
        assert_eq!(config.retry_delay(), Duration::from_millis(500));
    }
}
