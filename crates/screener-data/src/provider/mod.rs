//! 시장 데이터 프로바이더 추상화.
//!
//! primary/fallback 프로바이더를 하나의 capability 인터페이스 뒤에
//! 두고, 설정/가용성에 따라 호출 단위로 선택합니다. 하나의 스코어링
//! 실행에서 서로 다른 프로바이더의 부분 결과를 섞지 않습니다.

pub mod fmp;
pub mod yahoo;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use screener_core::{Fundamentals, PriceSeries, Quote};

use crate::error::{DataError, Result};

pub use fmp::FmpProvider;
pub use yahoo::YahooProvider;

/// 한 프로바이더에서 가져온 일관된 스냅샷.
///
/// 세 아티팩트는 항상 같은 프로바이더에서 나옵니다.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    /// 시세 스냅샷
    pub quote: Quote,
    /// 재무 비율
    pub fundamentals: Fundamentals,
    /// OHLCV 시계열
    pub series: PriceSeries,
}

/// 시장 데이터 프로바이더 계약.
///
/// 프로바이더는 fail-closed입니다: 재무 데이터가 없으면 기본값을
/// 지어내지 않고 null 필드를 반환합니다. 단, 문서화된 fallback
/// 프로바이더는 구조적으로 재무 비율을 제공할 수 없는 경우 산업
/// 평균 기본값을 대입할 수 있으며, 이때 반드시
/// [`screener_core::FundamentalsSource::IndustryDefault`]로 태깅해야
/// 합니다.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 프로바이더 이름 (로깅용).
    fn name(&self) -> &str;

    /// 프로바이더가 구성되어 있는지 확인 (자격 증명 존재 여부 등).
    fn is_configured(&self) -> bool;

    /// 시세 스냅샷 조회.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote>;

    /// 재무 비율 조회.
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals>;

    /// 트레일링 lookback 일수의 OHLCV 시계열 조회.
    async fn fetch_price_series(&self, symbol: &str, days: u32) -> Result<PriceSeries>;
}

/// 데이터 소스 선택기.
///
/// 순서가 지정된 후보 목록을 차례로 시도합니다. 구성되지 않았거나
/// 오류를 낸 프로바이더는 건너뛰고 다음 후보로 넘어갑니다. 스냅샷은
/// 전체가 한 프로바이더에서 나오거나 아예 실패합니다.
pub struct DataSourceSelector {
    providers: Vec<Arc<dyn MarketDataProvider>>,
}

impl DataSourceSelector {
    /// 우선순위 순서의 프로바이더 목록으로 선택기 생성.
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        Self { providers }
    }

    /// 한 종목의 일관된 스냅샷 조회.
    ///
    /// 모든 후보가 실패하면, 백오프 분류가 올바르게 적용되도록
    /// RateLimited 오류를 다른 오류보다 우선해서 반환합니다.
    pub async fn fetch_snapshot(&self, symbol: &str, days: u32) -> Result<MarketSnapshot> {
        let mut rate_limited: Option<DataError> = None;
        let mut last_error: Option<DataError> = None;

        for provider in &self.providers {
            if !provider.is_configured() {
                debug!(
                    provider = provider.name(),
                    symbol = symbol,
                    "프로바이더 미구성, 건너뜀"
                );
                continue;
            }

            match self.fetch_from(provider.as_ref(), symbol, days).await {
                Ok(snapshot) => {
                    debug!(
                        provider = provider.name(),
                        symbol = symbol,
                        bars = snapshot.series.len(),
                        "스냅샷 수집 완료"
                    );
                    return Ok(snapshot);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        symbol = symbol,
                        error = %e,
                        "프로바이더 실패, 다음 후보 시도"
                    );
                    if e.is_rate_limited() && rate_limited.is_none() {
                        rate_limited = Some(e);
                    } else {
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(rate_limited.or(last_error).unwrap_or_else(|| {
            DataError::ProviderUnavailable("구성된 프로바이더가 없습니다".to_string())
        }))
    }

    /// 단일 프로바이더에서 세 아티팩트를 모두 조회.
    ///
    /// 하나라도 실패하면 전체를 실패로 처리하여 프로바이더 간 혼합을
    /// 방지합니다.
    async fn fetch_from(
        &self,
        provider: &dyn MarketDataProvider,
        symbol: &str,
        days: u32,
    ) -> Result<MarketSnapshot> {
        let quote = provider.fetch_quote(symbol).await?;
        let fundamentals = provider.fetch_fundamentals(symbol).await?;
        let series = provider.fetch_price_series(symbol, days).await?;

        Ok(MarketSnapshot {
            quote,
            fundamentals,
            series,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use screener_core::FundamentalsSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 테스트용 프로그래머블 프로바이더.
    struct FakeProvider {
        name: &'static str,
        configured: bool,
        error: Option<fn() -> DataError>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn ok(name: &'static str) -> Self {
            Self {
                name,
                configured: true,
                error: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(name: &'static str, error: fn() -> DataError) -> Self {
            Self {
                name,
                configured: true,
                error: Some(error),
                calls: AtomicUsize::new(0),
            }
        }

        fn unconfigured(name: &'static str) -> Self {
            Self {
                name,
                configured: false,
                error: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn quote(&self, symbol: &str) -> Quote {
            Quote {
                symbol: symbol.to_string(),
                name: Some(self.name.to_string()),
                price: Decimal::from(100),
                change: None,
                change_percent: None,
                day_high: None,
                day_low: None,
                week_52_high: None,
                week_52_low: None,
                volume: None,
                avg_volume: None,
                market_cap: None,
                pe_ratio: None,
                eps: None,
                sector: None,
                industry: None,
                earnings_date: None,
                earnings_date_is_estimate: false,
                fetched_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.error {
                Some(make_error) => Err(make_error()),
                None => Ok(self.quote(symbol)),
            }
        }

        async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
            match self.error {
                Some(make_error) => Err(make_error()),
                None => Ok(Fundamentals::empty(symbol)),
            }
        }

        async fn fetch_price_series(&self, _symbol: &str, _days: u32) -> Result<PriceSeries> {
            match self.error {
                Some(make_error) => Err(make_error()),
                None => Ok(PriceSeries::new()),
            }
        }
    }

    #[tokio::test]
    async fn test_primary_used_when_healthy() {
        let primary = Arc::new(FakeProvider::ok("primary"));
        let fallback = Arc::new(FakeProvider::ok("fallback"));
        let selector = DataSourceSelector::new(vec![
            primary.clone() as Arc<dyn MarketDataProvider>,
            fallback.clone() as Arc<dyn MarketDataProvider>,
        ]);

        let snapshot = selector.fetch_snapshot("AAPL", 90).await.unwrap();

        // 스냅샷 전체가 primary에서 나옴
        assert_eq!(snapshot.quote.name.as_deref(), Some("primary"));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_on_unconfigured_primary() {
        let primary = Arc::new(FakeProvider::unconfigured("primary"));
        let fallback = Arc::new(FakeProvider::ok("fallback"));
        let selector = DataSourceSelector::new(vec![
            primary as Arc<dyn MarketDataProvider>,
            fallback as Arc<dyn MarketDataProvider>,
        ]);

        let snapshot = selector.fetch_snapshot("AAPL", 90).await.unwrap();
        assert_eq!(snapshot.quote.name.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_fallback_on_primary_error() {
        let primary = Arc::new(FakeProvider::failing("primary", || {
            DataError::ProviderUnavailable("down".to_string())
        }));
        let fallback = Arc::new(FakeProvider::ok("fallback"));
        let selector = DataSourceSelector::new(vec![
            primary as Arc<dyn MarketDataProvider>,
            fallback as Arc<dyn MarketDataProvider>,
        ]);

        let snapshot = selector.fetch_snapshot("AAPL", 90).await.unwrap();
        assert_eq!(snapshot.quote.name.as_deref(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_rate_limited_error_preferred_when_all_fail() {
        let primary = Arc::new(FakeProvider::failing("primary", || {
            DataError::RateLimited("429".to_string())
        }));
        let fallback = Arc::new(FakeProvider::failing("fallback", || {
            DataError::Network("down".to_string())
        }));
        let selector = DataSourceSelector::new(vec![
            primary as Arc<dyn MarketDataProvider>,
            fallback as Arc<dyn MarketDataProvider>,
        ]);

        let error = selector.fetch_snapshot("AAPL", 90).await.unwrap_err();
        assert!(error.is_rate_limited());
    }

    #[tokio::test]
    async fn test_no_configured_providers() {
        let selector = DataSourceSelector::new(vec![
            Arc::new(FakeProvider::unconfigured("primary")) as Arc<dyn MarketDataProvider>,
        ]);

        let error = selector.fetch_snapshot("AAPL", 90).await.unwrap_err();
        assert!(matches!(error, DataError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn test_no_partial_mixing() {
        // fundamentals만 실패하는 프로바이더: 스냅샷 전체가 fallback으로 넘어가야 함
        struct PartialProvider;

        #[async_trait]
        impl MarketDataProvider for PartialProvider {
            fn name(&self) -> &str {
                "partial"
            }
            fn is_configured(&self) -> bool {
                true
            }
            async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
                Ok(Quote {
                    symbol: symbol.to_string(),
                    name: Some("partial".to_string()),
                    price: Decimal::from(100),
                    change: None,
                    change_percent: None,
                    day_high: None,
                    day_low: None,
                    week_52_high: None,
                    week_52_low: None,
                    volume: None,
                    avg_volume: None,
                    market_cap: None,
                    pe_ratio: None,
                    eps: None,
                    sector: None,
                    industry: None,
                    earnings_date: None,
                    earnings_date_is_estimate: false,
                    fetched_at: Utc::now(),
                })
            }
            async fn fetch_fundamentals(&self, _symbol: &str) -> Result<Fundamentals> {
                Err(DataError::IncompleteData("no ratios".to_string()))
            }
            async fn fetch_price_series(&self, _symbol: &str, _days: u32) -> Result<PriceSeries> {
                Ok(PriceSeries::new())
            }
        }

        let fallback = Arc::new(FakeProvider::ok("fallback"));
        let selector = DataSourceSelector::new(vec![
            Arc::new(PartialProvider) as Arc<dyn MarketDataProvider>,
            fallback,
        ]);

        let snapshot = selector.fetch_snapshot("AAPL", 90).await.unwrap();

        // quote까지 포함해 전부 fallback에서 나옴 (부분 혼합 없음)
        assert_eq!(snapshot.quote.name.as_deref(), Some("fallback"));
        assert_eq!(snapshot.fundamentals.source, FundamentalsSource::Reported);
    }
}
