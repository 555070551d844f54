//! 크롤러 통합 테스트.
//!
//! 프로바이더/저장소/cache를 fake로 대체해 오케스트레이션 동작을
//! 검증합니다: no-op 실행, 재시도/백오프 분류, 부분 실패 격리, 취소.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio_util::sync::CancellationToken;

use screener_collector::{CrawlConfig, Crawler};
use screener_core::{
    Fundamentals, PricePoint, PriceSeries, Quote, Recommendation, Score, ScoreBreakdown,
    TechnicalIndicators,
};
use screener_data::{
    Cache, DataError, DataSourceSelector, MarketDataProvider, Result as DataResult, ScoreStore,
    StaticUniverse, SymbolUniverse,
};

// =============================================================================
// Fakes
// =============================================================================

/// 프로그래머블 fake 프로바이더.
#[derive(Default)]
struct FakeProvider {
    /// 심볼별 남은 RateLimited 실패 횟수
    rate_limit_plan: Mutex<HashMap<String, u32>>,
    /// 항상 IncompleteData를 반환할 심볼
    incomplete: HashSet<String>,
    /// 심볼별 fetch_quote 호출 횟수
    quote_calls: Mutex<HashMap<String, u32>>,
}

impl FakeProvider {
    fn with_rate_limit_failures(symbol: &str, count: u32) -> Self {
        let mut plan = HashMap::new();
        plan.insert(symbol.to_string(), count);
        Self {
            rate_limit_plan: Mutex::new(plan),
            ..Default::default()
        }
    }

    fn with_incomplete(symbol: &str) -> Self {
        let mut incomplete = HashSet::new();
        incomplete.insert(symbol.to_string());
        Self {
            incomplete,
            ..Default::default()
        }
    }

    fn quote_call_count(&self, symbol: &str) -> u32 {
        *self.quote_calls.lock().unwrap().get(symbol).unwrap_or(&0)
    }
}

fn sample_quote(symbol: &str) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        name: None,
        price: dec!(100),
        change: None,
        change_percent: None,
        day_high: None,
        day_low: None,
        week_52_high: Some(dec!(130)),
        week_52_low: Some(dec!(90)),
        volume: Some(1_000_000),
        avg_volume: None,
        market_cap: None,
        pe_ratio: Some(dec!(20)),
        eps: None,
        sector: None,
        industry: None,
        earnings_date: None,
        earnings_date_is_estimate: false,
        fetched_at: Utc::now(),
    }
}

fn sample_series(bars: usize) -> PriceSeries {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let points = (0..bars)
        .map(|i| {
            let close = dec!(90) + Decimal::from(i as i64) / dec!(4);
            PricePoint {
                date: start + chrono::Duration::days(i as i64),
                open: close,
                high: close + dec!(1),
                low: close - dec!(1),
                close,
                volume: 10_000,
            }
        })
        .collect();
    PriceSeries::from_points(points)
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn fetch_quote(&self, symbol: &str) -> DataResult<Quote> {
        *self
            .quote_calls
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_insert(0) += 1;

        if self.incomplete.contains(symbol) {
            return Err(DataError::IncompleteData(format!("시세 없음: {}", symbol)));
        }

        let mut plan = self.rate_limit_plan.lock().unwrap();
        if let Some(remaining) = plan.get_mut(symbol) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DataError::RateLimited("429".to_string()));
            }
        }

        Ok(sample_quote(symbol))
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> DataResult<Fundamentals> {
        let mut fund = Fundamentals::empty(symbol);
        fund.return_on_equity = Some(dec!(0.22));
        fund.debt_to_equity = Some(dec!(0.2));
        fund.current_ratio = Some(dec!(2.1));
        fund.profit_margin = Some(dec!(0.25));
        Ok(fund)
    }

    async fn fetch_price_series(&self, _symbol: &str, _days: u32) -> DataResult<PriceSeries> {
        Ok(sample_series(60))
    }
}

/// 인메모리 점수 저장소.
#[derive(Default)]
struct MemoryStore {
    scores: Mutex<HashMap<String, Score>>,
}

impl MemoryStore {
    fn insert_fresh(&self, symbol: &str) {
        let score = Score {
            symbol: symbol.to_string(),
            total: 70,
            business_quality: 45,
            timing: 25,
            breakdown: ScoreBreakdown::default(),
            recommendation: Recommendation::Buy,
            explanation: String::new(),
            strengths: vec![],
            weaknesses: vec![],
            indicators: TechnicalIndicators::neutral(),
            calculated_at: Utc::now(),
        };
        self.scores
            .lock()
            .unwrap()
            .insert(symbol.to_string(), score);
    }

    fn score_of(&self, symbol: &str) -> Option<Score> {
        self.scores.lock().unwrap().get(symbol).cloned()
    }

    fn len(&self) -> usize {
        self.scores.lock().unwrap().len()
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn save_score(&self, score: &Score) -> DataResult<()> {
        self.scores
            .lock()
            .unwrap()
            .insert(score.symbol.clone(), score.clone());
        Ok(())
    }

    async fn get_score(&self, symbol: &str) -> DataResult<Option<Score>> {
        Ok(self.scores.lock().unwrap().get(symbol).cloned())
    }

    async fn get_stale_symbols(
        &self,
        symbols: &[String],
        max_age_hours: i64,
    ) -> DataResult<Vec<String>> {
        let now = Utc::now();
        let scores = self.scores.lock().unwrap();
        Ok(symbols
            .iter()
            .filter(|symbol| match scores.get(*symbol) {
                Some(score) => score.is_stale(now, max_age_hours),
                None => true,
            })
            .cloned()
            .collect())
    }
}

/// 인메모리 cache.
#[derive(Default)]
struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get_raw(&self, key: &str) -> DataResult<Option<String>> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_raw(&self, key: &str, value: &str, _ttl_secs: u64) -> DataResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> DataResult<bool> {
        Ok(self.entries.lock().unwrap().remove(key).is_some())
    }
}

// =============================================================================
// 테스트 하네스
// =============================================================================

fn test_config() -> CrawlConfig {
    CrawlConfig {
        batch_size: 2,
        batch_delay_ms: 0,
        staleness_hours: 24,
        max_attempts: 3,
        retry_delay_ms: 0,
        rate_limit_delay_ms: 0,
        lookback_days: 90,
    }
}

fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

struct Harness {
    crawler: Crawler,
    provider: Arc<FakeProvider>,
    store: Arc<MemoryStore>,
    cache: Arc<MemoryCache>,
}

fn harness(provider: FakeProvider, universe: Vec<String>) -> Harness {
    let provider = Arc::new(provider);
    let store = Arc::new(MemoryStore::default());
    let cache = Arc::new(MemoryCache::default());

    let selector = DataSourceSelector::new(vec![
        provider.clone() as Arc<dyn MarketDataProvider>,
    ]);
    let universe = Arc::new(StaticUniverse::new(universe)) as Arc<dyn SymbolUniverse>;

    let crawler = Crawler::new(
        selector,
        cache.clone() as Arc<dyn Cache>,
        store.clone() as Arc<dyn ScoreStore>,
        universe,
        test_config(),
    );

    Harness {
        crawler,
        provider,
        store,
        cache,
    }
}

// =============================================================================
// 테스트
// =============================================================================

#[tokio::test]
async fn test_no_stale_symbols_is_noop() {
    let h = harness(FakeProvider::default(), symbols(&["AAPL", "MSFT"]));

    // 모든 심볼에 신선한 점수 존재
    h.store.insert_fresh("AAPL");
    h.store.insert_fresh("MSFT");

    let summary = h.crawler.run(&CancellationToken::new()).await.unwrap();

    // no-op도 유효한 결과: 즉시 종료, 카운터 0
    assert_eq!(summary.total, 0);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(h.provider.quote_call_count("AAPL"), 0);
}

#[tokio::test]
async fn test_full_run_scores_all_stale_symbols() {
    let h = harness(
        FakeProvider::default(),
        symbols(&["AAPL", "MSFT", "GOOG", "AMZN", "NVDA"]),
    );

    let summary = h.crawler.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.total, 5);
    assert_eq!(summary.completed, 5);
    assert_eq!(summary.failed, 0);
    assert!(summary.failures.is_empty());
    assert_eq!(h.store.len(), 5);

    // 최상위 구간 재무 비율 → 재무 건전성 만점
    let score = h.store.score_of("AAPL").unwrap();
    assert_eq!(score.breakdown.financial_health, 25);
    assert_eq!(score.business_quality + score.timing, score.total);

    // 저장소 계약을 통한 조회도 동일한 점수 반환
    let stored = h.store.get_score("MSFT").await.unwrap().unwrap();
    assert_eq!(stored.symbol, "MSFT");
}

#[tokio::test]
async fn test_rate_limited_to_exhaustion_recorded_as_failure() {
    // RATE 심볼은 시도 횟수 상한(3)만큼 연속으로 429
    let h = harness(
        FakeProvider::with_rate_limit_failures("RATE", 3),
        symbols(&["RATE", "AAPL", "MSFT"]),
    );

    let summary = h.crawler.run(&CancellationToken::new()).await.unwrap();

    // 실패는 기록되고 배치는 계속 진행
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "RATE");

    // 3회 모두 시도했는지 확인
    assert_eq!(h.provider.quote_call_count("RATE"), 3);

    // 나머지 심볼은 정상 저장
    assert!(h.store.score_of("AAPL").is_some());
    assert!(h.store.score_of("MSFT").is_some());
    assert!(h.store.score_of("RATE").is_none());
}

#[tokio::test]
async fn test_rate_limited_then_recovers() {
    // 2회 실패 후 3번째 시도에 성공
    let h = harness(
        FakeProvider::with_rate_limit_failures("RATE", 2),
        symbols(&["RATE"]),
    );

    let summary = h.crawler.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(h.provider.quote_call_count("RATE"), 3);
    assert!(h.store.score_of("RATE").is_some());
}

#[tokio::test]
async fn test_incomplete_data_not_retried() {
    let h = harness(
        FakeProvider::with_incomplete("EMPTY"),
        symbols(&["EMPTY", "AAPL"]),
    );

    let summary = h.crawler.run(&CancellationToken::new()).await.unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);

    // IncompleteData는 재시도 없이 1회로 종료
    assert_eq!(h.provider.quote_call_count("EMPTY"), 1);
}

#[tokio::test]
async fn test_cancelled_run_processes_nothing() {
    let h = harness(FakeProvider::default(), symbols(&["AAPL", "MSFT"]));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = h.crawler.run(&cancel).await.unwrap();

    assert_eq!(summary.completed, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(h.provider.quote_call_count("AAPL"), 0);
}

#[tokio::test]
async fn test_cached_score_skips_recomputation() {
    let h = harness(FakeProvider::default(), symbols(&["AAPL"]));

    // 점수 cache를 미리 채움
    let cached = Score {
        symbol: "AAPL".to_string(),
        total: 88,
        business_quality: 55,
        timing: 33,
        breakdown: ScoreBreakdown::default(),
        recommendation: Recommendation::StrongBuy,
        explanation: String::new(),
        strengths: vec![],
        weaknesses: vec![],
        indicators: TechnicalIndicators::neutral(),
        calculated_at: Utc::now(),
    };
    h.cache
        .set_raw(
            "score:AAPL",
            &serde_json::to_string(&cached).unwrap(),
            3_600,
        )
        .await
        .unwrap();

    let summary = h.crawler.run(&CancellationToken::new()).await.unwrap();

    // cache 히트 → 프로바이더 호출 없이 저장소만 동기화
    assert_eq!(summary.completed, 1);
    assert_eq!(h.provider.quote_call_count("AAPL"), 0);
    assert_eq!(h.store.score_of("AAPL").unwrap().total, 88);
}

#[tokio::test]
async fn test_run_symbols_bypasses_staleness() {
    let h = harness(FakeProvider::default(), symbols(&["AAPL"]));

    // 신선한 점수가 있어도 지정 심볼 실행은 재계산
    h.store.insert_fresh("AAPL");

    let summary = h
        .crawler
        .run_symbols(symbols(&["AAPL"]), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.completed, 1);
    assert_eq!(h.provider.quote_call_count("AAPL"), 1);
}
