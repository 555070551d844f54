//! 배치 크롤러 / 오케스트레이터.
//!
//! 전체 심볼 유니버스에 대해 스코어링 파이프라인을 구동합니다.
//!
//! # 실행 흐름
//!
//! 1. 심볼 유니버스 조회
//! 2. 영속화 저장소에 신선도 질의 — stale 심볼이 없으면 즉시 종료
//!    (no-op도 유효한 결과)
//! 3. 고정 크기 배치로 분할, 배치 내 심볼은 동시 처리
//!    (동시성 한도 = 배치 크기), 배치 간 고정 딜레이
//! 4. 심볼별: cache 우선 스냅샷 수집 → 지표/점수 계산 →
//!    cache/저장소 기록 → 진행 카운터 갱신
//! 5. 실패 시: 요청 한도 초과는 지수 백오프, 일시적 I/O 오류는 고정
//!    딜레이로 최대 시도 횟수까지 재시도. 소진되면 실패 목록에
//!    기록하고 배치는 계속 진행 — 한 심볼의 실패가 실행을 중단시키지
//!    않습니다.
//! 6. 전체 배치 종료 후 요약 반환, run-scoped 상태 폐기
//!
//! 배치 i+1은 배치 i의 동시 처리가 전부 정착(성공/실패)한 뒤에야
//! 시작됩니다. 이 순차성이 순간 요청량의 상한이 됩니다.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use screener_analytics::CompositeScorer;
use screener_core::{Fundamentals, PriceSeries, Quote, Score};
use screener_data::{
    cache_get_or_miss, cache_put_best_effort, cached_moat_rating, Cache, CacheKey, CacheTtl,
    DataError, DataSourceSelector, MarketSnapshot, ScoreStore, SymbolUniverse,
};

use crate::config::CrawlConfig;
use crate::error::Result;
use crate::progress::{CalculationProgress, RunPhase};
use crate::stats::RunSummary;

/// 배치 크롤러.
///
/// 모든 의존성은 생성 시 주입되므로 테스트에서 fake로 대체할 수
/// 있습니다.
pub struct Crawler {
    selector: DataSourceSelector,
    scorer: CompositeScorer,
    cache: Arc<dyn Cache>,
    store: Arc<dyn ScoreStore>,
    universe: Arc<dyn SymbolUniverse>,
    config: CrawlConfig,
}

impl Crawler {
    /// 의존성을 주입하여 크롤러 생성.
    pub fn new(
        selector: DataSourceSelector,
        cache: Arc<dyn Cache>,
        store: Arc<dyn ScoreStore>,
        universe: Arc<dyn SymbolUniverse>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            selector,
            scorer: CompositeScorer::new(),
            cache,
            store,
            universe,
            config,
        }
    }

    /// 전체 실행: 유니버스 조회 → stale 심볼 필터 → 배치 처리.
    ///
    /// stale 심볼이 없으면 아무것도 처리하지 않고 빈 요약을
    /// 반환합니다.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary> {
        info!("스코어링 실행 시작");

        let symbols = self.universe.list_symbols().await?;
        debug!(count = symbols.len(), "유니버스 조회 완료");

        let stale = self
            .store
            .get_stale_symbols(&symbols, self.config.staleness_hours)
            .await?;

        if stale.is_empty() {
            info!("stale 심볼 없음, 실행 종료");
            return Ok(RunSummary::empty());
        }

        info!(
            stale = stale.len(),
            universe = symbols.len(),
            staleness_hours = self.config.staleness_hours,
            "stale 심볼 처리 시작"
        );

        self.process_all(stale, cancel).await
    }

    /// 지정 심볼 실행: 신선도 필터 없이 주어진 목록을 처리.
    pub async fn run_symbols(
        &self,
        symbols: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        if symbols.is_empty() {
            return Ok(RunSummary::empty());
        }
        self.process_all(symbols, cancel).await
    }

    /// 배치 분할과 동시 처리.
    async fn process_all(
        &self,
        symbols: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<RunSummary> {
        let progress = CalculationProgress::new(symbols.len());
        let batch_size = self.config.batch_size.max(1);
        let batch_count = symbols.len().div_ceil(batch_size);

        for (index, batch) in symbols.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                warn!(batch = index + 1, "취소 요청 수신, 남은 배치 중단");
                break;
            }

            progress.set_phase(RunPhase::Batching(index));
            debug!(
                batch = index + 1,
                total_batches = batch_count,
                size = batch.len(),
                "배치 처리 시작"
            );

            // 배치 내 동시 처리: 동시성 한도 = 배치 크기
            let futures = batch
                .iter()
                .map(|symbol| self.process_symbol(symbol, &progress, cancel));
            futures::future::join_all(futures).await;

            // 배치 간 딜레이로 순간 요청량 제한
            if index + 1 < batch_count && !cancel.is_cancelled() {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.config.batch_delay()) => {}
                }
            }
        }

        progress.set_phase(RunPhase::Reporting);
        let summary = progress.into_summary();
        summary.log_summary("점수 계산");

        Ok(summary)
    }

    /// 단일 심볼 처리와 진행 상태 갱신.
    async fn process_symbol(
        &self,
        symbol: &str,
        progress: &CalculationProgress,
        cancel: &CancellationToken,
    ) {
        progress.set_current(symbol);

        match self.score_with_retry(symbol, cancel).await {
            Ok(()) => progress.record_success(),
            Err(e) => {
                warn!(symbol = symbol, error = %e, "심볼 점수 계산 실패");
                progress.record_failure(symbol, e.to_string());
            }
        }
    }

    /// 재시도가 포함된 심볼 처리.
    ///
    /// 시도 횟수와 딜레이를 명시적으로 들고 도는 유한 루프입니다.
    /// 요청 한도 초과는 지수 백오프, 그 외 일시적 오류는 고정
    /// 딜레이를 적용하며, 재시도 불가 오류는 즉시 반환합니다.
    async fn score_with_retry(
        &self,
        symbol: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), DataError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            if cancel.is_cancelled() {
                return Err(DataError::Cancelled);
            }

            match self.score_once(symbol).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if attempt >= max_attempts || !e.is_retryable() {
                        return Err(e);
                    }

                    let delay = if e.is_rate_limited() {
                        let backoff = self.config.rate_limit_backoff(attempt);
                        warn!(
                            symbol = symbol,
                            attempt = attempt,
                            delay_ms = backoff.as_millis() as u64,
                            "요청 한도 초과, 백오프 후 재시도"
                        );
                        backoff
                    } else {
                        debug!(
                            symbol = symbol,
                            attempt = attempt,
                            error = %e,
                            "일시적 오류, 재시도 예정"
                        );
                        self.config.retry_delay()
                    };

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(DataError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// 단일 시도: cache-aside 수집 → 점수 계산 → 기록.
    async fn score_once(&self, symbol: &str) -> std::result::Result<(), DataError> {
        // 1. 점수 cache 히트면 재계산 생략, 저장소만 동기화
        if let Some(score) =
            cache_get_or_miss::<Score>(self.cache.as_ref(), &CacheKey::score(symbol)).await
        {
            debug!(symbol = symbol, "cache된 점수 사용");
            self.store.save_score(&score).await?;
            return Ok(());
        }

        let snapshot = self.fetch_snapshot_cached(symbol).await?;

        // 해자 등급은 cache만 기회주의적으로 소비 (오라클 직접 호출 금지)
        let moat = cached_moat_rating(self.cache.as_ref(), symbol).await;

        let score = self.scorer.score(
            &snapshot.quote,
            &snapshot.fundamentals,
            &snapshot.series,
            moat.as_ref(),
        );

        cache_put_best_effort(
            self.cache.as_ref(),
            &CacheKey::score(symbol),
            &score,
            CacheTtl::SCORE_SECS,
        )
        .await;

        self.store.save_score(&score).await?;

        info!(
            symbol = symbol,
            total = score.total,
            recommendation = %score.recommendation,
            "점수 계산 완료"
        );

        Ok(())
    }

    /// cache 우선 스냅샷 수집.
    ///
    /// 세 아티팩트가 모두 cache에 있을 때만 cache 스냅샷을 사용합니다
    /// (프로바이더 간 부분 혼합 방지). 하나라도 없으면 선택기를 통해
    /// 전체를 새로 수집하고 각 아티팩트를 write-through합니다.
    async fn fetch_snapshot_cached(
        &self,
        symbol: &str,
    ) -> std::result::Result<MarketSnapshot, DataError> {
        let days = self.config.lookback_days;
        let cache = self.cache.as_ref();

        let cached_quote = cache_get_or_miss::<Quote>(cache, &CacheKey::quote(symbol)).await;
        let cached_fundamentals =
            cache_get_or_miss::<Fundamentals>(cache, &CacheKey::fundamentals(symbol)).await;
        let cached_series =
            cache_get_or_miss::<PriceSeries>(cache, &CacheKey::series(symbol, days)).await;

        if let (Some(quote), Some(fundamentals), Some(series)) =
            (cached_quote, cached_fundamentals, cached_series)
        {
            debug!(symbol = symbol, "cache 스냅샷 사용");
            return Ok(MarketSnapshot {
                quote,
                fundamentals,
                series,
            });
        }

        let snapshot = self.selector.fetch_snapshot(symbol, days).await?;

        cache_put_best_effort(
            cache,
            &CacheKey::quote(symbol),
            &snapshot.quote,
            CacheTtl::QUOTE_SECS,
        )
        .await;
        cache_put_best_effort(
            cache,
            &CacheKey::fundamentals(symbol),
            &snapshot.fundamentals,
            CacheTtl::FUNDAMENTALS_SECS,
        )
        .await;
        cache_put_best_effort(
            cache,
            &CacheKey::series(symbol, days),
            &snapshot.series,
            CacheTtl::SERIES_SECS,
        )
        .await;

        Ok(snapshot)
    }
}
