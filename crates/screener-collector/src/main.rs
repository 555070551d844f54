//! Standalone scoring crawler CLI.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use screener_collector::{CollectorConfig, Crawler};
use screener_core::{init_logging, LogConfig};
use screener_data::{
    Cache, CachedUniverse, DataSourceSelector, FmpProvider, MarketDataProvider, NullCache,
    PgScoreStore, RedisCache, StaticUniverse, YahooProvider,
};

#[derive(Parser)]
#[command(name = "screener-collector")]
#[command(about = "Stock Screener Background Scoring Crawler", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 스코어링 1회 실행 (stale 심볼만)
    Run {
        /// 특정 심볼만 강제 재계산 (쉼표로 구분, 예: "AAPL,MSFT")
        #[arg(long)]
        symbols: Option<String>,
    },

    /// 데몬 모드: 주기적으로 스코어링 실행
    Daemon,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화 (RUST_LOG가 있으면 우선, 없으면 CLI 레벨 사용)
    let log_config = if std::env::var("RUST_LOG").is_ok() {
        LogConfig::from_env()
    } else {
        LogConfig::new(format!("screener_collector={},screener_data=info", cli.log_level))
    };
    init_logging(&log_config).map_err(std::io::Error::other)?;

    tracing::info!("Screener Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(
        watchlist = config.watchlist.len(),
        batch_size = config.crawl.batch_size,
        "설정 로드 완료"
    );

    // DB 연결
    let pool = sqlx::PgPool::connect(&config.database_url).await?;
    tracing::info!("데이터베이스 연결 성공");

    let crawler = build_crawler(&config, pool.clone()).await?;

    // ctrl-c를 취소 토큰에 연결
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("종료 신호 수신, 실행 중단 요청");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Run { symbols } => {
            let summary = match symbols {
                Some(list) => {
                    let symbols: Vec<String> = list
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                    crawler.run_symbols(symbols, &cancel).await?
                }
                None => crawler.run(&cancel).await?,
            };
            tracing::info!(
                completed = summary.completed,
                failed = summary.failed,
                "실행 종료"
            );
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("데몬 종료");
                        break;
                    }
                    _ = interval.tick() => {
                        match crawler.run(&cancel).await {
                            Ok(summary) => {
                                tracing::info!(
                                    completed = summary.completed,
                                    failed = summary.failed,
                                    "주기 실행 완료, 다음 실행: {}분 후",
                                    config.daemon.interval_minutes
                                );
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "주기 실행 실패");
                            }
                        }
                    }
                }
            }
        }
    }

    pool.close().await;
    tracing::info!("Screener Collector 종료");

    Ok(())
}

/// 설정으로부터 크롤러 의존성 조립.
async fn build_crawler(
    config: &CollectorConfig,
    pool: sqlx::PgPool,
) -> Result<Crawler, Box<dyn std::error::Error>> {
    // cache: Redis 미구성/장애 시 NullCache로 강등 (파이프라인은 cache
    // 없이도 동작해야 함)
    let cache: Arc<dyn Cache> = match &config.redis_url {
        Some(url) => {
            let redis_config = screener_data::cache::RedisConfig { url: url.clone() };
            match RedisCache::connect(&redis_config).await {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis 연결 실패, cache 없이 진행");
                    Arc::new(NullCache)
                }
            }
        }
        None => {
            tracing::info!("REDIS_URL 미설정, cache 없이 진행");
            Arc::new(NullCache)
        }
    };

    // 프로바이더: FMP primary, Yahoo fallback
    let providers: Vec<Arc<dyn MarketDataProvider>> = vec![
        Arc::new(FmpProvider::new(config.fmp_api_key.clone())),
        Arc::new(YahooProvider::new()?),
    ];
    let selector = DataSourceSelector::new(providers);

    // 유니버스: 워치리스트 + 2일 cache + durable fallback
    let universe = Arc::new(CachedUniverse::new(
        Arc::new(StaticUniverse::new(config.watchlist.clone())),
        cache.clone(),
        config.watchlist.clone(),
    ));

    let store = Arc::new(PgScoreStore::new(pool));

    Ok(Crawler::new(
        selector,
        cache,
        store,
        universe,
        config.crawl.clone(),
    ))
}
