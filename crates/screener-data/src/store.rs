//! 점수 영속화.
//!
//! 심볼당 최신 점수 하나를 보관하는 durable 저장소 계약과 PostgreSQL
//! 구현을 제공합니다. 저장은 delete-then-insert(replace) 의미론으로,
//! 심볼당 살아있는 점수는 항상 하나입니다.
//!
//! # 스키마
//!
//! ```sql
//! CREATE TABLE symbol_score (
//!     symbol           TEXT PRIMARY KEY,
//!     total            SMALLINT NOT NULL,
//!     business_quality SMALLINT NOT NULL,
//!     timing           SMALLINT NOT NULL,
//!     breakdown        JSONB NOT NULL,
//!     recommendation   TEXT NOT NULL,
//!     explanation      TEXT NOT NULL,
//!     strengths        JSONB NOT NULL,
//!     weaknesses       JSONB NOT NULL,
//!     indicators       JSONB NOT NULL,
//!     calculated_at    TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::debug;

use screener_core::{Recommendation, Score};

use crate::error::{DataError, Result};

/// 점수 저장소 계약.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// 점수 저장 (replace 의미론).
    async fn save_score(&self, score: &Score) -> Result<()>;

    /// 심볼의 최신 점수 조회.
    async fn get_score(&self, symbol: &str) -> Result<Option<Score>>;

    /// 주어진 심볼 중 점수가 없거나 max_age_hours보다 오래된 심볼 반환.
    ///
    /// 입력 순서를 보존합니다.
    async fn get_stale_symbols(&self, symbols: &[String], max_age_hours: i64)
        -> Result<Vec<String>>;
}

/// 입력 심볼 중 신선한(fresh) 집합에 없는 심볼만 순서대로 유지.
fn retain_stale(symbols: &[String], fresh: &HashSet<String>) -> Vec<String> {
    symbols
        .iter()
        .filter(|s| !fresh.contains(*s))
        .cloned()
        .collect()
}

/// PostgreSQL 점수 저장소.
pub struct PgScoreStore {
    pool: PgPool,
}

impl PgScoreStore {
    /// 연결 풀로 저장소 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreStore for PgScoreStore {
    async fn save_score(&self, score: &Score) -> Result<()> {
        let breakdown = serde_json::to_value(score.breakdown)?;
        let strengths = serde_json::to_value(&score.strengths)?;
        let weaknesses = serde_json::to_value(&score.weaknesses)?;
        let indicators = serde_json::to_value(&score.indicators)?;

        let mut tx = self.pool.begin().await?;

        // replace 의미론: 삭제 후 삽입으로 심볼당 한 행을 보장
        sqlx::query("DELETE FROM symbol_score WHERE symbol = $1")
            .bind(&score.symbol)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO symbol_score
                (symbol, total, business_quality, timing, breakdown, recommendation,
                 explanation, strengths, weaknesses, indicators, calculated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&score.symbol)
        .bind(score.total as i16)
        .bind(score.business_quality as i16)
        .bind(score.timing as i16)
        .bind(breakdown)
        .bind(score.recommendation.as_str())
        .bind(&score.explanation)
        .bind(strengths)
        .bind(weaknesses)
        .bind(indicators)
        .bind(score.calculated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(symbol = %score.symbol, total = score.total, "점수 저장 완료");
        Ok(())
    }

    async fn get_score(&self, symbol: &str) -> Result<Option<Score>> {
        type ScoreRow = (
            i16,
            i16,
            i16,
            serde_json::Value,
            String,
            String,
            serde_json::Value,
            serde_json::Value,
            serde_json::Value,
            DateTime<Utc>,
        );

        let row: Option<ScoreRow> = sqlx::query_as(
            r#"
            SELECT total, business_quality, timing, breakdown, recommendation,
                   explanation, strengths, weaknesses, indicators, calculated_at
            FROM symbol_score
            WHERE symbol = $1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        let Some((
            total,
            business_quality,
            timing,
            breakdown,
            recommendation,
            explanation,
            strengths,
            weaknesses,
            indicators,
            calculated_at,
        )) = row
        else {
            return Ok(None);
        };

        let recommendation = Recommendation::parse(&recommendation).ok_or_else(|| {
            DataError::ParseError(format!("알 수 없는 추천 등급: {}", recommendation))
        })?;

        Ok(Some(Score {
            symbol: symbol.to_string(),
            total: total as u8,
            business_quality: business_quality as u8,
            timing: timing as u8,
            breakdown: serde_json::from_value(breakdown)?,
            recommendation,
            explanation,
            strengths: serde_json::from_value(strengths)?,
            weaknesses: serde_json::from_value(weaknesses)?,
            indicators: serde_json::from_value(indicators)?,
            calculated_at,
        }))
    }

    async fn get_stale_symbols(
        &self,
        symbols: &[String],
        max_age_hours: i64,
    ) -> Result<Vec<String>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let cutoff = Utc::now() - chrono::Duration::hours(max_age_hours);

        // 신선한 심볼을 조회하고 나머지를 stale로 판정
        let fresh_rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT symbol
            FROM symbol_score
            WHERE symbol = ANY($1)
              AND calculated_at > $2
            "#,
        )
        .bind(symbols)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let fresh: HashSet<String> = fresh_rows.into_iter().map(|(s,)| s).collect();
        Ok(retain_stale(symbols, &fresh))
    }
}
