//! Yahoo Finance fallback 프로바이더.
//!
//! API 키 없이 동작하는 secondary 프로바이더입니다. 시세와 OHLCV
//! 시계열은 chart API에서 수집하지만, 재무 비율은 구조적으로 제공할
//! 수 없으므로 산업 평균 기본값을 대입합니다. 대입된 값은
//! [`FundamentalsSource::IndustryDefault`]로 태깅되어 테스트에서
//! 기본값 입력을 구분할 수 있습니다.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use screener_core::{Fundamentals, FundamentalsSource, PricePoint, PriceSeries, Quote};

use crate::error::{DataError, Result};

use super::MarketDataProvider;

/// f64를 Decimal로 변환 후 소수점 4자리로 반올림.
fn round_decimal_from_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(4))
}

/// Yahoo 오류 문자열을 오류 분류 체계로 변환.
///
/// yahoo_finance_api는 상태 코드를 구조화해 주지 않으므로 메시지로
/// 요청 한도 초과를 식별합니다.
fn classify_yahoo_error(context: &str, err: impl std::fmt::Display) -> DataError {
    let message = format!("{}: {}", context, err);
    if message.contains("429") || message.contains("Too Many Requests") {
        DataError::RateLimited(message)
    } else {
        DataError::Network(message)
    }
}

/// Yahoo Finance fallback 프로바이더.
pub struct YahooProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooProvider {
    /// 새 YahooProvider 생성.
    pub fn new() -> Result<Self> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| DataError::ProviderUnavailable(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self { connector })
    }

    /// lookback 일수를 Yahoo range 문자열로 변환.
    fn range_for_days(days: u32) -> &'static str {
        match days {
            0..=30 => "1mo",
            31..=93 => "3mo",
            94..=186 => "6mo",
            187..=365 => "1y",
            _ => "2y",
        }
    }

    /// chart API에서 일봉 수집.
    async fn fetch_daily_bars(&self, symbol: &str, range: &str) -> Result<Vec<PricePoint>> {
        let response = self
            .connector
            .get_quote_range(symbol, "1d", range)
            .await
            .map_err(|e| classify_yahoo_error(&format!("Yahoo 조회 실패 ({})", symbol), e))?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::ParseError(format!("Yahoo quote 파싱 오류: {}", e)))?;

        let points = quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp, 0)?.date_naive();
                Some(PricePoint {
                    date,
                    open: round_decimal_from_f64(q.open)?,
                    high: round_decimal_from_f64(q.high)?,
                    low: round_decimal_from_f64(q.low)?,
                    close: round_decimal_from_f64(q.close)?,
                    volume: q.volume,
                })
            })
            .collect();

        Ok(points)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn is_configured(&self) -> bool {
        // API 키가 필요 없으므로 항상 사용 가능
        true
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        // 1년치 일봉으로 현재가와 52주 고저가를 함께 계산
        let bars = self.fetch_daily_bars(symbol, "1y").await?;

        let latest = bars
            .last()
            .ok_or_else(|| DataError::IncompleteData(format!("시세 데이터 없음: {}", symbol)))?;

        if latest.close <= Decimal::ZERO {
            return Err(DataError::IncompleteData(format!(
                "유효하지 않은 가격: {}",
                symbol
            )));
        }

        let week_52_high = bars.iter().map(|b| b.high).max();
        let week_52_low = bars.iter().map(|b| b.low).min();

        let previous_close = bars.len().checked_sub(2).map(|i| bars[i].close);
        let change = previous_close.map(|prev| latest.close - prev);
        let change_percent = match (change, previous_close) {
            (Some(chg), Some(prev)) if prev > Decimal::ZERO => {
                Some((chg / prev * dec!(100)).round_dp(2))
            }
            _ => None,
        };

        let avg_volume = if bars.is_empty() {
            None
        } else {
            Some(bars.iter().map(|b| b.volume).sum::<u64>() / bars.len() as u64)
        };

        debug!(symbol = symbol, price = %latest.close, "Yahoo 시세 수집 완료");

        Ok(Quote {
            symbol: symbol.to_string(),
            name: None,
            price: latest.close,
            change,
            change_percent,
            day_high: Some(latest.high),
            day_low: Some(latest.low),
            week_52_high,
            week_52_low,
            volume: Some(latest.volume),
            avg_volume,
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

    /// 산업 평균 기본값 재무 비율 반환.
    ///
    /// chart API는 재무 비율을 제공하지 않으므로, 문서화된 보수적
    /// 기본값을 대입하고 IndustryDefault로 태깅합니다. 밸류에이션
    /// 멀티플(PER/PEG/PBR)은 지어내지 않고 null로 유지합니다.
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        Ok(Fundamentals {
            symbol: symbol.to_string(),
            gross_margin: Some(dec!(0.40)),
            operating_margin: Some(dec!(0.12)),
            profit_margin: Some(dec!(0.08)),
            return_on_equity: Some(dec!(0.10)),
            return_on_assets: Some(dec!(0.05)),
            debt_to_equity: Some(dec!(1.0)),
            current_ratio: Some(dec!(1.5)),
            quick_ratio: Some(dec!(1.0)),
            price_to_book: None,
            price_to_sales: None,
            peg_ratio: None,
            forward_pe: None,
            revenue_growth: Some(dec!(0.05)),
            earnings_growth: Some(dec!(0.05)),
            free_cash_flow: None,
            operating_cash_flow: None,
            total_cash: None,
            total_debt: None,
            revenue: None,
            dividend_yield: None,
            source: FundamentalsSource::IndustryDefault,
            fetched_at: Some(Utc::now()),
        })
    }

    async fn fetch_price_series(&self, symbol: &str, days: u32) -> Result<PriceSeries> {
        let range = Self::range_for_days(days);
        let bars = self.fetch_daily_bars(symbol, range).await?;

        debug!(symbol = symbol, bars = bars.len(), "Yahoo 시계열 수집 완료");

        Ok(PriceSeries::from_points(bars))
    }
}
