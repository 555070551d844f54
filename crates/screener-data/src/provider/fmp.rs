//! FMP (Financial Modeling Prep) 프로바이더.
//!
//! 높은 처리량의 primary 프로바이더입니다. API 키가 필요하며, 키가
//! 없으면 미구성 상태로 간주되어 선택기가 fallback으로 넘어갑니다.
//!
//! upstream JSON은 경계에서 nullable 필드 DTO로 검증한 뒤 도메인
//! 타입으로 변환합니다. 누락된 재무 지표는 null로 유지합니다
//! (fail-closed).

use chrono::{NaiveDate, Utc};
use reqwest::StatusCode;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use screener_core::{Fundamentals, PricePoint, PriceSeries, Quote};

use crate::error::{DataError, Result};

use super::MarketDataProvider;

/// 기본 API 엔드포인트.
const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api";

/// HTTP 요청 타임아웃.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// f64를 Decimal로 변환 후 소수점 4자리로 반올림.
///
/// 부동소수점 변환 시 발생하는 무한 소수점 문제를 방지합니다.
fn round_decimal_from_f64(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(|d| d.round_dp(4))
}

/// FMP 프로바이더.
pub struct FmpProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl FmpProvider {
    /// 새 FmpProvider 생성. API 키가 None이면 미구성 상태입니다.
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// base URL을 지정하여 생성 (테스트용).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url: base_url.into(),
        }
    }

    /// 인증된 GET 요청 수행 후 JSON 역직렬화.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DataError::ProviderUnavailable("FMP API 키 미설정".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(&[("apikey", api_key)])
            .send()
            .await?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(DataError::RateLimited(format!("FMP 요청 한도 초과: {}", path)));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(DataError::ProviderUnavailable(format!(
                    "FMP 인증 실패: {}",
                    response.status()
                )));
            }
            status if !status.is_success() => {
                return Err(DataError::Network(format!(
                    "FMP 응답 오류 {}: {}",
                    status, path
                )));
            }
            _ => {}
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DataError::ParseError(format!("FMP 응답 파싱 실패: {}", e)))
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for FmpProvider {
    fn name(&self) -> &str {
        "fmp"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote> {
        let rows: Vec<FmpQuoteDto> = self.get_json(&format!("/v3/quote/{}", symbol)).await?;
        let dto = rows
            .into_iter()
            .next()
            .ok_or_else(|| DataError::IncompleteData(format!("시세 없음: {}", symbol)))?;

        let price = dto
            .price
            .and_then(round_decimal_from_f64)
            .filter(|p| *p > Decimal::ZERO)
            .ok_or_else(|| DataError::IncompleteData(format!("유효하지 않은 가격: {}", symbol)))?;

        // 실적 발표일: 미래 날짜는 아직 확정 전 추정치로 간주
        let earnings_date = dto
            .earnings_announcement
            .as_deref()
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        let earnings_date_is_estimate = earnings_date
            .map(|d| d > Utc::now().date_naive())
            .unwrap_or(false);

        debug!(symbol = symbol, price = %price, "FMP 시세 수집 완료");

        Ok(Quote {
            symbol: dto.symbol.unwrap_or_else(|| symbol.to_string()),
            name: dto.name,
            price,
            change: dto.change.and_then(round_decimal_from_f64),
            change_percent: dto.changes_percentage.and_then(round_decimal_from_f64),
            day_high: dto.day_high.and_then(round_decimal_from_f64),
            day_low: dto.day_low.and_then(round_decimal_from_f64),
            week_52_high: dto.year_high.and_then(round_decimal_from_f64),
            week_52_low: dto.year_low.and_then(round_decimal_from_f64),
            volume: dto.volume,
            avg_volume: dto.avg_volume,
            market_cap: dto.market_cap.and_then(round_decimal_from_f64),
            pe_ratio: dto.pe.and_then(round_decimal_from_f64),
            eps: dto.eps.and_then(round_decimal_from_f64),
            sector: None,
            industry: None,
            earnings_date,
            earnings_date_is_estimate,
            fetched_at: Utc::now(),
        })
    }

    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        let ratios: Vec<FmpRatiosDto> = self
            .get_json(&format!("/v3/ratios-ttm/{}", symbol))
            .await?;
        let growth: Vec<FmpGrowthDto> = self
            .get_json(&format!("/v3/financial-growth/{}?limit=1", symbol))
            .await
            .unwrap_or_default();

        let ratios = ratios.into_iter().next().unwrap_or_default();
        let growth = growth.into_iter().next().unwrap_or_default();

        let fundamentals = Fundamentals {
            symbol: symbol.to_string(),
            gross_margin: ratios.gross_profit_margin.and_then(round_decimal_from_f64),
            operating_margin: ratios
                .operating_profit_margin
                .and_then(round_decimal_from_f64),
            profit_margin: ratios.net_profit_margin.and_then(round_decimal_from_f64),
            return_on_equity: ratios.return_on_equity.and_then(round_decimal_from_f64),
            return_on_assets: ratios.return_on_assets.and_then(round_decimal_from_f64),
            debt_to_equity: ratios.debt_equity_ratio.and_then(round_decimal_from_f64),
            current_ratio: ratios.current_ratio.and_then(round_decimal_from_f64),
            quick_ratio: ratios.quick_ratio.and_then(round_decimal_from_f64),
            price_to_book: ratios.price_to_book_ratio.and_then(round_decimal_from_f64),
            price_to_sales: ratios.price_to_sales_ratio.and_then(round_decimal_from_f64),
            peg_ratio: ratios.peg_ratio.and_then(round_decimal_from_f64),
            forward_pe: None,
            revenue_growth: growth.revenue_growth.and_then(round_decimal_from_f64),
            earnings_growth: growth.net_income_growth.and_then(round_decimal_from_f64),
            free_cash_flow: growth.free_cash_flow.and_then(round_decimal_from_f64),
            operating_cash_flow: growth.operating_cash_flow.and_then(round_decimal_from_f64),
            total_cash: None,
            total_debt: None,
            revenue: growth.revenue.and_then(round_decimal_from_f64),
            dividend_yield: ratios.dividend_yield.and_then(round_decimal_from_f64),
            source: screener_core::FundamentalsSource::Reported,
            fetched_at: Some(Utc::now()),
        };

        debug!(
            symbol = symbol,
            roe = ?fundamentals.return_on_equity,
            profit_margin = ?fundamentals.profit_margin,
            "FMP 재무 비율 수집 완료"
        );

        Ok(fundamentals)
    }

    async fn fetch_price_series(&self, symbol: &str, days: u32) -> Result<PriceSeries> {
        let response: FmpHistoricalDto = self
            .get_json(&format!(
                "/v3/historical-price-full/{}?timeseries={}",
                symbol, days
            ))
            .await?;

        let points: Vec<PricePoint> = response
            .historical
            .into_iter()
            .filter_map(|bar| {
                Some(PricePoint {
                    date: NaiveDate::parse_from_str(&bar.date, "%Y-%m-%d").ok()?,
                    open: bar.open.and_then(round_decimal_from_f64)?,
                    high: bar.high.and_then(round_decimal_from_f64)?,
                    low: bar.low.and_then(round_decimal_from_f64)?,
                    close: bar.close.and_then(round_decimal_from_f64)?,
                    volume: bar.volume.unwrap_or(0),
                })
            })
            .collect();

        debug!(symbol = symbol, bars = points.len(), "FMP 시계열 수집 완료");

        Ok(PriceSeries::from_points(points))
    }
}

// =============================================================================
// upstream DTO (경계 검증용, 모든 필드 nullable)
// =============================================================================

/// `/v3/quote` 응답 행.
#[derive(Debug, Default, Deserialize)]
struct FmpQuoteDto {
    symbol: Option<String>,
    name: Option<String>,
    price: Option<f64>,
    change: Option<f64>,
    #[serde(rename = "changesPercentage")]
    changes_percentage: Option<f64>,
    #[serde(rename = "dayHigh")]
    day_high: Option<f64>,
    #[serde(rename = "dayLow")]
    day_low: Option<f64>,
    #[serde(rename = "yearHigh")]
    year_high: Option<f64>,
    #[serde(rename = "yearLow")]
    year_low: Option<f64>,
    volume: Option<u64>,
    #[serde(rename = "avgVolume")]
    avg_volume: Option<u64>,
    #[serde(rename = "marketCap")]
    market_cap: Option<f64>,
    pe: Option<f64>,
    eps: Option<f64>,
    #[serde(rename = "earningsAnnouncement")]
    earnings_announcement: Option<String>,
}

/// `/v3/ratios-ttm` 응답 행.
#[derive(Debug, Default, Deserialize)]
struct FmpRatiosDto {
    #[serde(rename = "grossProfitMarginTTM")]
    gross_profit_margin: Option<f64>,
    #[serde(rename = "operatingProfitMarginTTM")]
    operating_profit_margin: Option<f64>,
    #[serde(rename = "netProfitMarginTTM")]
    net_profit_margin: Option<f64>,
    #[serde(rename = "returnOnEquityTTM")]
    return_on_equity: Option<f64>,
    #[serde(rename = "returnOnAssetsTTM")]
    return_on_assets: Option<f64>,
    #[serde(rename = "debtEquityRatioTTM")]
    debt_equity_ratio: Option<f64>,
    #[serde(rename = "currentRatioTTM")]
    current_ratio: Option<f64>,
    #[serde(rename = "quickRatioTTM")]
    quick_ratio: Option<f64>,
    #[serde(rename = "priceToBookRatioTTM")]
    price_to_book_ratio: Option<f64>,
    #[serde(rename = "priceToSalesRatioTTM")]
    price_to_sales_ratio: Option<f64>,
    #[serde(rename = "pegRatioTTM")]
    peg_ratio: Option<f64>,
    #[serde(rename = "dividendYieldTTM")]
    dividend_yield: Option<f64>,
}

/// `/v3/financial-growth` 응답 행 (최신 연차).
#[derive(Debug, Default, Deserialize)]
struct FmpGrowthDto {
    #[serde(rename = "revenueGrowth")]
    revenue_growth: Option<f64>,
    #[serde(rename = "netIncomeGrowth")]
    net_income_growth: Option<f64>,
    revenue: Option<f64>,
    #[serde(rename = "freeCashFlow")]
    free_cash_flow: Option<f64>,
    #[serde(rename = "operatingCashFlow")]
    operating_cash_flow: Option<f64>,
}

/// `/v3/historical-price-full` 응답.
#[derive(Debug, Default, Deserialize)]
struct FmpHistoricalDto {
    #[serde(default)]
    historical: Vec<FmpBarDto>,
}

/// 하나의 일봉 행.
#[derive(Debug, Deserialize)]
struct FmpBarDto {
    date: String,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<u64>,
}
