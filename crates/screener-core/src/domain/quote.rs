//! 시세 스냅샷 모델.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 단일 종목의 시세 스냅샷.
///
/// 수집 시점의 불변 스냅샷이며, 매 수집마다 새로 생성됩니다.
/// symbol + fetched_at 외의 식별자는 없습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// 종목 티커 (예: "AAPL")
    pub symbol: String,
    /// 종목명
    pub name: Option<String>,
    /// 현재가
    pub price: Decimal,
    /// 전일 대비 변화
    pub change: Option<Decimal>,
    /// 전일 대비 변화율 (%)
    pub change_percent: Option<Decimal>,
    /// 당일 고가
    pub day_high: Option<Decimal>,
    /// 당일 저가
    pub day_low: Option<Decimal>,
    /// 52주 최고가
    pub week_52_high: Option<Decimal>,
    /// 52주 최저가
    pub week_52_low: Option<Decimal>,
    /// 거래량
    pub volume: Option<u64>,
    /// 평균 거래량
    pub avg_volume: Option<u64>,
    /// 시가총액
    pub market_cap: Option<Decimal>,
    /// PER (trailing)
    pub pe_ratio: Option<Decimal>,
    /// EPS (trailing)
    pub eps: Option<Decimal>,
    /// 섹터
    pub sector: Option<String>,
    /// 산업
    pub industry: Option<String>,
    /// 다음 실적 발표일
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_date: Option<NaiveDate>,
    /// 실적 발표일이 추정치인지 여부
    #[serde(default)]
    pub earnings_date_is_estimate: bool,
    /// 수집 시각
    pub fetched_at: DateTime<Utc>,
}

impl Quote {
    /// 52주 밴드 내 현재가 위치 (0.0 = 저점, 1.0 = 고점).
    ///
    /// 52주 고저가가 없거나 밴드 폭이 0이면 None.
    pub fn week_52_position(&self) -> Option<Decimal> {
        let high = self.week_52_high?;
        let low = self.week_52_low?;
        let range = high - low;
        if range <= Decimal::ZERO {
            return None;
        }
        Some((self.price - low) / range)
    }
}
