//! 재무 비율 모델.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 재무 데이터의 출처.
///
/// fallback 프로바이더는 구조적으로 재무 비율을 제공할 수 없는 경우
/// 산업 평균 기본값을 대입하며, 그 사실을 이 태그로 표시합니다.
/// 점수 검증 테스트가 기본값 입력을 구분할 수 있어야 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundamentalsSource {
    /// 프로바이더가 보고한 실제 값
    Reported,
    /// 산업 평균 기본값으로 대체된 값
    IndustryDefault,
}

impl Default for FundamentalsSource {
    fn default() -> Self {
        Self::Reported
    }
}

/// 종목별 재무 비율.
///
/// 모든 필드는 비율(0.22 = 22%) 단위의 nullable 값입니다.
/// 필드 부재는 해당 서브 점수를 0으로 강등시킬 뿐, 파이프라인을
/// 실패시키지 않습니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,

    // 마진
    pub gross_margin: Option<Decimal>,
    pub operating_margin: Option<Decimal>,
    pub profit_margin: Option<Decimal>,

    // 수익성
    pub return_on_equity: Option<Decimal>,
    pub return_on_assets: Option<Decimal>,

    // 안정성
    pub debt_to_equity: Option<Decimal>,
    pub current_ratio: Option<Decimal>,
    pub quick_ratio: Option<Decimal>,

    // 밸류에이션
    pub price_to_book: Option<Decimal>,
    pub price_to_sales: Option<Decimal>,
    pub peg_ratio: Option<Decimal>,
    pub forward_pe: Option<Decimal>,

    // 성장성
    pub revenue_growth: Option<Decimal>,
    pub earnings_growth: Option<Decimal>,

    // 현금 흐름 (절대 금액)
    pub free_cash_flow: Option<Decimal>,
    pub operating_cash_flow: Option<Decimal>,
    pub total_cash: Option<Decimal>,
    pub total_debt: Option<Decimal>,
    pub revenue: Option<Decimal>,

    // 배당
    pub dividend_yield: Option<Decimal>,

    // 메타데이터
    #[serde(default)]
    pub source: FundamentalsSource,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Fundamentals {
    /// 빈 재무 데이터 생성 (모든 비율 없음).
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// FCF 마진 (자유현금흐름 / 매출).
    ///
    /// 둘 중 하나라도 없거나 매출이 0 이하이면 None.
    pub fn fcf_margin(&self) -> Option<Decimal> {
        let fcf = self.free_cash_flow?;
        let revenue = self.revenue?;
        if revenue <= Decimal::ZERO {
            return None;
        }
        Some(fcf / revenue)
    }

    /// 핵심 지표가 하나라도 존재하는지 확인.
    pub fn has_any_metric(&self) -> bool {
        self.gross_margin.is_some()
            || self.operating_margin.is_some()
            || self.profit_margin.is_some()
            || self.return_on_equity.is_some()
            || self.return_on_assets.is_some()
            || self.debt_to_equity.is_some()
            || self.current_ratio.is_some()
            || self.revenue_growth.is_some()
            || self.earnings_growth.is_some()
    }
}
