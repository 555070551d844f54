//! 종합 점수 계산기.
//!
//! 재무 비율, 외부 해자 등급, 기술적 지표를 단일 점수(0~100)로
//! 종합합니다. 점수는 두 개의 상위 버킷으로 구성됩니다.
//!
//! # 사업 품질 (Business Quality, 0~60)
//!
//! 1. **재무 건전성 (0~25)**: ROE, ROA, 부채비율, 유동비율, 순이익률
//! 2. **해자 (0~20)**: 외부 등급이 있으면 0~100을 0~20으로 선형 변환,
//!    없으면 마진 지표로 추정
//! 3. **성장성 (0~15)**: 매출 성장률, 이익 성장률
//!
//! # 타이밍 (Timing, 0~40)
//!
//! 4. **밸류에이션 (0~20)**: PER, PEG, PBR, 52주 밴드 내 위치
//! 5. **기술적 (0~20)**: 추세, RSI 밴드, 지지선 근접도, 실현 변동성
//!
//! 각 지표는 정의된 구간 안에서만 점수를 기여하는 계단식(tiered)
//! 방식으로 평가됩니다. 누락된 지표는 0점을 기여할 뿐 감점하지
//! 않습니다. 서브 점수 합계는 상한에서 클램핑됩니다.
//!
//! 이 모듈 전체는 순수 함수이며, 동일 입력은 항상 동일한 Score를
//! 산출합니다.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use screener_core::{
    Fundamentals, MoatRating, PriceSeries, Quote, Recommendation, Score, ScoreBreakdown,
    TechnicalIndicators, TrendDirection,
};

use crate::indicators::IndicatorEngine;

/// "이상(≥)" 비교 계단식 구간: (하한, 점수). 내림차순 정렬 필수.
type GteTiers = [(Decimal, u8)];

/// "이하(≤)" 비교 계단식 구간: (상한, 점수). 오름차순 정렬 필수.
type LteTiers = [(Decimal, u8)];

/// 값이 속한 첫 번째 "이상" 구간의 점수.
fn tier_gte(value: Decimal, tiers: &GteTiers) -> u8 {
    for &(threshold, points) in tiers {
        if value >= threshold {
            return points;
        }
    }
    0
}

/// 값이 속한 첫 번째 "이하" 구간의 점수.
fn tier_lte(value: Decimal, tiers: &LteTiers) -> u8 {
    for &(threshold, points) in tiers {
        if value <= threshold {
            return points;
        }
    }
    0
}

/// 종합 점수 계산기.
///
/// `(Quote, Fundamentals, PriceSeries, MoatRating?)`에 대한 순수 함수로
/// Score를 산출합니다. 어떤 입력 조합에서도 실패하지 않습니다.
#[derive(Debug, Default)]
pub struct CompositeScorer {
    /// 지표 계산 엔진
    engine: IndicatorEngine,
}

impl CompositeScorer {
    /// 새로운 CompositeScorer 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 종목의 종합 점수 계산.
    ///
    /// # 인자
    ///
    /// * `quote` - 시세 스냅샷
    /// * `fundamentals` - 재무 비율 (모든 필드 nullable)
    /// * `series` - OHLCV 시계열 (bar 20개 미만이면 중립 지표 사용)
    /// * `moat` - 외부 해자 등급 (없으면 마진 기반 추정)
    pub fn score(
        &self,
        quote: &Quote,
        fundamentals: &Fundamentals,
        series: &PriceSeries,
        moat: Option<&MoatRating>,
    ) -> Score {
        let indicators = self.engine.compute(series);

        let breakdown = ScoreBreakdown {
            financial_health: self.financial_health_score(fundamentals),
            moat: self.moat_score(fundamentals, moat),
            growth: self.growth_score(fundamentals),
            valuation: self.valuation_score(quote, fundamentals),
            technical: self.technical_score(&indicators, quote.price),
        };

        let business_quality = breakdown.business_quality();
        let timing = breakdown.timing();
        let total = breakdown.total();
        let recommendation = Recommendation::from_scores(total, business_quality);

        let strengths = self.collect_strengths(quote, fundamentals, &indicators, moat);
        let weaknesses = self.collect_weaknesses(quote, fundamentals, &indicators);
        let explanation =
            self.build_explanation(&quote.symbol, total, business_quality, timing, recommendation);

        Score {
            symbol: quote.symbol.clone(),
            total,
            business_quality,
            timing,
            breakdown,
            recommendation,
            explanation,
            strengths,
            weaknesses,
            indicators,
            calculated_at: Utc::now(),
        }
    }

    // ================================================================================================
    // 서브 점수 계산
    // ================================================================================================

    /// 1. 재무 건전성 (0~25).
    ///
    /// ROE / ROA / 부채비율 / 유동비율 / 순이익률의 계단식 합산.
    /// 개별 최대 합은 28이며 25에서 클램핑됩니다.
    fn financial_health_score(&self, fund: &Fundamentals) -> u8 {
        let mut points = 0u8;

        if let Some(roe) = fund.return_on_equity {
            points += tier_gte(roe, &[(dec!(0.20), 7), (dec!(0.15), 5), (dec!(0.10), 3)]);
        }
        if let Some(roa) = fund.return_on_assets {
            points += tier_gte(roa, &[(dec!(0.10), 3), (dec!(0.05), 2)]);
        }
        if let Some(de) = fund.debt_to_equity {
            points += tier_lte(de, &[(dec!(0.30), 6), (dec!(0.50), 4), (dec!(1.0), 2)]);
        }
        if let Some(cr) = fund.current_ratio {
            points += tier_gte(cr, &[(dec!(2.0), 6), (dec!(1.5), 4), (dec!(1.0), 2)]);
        }
        if let Some(pm) = fund.profit_margin {
            points += tier_gte(pm, &[(dec!(0.20), 6), (dec!(0.10), 4), (dec!(0.05), 2)]);
        }

        points.min(ScoreBreakdown::MAX_FINANCIAL_HEALTH)
    }

    /// 2. 해자 (0~20).
    ///
    /// 외부 등급이 있으면 0~100 점수를 0~20으로 선형 변환(반올림)합니다.
    /// 없으면 매출총이익률 / 영업이익률 / FCF 마진으로 추정합니다.
    fn moat_score(&self, fund: &Fundamentals, moat: Option<&MoatRating>) -> u8 {
        if let Some(rating) = moat {
            // round(overall / 100 * 20)
            let scaled = (rating.clamped_score() as u16 * 20 + 50) / 100;
            return (scaled as u8).min(ScoreBreakdown::MAX_MOAT);
        }

        let mut points = 0u8;

        if let Some(gm) = fund.gross_margin {
            points += tier_gte(gm, &[(dec!(0.50), 7), (dec!(0.35), 5), (dec!(0.20), 3)]);
        }
        if let Some(om) = fund.operating_margin {
            points += tier_gte(om, &[(dec!(0.25), 7), (dec!(0.15), 5), (dec!(0.08), 3)]);
        }
        if let Some(fcf_margin) = fund.fcf_margin() {
            points += tier_gte(
                fcf_margin,
                &[(dec!(0.15), 6), (dec!(0.08), 4), (dec!(0.03), 2)],
            );
        }

        points.min(ScoreBreakdown::MAX_MOAT)
    }

    /// 3. 성장성 (0~15).
    fn growth_score(&self, fund: &Fundamentals) -> u8 {
        let mut points = 0u8;

        if let Some(rg) = fund.revenue_growth {
            points += tier_gte(rg, &[(dec!(0.20), 8), (dec!(0.10), 6), (dec!(0.05), 3)]);
        }
        if let Some(eg) = fund.earnings_growth {
            points += tier_gte(eg, &[(dec!(0.20), 7), (dec!(0.10), 5), (dec!(0.05), 3)]);
        }

        points.min(ScoreBreakdown::MAX_GROWTH)
    }

    /// 4. 밸류에이션 (0~20).
    ///
    /// PER / PEG / PBR / 52주 밴드 내 위치. 52주 저점에 가까울수록
    /// 높은 점수를 받습니다.
    fn valuation_score(&self, quote: &Quote, fund: &Fundamentals) -> u8 {
        let mut points = 0u8;

        if let Some(pe) = quote.pe_ratio {
            if pe > Decimal::ZERO {
                points += tier_lte(pe, &[(dec!(15), 6), (dec!(25), 4), (dec!(40), 2)]);
            }
        }
        if let Some(peg) = fund.peg_ratio {
            if peg > Decimal::ZERO {
                points += tier_lte(peg, &[(dec!(1.0), 5), (dec!(2.0), 3)]);
            }
        }
        if let Some(pb) = fund.price_to_book {
            if pb > Decimal::ZERO {
                points += tier_lte(pb, &[(dec!(1.5), 4), (dec!(3.0), 2)]);
            }
        }
        if let Some(position) = quote.week_52_position() {
            points += tier_lte(position, &[(dec!(0.3), 5), (dec!(0.5), 3), (dec!(0.7), 1)]);
        }

        points.min(ScoreBreakdown::MAX_VALUATION)
    }

    /// 5. 기술적 타이밍 (0~20).
    ///
    /// - 추세: 상승 8 / 중립 4 / 하락 0
    /// - RSI: 30~70 밴드 4, 30 이하 2
    /// - 지지선 근접도: 5% 이내 4, 10% 이내 2
    /// - 실현 변동성: 2% 미만 4, 4% 미만 2
    fn technical_score(&self, indicators: &TechnicalIndicators, price: Decimal) -> u8 {
        let mut points = 0u8;

        points += match indicators.trend {
            TrendDirection::Bullish => 8,
            TrendDirection::Neutral => 4,
            TrendDirection::Bearish => 0,
        };

        let rsi = indicators.rsi_14;
        if rsi > dec!(30) && rsi < dec!(70) {
            points += 4;
        } else if rsi <= dec!(30) {
            points += 2;
        }

        if indicators.support > Decimal::ZERO && price > indicators.support {
            let distance = (price - indicators.support) / indicators.support;
            if distance <= dec!(0.05) {
                points += 4;
            } else if distance <= dec!(0.10) {
                points += 2;
            }
        }

        let vol = indicators.volatility;
        if vol > Decimal::ZERO {
            if vol < dec!(0.02) {
                points += 4;
            } else if vol < dec!(0.04) {
                points += 2;
            }
        }

        points.min(ScoreBreakdown::MAX_TECHNICAL)
    }

    // ================================================================================================
    // 강점 / 약점 / 설명
    // ================================================================================================

    /// 강점 목록 생성.
    ///
    /// 점수에서 역산하지 않고 원본 입력에 대한 독립적인 임계치 검사로
    /// 생성하므로 단독 테스트가 가능합니다.
    fn collect_strengths(
        &self,
        quote: &Quote,
        fund: &Fundamentals,
        indicators: &TechnicalIndicators,
        moat: Option<&MoatRating>,
    ) -> Vec<String> {
        let mut strengths = Vec::new();

        if let Some(roe) = fund.return_on_equity {
            if roe >= dec!(0.15) {
                strengths.push(format!("높은 자기자본이익률 (ROE {}%)", to_pct(roe)));
            }
        }
        if let Some(pm) = fund.profit_margin {
            if pm >= dec!(0.15) {
                strengths.push(format!("높은 순이익률 ({}%)", to_pct(pm)));
            }
        }
        if let Some(de) = fund.debt_to_equity {
            if de <= dec!(0.5) {
                strengths.push("낮은 부채 비율".to_string());
            }
        }
        if let Some(rg) = fund.revenue_growth {
            if rg >= dec!(0.10) {
                strengths.push(format!("견조한 매출 성장 ({}%)", to_pct(rg)));
            }
        }
        if let Some(rating) = moat {
            if rating.clamped_score() >= 70 {
                strengths.push("강한 경쟁 해자".to_string());
            }
        }
        if indicators.trend == TrendDirection::Bullish {
            strengths.push("상승 추세".to_string());
        }
        if let Some(position) = quote.week_52_position() {
            if position <= dec!(0.3) {
                strengths.push("52주 저점 부근의 매력적인 가격".to_string());
            }
        }

        strengths
    }

    /// 약점 목록 생성.
    fn collect_weaknesses(
        &self,
        quote: &Quote,
        fund: &Fundamentals,
        indicators: &TechnicalIndicators,
    ) -> Vec<String> {
        let mut weaknesses = Vec::new();

        if !fund.has_any_metric() {
            weaknesses.push("재무 데이터 부족".to_string());
        }
        if let Some(de) = fund.debt_to_equity {
            if de > dec!(2.0) {
                weaknesses.push("높은 부채 부담".to_string());
            }
        }
        if let Some(pm) = fund.profit_margin {
            if pm < Decimal::ZERO {
                weaknesses.push("적자 상태".to_string());
            }
        }
        if let Some(eg) = fund.earnings_growth {
            if eg < Decimal::ZERO {
                weaknesses.push("이익 감소".to_string());
            }
        }
        if let Some(pe) = quote.pe_ratio {
            if pe > dec!(40) {
                weaknesses.push(format!("높은 밸류에이션 (PER {})", pe.round_dp(1)));
            }
        }
        if indicators.trend == TrendDirection::Bearish {
            weaknesses.push("하락 추세".to_string());
        }
        if indicators.rsi_14 >= dec!(70) {
            weaknesses.push("과매수 구간".to_string());
        }
        if indicators.volatility >= dec!(0.04) {
            weaknesses.push("높은 변동성".to_string());
        }

        weaknesses
    }

    /// 설명 텍스트 생성.
    fn build_explanation(
        &self,
        symbol: &str,
        total: u8,
        business_quality: u8,
        timing: u8,
        recommendation: Recommendation,
    ) -> String {
        format!(
            "{}: 총점 {}점 (사업 품질 {}/60, 타이밍 {}/40) → {}",
            symbol,
            total,
            business_quality,
            timing,
            recommendation.as_str()
        )
    }
}

/// 비율을 정수 퍼센트 문자열로 변환.
fn to_pct(ratio: Decimal) -> Decimal {
    (ratio * dec!(100)).round()
}
