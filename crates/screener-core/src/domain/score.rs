//! 종합 점수 모델.
//!
//! 점수 수명주기: 스코어링 모델이 매 실행마다 새로 생성하며, 다음 실행이
//! 이전 점수를 대체합니다(병합 없음). 신선도는 calculated_at으로만 판정합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::technical::TechnicalIndicators;

/// 투자 추천 등급.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

/// 추천 등급 결정 테이블: (총점 하한, 사업 품질 하한, 등급).
///
/// 위에서부터 첫 번째로 만족하는 행이 선택됩니다.
const RECOMMENDATION_TABLE: &[(u8, u8, Recommendation)] = &[
    (80, 45, Recommendation::StrongBuy),
    (70, 40, Recommendation::Buy),
    (50, 0, Recommendation::Hold),
    (30, 0, Recommendation::Sell),
];

impl Recommendation {
    /// (총점, 사업 품질) 쌍으로부터 추천 등급 결정.
    ///
    /// 순수 함수이며 동일 입력은 항상 동일 등급을 반환합니다.
    pub fn from_scores(total: u8, business_quality: u8) -> Self {
        for &(min_total, min_quality, rec) in RECOMMENDATION_TABLE {
            if total >= min_total && business_quality >= min_quality {
                return rec;
            }
        }
        Recommendation::StrongSell
    }

    /// DB 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongBuy => "strong_buy",
            Self::Buy => "buy",
            Self::Hold => "hold",
            Self::Sell => "sell",
            Self::StrongSell => "strong_sell",
        }
    }

    /// DB 문자열로부터 파싱.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "strong_buy" => Some(Self::StrongBuy),
            "buy" => Some(Self::Buy),
            "hold" => Some(Self::Hold),
            "sell" => Some(Self::Sell),
            "strong_sell" => Some(Self::StrongSell),
            _ => None,
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 서브 점수 분해.
///
/// 각 서브 점수는 고정 상한을 가지며 상한을 초과할 수 없습니다.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// 재무 건전성 (0~25)
    pub financial_health: u8,
    /// 해자 (0~20)
    pub moat: u8,
    /// 성장성 (0~15)
    pub growth: u8,
    /// 밸류에이션 (0~20)
    pub valuation: u8,
    /// 기술적 타이밍 (0~20)
    pub technical: u8,
}

impl ScoreBreakdown {
    /// 재무 건전성 상한.
    pub const MAX_FINANCIAL_HEALTH: u8 = 25;
    /// 해자 상한.
    pub const MAX_MOAT: u8 = 20;
    /// 성장성 상한.
    pub const MAX_GROWTH: u8 = 15;
    /// 밸류에이션 상한.
    pub const MAX_VALUATION: u8 = 20;
    /// 기술적 타이밍 상한.
    pub const MAX_TECHNICAL: u8 = 20;

    /// 사업 품질 점수 (재무 건전성 + 해자 + 성장성, 상한 60).
    pub fn business_quality(&self) -> u8 {
        (self.financial_health + self.moat + self.growth).min(60)
    }

    /// 타이밍 점수 (밸류에이션 + 기술적, 상한 40).
    pub fn timing(&self) -> u8 {
        (self.valuation + self.technical).min(40)
    }

    /// 총점 (사업 품질 + 타이밍, 상한 100).
    pub fn total(&self) -> u8 {
        (self.business_quality() + self.timing()).min(100)
    }
}

/// 한 종목의 종합 점수.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    /// 종목 티커
    pub symbol: String,
    /// 총점 (0~100)
    pub total: u8,
    /// 사업 품질 (0~60)
    pub business_quality: u8,
    /// 타이밍 (0~40)
    pub timing: u8,
    /// 서브 점수 분해
    pub breakdown: ScoreBreakdown,
    /// 추천 등급
    pub recommendation: Recommendation,
    /// 설명 텍스트
    pub explanation: String,
    /// 강점 목록 (순서 보존)
    pub strengths: Vec<String>,
    /// 약점 목록 (순서 보존)
    pub weaknesses: Vec<String>,
    /// 계산에 사용된 기술적 지표 스냅샷
    pub indicators: TechnicalIndicators,
    /// 계산 시각
    pub calculated_at: DateTime<Utc>,
}

impl Score {
    /// 점수가 주어진 시각 기준으로 오래되었는지 확인.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age_hours: i64) -> bool {
        now - self.calculated_at > chrono::Duration::hours(max_age_hours)
    }
}
