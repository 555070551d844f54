//! 해자(moat) 등급 모델.
//!
//! 외부 정성 평가 서비스가 산출하는 경쟁우위 점수입니다.
//! 파이프라인은 이 값을 불투명한 0~100 신호로만 소비하며,
//! 없을 수 있음을 전제합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 해자 강도 라벨.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoatStrength {
    /// 넓은 해자
    Wide,
    /// 좁은 해자
    Narrow,
    /// 해자 없음
    None,
}

/// 외부에서 공급되는 해자 등급.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoatRating {
    /// 종목 티커
    pub symbol: String,
    /// 종합 점수 (0~100)
    pub overall_score: u8,
    /// 강도 라벨
    pub strength: MoatStrength,
    /// 요약 설명 (선택)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// 평가 시각
    pub rated_at: DateTime<Utc>,
}

impl MoatRating {
    /// 0~100 범위로 클램핑된 점수 반환.
    pub fn clamped_score(&self) -> u8 {
        self.overall_score.min(100)
    }
}
