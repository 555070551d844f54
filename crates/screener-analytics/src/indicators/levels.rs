//! 지지/저항선 (Support / Resistance Levels).
//!
//! 대칭 윈도우 극값 탐색으로 가격 레벨을 식별합니다.
//! 윈도우 내에서 같은 극값이 반복 확인된 최상위 레벨만 유지하고,
//! 최신 종가 아래의 가장 가까운 지지선과 위의 가장 가까운 저항선을
//! 선택합니다. 양쪽 모두 항상 정의됩니다 (없으면 극값 대비 고정
//! 비율 오프셋으로 대체).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// 레벨 탐색 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LevelParams {
    /// 극값 판정용 대칭 윈도우 반경 (기본: ±10 bar).
    pub window: usize,
    /// 같은 극값으로 인정하는 상대 허용 오차 (기본: 0.1%).
    pub tolerance: Decimal,
    /// 레벨 부재 시 극값 대비 오프셋 비율 (기본: 5%).
    pub fallback_offset: Decimal,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            window: 10,
            tolerance: dec!(0.001),
            fallback_offset: dec!(0.05),
        }
    }
}

/// 지지/저항선 계산기.
#[derive(Debug, Default)]
pub struct LevelCalculator;

impl LevelCalculator {
    /// 새로운 레벨 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 지지선과 저항선 계산.
    ///
    /// # 인자
    /// * `highs` - 고가 데이터
    /// * `lows` - 저가 데이터
    /// * `price` - 최신 종가
    /// * `params` - 레벨 파라미터
    ///
    /// # 반환
    /// (지지선, 저항선). 확인된 레벨이 없는 쪽은 시계열 극값 대비
    /// 고정 비율 오프셋으로 대체되므로 항상 0보다 큰 값이 반환됩니다
    /// (입력이 비어있으면 0).
    pub fn support_resistance(
        &self,
        highs: &[Decimal],
        lows: &[Decimal],
        price: Decimal,
        params: LevelParams,
    ) -> (Decimal, Decimal) {
        if highs.is_empty() || lows.is_empty() {
            return (Decimal::ZERO, Decimal::ZERO);
        }

        let support_levels = self.confirmed_levels(lows, params, Extremum::Min);
        let resistance_levels = self.confirmed_levels(highs, params, Extremum::Max);

        // 종가 아래의 가장 가까운 지지선
        let support = support_levels
            .iter()
            .filter(|&&level| level < price)
            .max()
            .copied()
            .unwrap_or_else(|| {
                let lowest = lows.iter().min().copied().unwrap_or(Decimal::ZERO);
                lowest * (Decimal::ONE - params.fallback_offset)
            });

        // 종가 위의 가장 가까운 저항선
        let resistance = resistance_levels
            .iter()
            .filter(|&&level| level > price)
            .min()
            .copied()
            .unwrap_or_else(|| {
                let highest = highs.iter().max().copied().unwrap_or(Decimal::ZERO);
                highest * (Decimal::ONE + params.fallback_offset)
            });

        (support, resistance)
    }

    /// 반복 확인된 극값 레벨 탐색.
    ///
    /// bar i는 ±window 범위 전체에서 극값이면서, 그 범위 안에 허용
    /// 오차 내의 같은 값이 2회 이상 나타나야 최상위 레벨로 인정됩니다.
    fn confirmed_levels(
        &self,
        values: &[Decimal],
        params: LevelParams,
        extremum: Extremum,
    ) -> Vec<Decimal> {
        let window = params.window;
        let mut levels = Vec::new();

        if values.len() < 2 * window + 1 {
            return levels;
        }

        for i in window..values.len() - window {
            let candidate = values[i];
            let range = &values[i - window..=i + window];

            let is_extremum = match extremum {
                Extremum::Min => range.iter().all(|&v| v >= candidate),
                Extremum::Max => range.iter().all(|&v| v <= candidate),
            };
            if !is_extremum {
                continue;
            }

            // 같은 극값이 윈도우 안에서 반복되는지 확인 (자기 자신 포함 2회 이상)
            let tolerance_band = candidate * params.tolerance;
            let recurrence = range
                .iter()
                .filter(|&&v| (v - candidate).abs() <= tolerance_band)
                .count();
            if recurrence < 2 {
                continue;
            }

            if !levels.contains(&candidate) {
                levels.push(candidate);
            }
        }

        levels
    }
}

/// 극값 종류.
#[derive(Debug, Clone, Copy)]
enum Extremum {
    Min,
    Max,
}
