//! 모멘텀 지표 (Momentum Indicators).
//!
//! 과매수/과매도 상태를 측정하는 지표를 제공합니다.
//! - RSI (Relative Strength Index, Wilder 평활화)

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{IndicatorError, IndicatorResult};

/// RSI 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RsiParams {
    /// RSI 기간 (기본: 14).
    pub period: usize,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// 모멘텀 지표 계산기.
#[derive(Debug, Default)]
pub struct MomentumCalculator;

impl MomentumCalculator {
    /// 새로운 모멘텀 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// RSI (Relative Strength Index) 계산.
    ///
    /// Wilder 방식 평활화를 사용합니다:
    /// - 초기 평균 상승/하락폭은 첫 period개 델타의 단순 평균
    /// - 이후 평균 = (이전 평균 × (period - 1) + 현재값) / period
    ///
    /// RSI = 100 - (100 / (1 + RS)), RS = 평균 상승폭 / 평균 하락폭.
    /// 평균 하락폭이 0이면 RSI = 100.
    ///
    /// # 인자
    /// * `prices` - 가격 데이터 (종가)
    /// * `params` - RSI 파라미터
    ///
    /// # 반환
    /// 0-100 사이의 RSI 값들 (처음 period개는 None)
    pub fn rsi(
        &self,
        prices: &[Decimal],
        params: RsiParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
        let period = params.period;

        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        if prices.len() < period + 1 {
            return Err(IndicatorError::InsufficientData {
                required: period + 1,
                provided: prices.len(),
            });
        }

        let period_decimal = Decimal::from(period);
        let mut result: Vec<Option<Decimal>> = vec![None; period];

        // 초기 평균: 첫 period개 델타의 단순 평균
        let mut avg_gain = Decimal::ZERO;
        let mut avg_loss = Decimal::ZERO;
        for i in 1..=period {
            let delta = prices[i] - prices[i - 1];
            if delta > Decimal::ZERO {
                avg_gain += delta;
            } else {
                avg_loss += delta.abs();
            }
        }
        avg_gain /= period_decimal;
        avg_loss /= period_decimal;

        result.push(Some(Self::rsi_value(avg_gain, avg_loss)));

        // 이후 델타는 지수적으로 평활화
        let prev_weight = Decimal::from(period - 1);
        for i in period + 1..prices.len() {
            let delta = prices[i] - prices[i - 1];
            let (gain, loss) = if delta > Decimal::ZERO {
                (delta, Decimal::ZERO)
            } else {
                (Decimal::ZERO, delta.abs())
            };

            avg_gain = (avg_gain * prev_weight + gain) / period_decimal;
            avg_loss = (avg_loss * prev_weight + loss) / period_decimal;

            result.push(Some(Self::rsi_value(avg_gain, avg_loss)));
        }

        Ok(result)
    }

    /// 평균 상승/하락폭으로부터 RSI 값 계산.
    fn rsi_value(avg_gain: Decimal, avg_loss: Decimal) -> Decimal {
        if avg_loss == Decimal::ZERO {
            return dec!(100);
        }
        let rs = avg_gain / avg_loss;
        dec!(100) - (dec!(100) / (Decimal::ONE + rs))
    }
}
