//! 변동성 지표 (Volatility Indicators).
//!
//! 가격 변동성을 측정하는 지표들을 제공합니다.
//! - Bollinger Bands (볼린저 밴드)
//! - 실현 변동성 (일일 수익률 표준편차)

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{IndicatorError, IndicatorResult};

/// 볼린저 밴드 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BollingerBandsParams {
    /// 이동평균 기간 (기본: 20).
    pub period: usize,
    /// 표준편차 배수 (기본: 2.0).
    pub std_dev_multiplier: Decimal,
}

impl Default for BollingerBandsParams {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: dec!(2.0),
        }
    }
}

/// 볼린저 밴드 결과.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BollingerBandsResult {
    /// 상단 밴드 (MA + k × σ).
    pub upper: Option<Decimal>,
    /// 중간 밴드 (이동평균).
    pub middle: Option<Decimal>,
    /// 하단 밴드 (MA - k × σ).
    pub lower: Option<Decimal>,
}

/// 변동성 지표 계산기.
#[derive(Debug, Default)]
pub struct VolatilityCalculator;

impl VolatilityCalculator {
    /// 새로운 변동성 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 볼린저 밴드 계산.
    ///
    /// 상단 밴드 = MA + (k × σ)
    /// 중간 밴드 = MA (이동평균)
    /// 하단 밴드 = MA - (k × σ)
    ///
    /// σ는 트레일링 period개 종가의 모표준편차입니다.
    ///
    /// # 인자
    /// * `prices` - 가격 데이터 (종가)
    /// * `params` - 볼린저 밴드 파라미터
    ///
    /// # 반환
    /// 상단, 중간, 하단 밴드 값들
    pub fn bollinger_bands(
        &self,
        prices: &[Decimal],
        params: BollingerBandsParams,
    ) -> IndicatorResult<Vec<BollingerBandsResult>> {
        let period = params.period;

        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        if prices.len() < period {
            return Err(IndicatorError::InsufficientData {
                required: period,
                provided: prices.len(),
            });
        }

        let mut result = Vec::with_capacity(prices.len());
        let period_decimal = Decimal::from(period);

        for i in 0..prices.len() {
            if i < period - 1 {
                result.push(BollingerBandsResult {
                    upper: None,
                    middle: None,
                    lower: None,
                });
            } else {
                let window = &prices[i + 1 - period..=i];

                let sum: Decimal = window.iter().sum();
                let ma = sum / period_decimal;

                let variance: Decimal = window
                    .iter()
                    .map(|&p| {
                        let diff = p - ma;
                        diff * diff
                    })
                    .sum::<Decimal>()
                    / period_decimal;

                let std_dev = self.sqrt_decimal(variance);
                let deviation = params.std_dev_multiplier * std_dev;

                result.push(BollingerBandsResult {
                    upper: Some(ma + deviation),
                    middle: Some(ma),
                    lower: Some(ma - deviation),
                });
            }
        }

        Ok(result)
    }

    /// 실현 변동성 계산.
    ///
    /// 트레일링 `window`개 일일 수익률의 모표준편차 (비율 단위).
    /// 수익률을 계산할 수 없으면 (bar 2개 미만) 0을 반환합니다.
    ///
    /// # 인자
    /// * `prices` - 가격 데이터 (종가)
    /// * `window` - 참조할 최근 수익률 개수
    pub fn realized_volatility(&self, prices: &[Decimal], window: usize) -> Decimal {
        if prices.len() < 2 || window == 0 {
            return Decimal::ZERO;
        }

        let mut returns = Vec::with_capacity(prices.len() - 1);
        for i in 1..prices.len() {
            if prices[i - 1] > Decimal::ZERO {
                returns.push((prices[i] - prices[i - 1]) / prices[i - 1]);
            }
        }

        if returns.is_empty() {
            return Decimal::ZERO;
        }

        let start = returns.len().saturating_sub(window);
        let tail = &returns[start..];
        let count = Decimal::from(tail.len());

        let mean: Decimal = tail.iter().sum::<Decimal>() / count;
        let variance: Decimal = tail
            .iter()
            .map(|&r| {
                let diff = r - mean;
                diff * diff
            })
            .sum::<Decimal>()
            / count;

        self.sqrt_decimal(variance)
    }

    /// Newton 반복법으로 Decimal 제곱근 계산.
    fn sqrt_decimal(&self, value: Decimal) -> Decimal {
        if value <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let two = dec!(2);
        let mut guess = value / two;
        if guess == Decimal::ZERO {
            guess = value;
        }

        // 16회 반복이면 소수점 이하 충분한 정밀도에 수렴
        for _ in 0..16 {
            let next = (guess + value / guess) / two;
            if (next - guess).abs() < dec!(0.0000000001) {
                return next;
            }
            guess = next;
        }

        guess
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqrt_decimal() {
        let volatility = VolatilityCalculator::new();

        let sqrt_4 = volatility.sqrt_decimal(dec!(4));
        assert!((sqrt_4 - dec!(2)).abs() < dec!(0.0001));

        let sqrt_9 = volatility.sqrt_decimal(dec!(9));
        assert!((sqrt_9 - dec!(3)).abs() < dec!(0.0001));

        let sqrt_2 = volatility.sqrt_decimal(dec!(2));
        assert!((sqrt_2 - dec!(1.4142)).abs() < dec!(0.001));

        assert_eq!(volatility.sqrt_decimal(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_bollinger_bands_basic() {
        let volatility = VolatilityCalculator::new();
        let prices: Vec<Decimal> = (0..25).map(|i| Decimal::from(100 + i % 5)).collect();

        let bands = volatility
            .bollinger_bands(&prices, BollingerBandsParams::default())
            .unwrap();

        assert_eq!(bands.len(), prices.len());

        // 처음 19개는 None
        assert!(bands[18].middle.is_none());

        // 20번째부터 값이 있고 상단 > 중간 > 하단
        let last = bands.last().unwrap();
        let (upper, middle, lower) = (
            last.upper.unwrap(),
            last.middle.unwrap(),
            last.lower.unwrap(),
        );
        assert!(upper > middle);
        assert!(middle > lower);
    }

    #[test]
    fn test_bollinger_constant_prices_collapse() {
        let volatility = VolatilityCalculator::new();
        let prices = vec![dec!(100); 20];

        let bands = volatility
            .bollinger_bands(&prices, BollingerBandsParams::default())
            .unwrap();

        // 변동이 없으면 세 밴드가 일치
        let last = bands.last().unwrap();
        assert_eq!(last.upper, Some(dec!(100)));
        assert_eq!(last.middle, Some(dec!(100)));
        assert_eq!(last.lower, Some(dec!(100)));
    }

    #[test]
    fn test_realized_volatility_zero_for_flat_series() {
        let volatility = VolatilityCalculator::new();
        let prices = vec![dec!(100); 30];

        assert_eq!(volatility.realized_volatility(&prices, 20), Decimal::ZERO);
    }

    #[test]
    fn test_realized_volatility_positive_for_noisy_series() {
        let volatility = VolatilityCalculator::new();
        let prices: Vec<Decimal> = (0..30)
            .map(|i| if i % 2 == 0 { dec!(100) } else { dec!(105) })
            .collect();

        let vol = volatility.realized_volatility(&prices, 20);
        assert!(vol > dec!(0.02), "vol {}", vol);
    }

    #[test]
    fn test_realized_volatility_degenerate_input() {
        let volatility = VolatilityCalculator::new();
        assert_eq!(volatility.realized_volatility(&[], 20), Decimal::ZERO);
        assert_eq!(
            volatility.realized_volatility(&[dec!(100)], 20),
            Decimal::ZERO
        );
    }
}
