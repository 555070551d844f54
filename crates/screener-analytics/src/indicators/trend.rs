//! 추세 지표 (Trend Indicators).
//!
//! 이동평균 기반의 추세 지표들을 제공합니다.
//! - SMA (Simple Moving Average)
//! - EMA (Exponential Moving Average)
//! - MACD (Moving Average Convergence Divergence)
//! - 추세 분류 (Bullish/Bearish)

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use screener_core::TrendDirection;

use super::{IndicatorError, IndicatorResult};

/// SMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SmaParams {
    /// 이동평균 기간.
    pub period: usize,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self { period: 20 }
    }
}

/// EMA 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmaParams {
    /// 이동평균 기간.
    pub period: usize,
}

impl Default for EmaParams {
    fn default() -> Self {
        Self { period: 12 }
    }
}

/// MACD 파라미터.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdParams {
    /// 단기 EMA 기간 (기본: 12).
    pub fast_period: usize,
    /// 장기 EMA 기간 (기본: 26).
    pub slow_period: usize,
    /// 시그널 라인 기간 (기본: 9).
    pub signal_period: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

/// MACD 결과.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MacdResult {
    /// MACD 라인 (단기 EMA - 장기 EMA).
    pub macd: Decimal,
    /// 시그널 라인 (MACD의 EMA).
    pub signal: Decimal,
    /// 히스토그램 (MACD - 시그널).
    pub histogram: Decimal,
}

/// 추세 지표 계산기.
#[derive(Debug, Default)]
pub struct TrendCalculator;

impl TrendCalculator {
    /// 새로운 추세 지표 계산기 생성.
    pub fn new() -> Self {
        Self
    }

    /// 단순 이동평균 (SMA) 계산.
    ///
    /// SMA = (P1 + P2 + ... + Pn) / n
    ///
    /// # 인자
    /// * `prices` - 가격 데이터 (종가)
    /// * `params` - SMA 파라미터
    ///
    /// # 반환
    /// 각 시점의 SMA 값 (처음 period-1개는 None)
    pub fn sma(
        &self,
        prices: &[Decimal],
        params: SmaParams,
    ) -> IndicatorResult<Vec<Option<Decimal>>> {
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
                result.push(None);
            } else {
                let sum: Decimal = prices[i + 1 - period..=i].iter().sum();
                result.push(Some(sum / period_decimal));
            }
        }

        Ok(result)
    }

    /// 지수 이동평균 (EMA) 계산.
    ///
    /// EMA = (현재가 × k) + (이전 EMA × (1 - k)), k = 2 / (period + 1)
    ///
    /// 첫 가격을 시드로 사용하므로 모든 시점에서 값이 정의됩니다.
    ///
    /// # 인자
    /// * `prices` - 가격 데이터 (종가)
    /// * `params` - EMA 파라미터
    ///
    /// # 반환
    /// 각 시점의 EMA 값
    pub fn ema(&self, prices: &[Decimal], params: EmaParams) -> IndicatorResult<Vec<Decimal>> {
        let period = params.period;

        if period == 0 {
            return Err(IndicatorError::InvalidParameter(
                "기간은 0보다 커야 합니다".to_string(),
            ));
        }

        if prices.is_empty() {
            return Err(IndicatorError::InsufficientData {
                required: 1,
                provided: 0,
            });
        }

        let multiplier = dec!(2) / Decimal::from(period + 1);
        let mut result = Vec::with_capacity(prices.len());

        let mut prev_ema = prices[0];
        result.push(prev_ema);

        for price in prices.iter().skip(1) {
            let ema = (*price * multiplier) + (prev_ema * (Decimal::ONE - multiplier));
            result.push(ema);
            prev_ema = ema;
        }

        Ok(result)
    }

    /// MACD 계산.
    ///
    /// MACD 라인 = EMA(12) - EMA(26)
    /// 시그널 라인 = MACD 라인의 EMA(9)
    /// 히스토그램 = MACD 라인 - 시그널 라인
    ///
    /// # 인자
    /// * `prices` - 가격 데이터 (종가)
    /// * `params` - MACD 파라미터
    ///
    /// # 반환
    /// 각 시점의 MACD, 시그널, 히스토그램 값
    pub fn macd(&self, prices: &[Decimal], params: MacdParams) -> IndicatorResult<Vec<MacdResult>> {
        let fast_ema = self.ema(
            prices,
            EmaParams {
                period: params.fast_period,
            },
        )?;
        let slow_ema = self.ema(
            prices,
            EmaParams {
                period: params.slow_period,
            },
        )?;

        let macd_line: Vec<Decimal> = fast_ema
            .iter()
            .zip(slow_ema.iter())
            .map(|(fast, slow)| fast - slow)
            .collect();

        let signal_line = self.ema(
            &macd_line,
            EmaParams {
                period: params.signal_period,
            },
        )?;

        let result = macd_line
            .iter()
            .zip(signal_line.iter())
            .map(|(&macd, &signal)| MacdResult {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect();

        Ok(result)
    }

    /// 추세 분류.
    ///
    /// - 상승: 가격 > SMA50 > SMA200 (200 bar 미만이면 가격 > SMA50)
    /// - 하락: 미러 조건
    /// - 그 외: SMA200 기준 가격 위치로 분류 (없으면 SMA50 기준)
    ///
    /// bar가 20개 이상이면 Neutral을 반환하지 않습니다. 이 이진 분류는
    /// 결정성을 위한 고정 설계입니다.
    ///
    /// # 인자
    /// * `price` - 최신 종가
    /// * `sma_50` - 50일 이동평균 (50 bar 미만이면 호출자가 SMA20을 대입)
    /// * `sma_200` - 200일 이동평균 (미정의면 0)
    /// * `bar_count` - 시계열 bar 수
    pub fn classify(
        &self,
        price: Decimal,
        sma_50: Decimal,
        sma_200: Decimal,
        bar_count: usize,
    ) -> TrendDirection {
        if bar_count < super::MIN_BARS {
            return TrendDirection::Neutral;
        }

        if bar_count >= 200 && sma_200 > Decimal::ZERO {
            if price > sma_50 && sma_50 > sma_200 {
                return TrendDirection::Bullish;
            }
            if price < sma_50 && sma_50 < sma_200 {
                return TrendDirection::Bearish;
            }
            return if price >= sma_200 {
                TrendDirection::Bullish
            } else {
                TrendDirection::Bearish
            };
        }

        // 200 bar 미만: 가용한 최장 이동평균 기준 이진 분류
        if price >= sma_50 {
            TrendDirection::Bullish
        } else {
            TrendDirection::Bearish
        }
    }
}
