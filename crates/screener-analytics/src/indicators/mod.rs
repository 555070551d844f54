//! 기술적 지표 모듈.
//!
//! PriceSeries에 대한 순수 함수로 기술적 지표를 계산합니다.
//!
//! # 지원 지표
//!
//! ## 추세 지표 (Trend Indicators)
//! - **SMA**: 단순 이동평균 (20/50/150/200)
//! - **EMA**: 지수 이동평균 (첫 가격에서 시드)
//! - **MACD**: 이동평균 수렴/확산 (12, 26, 9)
//! - **추세 분류**: 가격과 SMA50/SMA200의 상대 위치
//!
//! ## 모멘텀 지표 (Momentum Indicators)
//! - **RSI(14)**: Wilder 방식 평활화
//!
//! ## 변동성 지표 (Volatility Indicators)
//! - **Bollinger Bands**: SMA20 ± 2σ
//! - **실현 변동성**: 일일 수익률 표준편차
//!
//! ## 가격 레벨 (Price Levels)
//! - **지지/저항선**: ±10 bar 대칭 윈도우 극값 탐색
//!
//! # 데이터 부족 정책
//!
//! bar가 20개 미만이면 [`IndicatorEngine::compute`]는 오류 대신
//! 중립 지표 세트를 반환합니다. 호출자는 이를 "데이터 부족"으로
//! 취급해야 합니다.

pub mod levels;
pub mod momentum;
pub mod trend;
pub mod volatility;

use rust_decimal::Decimal;
use thiserror::Error;

use screener_core::{PriceSeries, TechnicalIndicators};

pub use levels::{LevelCalculator, LevelParams};
pub use momentum::{MomentumCalculator, RsiParams};
pub use trend::{EmaParams, MacdParams, MacdResult, SmaParams, TrendCalculator};
pub use volatility::{BollingerBandsParams, BollingerBandsResult, VolatilityCalculator};

/// 지표 계산이 의미를 갖는 최소 bar 수.
pub const MIN_BARS: usize = 20;

/// 지표 계산 오류.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// 데이터 부족 오류
    #[error("데이터가 부족합니다: 필요 {required}개, 제공 {provided}개")]
    InsufficientData { required: usize, provided: usize },

    /// 잘못된 파라미터
    #[error("잘못된 파라미터: {0}")]
    InvalidParameter(String),
}

/// 지표 계산 결과 타입.
pub type IndicatorResult<T> = Result<T, IndicatorError>;

/// 통합 지표 엔진.
///
/// 모든 기술적 지표 계산을 위한 통합 인터페이스를 제공합니다.
/// 상태가 없으며 결정적입니다.
#[derive(Debug, Default)]
pub struct IndicatorEngine {
    trend: TrendCalculator,
    momentum: MomentumCalculator,
    volatility: VolatilityCalculator,
    levels: LevelCalculator,
}

impl IndicatorEngine {
    /// 새로운 지표 엔진 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// PriceSeries로부터 지표 스냅샷 계산.
    ///
    /// bar가 [`MIN_BARS`] 미만이면 [`TechnicalIndicators::neutral`]을
    /// 반환합니다. 그 외에는 모든 지표를 계산하며, 기간 미달로 정의되지
    /// 않는 이동평균은 0으로 남습니다. 이 함수는 실패하지 않습니다.
    pub fn compute(&self, series: &PriceSeries) -> TechnicalIndicators {
        if series.len() < MIN_BARS {
            return TechnicalIndicators::neutral();
        }

        let closes = series.closes();
        let highs = series.highs();
        let lows = series.lows();
        // MIN_BARS 검사를 통과했으므로 latest_close는 항상 존재
        let price = closes[closes.len() - 1];

        let sma_20 = self.sma_latest(&closes, 20);
        let sma_50 = self.sma_latest(&closes, 50);
        let sma_150 = self.sma_latest(&closes, 150);
        let sma_200 = self.sma_latest(&closes, 200);

        let rsi_14 = self
            .momentum
            .rsi(&closes, RsiParams::default())
            .ok()
            .and_then(|values| values.last().copied().flatten())
            .unwrap_or_else(|| Decimal::from(50));

        let (macd, macd_signal, macd_histogram) = self
            .trend
            .macd(&closes, MacdParams::default())
            .ok()
            .and_then(|values| values.last().copied())
            .map(|r| (r.macd, r.signal, r.histogram))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO, Decimal::ZERO));

        let (bollinger_upper, bollinger_middle, bollinger_lower) = self
            .volatility
            .bollinger_bands(&closes, BollingerBandsParams::default())
            .ok()
            .and_then(|values| values.last().copied())
            .and_then(|b| match (b.upper, b.middle, b.lower) {
                (Some(u), Some(m), Some(l)) => Some((u, m, l)),
                _ => None,
            })
            .unwrap_or((Decimal::ZERO, Decimal::ZERO, Decimal::ZERO));

        let (support, resistance) =
            self.levels
                .support_resistance(&highs, &lows, price, LevelParams::default());

        // 50 bar 미만에서는 SMA50이 미정의이므로 SMA20을 기준선으로 사용
        let trend_reference = if sma_50 > Decimal::ZERO { sma_50 } else { sma_20 };
        let trend = self
            .trend
            .classify(price, trend_reference, sma_200, closes.len());

        let volatility = self.volatility.realized_volatility(&closes, 20);

        TechnicalIndicators {
            sma_20,
            sma_50,
            sma_150,
            sma_200,
            rsi_14,
            macd,
            macd_signal,
            macd_histogram,
            bollinger_upper,
            bollinger_middle,
            bollinger_lower,
            support,
            resistance,
            trend,
            volatility,
        }
    }

    /// 최신 시점의 SMA(n). 기간 미달이면 0.
    fn sma_latest(&self, closes: &[Decimal], period: usize) -> Decimal {
        self.trend
            .sma(closes, SmaParams { period })
            .ok()
            .and_then(|values| values.last().copied().flatten())
            .unwrap_or(Decimal::ZERO)
    }
}
