//! 스크리너 핵심 도메인 모델.
//!
//! 이 crate는 스코어링 파이프라인 전반에서 공유되는 도메인 타입을 정의합니다:
//! - 시세 스냅샷 (Quote)
//! - 재무 비율 (Fundamentals)
//! - 가격 시계열 (PricePoint / PriceSeries)
//! - 기술적 지표 스냅샷 (TechnicalIndicators)
//! - 해자 등급 (MoatRating)
//! - 종합 점수 (Score)
//!
//! I/O를 수행하지 않으며, 모든 타입은 직렬화 가능합니다.

pub mod domain;
pub mod logging;

pub use domain::fundamentals::{Fundamentals, FundamentalsSource};
pub use domain::moat::{MoatRating, MoatStrength};
pub use domain::price::{PricePoint, PriceSeries, SeriesError};
pub use domain::quote::Quote;
pub use domain::score::{Recommendation, Score, ScoreBreakdown};
pub use domain::technical::{TechnicalIndicators, TrendDirection};
pub use logging::{init_logging, LogConfig, LogFormat};
