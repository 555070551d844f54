//! 가격 시계열 모델.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 가격 시계열 오류.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    /// 날짜 순서 위반 (엄격한 오름차순이어야 함)
    #[error("날짜 순서 위반: {prev} 이후에 {next}가 올 수 없습니다")]
    OutOfOrder { prev: NaiveDate, next: NaiveDate },
}

/// 하나의 OHLCV 일봉.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricePoint {
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: u64,
}

/// 날짜 오름차순으로 정렬된 append-only OHLCV 시계열.
///
/// 불변식: 날짜는 엄격히 증가하며 중복이 없습니다.
/// 빠진 날짜(휴장일)는 허용됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// 빈 시계열 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 정렬되지 않은 bar 목록으로부터 시계열 생성.
    ///
    /// 날짜순으로 정렬하고 중복 날짜는 나중 항목을 버립니다.
    pub fn from_points(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Self { points }
    }

    /// bar 추가. 마지막 bar보다 이후 날짜여야 합니다.
    pub fn push(&mut self, point: PricePoint) -> Result<(), SeriesError> {
        if let Some(last) = self.points.last() {
            if point.date <= last.date {
                return Err(SeriesError::OutOfOrder {
                    prev: last.date,
                    next: point.date,
                });
            }
        }
        self.points.push(point);
        Ok(())
    }

    /// bar 개수.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 시계열이 비어있는지 확인.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 전체 bar 슬라이스.
    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    /// 종가 벡터 (날짜순).
    pub fn closes(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.close).collect()
    }

    /// 고가 벡터 (날짜순).
    pub fn highs(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.high).collect()
    }

    /// 저가 벡터 (날짜순).
    pub fn lows(&self) -> Vec<Decimal> {
        self.points.iter().map(|p| p.low).collect()
    }

    /// 최신 종가.
    pub fn latest_close(&self) -> Option<Decimal> {
        self.points.last().map(|p| p.close)
    }

    /// 최신 bar.
    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }
}
