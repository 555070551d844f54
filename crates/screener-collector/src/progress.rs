//! 실행 단위 진행 상태.
//!
//! 프로세스 전역 가변 상태 대신, 실행이 소유하고 실행 종료 시
//! 요약으로 변환되어 버려지는 run-scoped 값입니다. 카운터는 배치 내
//! 동시 처리 퓨처들이 경합하므로 원자적으로 갱신합니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::stats::RunSummary;

/// 실행 단계.
///
/// `Idle → Listing → Batching(i) → Reporting → Idle` 순으로
/// 전이합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// 대기
    Idle,
    /// 심볼 목록/신선도 조회
    Listing,
    /// i번째 배치 처리 중
    Batching(usize),
    /// 요약 생성
    Reporting,
}

/// 한 실행의 진행 상태.
#[derive(Debug)]
pub struct CalculationProgress {
    /// 총 대상 심볼 수
    total: usize,
    /// 성공 카운터
    completed: AtomicUsize,
    /// 실패 카운터
    failed: AtomicUsize,
    /// 현재 처리 중인 심볼
    current: Mutex<Option<String>>,
    /// 현재 단계
    phase: Mutex<RunPhase>,
    /// 실행 시작 시각
    started_at: Instant,
    /// (심볼, 오류) 목록
    failures: Mutex<Vec<(String, String)>>,
}

impl CalculationProgress {
    /// 총 대상 수로 진행 상태 생성.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            current: Mutex::new(None),
            phase: Mutex::new(RunPhase::Idle),
            started_at: Instant::now(),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// 총 대상 심볼 수.
    pub fn total(&self) -> usize {
        self.total
    }

    /// 성공 수.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// 실패 수.
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// 현재 단계.
    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap()
    }

    /// 단계 전이.
    pub fn set_phase(&self, phase: RunPhase) {
        *self.phase.lock().unwrap() = phase;
    }

    /// 현재 처리 중인 심볼.
    pub fn current(&self) -> Option<String> {
        self.current.lock().unwrap().clone()
    }

    /// 현재 처리 중인 심볼 기록.
    pub fn set_current(&self, symbol: &str) {
        *self.current.lock().unwrap() = Some(symbol.to_string());
    }

    /// 성공 기록.
    pub fn record_success(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    /// 실패 기록.
    pub fn record_failure(&self, symbol: &str, error: String) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.failures
            .lock()
            .unwrap()
            .push((symbol.to_string(), error));
    }

    /// 실행 요약으로 변환 (진행 상태는 소비되어 버려짐).
    pub fn into_summary(self) -> RunSummary {
        RunSummary {
            total: self.total,
            completed: self.completed.into_inner(),
            failed: self.failed.into_inner(),
            failures: self.failures.into_inner().unwrap_or_default(),
            duration: self.started_at.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_progress_counters() {
        let progress = CalculationProgress::new(3);
        progress.set_current("AAPL");
        progress.record_success();
        progress.record_success();
        progress.record_failure("FAIL", "rate limited".to_string());

        assert_eq!(progress.completed(), 2);
        assert_eq!(progress.failed(), 1);
        assert_eq!(progress.current().as_deref(), Some("AAPL"));

        let summary = progress.into_summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, "FAIL");
    }

    #[test]
    fn test_phase_transitions() {
        let progress = CalculationProgress::new(1);
        assert_eq!(progress.phase(), RunPhase::Idle);

        progress.set_phase(RunPhase::Listing);
        progress.set_phase(RunPhase::Batching(0));
        assert_eq!(progress.phase(), RunPhase::Batching(0));

        progress.set_phase(RunPhase::Reporting);
        assert_eq!(progress.phase(), RunPhase::Reporting);
    }

    #[tokio::test]
    async fn test_concurrent_updates() {
        let progress = Arc::new(CalculationProgress::new(100));

        let mut handles = Vec::new();
        for i in 0..100 {
            let progress = progress.clone();
            handles.push(tokio::spawn(async move {
                if i % 4 == 0 {
                    progress.record_failure(&format!("S{}", i), "err".to_string());
                } else {
                    progress.record_success();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(progress.completed(), 75);
        assert_eq!(progress.failed(), 25);
    }
}
