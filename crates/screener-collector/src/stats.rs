//! 실행 결과 요약 구조체.

use serde::Serialize;
use std::time::Duration;

/// 한 번의 크롤링 실행 요약.
///
/// 실행 종료 시 run-scoped 진행 상태로부터 생성되어 호출자에게
/// 반환됩니다. 영속화되지 않습니다.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// 총 대상 심볼 수
    pub total: usize,
    /// 성공 횟수
    pub completed: usize,
    /// 실패 횟수
    pub failed: usize,
    /// (심볼, 오류) 목록 (발생 순서 보존)
    pub failures: Vec<(String, String)>,
    /// 소요 시간
    #[serde(skip)]
    pub duration: Duration,
}

impl RunSummary {
    /// 처리할 심볼이 없었던 no-op 실행 요약.
    pub fn empty() -> Self {
        Self::default()
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }

    /// 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            completed = self.completed,
            failed = self.failed,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.duration.as_secs_f64()),
            "실행 완료"
        );

        for (symbol, error) in &self.failures {
            tracing::warn!(symbol = %symbol, error = %error, "실패 심볼");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_rate() {
        let summary = RunSummary {
            total: 10,
            completed: 7,
            failed: 3,
            failures: vec![],
            duration: Duration::from_secs(5),
        };
        assert!((summary.success_rate() - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::empty();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.completed, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.success_rate(), 0.0);
    }
}
