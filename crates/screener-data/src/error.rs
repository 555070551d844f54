//! 데이터 모듈 오류 타입.
//!
//! 파이프라인의 오류 분류 체계를 정의합니다:
//! - **ProviderUnavailable**: 자격 증명 누락 또는 프로바이더 다운. fallback으로
//!   전환하며 재시도하지 않습니다.
//! - **RateLimited**: 프로바이더가 보고한 요청 한도 초과. 지수 백오프로
//!   재시도합니다.
//! - **IncompleteData**: 필수 시세/재무 데이터 누락. 이번 실행에서 해당
//!   심볼을 건너뛰며 재시도하지 않습니다.
//! - **Network / Timeout**: 일시적 I/O 오류. 고정 딜레이로 재시도합니다.
//! - **CacheError**: cache 읽기/쓰기 오류. 항상 흡수되어 miss로 처리되며
//!   절대 전파되지 않습니다.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 프로바이더 사용 불가 (자격 증명 누락 또는 다운)
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// 요청 한도 초과 (429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 필수 데이터 누락
    #[error("Incomplete data: {0}")]
    IncompleteData(String),

    /// 네트워크 오류
    #[error("Network error: {0}")]
    Network(String),

    /// 타임아웃 오류
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// 캐시 오류
    #[error("Cache error: {0}")]
    CacheError(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    QueryError(String),

    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 작업 취소됨
    #[error("Operation cancelled")]
    Cancelled,
}

impl DataError {
    /// 재시도 가능한 오류인지 확인합니다.
    ///
    /// 네트워크/타임아웃/요청 한도 초과만 재시도 대상입니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::Network(_) | DataError::Timeout(_) | DataError::RateLimited(_)
        )
    }

    /// 요청 한도 초과 오류인지 확인합니다.
    ///
    /// 재시도 시 고정 딜레이 대신 지수 백오프를 적용해야 합니다.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, DataError::RateLimited(_))
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".to_string()),
            _ => DataError::QueryError(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for DataError {
    fn from(err: redis::RedisError) -> Self {
        DataError::CacheError(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Timeout(err.to_string())
        } else {
            DataError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        assert!(DataError::Network("timeout".to_string()).is_retryable());
        assert!(DataError::Timeout("slow".to_string()).is_retryable());
        assert!(DataError::RateLimited("429".to_string()).is_retryable());

        assert!(!DataError::ProviderUnavailable("no key".to_string()).is_retryable());
        assert!(!DataError::IncompleteData("no quote".to_string()).is_retryable());
        assert!(!DataError::Cancelled.is_retryable());
    }

    #[test]
    fn test_error_rate_limited() {
        assert!(DataError::RateLimited("429".to_string()).is_rate_limited());
        assert!(!DataError::Network("down".to_string()).is_rate_limited());
    }
}
