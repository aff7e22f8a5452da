//! 코어 에러 타입
//!
//! 모든 코어 연산은 실패를 잡아서 태깅된 결과로 반환합니다 (IPC 응답의
//! `{kind, message}`). 에러 종류는 실패가 발생한 지점에서 확정되며,
//! 메시지 문자열을 다시 분류하는 일은 없습니다.

use serde::Serialize;
use std::path::PathBuf;

pub type CoreResult<T> = Result<T, CoreError>;

/// 머신 판별용 에러 종류. GUI는 이 값으로만 분기합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// 디스크립터/경로/리모트 없음
    NotFound,
    /// 대상 폴더가 이미 존재 (동일 canonical name)
    Conflict,
    /// clone/fetch/다운로드 실패
    Network,
    /// 파일시스템 접근 거부
    Permission,
    /// rename이 디바이스 경계를 넘음 — 자동 복구되므로 로그에만 등장
    CrossDevice,
    /// 아카이브/디스크립터 파싱 불가
    Malformed,
    /// git 명령 실패 (네트워크 외)
    Git,
    /// 기타 IO 오류
    Io,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("no .toc descriptor found under {0}")]
    DescriptorNotFound(PathBuf),

    #[error("Addon \"{0}\" already installed")]
    AlreadyInstalled(String),

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("network error during {operation}: {message}")]
    Network { operation: String, message: String },

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("git {operation} failed: {message}")]
    Git { operation: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn network(operation: &str, err: impl std::fmt::Display) -> Self {
        CoreError::Network {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }

    pub fn git(operation: &str, message: impl Into<String>) -> Self {
        CoreError::Git {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::DescriptorNotFound(_) | CoreError::PathNotFound(_) => ErrorKind::NotFound,
            CoreError::AlreadyInstalled(_) => ErrorKind::Conflict,
            CoreError::Network { .. } => ErrorKind::Network,
            CoreError::Permission(_) => ErrorKind::Permission,
            CoreError::MalformedArchive(_) => ErrorKind::Malformed,
            CoreError::Git { .. } => ErrorKind::Git,
            // IO는 커널이 준 종류를 그대로 승격
            CoreError::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorKind::NotFound,
                std::io::ErrorKind::PermissionDenied => ErrorKind::Permission,
                _ => ErrorKind::Io,
            },
        }
    }
}

impl From<zip::result::ZipError> for CoreError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => CoreError::Io(e),
            other => CoreError::MalformedArchive(other.to_string()),
        }
    }
}

/// IPC 응답에 실리는 직렬화 형태
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&CoreError> for ErrorBody {
    fn from(err: &CoreError) -> Self {
        ErrorBody {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
