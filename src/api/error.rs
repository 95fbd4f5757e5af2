// ==========================================
// 贷款管理平台 - API层错误类型
// ==========================================
// 职责: 把导入/仓储错误折叠为上传流程可展示的错误
// 注意: 行级错误不经过此类型，随 ImportApiResponse 返回
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// 文件级错误（无法解析）
    #[error("import failed: {0}")]
    ImportError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("run log storage error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::RunNotFound(id) => ApiError::NotFound(format!("import run {}", id)),
            RepositoryError::LockError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Parse(parse_err) => ApiError::ImportError(parse_err.to_string()),
            ImportError::Config { key, message } => {
                ApiError::ConfigError(format!("{}: {}", key, message))
            }
            ImportError::Internal(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::error::ParseError;

    #[test]
    fn test_parse_error_maps_to_import_error() {
        let api_err: ApiError = ImportError::Parse(ParseError::EmptyFile).into();
        assert!(matches!(api_err, ApiError::ImportError(_)));
    }

    #[test]
    fn test_run_not_found_message() {
        let api_err: ApiError = RepositoryError::RunNotFound("run-1".to_string()).into();
        assert_eq!(api_err.to_string(), "not found: import run run-1");
    }

    #[test]
    fn test_ordering_unavailable_is_database_error() {
        let api_err: ApiError = RepositoryError::OrderingUnavailable {
            index: "idx_import_run_agency_started".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::DatabaseError(_)));
    }
}
