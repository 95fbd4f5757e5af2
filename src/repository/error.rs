// ==========================================
// 贷款管理平台 - 仓储层错误类型
// ==========================================
// 范围: import_run 运行日志的读写
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("import run not found: {0}")]
    RunNotFound(String),

    #[error("database lock poisoned: {0}")]
    LockError(String),

    #[error("database query failed: {0}")]
    DatabaseQueryError(String),

    /// 同一 run id 重复写入
    #[error("import run already exists: {0}")]
    DuplicateRun(String),

    /// 只追加表被尝试修改（触发器拒绝）
    #[error("import runs are append-only: {0}")]
    AppendOnlyViolation(String),

    /// 排序所依赖的索引不可用，调用方应改用无序查询
    #[error("ordering index unavailable: {index}")]
    OrderingUnavailable { index: String },

    /// 已存储的列值无法还原为领域类型
    #[error("corrupt import run column {column}: {message}")]
    CorruptColumn { column: String, message: String },

    #[error("JSON column serialization failed: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("UNIQUE") => {
                RepositoryError::DuplicateRun(msg)
            }
            // 触发器消息: 'import_run is append-only'
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("append-only") => {
                RepositoryError::AppendOnlyViolation(msg)
            }
            rusqlite::Error::SqliteFailure(_, Some(msg)) => RepositoryError::DatabaseQueryError(msg),
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::RunNotFound("unknown".to_string()),
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
