// ==========================================
// 贷款管理平台 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 文件级（致命）/ 行级（隔离，计入 failed）
// ==========================================

use crate::domain::types::IdentifierKind;
use thiserror::Error;

// ==========================================
// ParseError - 文件级错误（唯一会使运行失败的错误）
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("file is empty")]
    EmptyFile,

    #[error("header row is missing")]
    MissingHeader,

    #[error("unsupported file format: {0} (expected .csv, .xlsx, .xls or .ods)")]
    UnsupportedFormat(String),

    #[error("file is not valid UTF-8 text: {0}")]
    Encoding(String),

    #[error("CSV parse failed: {0}")]
    Csv(String),

    #[error("spreadsheet parse failed: {0}")]
    Spreadsheet(String),
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        ParseError::Csv(err.to_string())
    }
}

impl From<calamine::Error> for ParseError {
    fn from(err: calamine::Error) -> Self {
        ParseError::Spreadsheet(err.to_string())
    }
}

// ==========================================
// MatchError - 客户引用解析失败（行级，仅贷款导入）
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    /// 本行没有任何可用的客户识别值
    #[error("customerIdentifier is required")]
    MissingIdentifier,

    #[error("customer not found for identifier {identifier}")]
    CustomerNotFound { identifier: String },

    #[error("ambiguous customer match: {count} customers share {kind} '{value}'")]
    Ambiguous {
        kind: IdentifierKind,
        value: String,
        count: usize,
    },

    #[error("customer lookup failed for {kind} '{value}': {message}")]
    LookupFailed {
        kind: IdentifierKind,
        value: String,
        message: String,
    },
}

// ==========================================
// CommitError - 注入的创建函数失败（行级 / 块级）
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommitError {
    #[error("failed to create entity: {0}")]
    Row(String),

    #[error("batch write failed: {0}")]
    Chunk(String),

    #[error("row was already committed in this run")]
    Duplicate,
}

// ==========================================
// ImportError - 导入调用的顶层错误
// ==========================================
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("file could not be parsed: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to read config {key}: {message}")]
    Config { key: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ImportError::Internal(format!("background task failed: {}", err))
    }
}

/// Result 类型别名
pub type ImportOutcome<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_error_messages() {
        let err = MatchError::CustomerNotFound {
            identifier: "999999".to_string(),
        };
        assert_eq!(err.to_string(), "customer not found for identifier 999999");

        let err = MatchError::Ambiguous {
            kind: IdentifierKind::FullName,
            value: "Jane Doe".to_string(),
            count: 2,
        };
        assert_eq!(
            err.to_string(),
            "ambiguous customer match: 2 customers share name 'Jane Doe'"
        );
    }

    #[test]
    fn test_parse_error_wraps_into_import_error() {
        let err: ImportError = ParseError::MissingHeader.into();
        assert!(matches!(err, ImportError::Parse(ParseError::MissingHeader)));
        assert_eq!(err.to_string(), "file could not be parsed: header row is missing");
    }
}
