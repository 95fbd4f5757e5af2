// ==========================================
// 贷款管理平台 - 领域模型层
// ==========================================
// 职责: 导入管道的实体、类型与目标 Schema
// 红线: 不含数据访问逻辑
// ==========================================

pub mod import_run;
pub mod schema;
pub mod types;

// 重导出核心类型
pub use import_run::{
    ColumnMapping, ColumnMappingOverride, CreatedEntity, CustomerRef, EntityDraft, FieldError,
    FieldErrorKind, FieldValue, ImportResult, ImportRun, MappedColumn, MappingSource,
    MappingWarning, MatchCandidate, NormalizedFields, NormalizedRow, RawRow, RowError,
};
pub use schema::{customer_schema, loan_schema, FieldSpec, FieldValidator, TargetSchema};
pub use types::{FieldType, IdentifierKind, ImportRunStatus, TargetEntityKind};
