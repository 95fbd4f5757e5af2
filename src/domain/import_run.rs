// ==========================================
// 贷款管理平台 - 导入领域模型
// ==========================================
// 职责: 导入管道各阶段的数据结构
// 流程: RawRow → NormalizedRow → EntityDraft → ImportResult → ImportRun
// ==========================================

use crate::domain::types::{IdentifierKind, ImportRunStatus, TargetEntityKind};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ==========================================
// RawRow - 文件解析产物
// ==========================================
// 生命周期: 仅在 FileIngestor → RowNormalizer 之间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub row_index: usize,              // 1-based，表头不计
    pub cells: Vec<(String, String)>,  // 表头 → 原始字符串（保持列顺序）
}

impl RawRow {
    /// 按表头取值（重复表头取第一个）
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

// ==========================================
// ColumnMapping - 列映射
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingSource {
    Exact,    // 字段名/别名精确匹配
    Fuzzy,    // 相似度匹配
    Override, // 用户确认/覆盖
    Unmapped, // 未映射
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedColumn {
    pub source_header: Option<String>,
    pub confidence: f64,
    pub source: MappingSource,
}

impl MappedColumn {
    pub fn unmapped() -> Self {
        Self {
            source_header: None,
            confidence: 0.0,
            source: MappingSource::Unmapped,
        }
    }
}

/// 目标字段 → 源表头（BTreeMap 保证序列化顺序稳定）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub fields: BTreeMap<String, MappedColumn>,
}

impl ColumnMapping {
    pub fn header_for(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|c| c.source_header.as_deref())
    }

    pub fn is_mapped(&self, field: &str) -> bool {
        self.header_for(field).is_some()
    }
}

/// 用户提供的映射覆盖: 目标字段 → 源表头（None 表示显式不映射）
pub type ColumnMappingOverride = BTreeMap<String, Option<String>>;

/// 映射告警（不阻断，交由用户确认）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingWarning {
    RequiredFieldUnmapped { field: String },
    OverrideHeaderNotFound { field: String, header: String },
}

impl fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingWarning::RequiredFieldUnmapped { field } => {
                write!(f, "required field {} has no matching column", field)
            }
            MappingWarning::OverrideHeaderNotFound { field, header } => {
                write!(f, "column '{}' chosen for {} is not in the file", header, field)
            }
        }
    }
}

// ==========================================
// NormalizedRow - 类型化行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }
}

pub type NormalizedFields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    MissingField, // 必填为空
    BadValue,     // 类型转换失败
    OutOfRange,   // 领域校验失败
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn missing(field: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: FieldErrorKind::MissingField,
            message: format!("{} is required", field),
        }
    }

    pub fn bad_value(field: &str, value: &str, expected: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: FieldErrorKind::BadValue,
            message: format!("{} has invalid value '{}' (expected {})", field, value, expected),
        }
    }

    pub fn out_of_range(field: &str, message: String) -> Self {
        Self {
            field: field.to_string(),
            kind: FieldErrorKind::OutOfRange,
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub row_index: usize,
    pub fields: NormalizedFields,
    pub errors: Vec<FieldError>,
}

impl NormalizedRow {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|v| v.as_text())
    }

    /// 汇总为用户可见的行错误（同一行的多个错误合并为一条）
    pub fn to_row_error(&self) -> Option<RowError> {
        if self.errors.is_empty() {
            return None;
        }
        Some(RowError {
            row_index: self.row_index,
            fields: self.errors.iter().map(|e| e.field.clone()).collect(),
            message: self
                .errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        })
    }
}

// ==========================================
// 实体匹配
// ==========================================
/// 已落库客户的引用（由注入的查询函数返回）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub id: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub entity_id: String,
    pub confidence: f64,
    pub matched_by: IdentifierKind,
    pub matched_value: String,
}

// ==========================================
// EntityDraft - 待提交实体
// ==========================================
// 只有清洗 + 匹配均通过的行才会生成 Draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDraft {
    pub row_index: usize,
    pub kind: TargetEntityKind,
    pub fields: NormalizedFields,
    pub customer: Option<MatchCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedEntity {
    pub id: String,
}

// ==========================================
// ImportResult - 导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub row_index: usize,
    pub fields: Vec<String>,
    pub message: String,
}

impl RowError {
    pub fn new(row_index: usize, message: impl Into<String>) -> Self {
        Self {
            row_index,
            fields: Vec::new(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row_index, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub total_rows: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub created_ids: Vec<String>,
    pub errors: Vec<RowError>,
    pub warnings: Vec<MappingWarning>,
}

impl ImportResult {
    /// 用户可见的错误文本（"Row k: ..."，按行号排序）
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

// ==========================================
// ImportRun - 导入运行审计记录
// ==========================================
// 红线: completed / failed 之后不可变更（只追加历史）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRun {
    pub id: String,
    pub agency_id: String,
    pub actor_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub target_kind: TargetEntityKind,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ImportRunStatus,
    pub column_mapping: Option<ColumnMapping>,
    pub result: Option<ImportResult>,
    pub failure_reason: Option<String>,
}

impl ImportRun {
    /// 创建 pending 状态的运行记录
    pub fn new(
        agency_id: &str,
        actor_id: &str,
        file_name: &str,
        file_size: u64,
        target_kind: TargetEntityKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            agency_id: agency_id.to_string(),
            actor_id: actor_id.to_string(),
            file_name: file_name.to_string(),
            file_size,
            target_kind,
            started_at: Utc::now(),
            completed_at: None,
            status: ImportRunStatus::Pending,
            column_mapping: None,
            result: None,
            failure_reason: None,
        }
    }

    /// pending → running
    pub fn start(mut self) -> Result<Self, String> {
        self.transition(ImportRunStatus::Running)?;
        self.started_at = Utc::now();
        Ok(self)
    }

    /// running → completed
    pub fn complete(mut self, mapping: ColumnMapping, result: ImportResult) -> Result<Self, String> {
        self.transition(ImportRunStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        self.column_mapping = Some(mapping);
        self.result = Some(result);
        Ok(self)
    }

    /// running → failed（仅文件级解析错误）
    pub fn fail(mut self, reason: impl Into<String>) -> Result<Self, String> {
        self.transition(ImportRunStatus::Failed)?;
        self.completed_at = Some(Utc::now());
        self.failure_reason = Some(reason.into());
        Ok(self)
    }

    fn transition(&mut self, next: ImportRunStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "invalid run status transition: from={} to={}",
                self.status, next
            ));
        }
        self.status = next;
        Ok(())
    }
}
