// ==========================================
// 贷款管理平台 - 领域类型定义
// ==========================================
// 职责: 导入引擎共用的枚举类型
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 导入目标实体类型 (Target Entity Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEntityKind {
    Customer, // 客户
    Loan,     // 贷款（需引用已存在客户）
}

impl TargetEntityKind {
    /// 该实体是否引用其他已落库实体（需要 EntityMatcher）
    pub fn requires_reference(&self) -> bool {
        matches!(self, TargetEntityKind::Loan)
    }
}

impl fmt::Display for TargetEntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetEntityKind::Customer => write!(f, "customer"),
            TargetEntityKind::Loan => write!(f, "loan"),
        }
    }
}

impl FromStr for TargetEntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "customer" => Ok(TargetEntityKind::Customer),
            "loan" => Ok(TargetEntityKind::Loan),
            other => Err(format!("unknown target entity kind: {}", other)),
        }
    }
}

// ==========================================
// 导入运行状态 (Import Run Status)
// ==========================================
// 状态机: pending → running → completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportRunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ImportRunStatus {
    /// 终态（completed / failed）之后不允许任何变更
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportRunStatus::Completed | ImportRunStatus::Failed)
    }

    /// 是否允许从当前状态迁移到 `next`
    pub fn can_transition_to(&self, next: ImportRunStatus) -> bool {
        matches!(
            (self, next),
            (ImportRunStatus::Pending, ImportRunStatus::Running)
                | (ImportRunStatus::Running, ImportRunStatus::Completed)
                | (ImportRunStatus::Running, ImportRunStatus::Failed)
        )
    }
}

impl fmt::Display for ImportRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportRunStatus::Pending => write!(f, "pending"),
            ImportRunStatus::Running => write!(f, "running"),
            ImportRunStatus::Completed => write!(f, "completed"),
            ImportRunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for ImportRunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(ImportRunStatus::Pending),
            "running" => Ok(ImportRunStatus::Running),
            "completed" => Ok(ImportRunStatus::Completed),
            "failed" => Ok(ImportRunStatus::Failed),
            other => Err(format!("unknown import run status: {}", other)),
        }
    }
}

// ==========================================
// 客户识别字段类型 (Identifier Kind)
// ==========================================
// 声明顺序即匹配优先级: id > 证件号 > 手机号 > 姓名
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    EntityId,
    NationalId,
    Phone,
    FullName,
}

impl IdentifierKind {
    /// 按优先级排列的全部识别字段
    pub const PRIORITY: [IdentifierKind; 4] = [
        IdentifierKind::EntityId,
        IdentifierKind::NationalId,
        IdentifierKind::Phone,
        IdentifierKind::FullName,
    ];
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::EntityId => write!(f, "id"),
            IdentifierKind::NationalId => write!(f, "national id"),
            IdentifierKind::Phone => write!(f, "phone"),
            IdentifierKind::FullName => write!(f, "name"),
        }
    }
}

// ==========================================
// 目标字段数据类型 (Field Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,    // 文本
    Number,  // 金额/利率等小数
    Integer, // 期数等整数
    Date,    // 日期
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_transitions() {
        assert!(ImportRunStatus::Pending.can_transition_to(ImportRunStatus::Running));
        assert!(ImportRunStatus::Running.can_transition_to(ImportRunStatus::Completed));
        assert!(ImportRunStatus::Running.can_transition_to(ImportRunStatus::Failed));
        assert!(!ImportRunStatus::Completed.can_transition_to(ImportRunStatus::Running));
        assert!(!ImportRunStatus::Failed.can_transition_to(ImportRunStatus::Completed));
        assert!(!ImportRunStatus::Pending.can_transition_to(ImportRunStatus::Completed));
    }

    #[test]
    fn test_identifier_priority_order() {
        let mut kinds = vec![
            IdentifierKind::FullName,
            IdentifierKind::Phone,
            IdentifierKind::EntityId,
            IdentifierKind::NationalId,
        ];
        kinds.sort();
        assert_eq!(kinds, IdentifierKind::PRIORITY.to_vec());
    }

    #[test]
    fn test_target_kind_round_trip_text() {
        assert_eq!("Loan".parse::<TargetEntityKind>(), Ok(TargetEntityKind::Loan));
        assert_eq!(TargetEntityKind::Customer.to_string(), "customer");
        assert!("vehicle".parse::<TargetEntityKind>().is_err());
    }
}
