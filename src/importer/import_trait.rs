// ==========================================
// 贷款管理平台 - 导入引擎 Trait
// ==========================================
// 职责: 定义导入管道的接口与注入协作方（不包含实现）
// 红线: 导入引擎不感知具体存储后端，只通过以下窄接口访问
// ==========================================

use crate::domain::import_run::{CreatedEntity, CustomerRef, EntityDraft};
use crate::domain::types::IdentifierKind;
use crate::importer::error::ParseError;
use crate::importer::file_parser::ParsedFile;
use async_trait::async_trait;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    fn parse_bytes(&self, bytes: &[u8]) -> Result<ParsedFile, ParseError>;
}

// ==========================================
// EntityCreator Trait（注入）
// ==========================================
// 用途: 逐行创建实体（对应 createEntity）
// 实现者: 外部 CRUD 层（可能附带审计与统计更新，不在本模块范围）
#[async_trait]
pub trait EntityCreator: Send + Sync {
    /// 创建单个实体
    ///
    /// # 返回
    /// - Ok(CreatedEntity): 新实体 ID
    /// - Err: 任意错误，记入该行的失败原因
    async fn create_entity(
        &self,
        agency_id: &str,
        draft: &EntityDraft,
    ) -> anyhow::Result<CreatedEntity>;
}

/// 批量写入结果
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWriteOutcome {
    /// 整块成功，按输入顺序返回新实体 ID
    AllCreated(Vec<String>),
    /// 后端提供逐行结果（与输入一一对应）
    PerRow(Vec<Result<String, String>>),
}

// ==========================================
// BatchEntityWriter Trait（注入）
// ==========================================
// 用途: 多行批量写入，后端存在硬性单批上限
#[async_trait]
pub trait BatchEntityWriter: Send + Sync {
    /// 后端单批写入上限
    fn max_batch_size(&self) -> usize;

    /// 写入一个块（长度不超过 max_batch_size）
    async fn write_batch(
        &self,
        agency_id: &str,
        drafts: &[EntityDraft],
    ) -> anyhow::Result<BatchWriteOutcome>;
}

/// 客户查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    NotFound,
    Found(CustomerRef),
    Ambiguous(usize),
}

// ==========================================
// CustomerLookup Trait（注入）
// ==========================================
// 用途: 按识别字段查询已落库客户（对应 findCustomerByIdentifier）
// 红线: 只读
#[async_trait]
pub trait CustomerLookup: Send + Sync {
    async fn find_customer_by_identifier(
        &self,
        agency_id: &str,
        kind: IdentifierKind,
        value: &str,
    ) -> anyhow::Result<LookupOutcome>;
}
