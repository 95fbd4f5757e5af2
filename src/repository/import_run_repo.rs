// ==========================================
// 贷款管理平台 - 导入运行日志 Repository Trait
// ==========================================
// 职责: ImportRun 的追加写入与查询（不包含业务逻辑）
// 红线: 只追加，不提供更新/删除
// ==========================================

use crate::domain::import_run::ImportRun;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportRunRepository Trait
// ==========================================
// 实现者: ImportRunRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ImportRunRepository: Send + Sync {
    /// 追加一条运行记录
    ///
    /// # 返回
    /// - Err(DuplicateRun): 同 id 记录已存在
    async fn insert_run(&self, run: &ImportRun) -> RepositoryResult<()>;

    /// 按开始时间倒序查询机构的运行记录
    ///
    /// # 返回
    /// - Err(OrderingUnavailable): 排序索引缺失
    async fn list_runs_ordered(&self, agency_id: &str, limit: usize) -> RepositoryResult<Vec<ImportRun>>;

    /// 查询机构的全部运行记录（不保证顺序）
    async fn list_runs_unordered(&self, agency_id: &str) -> RepositoryResult<Vec<ImportRun>>;

    /// 按 id 查询
    async fn find_run(&self, run_id: &str) -> RepositoryResult<Option<ImportRun>>;
}
