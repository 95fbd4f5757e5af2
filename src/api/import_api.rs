// ==========================================
// 贷款管理平台 - 导入API
// ==========================================
// 职责: 封装导入、预览、历史查询，供上传流程调用
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportSettings};
use crate::domain::import_run::{ImportResult, ImportRun, MappingWarning, RowError};
use crate::importer::{
    CommitStrategy, CustomerLookup, EntityImporter, ImportHistory, ImportPreview, ImportRequest,
};
use crate::repository::{ImportRunRepository, ImportRunRepositoryImpl, RepositoryError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// 历史查询单次最大条数
pub const MAX_HISTORY_LIMIT: usize = 500;

/// 导入API响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    pub total_rows: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub created_ids: Vec<String>,
    /// 行级错误明细
    pub errors: Vec<RowError>,
    /// 用户可见的错误文本（"Row k: ..."）
    pub error_messages: Vec<String>,
    pub warnings: Vec<MappingWarning>,
    /// 导入耗时（毫秒）
    pub elapsed_ms: i64,
}

impl ImportApiResponse {
    fn from_result(result: ImportResult, elapsed_ms: i64) -> Self {
        Self {
            error_messages: result.error_messages(),
            total_rows: result.total_rows,
            success_count: result.success_count,
            failed_count: result.failed_count,
            created_ids: result.created_ids,
            errors: result.errors,
            warnings: result.warnings,
            elapsed_ms,
        }
    }
}

/// 导入API
pub struct ImportApi {
    importer: EntityImporter,
    history: ImportHistory,
    run_repo: Arc<dyn ImportRunRepository>,
}

impl ImportApi {
    /// 由已装配好的协作方创建
    pub fn new(
        customer_lookup: Arc<dyn CustomerLookup>,
        commit_strategy: CommitStrategy,
        run_repo: Arc<dyn ImportRunRepository>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            importer: EntityImporter::new(
                customer_lookup,
                commit_strategy,
                Arc::clone(&run_repo),
                settings,
            ),
            history: ImportHistory::new(Arc::clone(&run_repo)),
            run_repo,
        }
    }

    /// 打开 SQLite 数据库（运行日志 + 配置），读取导入参数
    pub async fn open(
        db_path: &str,
        customer_lookup: Arc<dyn CustomerLookup>,
        commit_strategy: CommitStrategy,
    ) -> ApiResult<Self> {
        let run_repo: Arc<dyn ImportRunRepository> = Arc::new(ImportRunRepositoryImpl::new(db_path)?);
        let config = ConfigManager::new(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let settings = ImportSettings::load(&config).await?;

        Ok(Self::new(customer_lookup, commit_strategy, run_repo, settings))
    }

    /// 导入文件
    ///
    /// # 返回
    /// - Ok(ImportApiResponse): 行级结果（部分行失败也返回 Ok）
    /// - Err(ApiError::ImportError): 文件无法解析
    pub async fn import_file(&self, request: ImportRequest) -> ApiResult<ImportApiResponse> {
        Self::validate_request(&request)?;

        let start_time = Instant::now();
        let result = self.importer.import(request).await?;
        let elapsed_ms = start_time.elapsed().as_millis() as i64;

        Ok(ImportApiResponse::from_result(result, elapsed_ms))
    }

    /// 预览映射与样本行
    pub async fn preview_import(
        &self,
        request: &ImportRequest,
        sample_size: usize,
    ) -> ApiResult<ImportPreview> {
        Self::validate_request(request)?;
        Ok(self.importer.preview(request, sample_size).await?)
    }

    /// 导入历史（最新在前）
    pub async fn get_import_history(&self, agency_id: &str, limit: usize) -> ApiResult<Vec<ImportRun>> {
        if agency_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("agency_id must not be empty".to_string()));
        }
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit must be greater than 0".to_string()));
        }

        Ok(self
            .history
            .get_import_history(agency_id, limit.min(MAX_HISTORY_LIMIT))
            .await?)
    }

    /// 查询单次运行记录
    pub async fn get_import_run(&self, run_id: &str) -> ApiResult<ImportRun> {
        self.run_repo
            .find_run(run_id)
            .await?
            .ok_or_else(|| RepositoryError::RunNotFound(run_id.to_string()).into())
    }

    fn validate_request(request: &ImportRequest) -> ApiResult<()> {
        if request.agency_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("agency_id must not be empty".to_string()));
        }
        if request.actor_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("actor_id must not be empty".to_string()));
        }
        if request.file_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("file_name must not be empty".to_string()));
        }
        Ok(())
    }
}
