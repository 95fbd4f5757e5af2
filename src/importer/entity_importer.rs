// ==========================================
// 贷款管理平台 - 实体导入器（编排）
// ==========================================
// 流程: 解析 → 映射 → 标准化 → 匹配(贷款) → 提交 → 汇总 → 运行日志
// 红线: 全部匹配完成后才开始提交
// 红线: 仅文件级解析错误使整个运行失败，其余错误均为行级
// 红线: 运行日志写入失败只记录告警，不影响返回结果
// ==========================================

use crate::config::ImportSettings;
use crate::domain::import_run::{
    ColumnMapping, ColumnMappingOverride, EntityDraft, ImportResult, ImportRun, MappingWarning,
    NormalizedRow, RawRow, RowError,
};
use crate::domain::schema::{loan_fields, TargetSchema};
use crate::domain::types::TargetEntityKind;
use crate::importer::batch_committer::{BatchCommitter, CommitStrategy};
use crate::importer::column_mapper::{ColumnMapper, ColumnMappingReport};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::entity_matcher::EntityMatcher;
use crate::importer::error::{ImportError, ImportOutcome};
use crate::importer::file_parser::{ParsedFile, UniversalFileParser};
use crate::importer::import_trait::CustomerLookup;
use crate::importer::row_normalizer::RowNormalizer;
use crate::repository::import_run_repo::ImportRunRepository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

// ==========================================
// ImportRequest - 单次导入调用的输入
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub agency_id: String,
    pub actor_id: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub target_kind: TargetEntityKind,
    /// 用户确认后的映射（原样采用）
    pub mapping_override: Option<ColumnMappingOverride>,
    /// 仅处理这些行号（提交前取消其余行）
    pub selected_rows: Option<BTreeSet<usize>>,
}

impl ImportRequest {
    pub fn new(
        agency_id: &str,
        actor_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
        target_kind: TargetEntityKind,
    ) -> Self {
        Self {
            agency_id: agency_id.to_string(),
            actor_id: actor_id.to_string(),
            file_name: file_name.to_string(),
            bytes,
            target_kind,
            mapping_override: None,
            selected_rows: None,
        }
    }

    pub fn with_mapping_override(mut self, overrides: ColumnMappingOverride) -> Self {
        self.mapping_override = Some(overrides);
        self
    }

    pub fn with_selected_rows(mut self, rows: impl IntoIterator<Item = usize>) -> Self {
        self.selected_rows = Some(rows.into_iter().collect());
        self
    }
}

/// 预览结果（人工确认映射前展示）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPreview {
    pub headers: Vec<String>,
    pub mapping: ColumnMapping,
    pub warnings: Vec<MappingWarning>,
    pub total_rows: usize,
    pub sample_rows: Vec<RawRow>,
    /// 样本行的标准化错误
    pub sample_errors: Vec<RowError>,
}

// ==========================================
// EntityImporter
// ==========================================
pub struct EntityImporter {
    customer_lookup: Arc<dyn CustomerLookup>,
    commit_strategy: CommitStrategy,
    run_repo: Arc<dyn ImportRunRepository>,
    settings: ImportSettings,
}

impl EntityImporter {
    /// # 参数
    /// - customer_lookup: 贷款行客户查询（只读）
    /// - commit_strategy: 逐行或分块提交
    /// - run_repo: 运行日志存储
    /// - settings: 本实例使用的参数快照
    pub fn new(
        customer_lookup: Arc<dyn CustomerLookup>,
        commit_strategy: CommitStrategy,
        run_repo: Arc<dyn ImportRunRepository>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            customer_lookup,
            commit_strategy,
            run_repo,
            settings,
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// 执行一次完整导入
    ///
    /// # 返回
    /// - Ok(ImportResult): 行级成功/失败汇总（含 "Row k: ..." 错误）
    /// - Err(ImportError::Parse): 文件无法解析，运行记为 failed
    #[instrument(
        skip(self, request),
        fields(agency_id = %request.agency_id, file_name = %request.file_name, target = %request.target_kind)
    )]
    pub async fn import(&self, request: ImportRequest) -> ImportOutcome<ImportResult> {
        let start_time = Instant::now();
        let ImportRequest {
            agency_id,
            actor_id,
            file_name,
            bytes,
            target_kind,
            mapping_override,
            selected_rows,
        } = request;

        let run = ImportRun::new(&agency_id, &actor_id, &file_name, bytes.len() as u64, target_kind)
            .start()
            .map_err(ImportError::Internal)?;
        info!(run_id = %run.id, file_size = run.file_size, "开始导入");

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let parsed = match Self::ingest(file_name, bytes).await {
            Ok(parsed) => parsed,
            Err(err) => {
                if let ImportError::Parse(parse_err) = &err {
                    error!(run_id = %run.id, error = %parse_err, "文件解析失败");
                    let failed = run.fail(parse_err.to_string()).map_err(ImportError::Internal)?;
                    self.record_run(&failed).await;
                }
                return Err(err);
            }
        };
        info!(rows = parsed.row_count(), headers = parsed.headers.len(), "文件解析完成");

        // === 步骤 2: 列映射（每次运行只做一次）===
        debug!("步骤 2: 列映射");
        let schema = TargetSchema::for_kind(target_kind);
        let report = self.map_columns(&parsed.headers, &schema, mapping_override.as_ref());
        for warning in &report.warnings {
            warn!(run_id = %run.id, warning = %warning, "列映射告警");
        }

        let rows: Vec<RawRow> = match &selected_rows {
            Some(selected) => parsed
                .rows
                .into_iter()
                .filter(|r| selected.contains(&r.row_index))
                .collect(),
            None => parsed.rows,
        };
        let total_rows = rows.len();

        // === 步骤 3: 行标准化（阻塞任务切片并行）===
        debug!("步骤 3: 行标准化");
        let normalized = self
            .normalize_rows(rows, report.mapping.clone(), schema)
            .await?;

        let mut errors: Vec<RowError> = Vec::new();
        let mut clean: Vec<NormalizedRow> = Vec::new();
        for row in normalized {
            match row.to_row_error() {
                Some(row_error) => errors.push(row_error),
                None => clean.push(row),
            }
        }
        info!(clean = clean.len(), invalid = errors.len(), "行标准化完成");

        // === 步骤 4: 实体匹配（仅贷款）===
        let drafts = if target_kind.requires_reference() {
            debug!("步骤 4: 客户匹配");
            let matcher = EntityMatcher::new(Arc::clone(&self.customer_lookup));
            let resolved = matcher
                .resolve_rows(&agency_id, clean, self.settings.match_concurrency)
                .await;

            let mut drafts = Vec::with_capacity(resolved.len());
            for (row, outcome) in resolved {
                match outcome {
                    Ok(candidate) => drafts.push(EntityDraft {
                        row_index: row.row_index,
                        kind: target_kind,
                        fields: row.fields,
                        customer: Some(candidate),
                    }),
                    Err(match_err) => errors.push(RowError {
                        row_index: row.row_index,
                        fields: vec![loan_fields::CUSTOMER_IDENTIFIER.to_string()],
                        message: match_err.to_string(),
                    }),
                }
            }
            info!(matched = drafts.len(), "客户匹配完成");
            drafts
        } else {
            clean
                .into_iter()
                .map(|row| EntityDraft {
                    row_index: row.row_index,
                    kind: target_kind,
                    fields: row.fields,
                    customer: None,
                })
                .collect()
        };

        // === 步骤 5: 提交 ===
        debug!(drafts = drafts.len(), "步骤 5: 提交");
        let committer = BatchCommitter::new(
            self.commit_strategy.clone(),
            self.settings.batch_size_limit,
            self.settings.max_in_flight_chunks,
        );
        let commit_report = committer.commit(&agency_id, drafts).await;

        for (row_index, commit_err) in commit_report.failures {
            errors.push(RowError::new(row_index, commit_err.to_string()));
        }
        errors.sort_by_key(|e| e.row_index);

        // === 步骤 6: 汇总 ===
        let created_ids: Vec<String> = commit_report
            .created
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        let result = ImportResult {
            total_rows,
            success_count: created_ids.len(),
            failed_count: errors.len(),
            created_ids,
            errors,
            warnings: report.warnings,
        };

        // === 步骤 7: 运行日志（尽力而为）===
        match run.complete(report.mapping, result.clone()) {
            Ok(completed) => self.record_run(&completed).await,
            Err(e) => warn!(error = %e, "运行记录状态异常，跳过日志"),
        }

        info!(
            total = result.total_rows,
            success = result.success_count,
            failed = result.failed_count,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "导入完成"
        );

        Ok(result)
    }

    /// 解析并给出映射建议与样本行，不提交、不写日志
    #[instrument(skip(self, request), fields(file_name = %request.file_name))]
    pub async fn preview(&self, request: &ImportRequest, sample_size: usize) -> ImportOutcome<ImportPreview> {
        let parsed = Self::ingest(request.file_name.clone(), request.bytes.clone()).await?;

        let schema = TargetSchema::for_kind(request.target_kind);
        let report = self.map_columns(&parsed.headers, &schema, request.mapping_override.as_ref());

        let total_rows = parsed.row_count();
        let sample_rows: Vec<RawRow> = parsed.rows.into_iter().take(sample_size).collect();

        let normalizer = RowNormalizer::new(DataCleaner::new(self.settings.date_formats.clone()));
        let sample_errors = normalizer
            .normalize_all(&sample_rows, &report.mapping, &schema)
            .iter()
            .filter_map(NormalizedRow::to_row_error)
            .collect();

        Ok(ImportPreview {
            headers: parsed.headers,
            mapping: report.mapping,
            warnings: report.warnings,
            total_rows,
            sample_rows,
            sample_errors,
        })
    }

    async fn ingest(file_name: String, bytes: Vec<u8>) -> ImportOutcome<ParsedFile> {
        let parsed =
            tokio::task::spawn_blocking(move || UniversalFileParser.parse(&file_name, &bytes)).await??;
        Ok(parsed)
    }

    fn map_columns(
        &self,
        headers: &[String],
        schema: &TargetSchema,
        overrides: Option<&ColumnMappingOverride>,
    ) -> ColumnMappingReport {
        let mapper = ColumnMapper::new(self.settings.fuzzy_match_threshold);
        match overrides {
            Some(o) => mapper.apply_override(headers, schema, o),
            None => mapper.map_columns(headers, schema),
        }
    }

    /// 按切片分发到阻塞线程池，结果保持原始行序
    async fn normalize_rows(
        &self,
        rows: Vec<RawRow>,
        mapping: ColumnMapping,
        schema: TargetSchema,
    ) -> ImportOutcome<Vec<NormalizedRow>> {
        let slice_size = self.settings.normalize_slice_size.max(1);
        let mapping = Arc::new(mapping);
        let schema = Arc::new(schema);

        let mut handles = Vec::new();
        let mut iter = rows.into_iter().peekable();
        while iter.peek().is_some() {
            let slice: Vec<RawRow> = iter.by_ref().take(slice_size).collect();
            let mapping = Arc::clone(&mapping);
            let schema = Arc::clone(&schema);
            let formats = self.settings.date_formats.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                RowNormalizer::new(DataCleaner::new(formats)).normalize_all(&slice, &mapping, &schema)
            }));
        }

        let slices = futures::future::try_join_all(handles).await?;
        Ok(slices.into_iter().flatten().collect())
    }

    async fn record_run(&self, run: &ImportRun) {
        if let Err(e) = self.run_repo.insert_run(run).await {
            warn!(run_id = %run.id, status = %run.status, error = %e, "运行日志写入失败，已忽略");
        } else {
            debug!(run_id = %run.id, status = %run.status, "运行日志已写入");
        }
    }
}
