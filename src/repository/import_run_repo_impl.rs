// ==========================================
// 贷款管理平台 - 导入运行日志 Repository 实现
// ==========================================
// 职责: 实现 ImportRun 的追加写入与查询（使用 rusqlite）
// 存储: import_run 表；映射与结果以 JSON 列保存
// ==========================================

use crate::db::{index_exists, open_sqlite_connection, IMPORT_RUN_ORDER_INDEX};
use crate::domain::import_run::{ColumnMapping, ImportResult, ImportRun};
use crate::domain::types::{ImportRunStatus, TargetEntityKind};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::import_run_repo::ImportRunRepository;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = r#"
    SELECT id, agency_id, actor_id, file_name, file_size, target_kind,
           started_at, completed_at, status, column_mapping_json, result_json,
           failure_reason
    FROM import_run
"#;

/// 固定宽度的 RFC 3339（UTC，微秒），保证字符串序与时间序一致
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::CorruptColumn {
            column: field.to_string(),
            message: format!("{}: {}", raw, e),
        })
}

// import_run 表的一行（原始列值）
struct ImportRunRecord {
    id: String,
    agency_id: String,
    actor_id: String,
    file_name: String,
    file_size: i64,
    target_kind: String,
    started_at: String,
    completed_at: Option<String>,
    status: String,
    column_mapping_json: Option<String>,
    result_json: Option<String>,
    failure_reason: Option<String>,
}

impl ImportRunRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            agency_id: row.get(1)?,
            actor_id: row.get(2)?,
            file_name: row.get(3)?,
            file_size: row.get(4)?,
            target_kind: row.get(5)?,
            started_at: row.get(6)?,
            completed_at: row.get(7)?,
            status: row.get(8)?,
            column_mapping_json: row.get(9)?,
            result_json: row.get(10)?,
            failure_reason: row.get(11)?,
        })
    }

    fn into_domain(self) -> RepositoryResult<ImportRun> {
        let target_kind: TargetEntityKind =
            self.target_kind
                .parse()
                .map_err(|message| RepositoryError::CorruptColumn {
                    column: "target_kind".to_string(),
                    message,
                })?;
        let status: ImportRunStatus =
            self.status
                .parse()
                .map_err(|message| RepositoryError::CorruptColumn {
                    column: "status".to_string(),
                    message,
                })?;

        let column_mapping = self
            .column_mapping_json
            .as_deref()
            .map(serde_json::from_str::<ColumnMapping>)
            .transpose()?;
        let result = self
            .result_json
            .as_deref()
            .map(serde_json::from_str::<ImportResult>)
            .transpose()?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|raw| parse_ts("completed_at", raw))
            .transpose()?;

        Ok(ImportRun {
            started_at: parse_ts("started_at", &self.started_at)?,
            id: self.id,
            agency_id: self.agency_id,
            actor_id: self.actor_id,
            file_name: self.file_name,
            file_size: self.file_size.max(0) as u64,
            target_kind,
            completed_at,
            status,
            column_mapping,
            result,
            failure_reason: self.failure_reason,
        })
    }
}

// ==========================================
// ImportRunRepositoryImpl
// ==========================================
pub struct ImportRunRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRunRepositoryImpl {
    /// 打开数据库并建表
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 复用已有连接（调用方负责建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn collect_runs(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<ImportRun>> {
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map(params, ImportRunRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        records.into_iter().map(ImportRunRecord::into_domain).collect()
    }
}

#[async_trait]
impl ImportRunRepository for ImportRunRepositoryImpl {
    async fn insert_run(&self, run: &ImportRun) -> RepositoryResult<()> {
        let column_mapping_json = run
            .column_mapping
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let result_json = run.result.as_ref().map(serde_json::to_string).transpose()?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO import_run (
                id, agency_id, actor_id, file_name, file_size, target_kind,
                started_at, completed_at, status, column_mapping_json, result_json,
                failure_reason
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                run.id,
                run.agency_id,
                run.actor_id,
                run.file_name,
                run.file_size as i64,
                run.target_kind.to_string(),
                format_ts(&run.started_at),
                run.completed_at.as_ref().map(format_ts),
                run.status.to_string(),
                column_mapping_json,
                result_json,
                run.failure_reason,
            ],
        )?;

        Ok(())
    }

    async fn list_runs_ordered(&self, agency_id: &str, limit: usize) -> RepositoryResult<Vec<ImportRun>> {
        let conn = self.lock()?;

        if !index_exists(&conn, IMPORT_RUN_ORDER_INDEX)? {
            return Err(RepositoryError::OrderingUnavailable {
                index: IMPORT_RUN_ORDER_INDEX.to_string(),
            });
        }

        let sql = format!(
            "{} WHERE agency_id = ?1 ORDER BY started_at DESC, id DESC LIMIT ?2",
            SELECT_COLUMNS
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Self::collect_runs(&conn, &sql, &[&agency_id, &limit])
    }

    async fn list_runs_unordered(&self, agency_id: &str) -> RepositoryResult<Vec<ImportRun>> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE agency_id = ?1", SELECT_COLUMNS);
        Self::collect_runs(&conn, &sql, &[&agency_id])
    }

    async fn find_run(&self, run_id: &str) -> RepositoryResult<Option<ImportRun>> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let record = conn
            .query_row(&sql, params![run_id], ImportRunRecord::from_row)
            .optional()?;

        record.map(ImportRunRecord::into_domain).transpose()
    }
}
