// ==========================================
// 贷款管理平台 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建库: config_kv / import_run / schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 历史查询依赖的排序索引名
pub const IMPORT_RUN_ORDER_INDEX: &str = "idx_import_run_agency_started";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）
///
/// import_run 只允许 INSERT：UPDATE / DELETE 由触发器拒绝。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS import_run (
            id TEXT PRIMARY KEY,
            agency_id TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            target_kind TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT,
            status TEXT NOT NULL,
            column_mapping_json TEXT,
            result_json TEXT,
            failure_reason TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_import_run_agency_started
            ON import_run (agency_id, started_at DESC);

        CREATE TRIGGER IF NOT EXISTS trg_import_run_no_update
        BEFORE UPDATE ON import_run
        BEGIN
            SELECT RAISE(ABORT, 'import_run is append-only');
        END;

        CREATE TRIGGER IF NOT EXISTS trg_import_run_no_delete
        BEFORE DELETE ON import_run
        BEGIN
            SELECT RAISE(ABORT, 'import_run is append-only');
        END;
        "#,
    )?;

    if read_schema_version(conn)?.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![CURRENT_SCHEMA_VERSION, chrono::Utc::now().to_rfc3339()],
        )?;
    }

    Ok(())
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 索引是否存在
pub fn index_exists(conn: &Connection, index_name: &str) -> rusqlite::Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 LIMIT 1",
            [index_name],
            |_row| Ok(true),
        )
        .optional()?;
    Ok(found.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
        assert!(index_exists(&conn, IMPORT_RUN_ORDER_INDEX).unwrap());
    }

    #[test]
    fn test_import_run_rejects_update() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            r#"INSERT INTO import_run (id, agency_id, actor_id, file_name, file_size,
                target_kind, started_at, status)
               VALUES ('run-1', 'a', 'u', 'f.csv', 1, 'customer', '2025-01-01T00:00:00Z', 'completed')"#,
            [],
        )
        .unwrap();

        let update = conn.execute("UPDATE import_run SET status = 'failed' WHERE id = 'run-1'", []);
        let delete = conn.execute("DELETE FROM import_run WHERE id = 'run-1'", []);

        assert!(update.is_err());
        assert!(delete.is_err());
    }
}
