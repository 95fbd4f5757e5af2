// ==========================================
// 贷款管理平台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、写入
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ConfigResult, ImportConfigReader};
use crate::db::open_sqlite_connection;
use crate::importer::data_cleaner::DEFAULT_DATE_FORMATS;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 配置键
pub mod config_keys {
    pub const BATCH_SIZE_LIMIT: &str = "import/batch_size_limit";
    pub const MAX_IN_FLIGHT_CHUNKS: &str = "import/max_in_flight_chunks";
    pub const MATCH_CONCURRENCY: &str = "import/match_concurrency";
    pub const FUZZY_MATCH_THRESHOLD: &str = "import/fuzzy_match_threshold";
    pub const DATE_FORMATS: &str = "import/date_formats";
    pub const NORMALIZE_SLICE_SIZE: &str = "import/normalize_slice_size";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("config connection lock poisoned: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("config connection lock poisoned: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("config connection lock poisoned: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES ('global', ?1, ?2, ?3)
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, chrono::Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取正整数配置，格式错误或为 0 时回退默认值
    fn get_positive_usize(&self, key: &str, default: usize) -> ConfigResult<usize> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => {
                warn!(config_key = key, raw_value = %value, default, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_batch_size_limit(&self) -> ConfigResult<usize> {
        self.get_positive_usize(config_keys::BATCH_SIZE_LIMIT, 400)
    }

    async fn get_max_in_flight_chunks(&self) -> ConfigResult<usize> {
        self.get_positive_usize(config_keys::MAX_IN_FLIGHT_CHUNKS, 4)
    }

    async fn get_match_concurrency(&self) -> ConfigResult<usize> {
        self.get_positive_usize(config_keys::MATCH_CONCURRENCY, 8)
    }

    async fn get_fuzzy_match_threshold(&self) -> ConfigResult<f64> {
        let value = self.get_config_or_default(config_keys::FUZZY_MATCH_THRESHOLD, "0.80")?;
        match value.trim().parse::<f64>() {
            Ok(t) if t > 0.0 && t <= 1.0 => Ok(t),
            _ => {
                warn!(
                    config_key = config_keys::FUZZY_MATCH_THRESHOLD,
                    raw_value = %value,
                    "相似度阈值超出 (0, 1]，使用默认值"
                );
                Ok(0.80)
            }
        }
    }

    async fn get_date_formats(&self) -> ConfigResult<Vec<String>> {
        let defaults: Vec<String> = DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect();

        let raw = match self.get_global_config_value(config_keys::DATE_FORMATS)? {
            Some(v) => v,
            None => return Ok(defaults),
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(formats) if !formats.is_empty() => Ok(formats),
            _ => {
                warn!(
                    config_key = config_keys::DATE_FORMATS,
                    raw_value = %raw,
                    "日期格式配置错误，使用默认列表"
                );
                Ok(defaults)
            }
        }
    }

    async fn get_normalize_slice_size(&self) -> ConfigResult<usize> {
        self.get_positive_usize(config_keys::NORMALIZE_SLICE_SIZE, 256)
    }
}
