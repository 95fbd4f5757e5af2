// ==========================================
// 贷款管理平台 - 导入参数快照
// ==========================================
// 每次运行开始时读取一次，运行期间不再变化
// ==========================================

use crate::config::config_manager::config_keys;
use crate::config::import_config_trait::ImportConfigReader;
use crate::importer::column_mapper::DEFAULT_FUZZY_THRESHOLD;
use crate::importer::data_cleaner::DEFAULT_DATE_FORMATS;
use crate::importer::error::ImportError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub batch_size_limit: usize,
    pub max_in_flight_chunks: usize,
    pub match_concurrency: usize,
    pub fuzzy_match_threshold: f64,
    pub date_formats: Vec<String>,
    pub normalize_slice_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            batch_size_limit: 400,
            max_in_flight_chunks: 4,
            match_concurrency: 8,
            fuzzy_match_threshold: DEFAULT_FUZZY_THRESHOLD,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            normalize_slice_size: 256,
        }
    }
}

fn config_error(key: &str, err: impl std::fmt::Display) -> ImportError {
    ImportError::Config {
        key: key.to_string(),
        message: err.to_string(),
    }
}

impl ImportSettings {
    /// 从配置源读取全部导入参数
    pub async fn load(reader: &dyn ImportConfigReader) -> Result<Self, ImportError> {
        let batch_size_limit = reader
            .get_batch_size_limit()
            .await
            .map_err(|e| config_error(config_keys::BATCH_SIZE_LIMIT, e))?;
        let max_in_flight_chunks = reader
            .get_max_in_flight_chunks()
            .await
            .map_err(|e| config_error(config_keys::MAX_IN_FLIGHT_CHUNKS, e))?;
        let match_concurrency = reader
            .get_match_concurrency()
            .await
            .map_err(|e| config_error(config_keys::MATCH_CONCURRENCY, e))?;
        let fuzzy_match_threshold = reader
            .get_fuzzy_match_threshold()
            .await
            .map_err(|e| config_error(config_keys::FUZZY_MATCH_THRESHOLD, e))?;
        let date_formats = reader
            .get_date_formats()
            .await
            .map_err(|e| config_error(config_keys::DATE_FORMATS, e))?;
        let normalize_slice_size = reader
            .get_normalize_slice_size()
            .await
            .map_err(|e| config_error(config_keys::NORMALIZE_SLICE_SIZE, e))?;

        Ok(Self {
            batch_size_limit,
            max_in_flight_chunks,
            match_concurrency,
            fuzzy_match_threshold,
            date_formats,
            normalize_slice_size,
        })
    }

    /// 单块上限覆写（便于调用方按后端能力调低）
    pub fn with_batch_size_limit(mut self, limit: usize) -> Self {
        self.batch_size_limit = limit.max(1);
        self
    }
}
