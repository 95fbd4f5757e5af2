// ==========================================
// 贷款管理平台 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;

/// 配置读取结果
pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 提交配置 =====

    /// 单块最大行数（再与后端硬上限取较小值）
    ///
    /// # 默认值
    /// - 400
    async fn get_batch_size_limit(&self) -> ConfigResult<usize>;

    /// 同时在途的提交块数
    ///
    /// # 默认值
    /// - 4
    async fn get_max_in_flight_chunks(&self) -> ConfigResult<usize>;

    // ===== 匹配配置 =====

    /// 客户匹配查询并发上限
    ///
    /// # 默认值
    /// - 8
    async fn get_match_concurrency(&self) -> ConfigResult<usize>;

    /// 表头相似度阈值 (0, 1]
    ///
    /// # 默认值
    /// - 0.80
    async fn get_fuzzy_match_threshold(&self) -> ConfigResult<f64>;

    // ===== 标准化配置 =====

    /// 接受的日期格式（chrono 格式串，按顺序尝试）
    ///
    /// # 存储
    /// - JSON 数组，如 ["%Y-%m-%d", "%d/%m/%Y"]
    async fn get_date_formats(&self) -> ConfigResult<Vec<String>>;

    /// 标准化阶段每个阻塞任务处理的行数
    ///
    /// # 默认值
    /// - 256
    async fn get_normalize_slice_size(&self) -> ConfigResult<usize>;
}
