// ==========================================
// 贷款管理平台 - 批量导入引擎
// ==========================================
// 职责: 客户/贷款表格文件的解析、映射、标准化、匹配与提交
// 技术栈: Rust + SQLite (运行日志/配置) + tokio
// 多租户: 所有操作按 agency_id 隔离
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 运行日志
pub mod repository;

// 导入层 - 管道各阶段与编排
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 上传流程接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{FieldType, IdentifierKind, ImportRunStatus, TargetEntityKind};

// 领域实体
pub use domain::{
    ColumnMapping, EntityDraft, ImportResult, ImportRun, MappingWarning, RowError, TargetSchema,
};

// 导入管道
pub use importer::{
    BatchEntityWriter, CommitStrategy, CustomerLookup, EntityCreator, EntityImporter,
    ImportError, ImportHistory, ImportRequest,
};

// 配置
pub use config::{ConfigManager, ImportSettings};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "贷款管理平台 - 批量导入引擎";
