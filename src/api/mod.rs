// ==========================================
// 贷款管理平台 - API 层
// ==========================================
// 职责: 供上传流程调用的导入接口
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, ImportApiResponse};
