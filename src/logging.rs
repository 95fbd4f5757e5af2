// ==========================================
// 贷款管理平台 - 日志初始化
// ==========================================
// 导入管道各阶段使用 tracing 结构化字段（run_id / agency_id / row）
// 宿主进程若已自行安装 subscriber，这里的 init 会静默跳过
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 默认过滤器: 本库 info，其余依赖只看 warn
pub const DEFAULT_FILTER: &str = "warn,loan_import=info";

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// 文本格式日志
///
/// # 环境变量
/// - RUST_LOG: 覆盖 DEFAULT_FILTER，例如 RUST_LOG=loan_import::importer=debug
///
/// # 示例
/// ```no_run
/// loan_import::logging::init();
/// ```
pub fn init() {
    let _ = fmt()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_target(true)
        .with_line_number(true)
        .try_init();
}

/// JSON 格式日志（部署环境，附带当前 span 的 run_id 等字段）
pub fn init_json() {
    let _ = fmt()
        .json()
        .with_env_filter(env_filter(DEFAULT_FILTER))
        .with_current_span(true)
        .with_span_list(false)
        .try_init();
}

/// 测试日志: 输出到测试捕获器，导入层开到 debug
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(env_filter("info,loan_import=debug"))
        .with_test_writer()
        .try_init();
}
