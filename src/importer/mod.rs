// ==========================================
// 贷款管理平台 - 导入层
// ==========================================
// 职责: 客户/贷款表格文件批量导入
// 流程: file_parser → column_mapper → row_normalizer → entity_matcher
//       → batch_committer，由 entity_importer 编排
// 支持: CSV, Excel/ODS（首个工作表）
// ==========================================

// 模块声明
pub mod batch_committer;
pub mod column_mapper;
pub mod data_cleaner;
pub mod entity_importer;
pub mod entity_matcher;
pub mod error;
pub mod file_parser;
pub mod import_history;
pub mod import_trait;
pub mod row_normalizer;

// 重导出核心类型
pub use batch_committer::{BatchCommitter, CommitReport, CommitStrategy};
pub use column_mapper::{ColumnMapper, ColumnMappingReport};
pub use data_cleaner::DataCleaner;
pub use entity_importer::{EntityImporter, ImportPreview, ImportRequest};
pub use entity_matcher::EntityMatcher;
pub use error::{CommitError, ImportError, ImportOutcome, MatchError, ParseError};
pub use file_parser::{CsvParser, ExcelParser, ParsedFile, UniversalFileParser};
pub use import_history::ImportHistory;
pub use row_normalizer::RowNormalizer;

// 重导出 Trait 接口
pub use import_trait::{
    BatchEntityWriter, BatchWriteOutcome, CustomerLookup, EntityCreator, FileParser, LookupOutcome,
};
