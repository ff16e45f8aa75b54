// ==========================================
// 内容管理平台 - 导入层
// ==========================================
// 职责: 读取表格文件，校验并转换为待执行的导入任务
// 支持: CSV（分号分隔）, Excel (.xlsx / .xls)
// ==========================================

// 模块声明
pub mod bulk_importer_impl;
pub mod bulk_importer_trait;
pub mod combobox_resolver;
pub mod context;
pub mod error;
pub mod field_validator;
pub mod file_parser;
pub mod integrity_checker;
pub mod job_assembler;
pub mod row_processor;
pub mod schema_loader;

// 重导出核心类型
pub use bulk_importer_impl::BulkImporterImpl;
pub use combobox_resolver::{ComboBoxResolver, Resolution};
pub use context::{ColumnPlan, ImportContext};
pub use error::{ImportError, ImporterResult};
pub use field_validator::FieldRejection;
pub use file_parser::{CsvParser, ExcelParser, SourceTable, UniversalFileParser};
pub use integrity_checker::IntegrityChecker;
pub use job_assembler::JobAssembler;
pub use row_processor::RowProcessor;
pub use schema_loader::SchemaLoader;

// 重导出 Trait 接口
pub use bulk_importer_trait::BulkImporter;
pub use file_parser::FileParser;
