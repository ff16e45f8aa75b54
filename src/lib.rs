// ==========================================
// 内容管理平台 - 批量导入核心库
// ==========================================
// 技术栈: Rust + SQLite
// 定位: 把 CSV / Excel 文件转换为待执行的导入任务，
//       任何一行出错则整个文件被拒绝
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 导入管道
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DateTimeKind, FieldScope, InputType};

// 领域实体
pub use domain::{
    FieldDefinition, FieldMapping, ImportActor, ImportJob, ImportJobRequest, ImportLog,
    ImportRecord, ImportResult, LinkDetailMapping, LinkMapping,
};

// 导入层
pub use importer::{BulkImporter, BulkImporterImpl, ImportError, UniversalFileParser};

// 数据仓储
pub use repository::{RepositoryError, RepositoryResult, SqliteStore, ZipArchiveExtractor};

// 配置
pub use config::{ConfigManager, ImportSettings};

// ==========================================
// 常量定义
// ==========================================

// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 名称
pub const APP_NAME: &str = "CMS Bulk Import";
