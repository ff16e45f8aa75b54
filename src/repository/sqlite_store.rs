// ==========================================
// 内容管理平台 - SQLite 存储实现
// ==========================================
// 职责: 以 rusqlite 实现导入管道依赖的全部存储接口
//       MetadataRepository / NamedListResolver / QueryExecutor / ImportJobRepository
// 红线: Repository 不含业务规则，只做数据映射
// ==========================================

mod core;
mod jobs;
mod metadata;


pub use self::core::SqliteStore;
