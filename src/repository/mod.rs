// ==========================================
// 内容管理平台 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 值一律参数化；只有整数 id 列表会被内联
// ==========================================

pub mod archive_extractor;
pub mod error;
pub mod import_job_repo;
pub mod metadata_repo;
pub mod query_executor;
pub mod sqlite_store;

// 重导出核心仓储
pub use archive_extractor::{ArchiveExtractor, ZipArchiveExtractor};
pub use error::{RepositoryError, RepositoryResult};
pub use import_job_repo::ImportJobRepository;
pub use metadata_repo::{MetadataRepository, NamedListResolver};
pub use query_executor::{QueryExecutor, TabularRow};
pub use sqlite_store::SqliteStore;
