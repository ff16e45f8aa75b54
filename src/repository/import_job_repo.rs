// ==========================================
// 内容管理平台 - 导入任务 Repository Trait
// ==========================================
// 职责: 任务行与审计日志行的写入接口
// 红线: 两次写入互相独立，任一失败不回滚另一者
// ==========================================

use crate::domain::import_result::{ImportJob, ImportLog};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportJobRepository Trait
// ==========================================
// 实现者: SqliteStore
#[async_trait]
pub trait ImportJobRepository: Send + Sync {
    /// 写入任务行
    ///
    /// # 返回
    /// - Ok(job_id): 新任务 id
    async fn insert_job(&self, job: &ImportJob) -> RepositoryResult<u64>;

    /// 写入审计日志行
    ///
    /// # 返回
    /// - Ok(log_id): 新日志 id
    async fn insert_import_log(&self, log: &ImportLog) -> RepositoryResult<u64>;
}
