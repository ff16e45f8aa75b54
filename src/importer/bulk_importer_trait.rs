// ==========================================
// 内容管理平台 - 批量导入器 Trait
// ==========================================
// 职责: 定义导入管道的对外接口（不包含实现）
// 红线: 不返回 Err，所有问题以 ImportResult 上的错误列表返回
// ==========================================

use crate::domain::import_job::{ImportActor, ImportJobRequest};
use crate::domain::import_result::ImportResult;
use async_trait::async_trait;

// ==========================================
// BulkImporter Trait
// ==========================================
// 实现者: BulkImporterImpl
#[async_trait]
pub trait BulkImporter: Send + Sync {
    /// 执行一次导入任务
    ///
    /// # 参数
    /// - request: 导入请求（文件 + 列映射）
    /// - actor: 操作人
    ///
    /// # 返回
    /// - ImportResult: 计数、技术错误与本地化错误；成功时带 job_id
    async fn import(&self, request: &ImportJobRequest, actor: &ImportActor) -> ImportResult;

    /// 批量执行多个导入任务（任务之间不共享缓存）
    ///
    /// # 返回
    /// - Vec<ImportResult>: 与 requests 一一对应
    async fn batch_import(
        &self,
        requests: &[ImportJobRequest],
        actor: &ImportActor,
    ) -> Vec<ImportResult>;
}
