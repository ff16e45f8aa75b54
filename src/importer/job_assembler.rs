// ==========================================
// 内容管理平台 - 导入任务组装
// ==========================================
// 职责: 序列化记录 → 写入任务行 → 解压附件包 → 写入审计日志
// 红线: 每一步单独容错；后一步失败不回滚前一步
// ==========================================

use crate::domain::import_result::{ImportJob, ImportLog};
use crate::importer::context::ImportContext;
use crate::repository::archive_extractor::ArchiveExtractor;
use crate::repository::import_job_repo::ImportJobRepository;
use chrono::Utc;
use tracing::{error, info, warn};

pub struct JobAssembler<'a> {
    jobs: &'a dyn ImportJobRepository,
    archives: &'a dyn ArchiveExtractor,
}

impl<'a> JobAssembler<'a> {
    pub fn new(jobs: &'a dyn ImportJobRepository, archives: &'a dyn ArchiveExtractor) -> Self {
        Self { jobs, archives }
    }

    /// 任务名称（未指定时按实体类型与时间生成）
    fn job_name(ctx: &ImportContext<'_>) -> String {
        match ctx.request.job_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "Import {} {}",
                ctx.request.entity_type,
                Utc::now().format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }

    /// 持久化任务行，并在成功后解压附件包
    ///
    /// # 返回
    /// - Some(job_id): 任务行已写入
    /// - None: 写入失败（错误已记录）
    pub async fn persist_job(&self, ctx: &mut ImportContext<'_>) -> Option<u64> {
        let data = match serde_json::to_string(&ctx.records) {
            Ok(data) => data,
            Err(e) => {
                error!(error = %e, "任务载荷序列化失败");
                let message = e.to_string();
                ctx.fail("job.payload_failed", &[("error", message.as_str())]);
                return None;
            }
        };

        let job = ImportJob {
            name: Self::job_name(ctx),
            start_on: ctx.request.scheduled_start.unwrap_or_else(Utc::now),
            added_by: ctx.actor.name.clone(),
            user_id: ctx.actor.id,
            tenant_id: ctx.actor.tenant_id,
            data,
        };

        let job_id = match self.jobs.insert_job(&job).await {
            Ok(job_id) => job_id,
            Err(e) => {
                error!(error = %e, "任务行写入失败");
                let message = e.to_string();
                ctx.fail("job.insert_failed", &[("error", message.as_str())]);
                return None;
            }
        };

        ctx.result.job_id = Some(job_id);
        info!(job_id, records = ctx.records.len(), "导入任务已创建");

        self.stage_bundle(ctx, job_id);
        Some(job_id)
    }

    /// 解压附件包到 {staging_dir}/{job_id}
    fn stage_bundle(&self, ctx: &mut ImportContext<'_>, job_id: u64) {
        let request = ctx.request;
        let Some(bundle) = request.file_bundle_path.as_ref() else {
            return;
        };

        let target = ctx.settings.staging_dir.join(job_id.to_string());
        match self.archives.extract(bundle, &target) {
            Ok(count) => {
                info!(job_id, files = count, target = %target.display(), "附件包已解压");
            }
            Err(e) => {
                // 任务行保留，由下游处理缺失的附件
                warn!(job_id, error = %e, "附件包解压失败");
                let path = bundle.display().to_string();
                let job = job_id.to_string();
                let message = e.to_string();
                ctx.fail(
                    "job.extract_failed",
                    &[
                        ("path", path.as_str()),
                        ("job_id", job.as_str()),
                        ("error", message.as_str()),
                    ],
                );
            }
        }
    }

    /// 写入审计日志（每次运行都写，无论成败）
    pub async fn write_audit_log(&self, ctx: &mut ImportContext<'_>, run_id: &str) {
        let log = ImportLog::from_result(
            run_id,
            &ctx.request.entity_type,
            &ctx.actor.name,
            &ctx.result,
        );

        if let Err(e) = self.jobs.insert_import_log(&log).await {
            error!(run_id = %run_id, error = %e, "审计日志写入失败");
            let message = e.to_string();
            ctx.fail("job.log_failed", &[("error", message.as_str())]);
        }
    }
}
