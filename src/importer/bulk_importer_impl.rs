// ==========================================
// 内容管理平台 - 批量导入器实现
// ==========================================
// 职责: 串联整个导入管道
// 流程: 读取文件 → 字段定义 → 逐行处理 → [闸门 1] → 完整性检查 → [闸门 2] → 组装任务
//       审计日志无论成败都写入
// ==========================================

use crate::config::ImportSettings;
use crate::domain::import_job::{ImportActor, ImportJobRequest};
use crate::domain::import_result::ImportResult;
use crate::importer::bulk_importer_trait::BulkImporter;
use crate::importer::combobox_resolver::ComboBoxResolver;
use crate::importer::context::{ColumnPlan, ImportContext};
use crate::importer::error::ImportError;
use crate::importer::file_parser::{file_extension, FileParser};
use crate::importer::integrity_checker::IntegrityChecker;
use crate::importer::job_assembler::JobAssembler;
use crate::importer::row_processor::{row_number, RowProcessor};
use crate::importer::schema_loader::SchemaLoader;
use crate::repository::archive_extractor::ArchiveExtractor;
use crate::repository::import_job_repo::ImportJobRepository;
use crate::repository::metadata_repo::{MetadataRepository, NamedListResolver};
use crate::repository::query_executor::QueryExecutor;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

// ==========================================
// BulkImporterImpl - 批量导入器实现
// ==========================================
pub struct BulkImporterImpl<M, Q, J>
where
    M: MetadataRepository,
    Q: QueryExecutor,
    J: ImportJobRepository,
{
    // 数据访问层
    metadata: M,
    query: Q,
    jobs: J,

    // 外部协作者
    named_lists: Box<dyn NamedListResolver>,
    file_parser: Box<dyn FileParser>,
    archive_extractor: Box<dyn ArchiveExtractor>,

    // 导入参数
    settings: ImportSettings,
}

impl<M, Q, J> BulkImporterImpl<M, Q, J>
where
    M: MetadataRepository,
    Q: QueryExecutor,
    J: ImportJobRepository,
{
    /// 创建新的 BulkImporter 实例
    ///
    /// # 参数
    /// - metadata: 字段定义 / 链接规则 / 表前缀
    /// - query: 通用查询
    /// - jobs: 任务行与审计日志写入
    /// - named_lists: ComboBox 命名列表
    /// - file_parser: 文件解析器
    /// - archive_extractor: 附件包解压
    /// - settings: 导入参数
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        metadata: M,
        query: Q,
        jobs: J,
        named_lists: Box<dyn NamedListResolver>,
        file_parser: Box<dyn FileParser>,
        archive_extractor: Box<dyn ArchiveExtractor>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            metadata,
            query,
            jobs,
            named_lists,
            file_parser,
            archive_extractor,
            settings,
        }
    }

    /// 管道主体；任何阶段出现阻断错误即停止后续阶段
    async fn run_pipeline(&self, ctx: &mut ImportContext<'_>) {
        // === 步骤 1: 读取文件 ===
        debug!("步骤 1: 读取文件");
        let file_path = ctx.request.file_path.clone();
        let table = match self.file_parser.open(&file_path) {
            Ok(table) => table,
            Err(ImportError::UnsupportedFormat(_)) => {
                let extension = file_extension(&file_path);
                ctx.fail(
                    "import.unsupported_format",
                    &[("extension", extension.as_str())],
                );
                return;
            }
            Err(e) => {
                error!(error = %e, "文件读取失败");
                let path = file_path.display().to_string();
                let message = e.to_string();
                ctx.fail(
                    "import.file_read_failed",
                    &[("path", path.as_str()), ("error", message.as_str())],
                );
                return;
            }
        };

        let Some(id_index) = table.id_column() else {
            ctx.fail("import.missing_id_column", &[]);
            return;
        };
        let plan = ColumnPlan::build(&table, id_index, ctx.request);
        info!(
            columns = table.headers.len(),
            item_columns = plan.items.len(),
            link_columns = plan.links.len(),
            link_detail_columns = plan.link_details.len(),
            "文件表头读取完成"
        );

        // === 步骤 2: 字段定义 ===
        debug!("步骤 2: 加载字段定义");
        let schema = SchemaLoader::new(&self.metadata);
        if let Err(e) = schema.load_item_fields(ctx).await {
            error!(error = %e, "字段定义加载失败");
            let entity_type = ctx.request.entity_type.clone();
            let message = e.to_string();
            ctx.fail(
                "import.schema_load_failed",
                &[("scope", entity_type.as_str()), ("error", message.as_str())],
            );
            return;
        }

        // === 步骤 3: 逐行处理 ===
        debug!("步骤 3: 逐行处理");
        let resolver = ComboBoxResolver::new(&self.metadata, &self.query, self.named_lists.as_ref());
        let processor = RowProcessor::new(&schema, &resolver, &self.query);

        for (row_index, row) in table.rows.take(self.settings.max_rows).enumerate() {
            match row {
                Ok(cells) => processor.process_row(ctx, &plan, row_index, &cells).await,
                Err(e) => {
                    let row_text = row_number(row_index).to_string();
                    let message = e.to_string();
                    ctx.fail(
                        "import.row_read_failed",
                        &[("row", row_text.as_str()), ("error", message.as_str())],
                    );
                }
            }
        }

        info!(
            items_total = ctx.result.items_total,
            successful = ctx.result.successful,
            failed = ctx.result.failed,
            "行处理完成"
        );

        // === 闸门 1 ===
        if ctx.result.has_failures() {
            info!(failed = ctx.result.failed, "行处理存在错误，任务被拒绝");
            return;
        }

        // === 步骤 4: 引用完整性 ===
        debug!("步骤 4: 引用完整性检查");
        let checker = IntegrityChecker::new(&self.metadata, &self.query);
        if let Err(e) = checker.check(ctx).await {
            error!(error = %e, "引用完整性检查失败");
            let message = e.to_string();
            ctx.fail("integrity.check_failed", &[("error", message.as_str())]);
        }

        // === 闸门 2 ===
        if ctx.result.has_failures() {
            info!(failed = ctx.result.failed, "引用完整性检查未通过，任务被拒绝");
            return;
        }

        // === 步骤 5: 组装任务 ===
        debug!("步骤 5: 组装任务");
        let assembler = JobAssembler::new(&self.jobs, self.archive_extractor.as_ref());
        assembler.persist_job(ctx).await;
    }
}

#[async_trait]
impl<M, Q, J> BulkImporter for BulkImporterImpl<M, Q, J>
where
    M: MetadataRepository + Send + Sync,
    Q: QueryExecutor + Send + Sync,
    J: ImportJobRepository + Send + Sync,
{
    #[instrument(skip(self, request, actor), fields(entity_type = %request.entity_type, run_id = tracing::field::Empty))]
    async fn import(&self, request: &ImportJobRequest, actor: &ImportActor) -> ImportResult {
        let start_time = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        info!(
            file_path = %request.file_path.display(),
            actor = %actor.name,
            "开始导入"
        );

        let mut ctx = ImportContext::new(request, actor, &self.settings);
        self.run_pipeline(&mut ctx).await;

        // 审计日志：无论成败都写入
        let assembler = JobAssembler::new(&self.jobs, self.archive_extractor.as_ref());
        assembler.write_audit_log(&mut ctx, &run_id).await;

        let result = ctx.into_result();
        info!(
            items_total = result.items_total,
            items_created = result.items_created,
            items_updated = result.items_updated,
            successful = result.successful,
            failed = result.failed,
            job_id = ?result.job_id,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "导入结束"
        );

        result
    }

    async fn batch_import(
        &self,
        requests: &[ImportJobRequest],
        actor: &ImportActor,
    ) -> Vec<ImportResult> {
        use futures::future::join_all;

        info!(count = requests.len(), "开始批量导入");

        // 每个任务拥有独立上下文，可并发执行
        let results = join_all(requests.iter().map(|request| self.import(request, actor))).await;

        info!(
            total = results.len(),
            accepted = results.iter().filter(|r| r.job_id.is_some()).count(),
            rejected = results.iter().filter(|r| r.has_failures()).count(),
            "批量导入完成"
        );

        results
    }
}
