// ==========================================
// 内容管理平台 - 字段定义加载器
// ==========================================
// 职责: 读取 item 字段定义与（惰性）链接字段定义，写入任务缓存
// 红线: 每个链接类型在一次任务中只读取一次
// ==========================================

use crate::domain::field::{FieldDefinition, FieldTable};
use crate::importer::context::ImportContext;
use crate::repository::metadata_repo::MetadataRepository;
use crate::repository::RepositoryResult;
use tracing::{debug, info};

pub struct SchemaLoader<'a> {
    metadata: &'a dyn MetadataRepository,
}

impl<'a> SchemaLoader<'a> {
    pub fn new(metadata: &'a dyn MetadataRepository) -> Self {
        Self { metadata }
    }

    /// 将字段定义列表转为缓存表（同键重复时保留第一条）
    pub fn build_table(definitions: Vec<FieldDefinition>) -> FieldTable {
        let mut table = FieldTable::new();
        for definition in definitions {
            table.entry(definition.cache_key()).or_insert(definition);
        }
        table
    }

    /// 加载目标实体类型的 item 字段定义
    ///
    /// 未指定实体类型时不加载（全部映射字段按透传处理）
    pub async fn load_item_fields(&self, ctx: &mut ImportContext<'_>) -> RepositoryResult<()> {
        if !ctx.request.has_entity_type() {
            debug!("未指定实体类型，跳过字段定义加载");
            return Ok(());
        }

        let definitions = self
            .metadata
            .get_field_definitions(&ctx.request.entity_type)
            .await?;

        info!(
            entity_type = %ctx.request.entity_type,
            field_count = definitions.len(),
            "item 字段定义加载完成"
        );
        ctx.item_fields = Self::build_table(definitions);
        Ok(())
    }

    /// 确保链接类型的字段定义已加载
    pub async fn ensure_link_fields(
        &self,
        ctx: &mut ImportContext<'_>,
        link_type: i32,
    ) -> RepositoryResult<()> {
        if ctx.link_fields.contains_key(&link_type) {
            return Ok(());
        }

        let definitions = match self.metadata.get_link_field_definitions(link_type).await {
            Ok(definitions) => definitions,
            Err(e) => {
                // 失败也占位，避免同一链接类型逐行重复报错
                ctx.link_fields.insert(link_type, FieldTable::new());
                return Err(e);
            }
        };
        debug!(link_type, field_count = definitions.len(), "链接字段定义加载完成");
        ctx.link_fields
            .insert(link_type, Self::build_table(definitions));
        Ok(())
    }
}
