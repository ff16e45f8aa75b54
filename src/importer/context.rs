// ==========================================
// 内容管理平台 - 单次导入任务上下文
// ==========================================
// 职责: 承载单次任务的全部可变状态（结果、记录、各类缓存）
// 红线: 缓存只属于一次执行，不跨任务共享，无需加锁
// ==========================================

use crate::config::ImportSettings;
use crate::domain::field::{ComboBoxDefinition, FieldDefinition, FieldTable};
use crate::domain::import_job::{
    FieldMapping, ImportActor, ImportJobRequest, LinkDetailMapping, LinkMapping,
};
use crate::domain::import_record::ImportRecord;
use crate::domain::import_result::ImportResult;
use crate::domain::types::FieldScope;
use crate::i18n::{t_locale_with_args, TECHNICAL_LOCALE};
use crate::importer::file_parser::SourceTable;
use crate::repository::metadata_repo::MetadataRepository;
use crate::repository::RepositoryResult;
use std::collections::HashMap;
use tracing::{debug, warn};

// ==========================================
// ColumnPlan - 列映射解析结果
// ==========================================
// 映射按列名与表头精确匹配；表头中不存在的列被忽略
#[derive(Debug, Clone, Default)]
pub struct ColumnPlan {
    pub id_index: usize,
    pub items: Vec<(usize, FieldMapping)>,
    pub links: Vec<(usize, LinkMapping)>,
    pub link_details: Vec<(usize, LinkDetailMapping)>,
}

impl ColumnPlan {
    pub fn build(table: &SourceTable, id_index: usize, request: &ImportJobRequest) -> Self {
        let resolve = |column: &str| {
            let index = table.column_index(column);
            if index.is_none() {
                debug!(column = %column, "映射列不在表头中，忽略");
            }
            index
        };

        Self {
            id_index,
            items: request
                .item_mappings
                .iter()
                .filter_map(|m| resolve(&m.column).map(|i| (i, m.clone())))
                .filter(|(i, _)| *i != id_index)
                .collect(),
            links: request
                .link_mappings
                .iter()
                .filter_map(|m| resolve(&m.column).map(|i| (i, m.clone())))
                .collect(),
            link_details: request
                .link_detail_mappings
                .iter()
                .filter_map(|m| resolve(&m.column).map(|i| (i, m.clone())))
                .collect(),
        }
    }
}

// ==========================================
// ImportContext - 任务上下文
// ==========================================
pub struct ImportContext<'a> {
    pub request: &'a ImportJobRequest,
    pub actor: &'a ImportActor,
    pub settings: &'a ImportSettings,

    /// 贯穿整个管道的结果对象
    pub result: ImportResult,
    /// 已接受的记录（按文件行序）
    pub records: Vec<ImportRecord>,

    // ===== 任务级缓存 =====
    pub item_fields: FieldTable,
    pub link_fields: HashMap<i32, FieldTable>,
    pub comboboxes: HashMap<(FieldScope, String), ComboBoxDefinition>,
    pub table_prefixes: HashMap<String, String>,
}

impl<'a> ImportContext<'a> {
    pub fn new(
        request: &'a ImportJobRequest,
        actor: &'a ImportActor,
        settings: &'a ImportSettings,
    ) -> Self {
        Self {
            request,
            actor,
            settings,
            result: ImportResult::default(),
            records: Vec::new(),
            item_fields: FieldTable::new(),
            link_fields: HashMap::new(),
            comboboxes: HashMap::new(),
            table_prefixes: HashMap::new(),
        }
    }

    /// 记录一个阻断错误（技术信息 + 本地化信息，同一消息键）
    ///
    /// # 参数
    /// - key: 消息键（locales/*.yml）
    /// - args: 占位符参数；技术信息与本地化信息各取所需
    pub fn fail(&mut self, key: &str, args: &[(&str, &str)]) {
        let technical = t_locale_with_args(key, TECHNICAL_LOCALE, args);
        let localized = t_locale_with_args(key, &self.settings.user_locale, args);

        warn!(key = %key, error = %technical, "记录阻断错误");
        self.result.add_failure(technical, localized);
    }

    /// 当前失败数
    pub fn failed(&self) -> usize {
        self.result.failed
    }

    /// 某作用域的字段定义表（链接类型尚未加载时为空）
    pub fn fields(&self, scope: FieldScope) -> Option<&FieldTable> {
        match scope {
            FieldScope::Item => Some(&self.item_fields),
            FieldScope::Link(link_type) => self.link_fields.get(&link_type),
        }
    }

    /// 查找字段定义：先 (属性名, 语言)，再 (属性名, "")
    pub fn lookup_field(
        &self,
        scope: FieldScope,
        property_name: &str,
        language_code: &str,
    ) -> Option<&FieldDefinition> {
        let table = self.fields(scope)?;
        let property = property_name.to_lowercase();

        table
            .get(&(property.clone(), language_code.to_string()))
            .or_else(|| table.get(&(property, String::new())))
    }

    /// 解析实体类型的表名前缀（任务内缓存）
    pub async fn table_prefix(
        &mut self,
        metadata: &dyn MetadataRepository,
        entity_type: &str,
    ) -> RepositoryResult<String> {
        if let Some(prefix) = self.table_prefixes.get(entity_type) {
            return Ok(prefix.clone());
        }

        let prefix = metadata.get_table_prefix(entity_type).await?;
        debug!(entity_type = %entity_type, prefix = %prefix, "表前缀已缓存");
        self.table_prefixes
            .insert(entity_type.to_string(), prefix.clone());
        Ok(prefix)
    }

    /// 结束任务，交出结果
    pub fn into_result(self) -> ImportResult {
        self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::InputType;

    fn definition(property: &str, language: &str, input_type: InputType) -> FieldDefinition {
        FieldDefinition {
            input_type,
            ..FieldDefinition::passthrough(property, language, FieldScope::Item)
        }
    }

    #[test]
    fn test_lookup_prefers_language_then_neutral() {
        let request = ImportJobRequest::default();
        let actor = ImportActor::new(1, "tester", 1);
        let settings = ImportSettings::default();
        let mut ctx = ImportContext::new(&request, &actor, &settings);

        for def in [
            definition("Price", "", InputType::NumericInput),
            definition("title_text", "nl", InputType::TextBox),
        ] {
            ctx.item_fields.insert(def.cache_key(), def);
        }

        let hit = ctx.lookup_field(FieldScope::Item, "PRICE", "en").unwrap();
        assert_eq!(hit.input_type, InputType::NumericInput);

        assert!(ctx.lookup_field(FieldScope::Item, "title_text", "nl").is_some());
        assert!(ctx.lookup_field(FieldScope::Item, "title_text", "en").is_none());
        assert!(ctx.lookup_field(FieldScope::Link(3), "price", "").is_none());
    }

    #[test]
    fn test_fail_records_both_messages() {
        let request = ImportJobRequest::default();
        let actor = ImportActor::new(1, "tester", 1);
        let settings = ImportSettings::default();
        let mut ctx = ImportContext::new(&request, &actor, &settings);

        ctx.fail("import.invalid_id", &[("row", "3"), ("value", "x")]);

        assert_eq!(ctx.failed(), 1);
        assert!(ctx.result.errors[0].starts_with("Row 3"));
        assert!(ctx.result.user_friendly_errors[0].starts_with("Regel 3"));
    }
}
