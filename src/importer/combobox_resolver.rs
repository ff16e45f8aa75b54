// ==========================================
// 内容管理平台 - ComboBox 值解析器
// ==========================================
// 职责: 将用户可读的选项文本解析为存储代码
// 流程: 首次使用时加载值表 → 逗号拆分 → 按代码或文本匹配（不区分大小写）
// 红线: 任一 token 未匹配即阻断，该字段本行不写入任何值
// ==========================================

use crate::db::item_table_name;
use crate::domain::field::{ComboBoxDefinition, ComboBoxSource, FieldDefinition};
use crate::domain::import_record::ItemLink;
use crate::importer::context::ImportContext;
use crate::importer::error::ImporterResult;
use crate::repository::metadata_repo::{MetadataRepository, NamedListResolver};
use crate::repository::query_executor::QueryExecutor;
use tracing::{debug, warn};

/// 旁路明细键后缀（保存解析后的显示文本）
pub const DISPLAY_TEXT_SUFFIX: &str = "_input";

/// 旁路明细键
pub fn display_text_key(property_name: &str) -> String {
    format!("{}{}", property_name, DISPLAY_TEXT_SUFFIX)
}

// ==========================================
// Resolution - 解析结果
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// 空值，原样交给校验器
    Empty,
    /// 解析后的代码（逗号拼接）与显示文本
    Value { codes: String, display: String },
    /// 代码已转为链接，字段本身不写入值
    Linked { display: String, links: Vec<ItemLink> },
    /// 已记录阻断错误
    Rejected,
}

pub struct ComboBoxResolver<'a> {
    metadata: &'a dyn MetadataRepository,
    query: &'a dyn QueryExecutor,
    named_lists: &'a dyn NamedListResolver,
}

impl<'a> ComboBoxResolver<'a> {
    pub fn new(
        metadata: &'a dyn MetadataRepository,
        query: &'a dyn QueryExecutor,
        named_lists: &'a dyn NamedListResolver,
    ) -> Self {
        Self {
            metadata,
            query,
            named_lists,
        }
    }

    /// 解析一个单元格值
    ///
    /// # 参数
    /// - field: 字段定义（受限取值类型）
    /// - raw: 单元格原始文本
    /// - current_item_id: 当前行 item id（0 = 新建）
    /// - row_number: 文件行号（用于错误信息）
    pub async fn resolve(
        &self,
        ctx: &mut ImportContext<'_>,
        field: &FieldDefinition,
        raw: &str,
        current_item_id: u64,
        row_number: usize,
    ) -> Resolution {
        if raw.trim().is_empty() {
            return Resolution::Empty;
        }

        let cache_key = (field.scope, field.property_name.to_lowercase());
        if !ctx.comboboxes.contains_key(&cache_key) {
            let definition = self.load_definition(ctx, field).await;
            ctx.comboboxes.insert(cache_key.clone(), definition);
        }
        let Some(definition) = ctx.comboboxes.get(&cache_key) else {
            return Resolution::Rejected;
        };

        let values = definition.values.as_deref().unwrap_or_default();
        let mut codes = Vec::new();
        let mut texts = Vec::new();
        let mut unmatched = None;

        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let wanted = token.to_lowercase();
            match values
                .iter()
                .find(|(code, text)| code.to_lowercase() == wanted || text.to_lowercase() == wanted)
            {
                Some((code, text)) => {
                    codes.push(code.clone());
                    texts.push(text.clone());
                }
                None => {
                    unmatched = Some(token.to_string());
                    break;
                }
            }
        }

        let options = definition.options.clone();
        let display_name = definition.display_name.clone();

        if let Some(token) = unmatched {
            let row = row_number.to_string();
            ctx.fail(
                "combobox.value_not_found",
                &[
                    ("row", row.as_str()),
                    ("property", field.property_name.as_str()),
                    ("field", display_name.as_str()),
                    ("value", token.as_str()),
                ],
            );
            return Resolution::Rejected;
        }

        let display = texts.join(", ");

        if !options.save_value_as_item_link {
            return Resolution::Value {
                codes: codes.join(","),
                display,
            };
        }

        let mut links = Vec::with_capacity(codes.len());
        for code in &codes {
            let Ok(other_id) = code.trim().parse::<u64>() else {
                let row = row_number.to_string();
                ctx.fail(
                    "link.invalid_value",
                    &[
                        ("row", row.as_str()),
                        ("column", field.property_name.as_str()),
                        ("value", code.as_str()),
                    ],
                );
                continue;
            };

            let link = if options.current_item_is_destination_id {
                ItemLink::new(other_id, current_item_id, options.link_type_number)
            } else {
                ItemLink::new(current_item_id, other_id, options.link_type_number)
            };
            links.push(link);
        }

        Resolution::Linked { display, links }
    }

    /// 构建 ComboBox 定义并加载值表（每个字段每个任务一次）
    async fn load_definition(
        &self,
        ctx: &mut ImportContext<'_>,
        field: &FieldDefinition,
    ) -> ComboBoxDefinition {
        let mut definition = ComboBoxDefinition::from_field(field);

        match self.load_values(ctx, &definition.source).await {
            Ok(values) => {
                debug!(
                    property = %field.property_name,
                    value_count = values.len(),
                    "ComboBox 值表加载完成"
                );
                definition.values = Some(values);
            }
            Err(e) => {
                warn!(property = %field.property_name, error = %e, "ComboBox 值表加载失败");
                let message = e.to_string();
                ctx.fail(
                    "combobox.source_failed",
                    &[
                        ("property", field.property_name.as_str()),
                        ("field", field.label()),
                        ("error", message.as_str()),
                    ],
                );
                definition.values = Some(Vec::new());
            }
        }

        definition
    }

    async fn load_values(
        &self,
        ctx: &mut ImportContext<'_>,
        source: &ComboBoxSource,
    ) -> ImporterResult<Vec<(String, String)>> {
        match source {
            ComboBoxSource::EntityType(entity_type) => {
                let prefix = ctx.table_prefix(self.metadata, entity_type).await?;
                let sql = format!(
                    "SELECT id, title FROM {} WHERE entity_type = ?1 AND published_environment > 0 ORDER BY id",
                    item_table_name(&prefix)?
                );
                let rows = self.query.query(&sql, &[entity_type.clone()]).await?;
                Ok(pairs_from_rows(rows, "id", "title"))
            }
            ComboBoxSource::DataQuery {
                query,
                value_column,
                text_column,
            } => {
                let rows = self.query.query(query, &[]).await?;
                Ok(pairs_from_rows(rows, value_column, text_column))
            }
            ComboBoxSource::Literal(values) => Ok(values.clone()),
            ComboBoxSource::SystemList(name) => Ok(self.named_lists.resolve_list(name).await?),
            ComboBoxSource::None => Ok(Vec::new()),
        }
    }
}

fn pairs_from_rows(
    rows: Vec<crate::repository::query_executor::TabularRow>,
    value_column: &str,
    text_column: &str,
) -> Vec<(String, String)> {
    rows.into_iter()
        .map(|mut row| {
            let code = row.remove(value_column).unwrap_or_default();
            let text = row.remove(text_column).unwrap_or_default();
            (code, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::domain::field::LinkTypeRule;
    use crate::domain::import_job::{ImportActor, ImportJobRequest};
    use crate::domain::types::{FieldScope, InputType};
    use crate::repository::query_executor::TabularRow;
    use crate::repository::{RepositoryError, RepositoryResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ===== 测试替身 =====

    #[derive(Default)]
    struct StubStore {
        query_calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataRepository for StubStore {
        async fn get_field_definitions(&self, _: &str) -> RepositoryResult<Vec<FieldDefinition>> {
            Ok(Vec::new())
        }
        async fn get_link_field_definitions(&self, _: i32) -> RepositoryResult<Vec<FieldDefinition>> {
            Ok(Vec::new())
        }
        async fn get_link_type_rules(&self) -> RepositoryResult<Vec<LinkTypeRule>> {
            Ok(Vec::new())
        }
        async fn get_table_prefix(&self, _: &str) -> RepositoryResult<String> {
            Ok(String::new())
        }
    }

    #[async_trait]
    impl QueryExecutor for StubStore {
        async fn query(&self, sql: &str, _: &[String]) -> RepositoryResult<Vec<TabularRow>> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            if sql.contains("broken") {
                return Err(RepositoryError::DatabaseQueryError("no such table".into()));
            }
            let row = |id: &str, title: &str| {
                TabularRow::from([
                    ("id".to_string(), id.to_string()),
                    ("title".to_string(), title.to_string()),
                ])
            };
            Ok(vec![row("15", "Acme"), row("16", "Globex")])
        }
    }

    #[async_trait]
    impl NamedListResolver for StubStore {
        async fn resolve_list(&self, _: &str) -> RepositoryResult<Vec<(String, String)>> {
            Ok(vec![("1".to_string(), "Anna".to_string())])
        }
    }

    fn combobox(options: serde_json::Value, data_query: Option<&str>) -> FieldDefinition {
        FieldDefinition {
            display_name: "Kleur".to_string(),
            input_type: InputType::ComboBox,
            options,
            data_query: data_query.map(str::to_string),
            ..FieldDefinition::passthrough("color", "", FieldScope::Item)
        }
    }

    fn literal_colors() -> FieldDefinition {
        combobox(
            json!({"dataSource": [{"id": "R", "name": "Rood"}, {"id": "B", "name": "Blauw"}]}),
            None,
        )
    }

    struct Fixture {
        request: ImportJobRequest,
        actor: ImportActor,
        settings: ImportSettings,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                request: ImportJobRequest::default(),
                actor: ImportActor::new(1, "tester", 1),
                settings: ImportSettings::default(),
            }
        }

        fn context(&self) -> ImportContext<'_> {
            ImportContext::new(&self.request, &self.actor, &self.settings)
        }
    }

    #[tokio::test]
    async fn test_matches_code_or_text_case_insensitive() {
        let store = StubStore::default();
        let resolver = ComboBoxResolver::new(&store, &store, &store);
        let fixture = Fixture::new();
        let mut ctx = fixture.context();

        let outcome = resolver
            .resolve(&mut ctx, &literal_colors(), "rood, b", 0, 2)
            .await;

        assert_eq!(
            outcome,
            Resolution::Value {
                codes: "R,B".to_string(),
                display: "Rood, Blauw".to_string(),
            }
        );
        assert_eq!(ctx.failed(), 0);
    }

    #[tokio::test]
    async fn test_non_ascii_code_and_text_match_alike() {
        let store = StubStore::default();
        let resolver = ComboBoxResolver::new(&store, &store, &store);
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let field = combobox(
            json!({"dataSource": [{"id": "Ä1", "name": "Ärmel"}, {"id": "Ö2", "name": "Öl"}]}),
            None,
        );

        // 值代码与显示文本使用同一套大小写规则
        let outcome = resolver.resolve(&mut ctx, &field, "ä1, öl", 0, 2).await;

        assert_eq!(
            outcome,
            Resolution::Value {
                codes: "Ä1,Ö2".to_string(),
                display: "Ärmel, Öl".to_string(),
            }
        );
        assert_eq!(ctx.failed(), 0);
    }

    #[tokio::test]
    async fn test_unmatched_token_rejects_with_display_name() {
        let store = StubStore::default();
        let resolver = ComboBoxResolver::new(&store, &store, &store);
        let fixture = Fixture::new();
        let mut ctx = fixture.context();

        let outcome = resolver
            .resolve(&mut ctx, &literal_colors(), "Rood,Paars", 0, 5)
            .await;

        assert_eq!(outcome, Resolution::Rejected);
        assert_eq!(ctx.failed(), 1);
        assert!(ctx.result.errors[0].contains("Paars"));
        assert!(ctx.result.user_friendly_errors[0].contains("Kleur"));
        assert!(ctx.result.user_friendly_errors[0].contains("Paars"));
    }

    #[tokio::test]
    async fn test_value_table_loaded_once_per_job() {
        let store = StubStore::default();
        let resolver = ComboBoxResolver::new(&store, &store, &store);
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let field = combobox(json!({"entityType": "brand"}), None);

        for row in 2..5 {
            let outcome = resolver.resolve(&mut ctx, &field, "acme", 0, row).await;
            assert!(matches!(outcome, Resolution::Value { ref codes, .. } if codes == "15"));
        }
        assert_eq!(store.query_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_save_as_link_builds_links_in_configured_direction() {
        let store = StubStore::default();
        let resolver = ComboBoxResolver::new(&store, &store, &store);
        let fixture = Fixture::new();
        let mut ctx = fixture.context();

        let field = combobox(
            json!({"entityType": "brand", "saveValueAsItemLink": true, "linkTypeNumber": 4}),
            None,
        );
        let outcome = resolver.resolve(&mut ctx, &field, "Acme,Globex", 30, 2).await;
        match outcome {
            Resolution::Linked { display, links } => {
                assert_eq!(display, "Acme, Globex");
                assert_eq!(links, vec![ItemLink::new(30, 15, 4), ItemLink::new(30, 16, 4)]);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let reversed = combobox(
            json!({
                "entityType": "brand",
                "saveValueAsItemLink": true,
                "currentItemIsDestinationId": true,
                "linkTypeNumber": 4
            }),
            None,
        );
        let mut ctx = fixture.context();
        let outcome = resolver.resolve(&mut ctx, &reversed, "15", 0, 2).await;
        assert!(matches!(
            outcome,
            Resolution::Linked { ref links, .. } if links == &vec![ItemLink::new(15, 0, 4)]
        ));
    }

    #[tokio::test]
    async fn test_failed_source_is_reported_once() {
        let store = StubStore::default();
        let resolver = ComboBoxResolver::new(&store, &store, &store);
        let fixture = Fixture::new();
        let mut ctx = fixture.context();
        let field = combobox(json!({}), Some("SELECT * FROM broken"));

        let first = resolver.resolve(&mut ctx, &field, "x", 0, 2).await;
        assert_eq!(first, Resolution::Rejected);
        // source_failed + value_not_found
        assert_eq!(ctx.failed(), 2);

        resolver.resolve(&mut ctx, &field, "y", 0, 3).await;
        assert_eq!(ctx.failed(), 3);
        assert_eq!(store.query_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_value_is_not_resolved() {
        let store = StubStore::default();
        let resolver = ComboBoxResolver::new(&store, &store, &store);
        let fixture = Fixture::new();
        let mut ctx = fixture.context();

        let outcome = resolver.resolve(&mut ctx, &literal_colors(), "  ", 0, 2).await;
        assert_eq!(outcome, Resolution::Empty);
        assert!(ctx.comboboxes.is_empty());
    }

    #[test]
    fn test_display_text_key() {
        assert_eq!(display_text_key("color"), "color_input");
    }
}
