// ==========================================
// 内容管理平台 - 行处理器
// ==========================================
// 职责: 单行 → ImportRecord（item + 明细 + 链接 + 附件请求）
// 流程:
//   Pass A: item 字段与链接列
//   Pass B: 链接字段（写入 Pass A 已建立的同类型链接）
//   收尾: 计数 + 附件请求展开
// 红线: 字段级错误只记录不中断；两遍扫描保证列顺序无关
// ==========================================

use crate::db::item_file_table_name;
use crate::domain::field::FieldDefinition;
use crate::domain::import_record::{
    upsert_detail, FileAttachment, ImportRecord, Item, ItemLink, PendingAttachment,
};
use crate::domain::types::{FieldScope, InputType};
use crate::importer::combobox_resolver::{display_text_key, ComboBoxResolver, Resolution};
use crate::importer::context::{ColumnPlan, ImportContext};
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::field_validator;
use crate::importer::schema_loader::SchemaLoader;
use crate::repository::query_executor::{row_u64, QueryExecutor};
use tracing::{debug, error};

/// 标题别名：映射到该属性名的列直接写入 item 标题
pub const TITLE_ALIAS: &str = "ItemTitle";

/// 数据行号（表头为第 1 行）
pub fn row_number(row_index: usize) -> usize {
    row_index + 2
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// 单个字段输入（item 字段或链接字段）
struct FieldInput<'r> {
    property_name: &'r str,
    language_code: &'r str,
    is_image_field: bool,
    allow_multiple: bool,
    raw: &'r str,
}

pub struct RowProcessor<'a> {
    schema: &'a SchemaLoader<'a>,
    resolver: &'a ComboBoxResolver<'a>,
    query: &'a dyn QueryExecutor,
}

impl<'a> RowProcessor<'a> {
    pub fn new(
        schema: &'a SchemaLoader<'a>,
        resolver: &'a ComboBoxResolver<'a>,
        query: &'a dyn QueryExecutor,
    ) -> Self {
        Self {
            schema,
            resolver,
            query,
        }
    }

    /// 处理一行数据
    ///
    /// # 参数
    /// - plan: 列映射解析结果
    /// - row_index: 数据行序号（从 0 开始，不含表头）
    /// - row: 单元格文本
    pub async fn process_row(
        &self,
        ctx: &mut ImportContext<'_>,
        plan: &ColumnPlan,
        row_index: usize,
        row: &[String],
    ) {
        // 完全空白的行：不产生记录，不计数
        if row.iter().all(|c| c.trim().is_empty()) {
            debug!(row_index, "跳过空白行");
            return;
        }

        let row_no = row_number(row_index);
        let id_cell = cell(row, plan.id_index).trim();
        let item_id = if id_cell.is_empty() {
            0
        } else {
            match id_cell.parse::<u64>() {
                Ok(id) => id,
                Err(_) => {
                    let row_text = row_no.to_string();
                    ctx.fail(
                        "import.invalid_id",
                        &[("row", row_text.as_str()), ("value", id_cell)],
                    );
                    return;
                }
            }
        };

        let item = Item {
            id: item_id,
            entity_type: ctx.request.entity_type.clone(),
            module_id: ctx.request.module_id,
            title: None,
            parent_item_id: None,
            added_by: ctx.actor.name.clone(),
        };
        let mut record = ImportRecord::new(item, row_no);

        // === Pass A: item 字段 ===
        for (index, mapping) in &plan.items {
            let raw = cell(row, *index);

            if mapping.property_name.eq_ignore_ascii_case(TITLE_ALIAS) {
                record.item.title = Some(raw.to_string());
                continue;
            }

            let input = FieldInput {
                property_name: &mapping.property_name,
                language_code: &mapping.language_code,
                is_image_field: mapping.is_image_field,
                allow_multiple: mapping.allow_multiple,
                raw,
            };
            self.apply_field(ctx, &mut record, FieldScope::Item, input).await;
        }

        // === Pass A: 链接列 ===
        for (index, mapping) in &plan.links {
            let current = record.item.id;
            for token in cell(row, *index)
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
            {
                let Ok(other) = token.parse::<u64>() else {
                    let row_text = row_no.to_string();
                    ctx.fail(
                        "link.invalid_value",
                        &[
                            ("row", row_text.as_str()),
                            ("column", mapping.column.as_str()),
                            ("value", token),
                        ],
                    );
                    continue;
                };

                let mut link = if mapping.link_is_destination {
                    ItemLink::new(current, other, mapping.link_type)
                } else {
                    ItemLink::new(other, current, mapping.link_type)
                };
                link.delete_existing_links = mapping.delete_existing_links;

                if !record.add_link(link) {
                    debug!(row = row_no, token, "忽略自链接或重复链接");
                }
            }
        }

        // === Pass B: 链接字段 ===
        for (index, mapping) in &plan.link_details {
            if !record.links.iter().any(|l| l.link_type == mapping.link_type) {
                continue;
            }

            if let Err(e) = self.schema.ensure_link_fields(ctx, mapping.link_type).await {
                let scope = FieldScope::Link(mapping.link_type).to_string();
                let message = e.to_string();
                ctx.fail(
                    "import.schema_load_failed",
                    &[("scope", scope.as_str()), ("error", message.as_str())],
                );
            }

            let input = FieldInput {
                property_name: &mapping.property_name,
                language_code: &mapping.language_code,
                is_image_field: mapping.is_image_field,
                allow_multiple: mapping.allow_multiple,
                raw: cell(row, *index),
            };
            self.apply_field(ctx, &mut record, FieldScope::Link(mapping.link_type), input)
                .await;
        }

        // === 收尾: 计数与附件 ===
        ctx.result.items_total += 1;

        match self.build_attachments(ctx, &mut record).await {
            Ok(()) => {
                ctx.result.successful += 1;
                if record.item.is_new() {
                    ctx.result.items_created += 1;
                } else {
                    ctx.result.items_updated += 1;
                }
            }
            Err(e) => {
                error!(row = row_no, error = %e, "附件请求构建失败");
                let row_text = row_no.to_string();
                let message = e.to_string();
                ctx.fail(
                    "row.attachment_failed",
                    &[("row", row_text.as_str()), ("error", message.as_str())],
                );
            }
        }

        ctx.records.push(record);
    }

    /// 处理一个字段：附件 / ComboBox 解析 / 校验 → 写入明细
    async fn apply_field(
        &self,
        ctx: &mut ImportContext<'_>,
        record: &mut ImportRecord,
        scope: FieldScope,
        input: FieldInput<'_>,
    ) {
        let definition = ctx
            .lookup_field(scope, input.property_name, input.language_code)
            .cloned()
            .unwrap_or_else(|| {
                FieldDefinition::passthrough(input.property_name, input.language_code, scope)
            });

        let link_type = match scope {
            FieldScope::Item => 0,
            FieldScope::Link(link_type) => link_type,
        };

        // 图片字段转为附件请求，不参与校验
        if input.is_image_field || definition.input_type == InputType::ImageUpload {
            if !input.raw.trim().is_empty() {
                record.pending_files.push(PendingAttachment {
                    property_name: definition.property_name.clone(),
                    language_code: input.language_code.to_string(),
                    raw_value: input.raw.trim().to_string(),
                    allow_multiple: input.allow_multiple,
                    link_type,
                });
            }
            return;
        }

        let mut value = input.raw.to_string();
        if definition.input_type.is_constrained() {
            let resolution = self
                .resolver
                .resolve(ctx, &definition, input.raw, record.item.id, record.row_number)
                .await;

            match resolution {
                Resolution::Empty => {}
                Resolution::Rejected => return,
                Resolution::Value { codes, display } => {
                    let key = display_text_key(&definition.property_name);
                    attach_detail(record, scope, &key, input.language_code, display);
                    value = codes;
                }
                Resolution::Linked { display, links } => {
                    let key = display_text_key(&definition.property_name);
                    attach_detail(record, scope, &key, input.language_code, display);
                    for link in links {
                        record.add_link(link);
                    }
                    return;
                }
            }
        }

        match field_validator::validate(&definition, &value) {
            Ok(normalized) => attach_detail(
                record,
                scope,
                &definition.property_name,
                input.language_code,
                normalized,
            ),
            Err(rejection) => {
                let row_text = record.row_number.to_string();
                let input_type = definition.input_type.to_string();
                ctx.fail(
                    rejection.message_key(),
                    &[
                        ("row", row_text.as_str()),
                        ("property", definition.property_name.as_str()),
                        ("field", definition.label()),
                        ("input_type", input_type.as_str()),
                        ("value", value.as_str()),
                    ],
                );
            }
        }
    }

    /// 展开附件请求：文件名、扩展名、（更新时）已有附件 id
    async fn build_attachments(
        &self,
        ctx: &mut ImportContext<'_>,
        record: &mut ImportRecord,
    ) -> ImporterResult<()> {
        let pending = std::mem::take(&mut record.pending_files);

        for request in pending {
            let paths: Vec<&str> = if request.allow_multiple {
                request
                    .raw_value
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect()
            } else {
                vec![request.raw_value.as_str()]
            };

            for path in paths {
                let (file_name, extension) = split_file_name(path).ok_or_else(|| {
                    ImportError::InvalidAttachmentPath {
                        property: request.property_name.clone(),
                        value: path.to_string(),
                    }
                })?;

                let replaces_existing =
                    !record.item.is_new() && !request.allow_multiple && request.link_type == 0;
                let existing_file_id = if replaces_existing {
                    self.find_existing_file(ctx, record.item.id, &request.property_name)
                        .await?
                } else {
                    None
                };

                record.files.push(FileAttachment {
                    item_id: record.item.id,
                    property_name: request.property_name.clone(),
                    language_code: request.language_code.clone(),
                    source_path: path.to_string(),
                    file_name,
                    extension,
                    allow_multiple: request.allow_multiple,
                    existing_file_id,
                    link_type: request.link_type,
                });
            }
        }

        Ok(())
    }

    async fn find_existing_file(
        &self,
        ctx: &ImportContext<'_>,
        item_id: u64,
        property_name: &str,
    ) -> ImporterResult<Option<u64>> {
        let sql = format!(
            "SELECT id FROM {} WHERE item_id = ?1 AND property_name = ?2 ORDER BY id LIMIT 1",
            item_file_table_name(&ctx.settings.primary_table_prefix)?
        );
        let rows = self
            .query
            .query(&sql, &[item_id.to_string(), property_name.to_string()])
            .await?;

        Ok(rows.first().and_then(|row| row_u64(row, "id")))
    }
}

/// 写入 item 明细或链接明细
fn attach_detail(
    record: &mut ImportRecord,
    scope: FieldScope,
    key: &str,
    language_code: &str,
    value: String,
) {
    match scope {
        FieldScope::Item => record.set_detail(key, language_code, value),
        FieldScope::Link(link_type) => {
            if let Some(link) = record.link_mut(link_type) {
                upsert_detail(&mut link.details, key, language_code, value);
            }
        }
    }
}

/// 拆分文件名与小写扩展名（兼容 / 与 \ 路径分隔符）
fn split_file_name(path: &str) -> Option<(String, String)> {
    let name = path.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }

    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    Some((name.to_string(), extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImportSettings;
    use crate::domain::field::LinkTypeRule;
    use crate::domain::import_job::{
        FieldMapping, ImportActor, ImportJobRequest, LinkDetailMapping, LinkMapping,
    };
    use crate::domain::import_result::ImportResult;
    use crate::importer::file_parser::ID_COLUMN;
    use crate::repository::metadata_repo::{MetadataRepository, NamedListResolver};
    use crate::repository::query_executor::TabularRow;
    use crate::repository::RepositoryResult;
    use async_trait::async_trait;
    use serde_json::json;

    // ===== 测试替身 =====

    struct StubStore;

    #[async_trait]
    impl MetadataRepository for StubStore {
        async fn get_field_definitions(&self, _: &str) -> RepositoryResult<Vec<FieldDefinition>> {
            Ok(vec![
                FieldDefinition {
                    display_name: "Prijs".to_string(),
                    input_type: InputType::NumericInput,
                    ..FieldDefinition::passthrough("price", "", FieldScope::Item)
                },
                FieldDefinition {
                    display_name: "Kleur".to_string(),
                    input_type: InputType::ComboBox,
                    options: json!({"dataSource": [{"id": 1, "name": "Rood"}]}),
                    ..FieldDefinition::passthrough("color", "", FieldScope::Item)
                },
            ])
        }
        async fn get_link_field_definitions(
            &self,
            link_type: i32,
        ) -> RepositoryResult<Vec<FieldDefinition>> {
            Ok(vec![FieldDefinition {
                input_type: InputType::NumericInput,
                ..FieldDefinition::passthrough("quantity", "", FieldScope::Link(link_type))
            }])
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
        async fn query(&self, sql: &str, params: &[String]) -> RepositoryResult<Vec<TabularRow>> {
            // item 15 的 "photo" 字段已有附件 90
            if sql.contains("item_file") && params.first().map(String::as_str) == Some("15") {
                return Ok(vec![TabularRow::from([("id".to_string(), "90".to_string())])]);
            }
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl NamedListResolver for StubStore {
        async fn resolve_list(&self, _: &str) -> RepositoryResult<Vec<(String, String)>> {
            Ok(Vec::new())
        }
    }

    fn request() -> ImportJobRequest {
        let field = |column: &str, property: &str| FieldMapping {
            column: column.to_string(),
            property_name: property.to_string(),
            ..Default::default()
        };

        ImportJobRequest {
            entity_type: "product".to_string(),
            module_id: 3,
            item_mappings: vec![
                field("title", "ItemTitle"),
                field("price", "price"),
                field("color", "color"),
                FieldMapping {
                    is_image_field: true,
                    ..field("photo", "photo")
                },
            ],
            link_mappings: vec![
                LinkMapping {
                    column: "brand".to_string(),
                    link_type: 4,
                    link_is_destination: true,
                    delete_existing_links: true,
                },
                LinkMapping {
                    column: "brand_again".to_string(),
                    link_type: 4,
                    link_is_destination: true,
                    delete_existing_links: false,
                },
                LinkMapping {
                    column: "category".to_string(),
                    link_type: 9,
                    link_is_destination: false,
                    delete_existing_links: false,
                },
            ],
            link_detail_mappings: vec![
                LinkDetailMapping {
                    column: "qty".to_string(),
                    link_type: 4,
                    property_name: "quantity".to_string(),
                    ..Default::default()
                },
                LinkDetailMapping {
                    column: "note".to_string(),
                    link_type: 77,
                    property_name: "note".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    const HEADERS: &[&str] = &[
        "qty", "note", ID_COLUMN, "title", "price", "color", "photo", "brand", "brand_again",
        "category",
    ];

    fn plan(request: &ImportJobRequest) -> ColumnPlan {
        let table = crate::importer::file_parser::SourceTable {
            headers: HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: Box::new(std::iter::empty::<ImporterResult<Vec<String>>>()),
        };
        ColumnPlan::build(&table, 2, request)
    }

    fn row(cells: &[(&str, &str)]) -> Vec<String> {
        HEADERS
            .iter()
            .map(|h| {
                cells
                    .iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default()
            })
            .collect()
    }

    async fn run(cells: &[&[(&str, &str)]]) -> (ImportResult, Vec<ImportRecord>) {
        let request = request();
        let actor = ImportActor::new(7, "tester", 1);
        let settings = ImportSettings::default();
        let mut ctx = ImportContext::new(&request, &actor, &settings);

        let store = StubStore;
        let schema = SchemaLoader::new(&store);
        let resolver = ComboBoxResolver::new(&store, &store, &store);
        let processor = RowProcessor::new(&schema, &resolver, &store);

        schema.load_item_fields(&mut ctx).await.unwrap();
        let plan = plan(&request);
        for (index, cells) in cells.iter().enumerate() {
            processor.process_row(&mut ctx, &plan, index, &row(cells)).await;
        }

        let records = std::mem::take(&mut ctx.records);
        (ctx.into_result(), records)
    }

    #[tokio::test]
    async fn test_blank_row_is_skipped() {
        let (result, records) = run(&[&[("title", "  "), ("price", "")]]).await;
        assert!(records.is_empty());
        assert_eq!(result.items_total, 0);
        assert_eq!(result.failed, 0);
    }

    #[tokio::test]
    async fn test_item_defaults_title_and_numeric() {
        let (result, records) = run(&[&[
            (ID_COLUMN, "0"),
            ("title", " Widget "),
            ("price", "12,50"),
        ]])
        .await;

        assert_eq!(result.items_total, 1);
        assert_eq!(result.items_created, 1);
        assert_eq!(result.successful, 1);

        let record = &records[0];
        assert_eq!(record.row_number, 2);
        assert!(record.item.is_new());
        assert_eq!(record.item.entity_type, "product");
        assert_eq!(record.item.module_id, 3);
        assert_eq!(record.item.added_by, "tester");
        assert_eq!(record.item.title.as_deref(), Some(" Widget "));
        assert_eq!(record.detail("price").map(|d| d.value.as_str()), Some("12.5"));
    }

    #[tokio::test]
    async fn test_rejected_field_is_dropped_but_row_counted() {
        let (result, records) = run(&[&[(ID_COLUMN, "15"), ("price", "abc")]]).await;

        assert_eq!(result.failed, 1);
        assert_eq!(result.successful, 1);
        assert_eq!(result.items_updated, 1);
        assert!(result.errors[0].contains("abc"));
        assert!(result.user_friendly_errors[0].contains("Prijs"));
        assert!(records[0].detail("price").is_none());
    }

    #[tokio::test]
    async fn test_invalid_id_produces_no_record() {
        let (result, records) = run(&[&[(ID_COLUMN, "x1"), ("title", "A")]]).await;
        assert!(records.is_empty());
        assert_eq!(result.items_total, 0);
        assert_eq!(result.failed, 1);
    }

    #[tokio::test]
    async fn test_link_direction_self_link_and_dedup() {
        let (result, records) = run(&[&[
            (ID_COLUMN, "15"),
            ("brand", "20, 15,21"),
            ("brand_again", "20"),
            ("category", "30"),
        ]])
        .await;

        assert_eq!(result.failed, 0);
        let links = &records[0].links;
        assert_eq!(links.len(), 3);

        // linkIsDestination = true: 当前行 → 单元格 id
        assert_eq!((links[0].item_id, links[0].destination_item_id), (15, 20));
        assert!(links[0].delete_existing_links);
        assert_eq!((links[1].item_id, links[1].destination_item_id), (15, 21));
        // linkIsDestination = false: 单元格 id → 当前行
        assert_eq!((links[2].item_id, links[2].destination_item_id), (30, 15));
    }

    #[tokio::test]
    async fn test_invalid_link_token_reported() {
        let (result, records) = run(&[&[(ID_COLUMN, "0"), ("brand", "abc,20")]]).await;
        assert_eq!(result.failed, 1);
        assert_eq!(records[0].links.len(), 1);
        assert!(result.errors[0].contains("brand"));
    }

    #[tokio::test]
    async fn test_link_details_written_regardless_of_column_order() {
        let (result, records) = run(&[&[
            (ID_COLUMN, "0"),
            ("qty", "2,5"),
            ("note", "ignored"),
            ("brand", "20"),
        ]])
        .await;

        assert_eq!(result.failed, 0);
        let link = &records[0].links[0];
        assert_eq!(link.details.len(), 1);
        assert_eq!(link.details[0].key, "quantity");
        assert_eq!(link.details[0].value, "2.5");
        // 链接类型 77 不存在，对应列被跳过
        assert!(records[0].links.iter().all(|l| l.link_type != 77));
    }

    #[tokio::test]
    async fn test_combobox_side_detail_and_rejection() {
        let (result, records) = run(&[
            &[(ID_COLUMN, "0"), ("color", "rood")],
            &[(ID_COLUMN, "0"), ("color", "Groen")],
        ])
        .await;

        assert_eq!(records[0].detail("color").map(|d| d.value.as_str()), Some("1"));
        assert_eq!(
            records[0].detail("color_input").map(|d| d.value.as_str()),
            Some("Rood")
        );

        assert_eq!(result.failed, 1);
        assert!(records[1].detail("color").is_none());
        assert!(result.user_friendly_errors[0].contains("Kleur"));
        assert!(result.user_friendly_errors[0].contains("Groen"));
    }

    #[tokio::test]
    async fn test_image_field_becomes_attachment() {
        let (result, records) = run(&[
            &[(ID_COLUMN, "15"), ("photo", "images\\Front.JPG")],
            &[(ID_COLUMN, "0"), ("photo", "back.png")],
        ])
        .await;

        assert_eq!(result.failed, 0);
        let update = &records[0].files[0];
        assert_eq!(update.file_name, "Front.JPG");
        assert_eq!(update.extension, "jpg");
        assert_eq!(update.existing_file_id, Some(90));
        assert!(records[0].detail("photo").is_none());

        let created = &records[1].files[0];
        assert_eq!(created.item_id, 0);
        assert_eq!(created.existing_file_id, None);
    }

    #[tokio::test]
    async fn test_bad_attachment_path_is_row_failure() {
        let (result, records) = run(&[&[(ID_COLUMN, "0"), ("photo", "images/")]]).await;

        assert_eq!(result.items_total, 1);
        assert_eq!(result.successful, 0);
        assert_eq!(result.items_created, 0);
        assert_eq!(result.failed, 1);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            split_file_name("a/b/c.tar.GZ"),
            Some(("c.tar.GZ".to_string(), "gz".to_string()))
        );
        assert_eq!(split_file_name("README"), Some(("README".to_string(), String::new())));
        assert_eq!(split_file_name("dir\\"), None);
    }
}
