// ==========================================
// 内容管理平台 - 引用完整性检查
// ==========================================
// 职责: 任务级一次性检查所有被引用的 item id
//   1. 行 id 的实体类型
//   2. 链接类型规则（方向兼容性 + parent 指针提升）
//   3. 按表前缀分组批量确认存在性
//   4. 附件目标 id（主表）
//   5. 汇总缺失 id（一条错误）
// 红线: 只在行处理阶段零失败时执行
// ==========================================

use crate::db::item_table_name;
use crate::domain::field::LinkTypeRule;
use crate::domain::import_record::{ImportRecord, ItemLink};
use crate::importer::context::ImportContext;
use crate::importer::error::ImporterResult;
use crate::repository::metadata_repo::MetadataRepository;
use crate::repository::query_executor::{inline_id_list, row_u64, QueryExecutor};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

/// 未知实体类型的占位显示
const UNKNOWN_TYPE: &str = "?";

/// 按表前缀分组的 id 集合
type IdsByPrefix = BTreeMap<String, BTreeSet<u64>>;

pub struct IntegrityChecker<'a> {
    metadata: &'a dyn MetadataRepository,
    query: &'a dyn QueryExecutor,
}

impl<'a> IntegrityChecker<'a> {
    pub fn new(metadata: &'a dyn MetadataRepository, query: &'a dyn QueryExecutor) -> Self {
        Self { metadata, query }
    }

    /// 执行完整性检查
    ///
    /// # 返回
    /// - Ok(()): 检查完成（发现的问题已记录到 ctx.result）
    /// - Err: 存储访问失败，检查无法完成
    pub async fn check(&self, ctx: &mut ImportContext<'_>) -> ImporterResult<()> {
        let mut records = std::mem::take(&mut ctx.records);
        let outcome = self.check_records(ctx, &mut records).await;
        ctx.records = records;
        outcome
    }

    async fn check_records(
        &self,
        ctx: &mut ImportContext<'_>,
        records: &mut [ImportRecord],
    ) -> ImporterResult<()> {
        let primary_prefix = ctx.settings.primary_table_prefix.clone();
        let mut expected = IdsByPrefix::new();
        let mut found: HashMap<String, HashSet<u64>> = HashMap::new();

        // === 步骤 1: 行 id 与实体类型 ===
        debug!("完整性检查 步骤 1: 行 id");
        let direct_ids: BTreeSet<u64> = records
            .iter()
            .map(|r| r.item.id)
            .filter(|id| *id != 0)
            .collect();

        let direct_prefix = if ctx.request.has_entity_type() {
            let entity_type = ctx.request.entity_type.clone();
            ctx.table_prefix(self.metadata, &entity_type).await?
        } else {
            primary_prefix.clone()
        };

        if !direct_ids.is_empty() {
            let types = self.fetch_entity_types(&direct_prefix, &direct_ids).await?;

            if ctx.request.has_entity_type() {
                let wrong: Vec<String> = types
                    .iter()
                    .filter(|(_, actual)| !actual.eq_ignore_ascii_case(&ctx.request.entity_type))
                    .map(|(id, actual)| format!("{} ({})", id, actual))
                    .collect();

                if !wrong.is_empty() {
                    let entity_type = ctx.request.entity_type.clone();
                    let items = wrong.join(", ");
                    ctx.fail(
                        "integrity.wrong_entity_type",
                        &[
                            ("entity_type", entity_type.as_str()),
                            ("items", items.as_str()),
                        ],
                    );
                }
            }

            found
                .entry(direct_prefix.clone())
                .or_default()
                .extend(types.keys().copied());
            expected
                .entry(direct_prefix.clone())
                .or_default()
                .extend(direct_ids.iter().copied());
        }

        // === 步骤 2: 链接类型规则 ===
        debug!("完整性检查 步骤 2: 链接规则");
        let has_links = records.iter().any(|r| !r.links.is_empty());
        let rules = if has_links {
            self.metadata.get_link_type_rules().await?
        } else {
            Vec::new()
        };

        for record in records.iter_mut() {
            self.check_links(ctx, record, &rules, &primary_prefix, &mut expected)
                .await?;
        }

        // === 步骤 3: 按表批量确认存在性 ===
        debug!(tables = expected.len(), "完整性检查 步骤 3: 存在性");
        for (prefix, ids) in &expected {
            let known = found.entry(prefix.clone()).or_default();
            let unknown = unconfirmed_ids(ids, known);
            if unknown.is_empty() {
                continue;
            }
            let existing = self.existing_ids(prefix, &unknown).await?;
            known.extend(existing);
        }

        // === 步骤 4: 附件目标 id ===
        debug!("完整性检查 步骤 4: 附件目标");
        let file_targets: BTreeSet<u64> = records
            .iter()
            .flat_map(|r| r.files.iter())
            .map(|f| f.item_id)
            .filter(|id| *id != 0)
            .filter(|id| !found.values().any(|known| known.contains(id)))
            .collect();

        if !file_targets.is_empty() {
            let existing = self.existing_ids(&primary_prefix, &file_targets).await?;
            found.entry(primary_prefix.clone()).or_default().extend(existing);
            expected
                .entry(primary_prefix.clone())
                .or_default()
                .extend(file_targets);
        }

        // === 步骤 5: 汇总缺失 id ===
        let missing: BTreeSet<u64> = expected
            .iter()
            .flat_map(|(prefix, ids)| {
                let known = found.get(prefix);
                ids.iter()
                    .filter(move |id| !known.is_some_and(|k| k.contains(*id)))
                    .copied()
            })
            .collect();

        if !missing.is_empty() {
            let ids = missing
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            ctx.fail("integrity.missing_items", &[("ids", ids.as_str())]);
        }

        info!(
            checked_tables = expected.len(),
            missing = missing.len(),
            failed = ctx.failed(),
            "完整性检查完成"
        );
        Ok(())
    }

    /// 检查一条记录的全部链接，并按规则执行 parent 指针提升
    async fn check_links(
        &self,
        ctx: &mut ImportContext<'_>,
        record: &mut ImportRecord,
        rules: &[LinkTypeRule],
        primary_prefix: &str,
        expected: &mut IdsByPrefix,
    ) -> ImporterResult<()> {
        let current_type = ctx.request.entity_type.clone();
        let current_id = record.item.id;
        let links: Vec<ItemLink> = std::mem::take(&mut record.links);

        for mut link in links {
            let current_is_source = link.item_id == current_id;
            let other_id = if current_is_source {
                link.destination_item_id
            } else {
                link.item_id
            };

            let rule = rules.iter().find(|rule| {
                rule.link_type == link.link_type
                    && (current_type.is_empty()
                        || if current_is_source {
                            rule.source_entity_type.eq_ignore_ascii_case(&current_type)
                        } else {
                            rule.destination_entity_type.eq_ignore_ascii_case(&current_type)
                        })
            });

            let Some(rule) = rule else {
                let (source, destination) =
                    describe_sides(rules, &link, current_is_source, &current_type);
                let row = record.row_number.to_string();
                let link_type = link.link_type.to_string();
                ctx.fail(
                    "integrity.link_not_allowed",
                    &[
                        ("row", row.as_str()),
                        ("link_type", link_type.as_str()),
                        ("source", source.as_str()),
                        ("destination", destination.as_str()),
                    ],
                );
                if other_id != 0 {
                    expected
                        .entry(primary_prefix.to_string())
                        .or_default()
                        .insert(other_id);
                }
                record.links.push(link);
                continue;
            };

            if other_id != 0 {
                let other_type = if current_is_source {
                    &rule.destination_entity_type
                } else {
                    &rule.source_entity_type
                };
                let prefix = ctx.table_prefix(self.metadata, other_type).await?;
                expected.entry(prefix).or_default().insert(other_id);
            }

            if rule.use_parent_item_id {
                // 当前记录为子项且链接无明细时，只保留 parent 指针
                if current_is_source && link.details.is_empty() {
                    debug!(row = record.row_number, parent = other_id, "链接提升为 parent 指针");
                    record.item.parent_item_id = Some(other_id);
                    continue;
                }
                link.use_parent_item_id = true;
            }

            record.links.push(link);
        }

        Ok(())
    }

    /// 批量读取 id → 实体类型
    async fn fetch_entity_types(
        &self,
        prefix: &str,
        ids: &BTreeSet<u64>,
    ) -> ImporterResult<BTreeMap<u64, String>> {
        let sql = format!(
            "SELECT id, entity_type FROM {} WHERE id IN ({})",
            item_table_name(prefix)?,
            inline_id_list(ids)
        );
        let rows = self.query.query(&sql, &[]).await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let id = row_u64(row, "id")?;
                Some((id, row.get("entity_type").cloned().unwrap_or_default()))
            })
            .collect())
    }

    /// 批量确认 id 存在
    async fn existing_ids(&self, prefix: &str, ids: &BTreeSet<u64>) -> ImporterResult<HashSet<u64>> {
        let sql = format!(
            "SELECT id FROM {} WHERE id IN ({})",
            item_table_name(prefix)?,
            inline_id_list(ids)
        );
        let rows = self.query.query(&sql, &[]).await?;

        Ok(rows.iter().filter_map(|row| row_u64(row, "id")).collect())
    }
}

/// 错误信息中的两端实体类型（当前端取任务实体类型，另一端取该链接类型规则中声明的类型）
fn describe_sides(
    rules: &[LinkTypeRule],
    link: &ItemLink,
    current_is_source: bool,
    current_type: &str,
) -> (String, String) {
    let current = if current_type.is_empty() {
        UNKNOWN_TYPE.to_string()
    } else {
        current_type.to_string()
    };

    let declared: BTreeSet<&str> = rules
        .iter()
        .filter(|r| r.link_type == link.link_type)
        .map(|r| {
            if current_is_source {
                r.destination_entity_type.as_str()
            } else {
                r.source_entity_type.as_str()
            }
        })
        .collect();
    let other = if declared.is_empty() {
        UNKNOWN_TYPE.to_string()
    } else {
        declared.into_iter().collect::<Vec<_>>().join("/")
    };

    if current_is_source {
        (current, other)
    } else {
        (other, current)
    }
}

/// 尚未确认存在的 id（按升序，便于生成稳定的 SQL）
fn unconfirmed_ids(expected: &BTreeSet<u64>, known: &HashSet<u64>) -> BTreeSet<u64> {
    expected
        .iter()
        .filter(|id| !known.contains(id))
        .copied()
        .collect()
}
