use super::core::SqliteStore;
use crate::domain::field::{FieldDefinition, LinkTypeRule};
use crate::domain::types::{FieldScope, InputType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::metadata_repo::{MetadataRepository, NamedListResolver};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value as JsonValue;
use tracing::warn;

/// 命名列表: 操作员目录
pub const OPERATORS_LIST: &str = "operators";

fn parse_options(property_name: &str, raw: Option<String>) -> JsonValue {
    match raw.as_deref().map(str::trim) {
        None | Some("") => JsonValue::Null,
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            // 选项格式错误不阻断导入，按无选项处理
            warn!(property = %property_name, error = %e, "字段选项不是合法 JSON");
            JsonValue::Null
        }),
    }
}

fn map_field_row(row: &Row<'_>, scope: FieldScope) -> rusqlite::Result<FieldDefinition> {
    let property_name: String = row.get(0)?;
    let options: Option<String> = row.get(4)?;
    let input_type: String = row.get(3)?;
    let data_query: Option<String> = row.get(5)?;

    Ok(FieldDefinition {
        display_name: row.get(1)?,
        language_code: row.get(2)?,
        input_type: InputType::parse(&input_type),
        options: parse_options(&property_name, options),
        data_query: data_query.filter(|q| !q.trim().is_empty()),
        property_name,
        scope,
    })
}

#[async_trait]
impl MetadataRepository for SqliteStore {
    async fn get_field_definitions(&self, entity_type: &str) -> RepositoryResult<Vec<FieldDefinition>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT property_name, display_name, language_code, input_type, options, data_query
            FROM entity_property
            WHERE entity_type = ?1 AND link_type = 0
            ORDER BY ordering, id
            "#,
        )?;

        let fields = stmt
            .query_map(params![entity_type], |row| map_field_row(row, FieldScope::Item))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(fields)
    }

    async fn get_link_field_definitions(&self, link_type: i32) -> RepositoryResult<Vec<FieldDefinition>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT property_name, display_name, language_code, input_type, options, data_query
            FROM entity_property
            WHERE link_type = ?1
            ORDER BY ordering, id
            "#,
        )?;

        let fields = stmt
            .query_map(params![link_type], |row| {
                map_field_row(row, FieldScope::Link(link_type))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(fields)
    }

    async fn get_link_type_rules(&self) -> RepositoryResult<Vec<LinkTypeRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT type, source_entity_type, destination_entity_type, use_parent_item_id
            FROM link_setting
            ORDER BY id
            "#,
        )?;

        let rules = stmt
            .query_map([], |row| {
                Ok(LinkTypeRule {
                    link_type: row.get(0)?,
                    source_entity_type: row.get(1)?,
                    destination_entity_type: row.get(2)?,
                    use_parent_item_id: row.get::<_, i32>(3)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rules)
    }

    async fn get_table_prefix(&self, entity_type: &str) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let prefix: Option<String> = conn
            .query_row(
                "SELECT table_prefix FROM entity_type WHERE name = ?1",
                params![entity_type],
                |row| row.get(0),
            )
            .optional()?;

        Ok(prefix.unwrap_or_default())
    }
}

#[async_trait]
impl NamedListResolver for SqliteStore {
    async fn resolve_list(&self, list_name: &str) -> RepositoryResult<Vec<(String, String)>> {
        if !list_name.eq_ignore_ascii_case(OPERATORS_LIST) {
            return Err(RepositoryError::UnknownNamedList(list_name.to_string()));
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM operator ORDER BY name, id")?;
        let values = stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?.to_string(), row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(values)
    }
}
