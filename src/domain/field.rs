// ==========================================
// 内容管理平台 - 字段定义领域模型
// ==========================================
// 职责: 动态字段定义、ComboBox 定义、链接类型规则
// 说明: 字段定义来源于 entity_property 表，按实体类型/链接类型区分作用域
// ==========================================

use crate::domain::types::{DateTimeKind, FieldScope, InputType};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

// ==========================================
// FieldDefinition - 字段定义
// ==========================================
// 唯一键: (property_name, language_code)，在同一作用域内唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub property_name: String,         // 属性名
    pub display_name: String,          // 显示名（用于用户错误信息）
    pub language_code: String,         // 语言代码（空字符串 = 不区分语言）
    pub input_type: InputType,         // 输入类型
    pub options: JsonValue,            // 字段选项（结构化数据）
    pub data_query: Option<String>,    // 自定义数据查询（ComboBox 数据源）
    pub scope: FieldScope,             // 作用域（item / link_type）
}

impl FieldDefinition {
    /// 创建一个最简字段定义（未配置的映射字段使用）
    pub fn passthrough(property_name: &str, language_code: &str, scope: FieldScope) -> Self {
        Self {
            property_name: property_name.to_string(),
            display_name: property_name.to_string(),
            language_code: language_code.to_string(),
            input_type: InputType::Input,
            options: JsonValue::Null,
            data_query: None,
            scope,
        }
    }

    /// 用户可读名称（显示名为空时回退为属性名）
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.property_name
        } else {
            &self.display_name
        }
    }

    /// 读取字符串选项
    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// date-time picker 的子类型
    pub fn datetime_kind(&self) -> DateTimeKind {
        DateTimeKind::parse(self.option_str("type"))
    }

    /// 缓存键: (小写属性名, 语言代码)
    pub fn cache_key(&self) -> (String, String) {
        (self.property_name.to_lowercase(), self.language_code.clone())
    }
}

// ==========================================
// ComboBoxOptions - ComboBox 字段选项
// ==========================================
// 来源: FieldDefinition.options（JSON，camelCase）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComboBoxOptions {
    /// 数据源 (a): 实体类型，取该类型全部已发布 item（id → title）
    pub entity_type: Option<String>,
    /// 数据源 (b): 自定义查询的代码列 / 文本列
    pub value_field_name: Option<String>,
    pub text_field_name: Option<String>,
    /// 数据源 (c): 内嵌列表
    pub data_source: Option<Vec<ComboBoxLiteral>>,
    /// 数据源 (d): 系统命名列表（如 operators）
    pub system_list: Option<String>,

    /// 将解析出的代码保存为 item 链接，而非字段值
    pub save_value_as_item_link: bool,
    /// 当前 item 作为链接的目标端
    pub current_item_is_destination_id: bool,
    /// 链接类型编号
    pub link_type_number: i32,
}

/// 内嵌列表条目（id 可为数字或字符串）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboBoxLiteral {
    pub id: JsonValue,
    pub name: String,
}

impl ComboBoxLiteral {
    pub fn code(&self) -> String {
        match &self.id {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

// ==========================================
// ComboBoxSource - 数据源描述（按优先级取唯一一个）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComboBoxSource {
    EntityType(String),
    DataQuery {
        query: String,
        value_column: String,
        text_column: String,
    },
    Literal(Vec<(String, String)>),
    SystemList(String),
    None,
}

// ==========================================
// ComboBoxDefinition - ComboBox 定义
// ==========================================
// 生命周期: 单次导入任务内，值表只加载一次
#[derive(Debug, Clone)]
pub struct ComboBoxDefinition {
    pub property_name: String,
    pub display_name: String,
    pub source: ComboBoxSource,
    pub options: ComboBoxOptions,
    /// 代码 → 显示文本（None = 尚未加载）
    pub values: Option<Vec<(String, String)>>,
}

impl ComboBoxDefinition {
    /// 从字段定义构建 ComboBox 定义
    ///
    /// # 数据源优先级
    /// 1. options.entityType
    /// 2. data_query（列名取 valueFieldName/textFieldName，默认 id/name）
    /// 3. options.dataSource
    /// 4. options.systemList
    pub fn from_field(field: &FieldDefinition) -> Self {
        let options: ComboBoxOptions = if field.options.is_null() {
            ComboBoxOptions::default()
        } else {
            serde_json::from_value(field.options.clone()).unwrap_or_else(|e| {
                tracing::warn!(
                    property = %field.property_name,
                    error = %e,
                    "ComboBox 选项格式错误，使用默认选项"
                );
                ComboBoxOptions::default()
            })
        };

        let non_empty = |v: &Option<String>| {
            v.as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let source = if let Some(entity_type) = non_empty(&options.entity_type) {
            ComboBoxSource::EntityType(entity_type)
        } else if let Some(query) = non_empty(&field.data_query) {
            ComboBoxSource::DataQuery {
                query,
                value_column: non_empty(&options.value_field_name)
                    .unwrap_or_else(|| "id".to_string()),
                text_column: non_empty(&options.text_field_name)
                    .unwrap_or_else(|| "name".to_string()),
            }
        } else if let Some(list) = options.data_source.as_ref().filter(|l| !l.is_empty()) {
            ComboBoxSource::Literal(list.iter().map(|e| (e.code(), e.name.clone())).collect())
        } else if let Some(name) = non_empty(&options.system_list) {
            ComboBoxSource::SystemList(name)
        } else {
            ComboBoxSource::None
        };

        Self {
            property_name: field.property_name.clone(),
            display_name: field.label().to_string(),
            source,
            options,
            values: None,
        }
    }
}

// ==========================================
// LinkTypeRule - 链接类型规则
// ==========================================
// 来源: link_setting 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkTypeRule {
    pub link_type: i32,
    pub source_entity_type: String,
    pub destination_entity_type: String,
    /// 以 parent 指针（item.parent_item_id）存储，而非独立链接行
    pub use_parent_item_id: bool,
}

/// 单一作用域的字段定义表
pub type FieldTable = HashMap<(String, String), FieldDefinition>;
