// ==========================================
// 内容管理平台 - 领域类型定义
// ==========================================
// 职责: 字段输入类型、字段作用域、日期子类型
// 说明: 字段定义是运行时数据，输入类型在此收敛为有限枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 输入类型 (Input Type)
// ==========================================
// 来源: entity_property.input_type（字符串，大小写不敏感）
// 未识别的类型保留原始字符串，按普通文本透传
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputType {
    // ===== 导入时一律拒绝 =====
    SecureInput,
    FileUpload,
    QueryBuilder,
    Button,
    ImageUpload,
    ItemLinker,
    AutoIncrement,
    LinkedItem,
    ActionButton,
    Chart,
    Scheduler,
    Timeline,
    Empty,

    // ===== 需要转换/校验 =====
    Checkbox,
    NumericInput,
    DateTimePicker,

    // ===== 受限取值 (ComboBox 解析) =====
    ComboBox,
    MultiSelect,
    RadioButton,

    // ===== 透传 =====
    Input,
    TextBox,
    HtmlEditor,
    Other(String),
}

impl InputType {
    /// 从数据库字符串解析输入类型
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "secure-input" => InputType::SecureInput,
            "file-upload" | "fileupload" => InputType::FileUpload,
            "querybuilder" | "query-builder" => InputType::QueryBuilder,
            "button" => InputType::Button,
            "image-upload" | "imageupload" => InputType::ImageUpload,
            "item-linker" | "itemlinker" => InputType::ItemLinker,
            "auto-increment" | "autoincrement" => InputType::AutoIncrement,
            "linked-item" | "linkeditem" => InputType::LinkedItem,
            "action-button" | "actionbutton" => InputType::ActionButton,
            "chart" => InputType::Chart,
            "scheduler" => InputType::Scheduler,
            "timeline" => InputType::Timeline,
            "empty" => InputType::Empty,
            "checkbox" => InputType::Checkbox,
            "numeric-input" | "numericinput" => InputType::NumericInput,
            "date-time-picker" | "datetimepicker" | "date-time" => InputType::DateTimePicker,
            "combobox" => InputType::ComboBox,
            "multiselect" | "multi-select" => InputType::MultiSelect,
            "radiobutton" | "radio-button" => InputType::RadioButton,
            "input" | "" => InputType::Input,
            "textbox" => InputType::TextBox,
            "htmleditor" | "html-editor" => InputType::HtmlEditor,
            _ => InputType::Other(raw.trim().to_string()),
        }
    }

    /// 是否为受限取值字段（需要 ComboBox 解析）
    pub fn is_constrained(&self) -> bool {
        matches!(
            self,
            InputType::ComboBox | InputType::MultiSelect | InputType::RadioButton
        )
    }

    /// 是否为导入不支持的字段类型
    pub fn is_rejected_on_import(&self) -> bool {
        matches!(
            self,
            InputType::SecureInput
                | InputType::FileUpload
                | InputType::QueryBuilder
                | InputType::Button
                | InputType::ImageUpload
                | InputType::ItemLinker
                | InputType::AutoIncrement
                | InputType::LinkedItem
                | InputType::ActionButton
                | InputType::Chart
                | InputType::Scheduler
                | InputType::Timeline
                | InputType::Empty
        )
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputType::SecureInput => "secure-input",
            InputType::FileUpload => "file-upload",
            InputType::QueryBuilder => "querybuilder",
            InputType::Button => "button",
            InputType::ImageUpload => "image-upload",
            InputType::ItemLinker => "item-linker",
            InputType::AutoIncrement => "auto-increment",
            InputType::LinkedItem => "linked-item",
            InputType::ActionButton => "action-button",
            InputType::Chart => "chart",
            InputType::Scheduler => "scheduler",
            InputType::Timeline => "timeline",
            InputType::Empty => "empty",
            InputType::Checkbox => "checkbox",
            InputType::NumericInput => "numeric-input",
            InputType::DateTimePicker => "date-time picker",
            InputType::ComboBox => "combobox",
            InputType::MultiSelect => "multiselect",
            InputType::RadioButton => "radiobutton",
            InputType::Input => "input",
            InputType::TextBox => "textbox",
            InputType::HtmlEditor => "htmleditor",
            InputType::Other(raw) => raw.as_str(),
        };
        write!(f, "{}", name)
    }
}

// ==========================================
// 字段作用域 (Field Scope)
// ==========================================
// 同一属性名在 item 作用域与各 link_type 作用域下互不冲突
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldScope {
    Item,
    Link(i32),
}

impl fmt::Display for FieldScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldScope::Item => write!(f, "item"),
            FieldScope::Link(link_type) => write!(f, "link:{}", link_type),
        }
    }
}

// ==========================================
// 日期时间子类型 (DateTime Kind)
// ==========================================
// 来源: date-time picker 字段 options.type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateTimeKind {
    Date,
    Time,
    DateTime,
}

impl DateTimeKind {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("date") => DateTimeKind::Date,
            Some("time") => DateTimeKind::Time,
            _ => DateTimeKind::DateTime,
        }
    }

    /// 输出格式（不依赖区域设置）
    pub fn output_format(&self) -> &'static str {
        match self {
            DateTimeKind::Date => "%Y-%m-%d",
            DateTimeKind::Time => "%H:%M:%S",
            DateTimeKind::DateTime => "%Y-%m-%d %H:%M:%S",
        }
    }
}
