// ==========================================
// 内容管理平台 - 导入记录模型
// ==========================================
// 职责: 每个有效行生成一条 ImportRecord（item + 字段 + 链接 + 附件）
// 用途: 序列化为任务负载，交由下游 worker 执行
// 序列化: PascalCase，省略空值/默认值
// ==========================================

use serde::{Deserialize, Serialize};

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

fn is_zero_i32(v: &i32) -> bool {
    *v == 0
}

fn is_false(v: &bool) -> bool {
    !*v
}

// ==========================================
// Item - 目标 item
// ==========================================
// id = 0 表示新建，非 0 表示更新已有 item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub id: u64,
    pub entity_type: String,
    #[serde(skip_serializing_if = "is_zero_i32", default)]
    pub module_id: i32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_item_id: Option<u64>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub added_by: String,
}

impl Item {
    pub fn is_new(&self) -> bool {
        self.id == 0
    }
}

// ==========================================
// ItemDetail - 字段值
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemDetail {
    pub key: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub language_code: String,
    pub value: String,
}

// ==========================================
// ItemLink - item 链接
// ==========================================
// 红线: item_id != destination_item_id（禁止自链接）
// 唯一: 同一记录内 (item_id, destination_item_id, link_type) 唯一
// 约定: id = 0 指代当前正在创建的 item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemLink {
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub item_id: u64,
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub destination_item_id: u64,
    pub link_type: i32,
    #[serde(skip_serializing_if = "is_false", default)]
    pub delete_existing_links: bool,
    #[serde(skip_serializing_if = "is_false", default)]
    pub use_parent_item_id: bool,
    /// 链接字段（与 item 字段是不同的命名空间）
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub details: Vec<ItemDetail>,
}

impl ItemLink {
    pub fn new(item_id: u64, destination_item_id: u64, link_type: i32) -> Self {
        Self {
            item_id,
            destination_item_id,
            link_type,
            delete_existing_links: false,
            use_parent_item_id: false,
            details: Vec::new(),
        }
    }

    pub fn is_self_link(&self) -> bool {
        self.item_id == self.destination_item_id
    }

    pub fn same_triple(&self, other: &ItemLink) -> bool {
        self.item_id == other.item_id
            && self.destination_item_id == other.destination_item_id
            && self.link_type == other.link_type
    }
}

// ==========================================
// FileAttachment - 附件请求
// ==========================================
// source_path 为文件包内的相对路径
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileAttachment {
    #[serde(skip_serializing_if = "is_zero_u64", default)]
    pub item_id: u64,
    pub property_name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub language_code: String,
    pub source_path: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub extension: String,
    #[serde(skip_serializing_if = "is_false", default)]
    pub allow_multiple: bool,
    /// 覆盖已有附件时的附件 id
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub existing_file_id: Option<u64>,
    /// 非 0 时附件属于该链接类型的链接
    #[serde(skip_serializing_if = "is_zero_i32", default)]
    pub link_type: i32,
}

// ==========================================
// PendingAttachment - 待构建的附件请求
// ==========================================
// 生命周期: 行处理期间（Pass A/B 入队，行末统一构建）
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAttachment {
    pub property_name: String,
    pub language_code: String,
    pub raw_value: String,
    pub allow_multiple: bool,
    pub link_type: i32,
}

// ==========================================
// ImportRecord - 导入记录
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImportRecord {
    pub item: Item,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub details: Vec<ItemDetail>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub links: Vec<ItemLink>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub files: Vec<FileAttachment>,
    /// 原始文件行号（仅用于诊断）
    #[serde(skip)]
    pub row_number: usize,
    #[serde(skip)]
    pub pending_files: Vec<PendingAttachment>,
}

impl ImportRecord {
    pub fn new(item: Item, row_number: usize) -> Self {
        Self {
            item,
            row_number,
            ..Default::default()
        }
    }

    /// 写入字段值（同 key + 语言覆盖旧值）
    pub fn set_detail(&mut self, key: &str, language_code: &str, value: String) {
        upsert_detail(&mut self.details, key, language_code, value);
    }

    pub fn detail(&self, key: &str) -> Option<&ItemDetail> {
        self.details.iter().find(|d| d.key == key)
    }

    /// 添加链接（拒绝自链接与重复三元组）
    ///
    /// # 返回
    /// - true: 已添加
    /// - false: 自链接或重复，已丢弃
    pub fn add_link(&mut self, link: ItemLink) -> bool {
        if link.is_self_link() {
            return false;
        }
        if self.links.iter().any(|existing| existing.same_triple(&link)) {
            return false;
        }
        self.links.push(link);
        true
    }

    /// 查找链接类型匹配的第一个链接
    pub fn link_mut(&mut self, link_type: i32) -> Option<&mut ItemLink> {
        self.links.iter_mut().find(|l| l.link_type == link_type)
    }
}

pub(crate) fn upsert_detail(details: &mut Vec<ItemDetail>, key: &str, language_code: &str, value: String) {
    if let Some(existing) = details
        .iter_mut()
        .find(|d| d.key == key && d.language_code == language_code)
    {
        existing.value = value;
        return;
    }
    details.push(ItemDetail {
        key: key.to_string(),
        language_code: language_code.to_string(),
        value,
    });
}
