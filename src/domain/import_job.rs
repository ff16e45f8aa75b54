// ==========================================
// 内容管理平台 - 导入任务请求模型
// ==========================================
// 职责: 导入请求（只读输入）+ 列映射 + 操作人
// 红线: 映射按列名与表头精确匹配（区分大小写）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ==========================================
// ImportJobRequest - 导入任务请求
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportJobRequest {
    pub file_path: PathBuf,                         // 上传后的数据文件路径（.csv/.xlsx/.xls）
    pub entity_type: String,                        // 目标实体类型（空 = 不限定）
    pub module_id: i32,                             // 目标模块
    pub job_name: Option<String>,                   // 任务名称（空时自动生成）
    pub item_mappings: Vec<FieldMapping>,           // item 字段列映射
    pub link_mappings: Vec<LinkMapping>,            // 链接列映射
    pub link_detail_mappings: Vec<LinkDetailMapping>, // 链接字段列映射
    pub file_bundle_path: Option<PathBuf>,          // 附件压缩包（可选）
    pub scheduled_start: Option<DateTime<Utc>>,     // 计划开始时间（默认当前时间）
}

impl ImportJobRequest {
    /// 是否指定了目标实体类型
    pub fn has_entity_type(&self) -> bool {
        !self.entity_type.trim().is_empty()
    }
}

// ==========================================
// FieldMapping - item 字段列映射
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldMapping {
    pub column: String,          // 文件列名
    pub property_name: String,   // 目标属性名
    pub language_code: String,   // 语言代码
    pub is_image_field: bool,    // 图片字段（转为附件请求）
    pub allow_multiple: bool,    // 图片字段允许多个文件
}

// ==========================================
// LinkMapping - 链接列映射
// ==========================================
// 单元格内容为逗号分隔的 item id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkMapping {
    pub column: String,
    pub link_type: i32,
    /// true: 当前行 → 单元格 id（当前行为 ItemId，单元格值为 DestinationItemId）
    /// false: 单元格 id → 当前行
    pub link_is_destination: bool,
    pub delete_existing_links: bool,
}

// ==========================================
// LinkDetailMapping - 链接字段列映射
// ==========================================
// 写入同一行中已创建的、链接类型相同的链接
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkDetailMapping {
    pub column: String,
    pub link_type: i32,
    pub property_name: String,
    pub language_code: String,
    pub is_image_field: bool,
    pub allow_multiple: bool,
}

// ==========================================
// ImportActor - 操作人
// ==========================================
// 来源: 身份服务（外部协作者）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportActor {
    pub id: u64,
    pub name: String,
    pub tenant_id: i32,
}

impl ImportActor {
    pub fn new(id: u64, name: &str, tenant_id: i32) -> Self {
        Self {
            id,
            name: name.to_string(),
            tenant_id,
        }
    }
}
