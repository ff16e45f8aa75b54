// ==========================================
// 内容管理平台 - 元数据 Repository Trait
// ==========================================
// 职责: 定义字段定义 / 链接规则 / 表前缀 / 命名列表的读取接口
// 红线: Repository 不含业务规则，只做数据读取
// ==========================================

use crate::domain::field::{FieldDefinition, LinkTypeRule};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// MetadataRepository Trait
// ==========================================
// 实现者: SqliteStore
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// 读取实体类型的 item 字段定义
    async fn get_field_definitions(&self, entity_type: &str) -> RepositoryResult<Vec<FieldDefinition>>;

    /// 读取链接类型的链接字段定义
    async fn get_link_field_definitions(&self, link_type: i32) -> RepositoryResult<Vec<FieldDefinition>>;

    /// 读取全部链接类型规则
    async fn get_link_type_rules(&self) -> RepositoryResult<Vec<LinkTypeRule>>;

    /// 读取实体类型的表名前缀
    ///
    /// # 返回
    /// - 未配置专用表的实体类型返回空字符串（主表）
    async fn get_table_prefix(&self, entity_type: &str) -> RepositoryResult<String>;
}

// ==========================================
// NamedListResolver Trait
// ==========================================
// 用途: ComboBox 静态数据源（如操作员目录）
// 实现者: SqliteStore
#[async_trait]
pub trait NamedListResolver: Send + Sync {
    /// 读取命名列表
    ///
    /// # 返回
    /// - Vec<(代码, 显示文本)>
    async fn resolve_list(&self, list_name: &str) -> RepositoryResult<Vec<(String, String)>>;
}
