// ==========================================
// 内容管理平台 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use std::error::Error;
use std::path::PathBuf;

/// 配置读取错误
pub type ConfigError = Box<dyn Error + Send + Sync>;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管道所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取单个文件最多读取的数据行数
    ///
    /// # 默认值
    /// - 1000000
    async fn get_max_rows(&self) -> Result<usize, ConfigError>;

    /// 获取用户错误信息的语言
    ///
    /// # 默认值
    /// - nl
    async fn get_user_locale(&self) -> Result<String, ConfigError>;

    /// 获取附件压缩包的解压根目录（按任务 id 建子目录）
    ///
    /// # 默认值
    /// - import_staging
    async fn get_staging_dir(&self) -> Result<PathBuf, ConfigError>;

    /// 获取主 item 表的表名前缀（附件目标 id 在主表中校验）
    ///
    /// # 默认值
    /// - 空字符串
    async fn get_primary_table_prefix(&self) -> Result<String, ConfigError>;
}
