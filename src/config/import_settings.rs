// ==========================================
// 内容管理平台 - 导入参数快照
// ==========================================
// 职责: 单次导入运行使用的配置值（运行开始前一次性读取）
// ==========================================

use crate::config::import_config_trait::{ConfigError, ImportConfigReader};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 默认值
pub mod defaults {
    pub const MAX_ROWS: usize = 1_000_000;
    pub const USER_LOCALE: &str = "nl";
    pub const STAGING_DIR: &str = "import_staging";
    pub const PRIMARY_TABLE_PREFIX: &str = "";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub max_rows: usize,
    pub user_locale: String,
    pub staging_dir: PathBuf,
    pub primary_table_prefix: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_rows: defaults::MAX_ROWS,
            user_locale: defaults::USER_LOCALE.to_string(),
            staging_dir: PathBuf::from(defaults::STAGING_DIR),
            primary_table_prefix: defaults::PRIMARY_TABLE_PREFIX.to_string(),
        }
    }
}

impl ImportSettings {
    /// 从配置读取器加载全部导入参数
    pub async fn load(reader: &dyn ImportConfigReader) -> Result<Self, ConfigError> {
        Ok(Self {
            max_rows: reader.get_max_rows().await?,
            user_locale: reader.get_user_locale().await?,
            staging_dir: reader.get_staging_dir().await?,
            primary_table_prefix: reader.get_primary_table_prefix().await?,
        })
    }

    /// 覆盖单次运行的最大行数
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// 覆盖附件解压目录
    pub fn with_staging_dir(mut self, staging_dir: PathBuf) -> Self {
        self.staging_dir = staging_dir;
        self
    }
}
