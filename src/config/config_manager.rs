// ==========================================
// 内容管理平台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ConfigError, ImportConfigReader};
use crate::config::import_settings::defaults;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }
}

#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_rows(&self) -> Result<usize, ConfigError> {
        let value = self.get_config_or_default(
            config_keys::IMPORT_MAX_ROWS,
            &defaults::MAX_ROWS.to_string(),
        )?;

        match value.parse::<usize>() {
            Ok(rows) if rows > 0 => Ok(rows),
            _ => {
                warn!(value = %value, "import_max_rows 配置无效，使用默认值");
                Ok(defaults::MAX_ROWS)
            }
        }
    }

    async fn get_user_locale(&self) -> Result<String, ConfigError> {
        let value = self.get_config_or_default(config_keys::IMPORT_USER_LOCALE, defaults::USER_LOCALE)?;
        Ok(value.to_lowercase())
    }

    async fn get_staging_dir(&self) -> Result<PathBuf, ConfigError> {
        let value = self.get_config_or_default(config_keys::IMPORT_STAGING_DIR, defaults::STAGING_DIR)?;
        Ok(PathBuf::from(value))
    }

    async fn get_primary_table_prefix(&self) -> Result<String, ConfigError> {
        // 空字符串是合法值，不能走 get_config_or_default 的空值回退
        Ok(self
            .get_config_value(config_keys::IMPORT_PRIMARY_TABLE_PREFIX)?
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| defaults::PRIMARY_TABLE_PREFIX.to_string()))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 文件读取
    pub const IMPORT_MAX_ROWS: &str = "import_max_rows";

    // 用户错误信息语言
    pub const IMPORT_USER_LOCALE: &str = "import_user_locale";

    // 附件压缩包解压目录
    pub const IMPORT_STAGING_DIR: &str = "import_staging_dir";

    // 主 item 表前缀
    pub const IMPORT_PRIMARY_TABLE_PREFIX: &str = "import_primary_table_prefix";
}
