// ==========================================
// 内容管理平台 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供导入管道所需的最小 schema（元数据 / item / 任务 / 审计）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// item 表基础名（完整表名 = 前缀 + 基础名）
pub const ITEM_TABLE: &str = "item";

/// item 附件表基础名
pub const ITEM_FILE_TABLE: &str = "item_file";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "CMS_IMPORT_DB_PATH";

/// 默认数据库路径
///
/// 优先级: 环境变量 CMS_IMPORT_DB_PATH → 用户数据目录 → 当前目录
pub fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }

    match dirs::data_dir() {
        Some(data_dir) => {
            let dir = data_dir.join("cms-bulk-import");
            // 目录创建失败时 open 会给出明确错误
            std::fs::create_dir_all(&dir).ok();
            dir.join("cms_import.db")
        }
        None => PathBuf::from("./cms_import.db"),
    }
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 校验表名前缀（仅允许字母、数字、下划线）
///
/// 表名无法参数化，拼接前必须校验
pub fn validate_table_prefix(prefix: &str) -> RepositoryResult<()> {
    if prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(RepositoryError::InvalidTablePrefix(prefix.to_string()))
    }
}

/// 根据前缀生成 item 表名
pub fn item_table_name(prefix: &str) -> RepositoryResult<String> {
    validate_table_prefix(prefix)?;
    Ok(format!("{}{}", prefix, ITEM_TABLE))
}

/// 根据前缀生成 item 附件表名
pub fn item_file_table_name(prefix: &str) -> RepositoryResult<String> {
    validate_table_prefix(prefix)?;
    Ok(format!("{}{}", prefix, ITEM_FILE_TABLE))
}

/// 初始化导入管道所需的 schema（幂等）
pub fn init_schema(conn: &Connection) -> RepositoryResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS entity_type (
            name TEXT PRIMARY KEY,
            table_prefix TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS entity_property (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_type TEXT NOT NULL DEFAULT '',
            link_type INTEGER NOT NULL DEFAULT 0,
            property_name TEXT NOT NULL,
            display_name TEXT NOT NULL DEFAULT '',
            language_code TEXT NOT NULL DEFAULT '',
            input_type TEXT NOT NULL DEFAULT 'input',
            options TEXT,
            data_query TEXT,
            ordering INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS link_setting (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            type INTEGER NOT NULL,
            source_entity_type TEXT NOT NULL,
            destination_entity_type TEXT NOT NULL,
            use_parent_item_id INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS operator (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS import_job (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            start_on TEXT NOT NULL,
            added_by TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            tenant_id INTEGER NOT NULL,
            data TEXT NOT NULL,
            added_on TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS import_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id TEXT NOT NULL,
            job_id INTEGER,
            entity_type TEXT NOT NULL,
            items_total INTEGER NOT NULL,
            items_created INTEGER NOT NULL,
            items_updated INTEGER NOT NULL,
            successful INTEGER NOT NULL,
            failed INTEGER NOT NULL,
            errors TEXT NOT NULL,
            added_by TEXT NOT NULL,
            added_on TEXT NOT NULL
        );
        "#,
    )?;

    create_item_tables(conn, "")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 创建指定前缀的 item 表与附件表（幂等）
pub fn create_item_tables(conn: &Connection, prefix: &str) -> RepositoryResult<()> {
    let item_table = item_table_name(prefix)?;
    let file_table = item_file_table_name(prefix)?;

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {item_table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_type TEXT NOT NULL,
            title TEXT,
            module_id INTEGER NOT NULL DEFAULT 0,
            parent_item_id INTEGER,
            published_environment INTEGER NOT NULL DEFAULT 15
        );

        CREATE TABLE IF NOT EXISTS {file_table} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER NOT NULL,
            property_name TEXT NOT NULL,
            file_name TEXT NOT NULL DEFAULT ''
        );
        "#
    ))?;

    Ok(())
}
