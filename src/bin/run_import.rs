// 执行一次批量导入并把结果以 JSON 打印到 stdout。
//
// Usage:
//   cargo run --bin run_import -- <request.json> [db_path] [actor_name]
//
// request.json 为 ImportJobRequest（camelCase）。db_path 缺省时使用 CMS_IMPORT_DB_PATH
// 或用户数据目录下的 cms_import.db。存在错误时退出码为 1。

use anyhow::{anyhow, Context};
use cms_bulk_import::config::{ConfigManager, ImportSettings};
use cms_bulk_import::db::{default_db_path, init_schema, open_sqlite_connection};
use cms_bulk_import::importer::{BulkImporter, BulkImporterImpl, UniversalFileParser};
use cms_bulk_import::repository::{SqliteStore, ZipArchiveExtractor};
use cms_bulk_import::{logging, ImportActor, ImportJobRequest};
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let request_path = args
        .next()
        .context("usage: run_import <request.json> [db_path] [actor_name]")?;
    let db_path = args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default_db_path().display().to_string());
    let actor_name = args.next().unwrap_or_else(|| "run_import".to_string());

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("cannot open database {}", db_path))?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(conn.clone()).map_err(|e| anyhow!(e))?;
    let settings = ImportSettings::load(&config)
        .await
        .map_err(|e| anyhow!("cannot load import settings: {}", e))?;

    let request_text = std::fs::read_to_string(&request_path)
        .with_context(|| format!("cannot read request {}", request_path))?;
    let request: ImportJobRequest =
        serde_json::from_str(&request_text).context("invalid import request")?;
    let actor = ImportActor::new(0, &actor_name, 0);

    let store = SqliteStore::from_connection(conn);
    let importer = BulkImporterImpl::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Box::new(store),
        Box::new(UniversalFileParser),
        Box::new(ZipArchiveExtractor),
        settings,
    );

    let result = importer.import(&request, &actor).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}
