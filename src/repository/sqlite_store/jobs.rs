use super::core::SqliteStore;
use crate::domain::import_result::{ImportJob, ImportLog};
use crate::repository::error::RepositoryResult;
use crate::repository::import_job_repo::ImportJobRepository;
use async_trait::async_trait;
use rusqlite::params;

#[async_trait]
impl ImportJobRepository for SqliteStore {
    async fn insert_job(&self, job: &ImportJob) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO import_job (name, start_on, added_by, user_id, tenant_id, data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                job.name,
                job.start_on.to_rfc3339(),
                job.added_by,
                job.user_id as i64,
                job.tenant_id,
                job.data,
            ],
        )?;

        Ok(conn.last_insert_rowid() as u64)
    }

    async fn insert_import_log(&self, log: &ImportLog) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO import_log (
                run_id, job_id, entity_type, items_total, items_created, items_updated,
                successful, failed, errors, added_by, added_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                log.run_id,
                log.job_id.map(|id| id as i64),
                log.entity_type,
                log.items_total as i64,
                log.items_created as i64,
                log.items_updated as i64,
                log.successful as i64,
                log.failed as i64,
                log.errors,
                log.added_by,
                log.added_on.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;

        Ok(conn.last_insert_rowid() as u64)
    }
}
