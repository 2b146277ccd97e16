//! SQLite job store implementation

use async_trait::async_trait;
use crosspost_domain::model::{JobStatus, Platform, PublishJobResult, PublishResult};
use crosspost_domain::ports::{JobStore, JobStoreError};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// SQLite-backed job store
pub struct SqliteJobStore {
    pool: SqlitePool,
}

type JobRow = (
    String,         // job_id
    String,         // content_id
    String,         // platform
    String,         // tenant_id
    String,         // status
    Option<String>, // result JSON
    i64,            // retry_count
    Option<String>, // scheduled_at
    Option<String>, // published_at
);

impl SqliteJobStore {
    /// Create a new SQLite job store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, JobStoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| JobStoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, JobStoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), JobStoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS publish_jobs (
                job_id TEXT PRIMARY KEY,
                content_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                status TEXT NOT NULL,
                result TEXT,
                error TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                scheduled_at TEXT,
                published_at TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_jobs_content
            ON publish_jobs(content_id, platform)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn status_str(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Retrying => "retrying",
        }
    }

    fn parse_status(raw: &str) -> Result<JobStatus, JobStoreError> {
        match raw {
            "pending" => Ok(JobStatus::Pending),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            "retrying" => Ok(JobStatus::Retrying),
            other => Err(JobStoreError::Serialization(format!(
                "unknown job status: {}",
                other
            ))),
        }
    }

    fn format_time(time: Option<OffsetDateTime>) -> Result<Option<String>, JobStoreError> {
        time.map(|t| {
            t.format(&Rfc3339)
                .map_err(|e| JobStoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    fn parse_time(raw: Option<String>) -> Result<Option<OffsetDateTime>, JobStoreError> {
        raw.map(|s| {
            OffsetDateTime::parse(&s, &Rfc3339)
                .map_err(|e| JobStoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    fn job_from_row(row: JobRow) -> Result<PublishJobResult, JobStoreError> {
        let (
            job_id,
            content_id,
            platform,
            tenant_id,
            status,
            result,
            retry_count,
            scheduled_at,
            published_at,
        ) = row;

        let job_id =
            Uuid::parse_str(&job_id).map_err(|e| JobStoreError::Serialization(e.to_string()))?;
        let platform: Platform = platform
            .parse()
            .map_err(|e: crosspost_domain::model::UnsupportedPlatformError| {
                JobStoreError::Serialization(e.to_string())
            })?;
        let status = Self::parse_status(&status)?;
        let result: Option<PublishResult> = result
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| JobStoreError::Serialization(e.to_string()))
            })
            .transpose()?;

        Ok(PublishJobResult {
            job_id,
            content_id,
            platform,
            tenant_id,
            status,
            result,
            retry_count: retry_count as u32,
            scheduled_at: Self::parse_time(scheduled_at)?,
            published_at: Self::parse_time(published_at)?,
        })
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn record(&self, job: &PublishJobResult) -> Result<(), JobStoreError> {
        let result_json = job
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| JobStoreError::Serialization(e.to_string()))?;
        let error = job.result.as_ref().and_then(|r| r.error.clone());
        let scheduled_at = Self::format_time(job.scheduled_at)?;
        let published_at = Self::format_time(job.published_at)?;

        sqlx::query(
            r#"
            INSERT INTO publish_jobs
            (job_id, content_id, platform, tenant_id, status, result, error,
             retry_count, scheduled_at, published_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                status = excluded.status,
                result = excluded.result,
                error = excluded.error,
                retry_count = excluded.retry_count,
                scheduled_at = excluded.scheduled_at,
                published_at = excluded.published_at
            "#,
        )
        .bind(job.job_id.to_string())
        .bind(&job.content_id)
        .bind(job.platform.as_str())
        .bind(&job.tenant_id)
        .bind(Self::status_str(job.status))
        .bind(&result_json)
        .bind(&error)
        .bind(job.retry_count as i64)
        .bind(&scheduled_at)
        .bind(&published_at)
        .execute(&self.pool)
        .await
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<PublishJobResult>, JobStoreError> {
        let row: Option<JobRow> = sqlx::query_as(
            r#"
            SELECT job_id, content_id, platform, tenant_id, status, result,
                   retry_count, scheduled_at, published_at
            FROM publish_jobs
            WHERE job_id = ?
            "#,
        )
        .bind(job_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        row.map(Self::job_from_row).transpose()
    }

    async fn list_for_content(
        &self,
        content_id: &str,
    ) -> Result<Vec<PublishJobResult>, JobStoreError> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT job_id, content_id, platform, tenant_id, status, result,
                   retry_count, scheduled_at, published_at
            FROM publish_jobs
            WHERE content_id = ?
            ORDER BY platform
            "#,
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        rows.into_iter().map(Self::job_from_row).collect()
    }
}
