//! In-memory job store for testing and embedding

use async_trait::async_trait;
use crosspost_domain::model::PublishJobResult;
use crosspost_domain::ports::{JobStore, JobStoreError};
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory job store implementation; records keep insertion order
pub struct InMemoryJobStore {
    records: RwLock<Vec<PublishJobResult>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored job records
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn record(&self, job: &PublishJobResult) -> Result<(), JobStoreError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| JobStoreError::Database(e.to_string()))?;
        if let Some(existing) = records.iter_mut().find(|j| j.job_id == job.job_id) {
            *existing = job.clone();
        } else {
            records.push(job.clone());
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<PublishJobResult>, JobStoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| JobStoreError::Database(e.to_string()))?;
        Ok(records.iter().find(|j| j.job_id == job_id).cloned())
    }

    async fn list_for_content(
        &self,
        content_id: &str,
    ) -> Result<Vec<PublishJobResult>, JobStoreError> {
        let records = self
            .records
            .read()
            .map_err(|e| JobStoreError::Database(e.to_string()))?;
        Ok(records
            .iter()
            .filter(|j| j.content_id == content_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::model::{JobStatus, Platform, PublishResult};
    use time::OffsetDateTime;

    fn job(content_id: &str, platform: Platform) -> PublishJobResult {
        PublishJobResult {
            job_id: Uuid::new_v4(),
            content_id: content_id.to_string(),
            platform,
            tenant_id: "t1".to_string(),
            status: JobStatus::Pending,
            result: None,
            retry_count: 0,
            scheduled_at: None,
            published_at: None,
        }
    }

    #[tokio::test]
    async fn record_and_get_round_trip() {
        let store = InMemoryJobStore::new();
        let job = job("c1", Platform::Instagram);

        store.record(&job).await.unwrap();
        let found = store.get(job.job_id).await.unwrap().unwrap();
        assert_eq!(found.content_id, "c1");
    }

    #[tokio::test]
    async fn record_upserts_by_job_id() {
        let store = InMemoryJobStore::new();
        let mut job = job("c1", Platform::Facebook);

        store.record(&job).await.unwrap();
        job.status = JobStatus::Success;
        job.result = Some(PublishResult::succeeded("p1", OffsetDateTime::UNIX_EPOCH));
        store.record(&job).await.unwrap();

        assert_eq!(store.len(), 1);
        let found = store.get(job.job_id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Success);
    }

    #[tokio::test]
    async fn list_filters_by_content() {
        let store = InMemoryJobStore::new();
        store.record(&job("c1", Platform::Instagram)).await.unwrap();
        store.record(&job("c1", Platform::Facebook)).await.unwrap();
        store.record(&job("c2", Platform::Facebook)).await.unwrap();

        let jobs = store.list_for_content("c1").await.unwrap();
        assert_eq!(jobs.len(), 2);
    }
}
