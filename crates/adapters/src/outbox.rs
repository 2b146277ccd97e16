//! Outbox adapter for require-approval and dry-run modes
//!
//! Implements the full adapter contract for one platform but appends
//! the would-be publish payload to a JSONL file instead of calling the
//! platform. Validation behaves exactly like the real adapter's, so an
//! approved entry is known to be publishable.

use async_trait::async_trait;
use crosspost_domain::model::{
    AdaptedContent, HealthCheck, Platform, PlatformCredentials, PlatformFields, PublishResult,
    TenantContext, ValidationCode, ValidationResult,
};
use crosspost_domain::ports::{AdapterError, PlatformAdapter};
use crosspost_domain::requirements::ContentRequirements;
use crosspost_domain::validation;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Append-only JSONL writer shared by outbox adapters
#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    platform: &'a str,
    tenant_id: &'a str,
    content_id: &'a str,
    text: &'a str,
    media_urls: &'a [String],
    fields: &'a PlatformFields,
}

/// Adapter that records publish payloads for later approval
#[derive(Debug, Clone)]
pub struct OutboxAdapter {
    writer: OutboxWriter,
    platform: Platform,
}

impl OutboxAdapter {
    pub fn new(writer: OutboxWriter, platform: Platform) -> Self {
        Self { writer, platform }
    }
}

#[async_trait]
impl PlatformAdapter for OutboxAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn authenticate(&self) -> Result<bool, AdapterError> {
        Ok(true)
    }

    fn validate_content(&self, content: &AdaptedContent) -> ValidationResult {
        let mut result = validation::validate_against_requirements(content, self.requirements());
        if content.fields.platform() != self.platform {
            result.push(
                ValidationCode::InvalidFieldValue,
                format!("adapted content is not for {}", self.platform),
            );
        }
        result
    }

    async fn publish(
        &self,
        content: &AdaptedContent,
        tenant: &TenantContext,
    ) -> Result<PublishResult, AdapterError> {
        let validation = self.validate_content(content);
        if !validation.is_valid() {
            return Ok(PublishResult::failed(
                format!("validation failed: {}", validation.summary()),
                false,
                OffsetDateTime::now_utc(),
            ));
        }

        let entry = OutboxEntry {
            platform: self.platform.as_str(),
            tenant_id: &tenant.tenant_id,
            content_id: &content.metadata.source_content_id,
            text: &content.text,
            media_urls: &content.media_urls,
            fields: &content.fields,
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| AdapterError::Api(format!("Outbox write failed: {}", error)))?;

        Ok(
            PublishResult::succeeded(Uuid::new_v4().to_string(), OffsetDateTime::now_utc())
                .with_metadata("outbox", "true"),
        )
    }

    fn requirements(&self) -> &'static ContentRequirements {
        self.platform.requirements()
    }

    async fn check_health(&self) -> HealthCheck {
        HealthCheck {
            healthy: true,
            latency: std::time::Duration::ZERO,
            rate_limit_remaining: None,
            error: None,
            checked_at: OffsetDateTime::now_utc(),
        }
    }

    async fn refresh_credentials(&self) -> Result<PlatformCredentials, AdapterError> {
        Err(AdapterError::Credential(
            "outbox adapter holds no credentials".to_string(),
        ))
    }
}
