//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external
//! systems. Adapters implement them to connect to real infrastructure.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::model::{
    AdaptedContent, HealthCheck, Platform, PlatformCredentials, PublishJobResult, PublishResult,
    TenantContext, UnsupportedPlatformError, ValidationResult,
};
use crate::requirements::ContentRequirements;

/// Error type for platform adapter operations
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Content failed platform constraints; never retried
    #[error("validation failed: {0}")]
    Validation(String),
    /// Missing or unusable credentials, or refresh not possible
    #[error("credential error: {0}")]
    Credential(String),
    /// Network failure, timeout, or remote server error
    #[error("transient error: {0}")]
    Transient(String),
    #[error("rate limited")]
    RateLimited,
    /// Unclassified remote API failure; retry eligibility decided by
    /// the policy's pattern list
    #[error("API error: {0}")]
    Api(String),
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatformError),
}

impl AdapterError {
    /// Retry classification for typed variants.
    ///
    /// `None` means the variant carries no classification of its own
    /// and the caller should match the error text against the active
    /// retry policy's patterns.
    pub fn retryable_hint(&self) -> Option<bool> {
        match self {
            AdapterError::Transient(_) | AdapterError::RateLimited => Some(true),
            AdapterError::Validation(_)
            | AdapterError::Credential(_)
            | AdapterError::UnsupportedPlatform(_) => Some(false),
            AdapterError::Api(_) => None,
        }
    }
}

/// Uniform capability contract hiding one platform's wire protocol.
///
/// One implementation exists per platform. Instances are cached by the
/// adapter registry and assume a single in-flight publish call each.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// The platform this adapter targets
    fn platform(&self) -> Platform;

    /// Verify or establish a usable session.
    ///
    /// Expected auth failure returns `Ok(false)`, not an error; side
    /// effects may populate adapter-internal state such as a resolved
    /// business-account id.
    async fn authenticate(&self) -> Result<bool, AdapterError>;

    /// Check platform-specific constraints. Pure; no network access.
    fn validate_content(&self, content: &AdaptedContent) -> ValidationResult;

    /// Run the platform's publish protocol.
    ///
    /// Re-validates internally and fails fast (non-retryable) on
    /// invalid input before any network call. Structured failures come
    /// back as `Ok` with `success == false`; transport-level surprises
    /// as `Err`.
    async fn publish(
        &self,
        content: &AdaptedContent,
        tenant: &TenantContext,
    ) -> Result<PublishResult, AdapterError>;

    /// The static requirements table entry for this platform
    fn requirements(&self) -> &'static ContentRequirements;

    /// Issue a lightweight authenticated call and report latency,
    /// rate-limit headroom where derivable, and health state
    async fn check_health(&self) -> HealthCheck;

    /// Exchange a refresh token (or app secret) for new credentials.
    ///
    /// Fails with a credential error naming the missing refresh token
    /// for flows where refresh is not supported.
    async fn refresh_credentials(&self) -> Result<PlatformCredentials, AdapterError>;
}

/// Constructs platform adapters from credentials
pub trait AdapterFactory: Send + Sync {
    fn create(
        &self,
        platform: Platform,
        credentials: &PlatformCredentials,
    ) -> Result<Arc<dyn PlatformAdapter>, AdapterError>;
}

/// Error type for credential store operations
#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("credentials store error: {0}")]
    Store(String),
}

/// Port for the tenant credentials collaborator.
///
/// Encryption and durable persistence live outside this core.
#[async_trait]
pub trait CredentialsStore: Send + Sync {
    /// Stored credentials for (tenant, platform), if any
    async fn get(
        &self,
        tenant_id: &str,
        platform: Platform,
    ) -> Result<Option<PlatformCredentials>, CredentialsError>;

    /// Replace credentials after a refresh
    async fn put(
        &self,
        tenant_id: &str,
        platform: Platform,
        credentials: PlatformCredentials,
    ) -> Result<(), CredentialsError>;
}

/// Error type for job store operations
#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Port for persisting publish job audit records
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Write or overwrite a job record (terminal or intermediate state)
    async fn record(&self, job: &PublishJobResult) -> Result<(), JobStoreError>;

    /// Fetch one job by id
    async fn get(&self, job_id: Uuid) -> Result<Option<PublishJobResult>, JobStoreError>;

    /// All jobs recorded for a content id
    async fn list_for_content(
        &self,
        content_id: &str,
    ) -> Result<Vec<PublishJobResult>, JobStoreError>;
}

/// Port for time operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
