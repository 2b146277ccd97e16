//! Publish orchestrator
//!
//! The façade over the publishing pipeline: resolves credentials,
//! obtains adapters through the registry, validates adapted payloads,
//! drives the retry controller per target platform, and persists one
//! job record per (content, platform). Per-platform failures are fully
//! isolated; the batch always yields one result per requested platform.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use futures::future;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::model::{
    AdaptedContent, ContentRecord, HealthCheck, JobStatus, Platform, PlatformCredentials,
    PublishJobResult, PublishRequest, PublishResult, RetryPolicy, TenantContext,
};
use crate::ports::{AdapterError, AdapterFactory, Clock, CredentialsStore, JobStore, PlatformAdapter};
use crate::registry::{AdapterRegistry, RegistryKey};
use crate::usecases::adapt::{AdaptError, ContentAdapter};
use crate::usecases::retry::RetryController;

/// Multi-platform publishing façade
pub struct PublishOrchestrator<F, C, J, Cl>
where
    F: AdapterFactory + ?Sized,
    C: CredentialsStore + ?Sized,
    J: JobStore + ?Sized,
    Cl: Clock + ?Sized,
{
    factory: Arc<F>,
    credentials: Arc<C>,
    jobs: Arc<J>,
    clock: Arc<Cl>,
    registry: Arc<AdapterRegistry>,
    content_adapter: ContentAdapter,
    default_policy: RetryPolicy,
    refresh_guards: AsyncMutex<HashMap<(String, Platform), Arc<AsyncMutex<()>>>>,
}

impl<F, C, J, Cl> PublishOrchestrator<F, C, J, Cl>
where
    F: AdapterFactory + ?Sized,
    C: CredentialsStore + ?Sized,
    J: JobStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(factory: Arc<F>, credentials: Arc<C>, jobs: Arc<J>, clock: Arc<Cl>) -> Self {
        Self {
            factory,
            credentials,
            jobs,
            clock,
            registry: Arc::new(AdapterRegistry::new()),
            content_adapter: ContentAdapter::default(),
            default_policy: RetryPolicy::default(),
            refresh_guards: AsyncMutex::new(HashMap::new()),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Publish one content record to every requested platform.
    ///
    /// Returns one job result per platform, in request order. Never
    /// fails the batch: every error becomes a failed job for that
    /// platform alone. Duplicate platform entries are collapsed so
    /// exactly one job exists per (content, platform).
    pub async fn publish_content(
        &self,
        request: &PublishRequest,
        tenant: &TenantContext,
    ) -> Vec<PublishJobResult> {
        let policy = request
            .retry_policy
            .clone()
            .unwrap_or_else(|| self.default_policy.clone());

        let mut seen = HashSet::new();
        let targets: Vec<Platform> = request
            .platforms
            .iter()
            .copied()
            .filter(|p| {
                let fresh = seen.insert(*p);
                if !fresh {
                    tracing::warn!(platform = %p, "Duplicate platform in publish request, skipping");
                }
                fresh
            })
            .collect();

        tracing::info!(
            content_id = %request.content.id,
            tenant_id = %tenant.tenant_id,
            platforms = ?targets,
            "Publishing content"
        );

        let branches = targets
            .iter()
            .map(|&platform| self.publish_to_platform(request, tenant, platform, &policy));

        future::join_all(branches).await
    }

    /// Adapt a content record for each platform, best-effort.
    ///
    /// A platform whose adaptation fails yields its error in the map
    /// instead of aborting the batch, so callers can detect partial
    /// adaptation failure.
    pub fn adapt_content_for_platforms(
        &self,
        content: &ContentRecord,
        platforms: &[Platform],
    ) -> BTreeMap<Platform, Result<AdaptedContent, AdaptError>> {
        let now = self.clock.now();
        platforms
            .iter()
            .map(|&platform| {
                let outcome = self.content_adapter.adapt(content, platform, now);
                if let Err(error) = &outcome {
                    tracing::warn!(
                        platform = %platform,
                        content_id = %content.id,
                        error = %error,
                        "Adaptation failed for platform"
                    );
                }
                (platform, outcome)
            })
            .collect()
    }

    /// Refresh stored credentials for one (tenant, platform).
    ///
    /// Single-flight per key: concurrent callers coalesce on one guard;
    /// whoever arrives after a completed refresh observes the rotated
    /// token and returns it without a second exchange. The registry
    /// entry under the old fingerprint is dropped so the next publish
    /// re-authenticates.
    pub async fn refresh_credentials(
        &self,
        tenant: &TenantContext,
        platform: Platform,
    ) -> Result<PlatformCredentials, AdapterError> {
        let observed = self.stored_credentials(tenant, platform).await?;

        let guard = {
            let mut guards = self.refresh_guards.lock().await;
            Arc::clone(
                guards
                    .entry((tenant.tenant_id.clone(), platform))
                    .or_default(),
            )
        };
        let _held = guard.lock().await;

        let current = self.stored_credentials(tenant, platform).await?;
        if current.access_token != observed.access_token {
            // refreshed while we waited on the guard
            return Ok(current);
        }

        let adapter = self.obtain_adapter(platform, &current)?;
        let refreshed = adapter.refresh_credentials().await?;

        self.credentials
            .put(&tenant.tenant_id, platform, refreshed.clone())
            .await
            .map_err(|e| AdapterError::Credential(e.to_string()))?;
        self.registry.remove(&RegistryKey::new(platform, &current));

        tracing::info!(
            platform = %platform,
            tenant_id = %tenant.tenant_id,
            "Refreshed platform credentials"
        );

        Ok(refreshed)
    }

    /// Run the health probe for every platform the tenant has
    /// credentials for
    pub async fn check_all_platforms(
        &self,
        tenant: &TenantContext,
    ) -> BTreeMap<Platform, HealthCheck> {
        let mut checks = BTreeMap::new();

        for platform in Platform::ALL {
            let creds = match self.credentials.get(&tenant.tenant_id, platform).await {
                Ok(Some(c)) => c,
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!(platform = %platform, error = %error, "Credential lookup failed during health sweep");
                    continue;
                }
            };
            match self.obtain_adapter(platform, &creds) {
                Ok(adapter) => {
                    checks.insert(platform, adapter.check_health().await);
                }
                Err(error) => {
                    checks.insert(
                        platform,
                        HealthCheck {
                            healthy: false,
                            latency: std::time::Duration::ZERO,
                            rate_limit_remaining: None,
                            error: Some(error.to_string()),
                            checked_at: self.clock.now(),
                        },
                    );
                }
            }
        }

        checks
    }

    async fn publish_to_platform(
        &self,
        request: &PublishRequest,
        tenant: &TenantContext,
        platform: Platform,
        policy: &RetryPolicy,
    ) -> PublishJobResult {
        let mut job = PublishJobResult {
            job_id: Uuid::new_v4(),
            content_id: request.content.id.clone(),
            platform,
            tenant_id: tenant.tenant_id.clone(),
            status: JobStatus::Pending,
            result: None,
            retry_count: 0,
            scheduled_at: request.scheduled_at,
            published_at: None,
        };
        self.persist(&job).await;

        let creds = match self.credentials.get(&tenant.tenant_id, platform).await {
            Ok(Some(creds)) => creds,
            Ok(None) => {
                return self
                    .finish_failed(job, format!("no credentials stored for {}", platform))
                    .await;
            }
            Err(error) => {
                return self
                    .finish_failed(job, format!("credential lookup failed: {}", error))
                    .await;
            }
        };

        let adapter = match self.obtain_adapter(platform, &creds) {
            Ok(adapter) => adapter,
            Err(error) => {
                return self
                    .finish_failed(job, format!("adapter unavailable: {}", error))
                    .await;
            }
        };

        let Some(content) = request.content.adaptations.get(&platform) else {
            return self
                .finish_failed(job, format!("no adapted content for {}", platform))
                .await;
        };

        let validation = adapter.validate_content(content);
        if !validation.is_valid() {
            return self
                .finish_failed(job, format!("validation failed: {}", validation.summary()))
                .await;
        }

        let controller = RetryController::new(policy.clone());
        let base_job = job.clone();
        let jobs = Arc::clone(&self.jobs);
        let outcome = controller
            .run(self.clock.as_ref(), |attempt| {
                let adapter = Arc::clone(&adapter);
                let jobs = Arc::clone(&jobs);
                let mut snapshot = base_job.clone();
                async move {
                    if attempt > 0 {
                        snapshot.status = JobStatus::Retrying;
                        snapshot.retry_count = attempt;
                        if let Err(error) = jobs.record(&snapshot).await {
                            tracing::warn!(
                                job_id = %snapshot.job_id,
                                error = %error,
                                "Failed to persist retrying state"
                            );
                        }
                    }
                    adapter.publish(content, tenant).await
                }
            })
            .await;

        job.retry_count = outcome.attempts.saturating_sub(1);
        if outcome.result.success {
            job.status = JobStatus::Success;
            job.published_at = Some(outcome.result.published_at);
            tracing::info!(
                content_id = %job.content_id,
                platform = %platform,
                post_id = ?outcome.result.post_id,
                attempts = outcome.attempts,
                "Published content"
            );
        } else {
            job.status = JobStatus::Failed;
            tracing::error!(
                content_id = %job.content_id,
                platform = %platform,
                attempts = outcome.attempts,
                error = ?outcome.result.error,
                "Publishing failed"
            );
        }
        job.result = Some(outcome.result);
        self.persist(&job).await;
        job
    }

    async fn stored_credentials(
        &self,
        tenant: &TenantContext,
        platform: Platform,
    ) -> Result<PlatformCredentials, AdapterError> {
        self.credentials
            .get(&tenant.tenant_id, platform)
            .await
            .map_err(|e| AdapterError::Credential(e.to_string()))?
            .ok_or_else(|| {
                AdapterError::Credential(format!("no credentials stored for {}", platform))
            })
    }

    fn obtain_adapter(
        &self,
        platform: Platform,
        creds: &PlatformCredentials,
    ) -> Result<Arc<dyn PlatformAdapter>, AdapterError> {
        let key = RegistryKey::new(platform, creds);
        if let Some(adapter) = self.registry.get(&key) {
            return Ok(adapter);
        }
        let adapter = self.factory.create(platform, creds)?;
        self.registry.register(key, Arc::clone(&adapter));
        Ok(adapter)
    }

    async fn finish_failed(
        &self,
        mut job: PublishJobResult,
        error: String,
    ) -> PublishJobResult {
        tracing::error!(
            content_id = %job.content_id,
            platform = %job.platform,
            error = %error,
            "Publish job failed before dispatch"
        );
        job.status = JobStatus::Failed;
        job.result = Some(PublishResult::failed(error, false, self.clock.now()));
        self.persist(&job).await;
        job
    }

    async fn persist(&self, job: &PublishJobResult) {
        if let Err(error) = self.jobs.record(job).await {
            tracing::error!(
                job_id = %job.job_id,
                error = %error,
                "Failed to persist job record"
            );
        }
    }
}
