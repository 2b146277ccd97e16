//! Scriptable stub adapter for testing

use async_trait::async_trait;
use crosspost_domain::model::{
    AdaptedContent, HealthCheck, Platform, PlatformCredentials, PublishResult, TenantContext,
    ValidationCode, ValidationResult,
};
use crosspost_domain::ports::{AdapterError, PlatformAdapter};
use crosspost_domain::requirements::ContentRequirements;
use crosspost_domain::validation;
use std::collections::VecDeque;
use std::sync::Mutex;
use time::OffsetDateTime;

/// Stub adapter with scripted publish outcomes.
///
/// Outcomes are consumed in order; once exhausted every publish
/// succeeds with a generated post id. Published payloads are recorded
/// for assertions.
pub struct StubAdapter {
    platform: Platform,
    reject_validation: bool,
    outcomes: Mutex<VecDeque<Result<PublishResult, AdapterError>>>,
    published: Mutex<Vec<AdaptedContent>>,
}

impl StubAdapter {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            reject_validation: false,
            outcomes: Mutex::new(VecDeque::new()),
            published: Mutex::new(vec![]),
        }
    }

    /// Queue outcomes for successive publish calls
    pub fn with_outcomes(self, outcomes: Vec<Result<PublishResult, AdapterError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..self
        }
    }

    /// Force validation to fail regardless of content
    pub fn rejecting_validation(self) -> Self {
        Self {
            reject_validation: true,
            ..self
        }
    }

    /// All payloads that reached publish
    pub fn get_published(&self) -> Vec<AdaptedContent> {
        self.published.lock().unwrap().clone()
    }

    /// Number of publish invocations
    pub fn publish_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }
}

#[async_trait]
impl PlatformAdapter for StubAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn authenticate(&self) -> Result<bool, AdapterError> {
        Ok(true)
    }

    fn validate_content(&self, content: &AdaptedContent) -> ValidationResult {
        if self.reject_validation {
            let mut result = ValidationResult::valid();
            result.push(ValidationCode::InvalidFieldValue, "rejected by stub");
            return result;
        }
        validation::validate_against_requirements(content, self.requirements())
    }

    async fn publish(
        &self,
        content: &AdaptedContent,
        _tenant: &TenantContext,
    ) -> Result<PublishResult, AdapterError> {
        let validation = self.validate_content(content);
        if !validation.is_valid() {
            return Ok(PublishResult::failed(
                format!("validation failed: {}", validation.summary()),
                false,
                OffsetDateTime::now_utc(),
            ));
        }

        self.published.lock().unwrap().push(content.clone());

        self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(PublishResult::succeeded(
                format!("stub_{}_{}", self.platform, self.publish_count()),
                OffsetDateTime::now_utc(),
            ))
        })
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
        Ok(PlatformCredentials::new("stub-refreshed-token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::model::ContentRecord;
    use crosspost_domain::usecases::adapt::ContentAdapter;

    fn sample_content() -> AdaptedContent {
        let record = ContentRecord {
            id: "c1".to_string(),
            text: "stubbed".to_string(),
            media_urls: vec!["https://cdn.example.com/a.jpg".to_string()],
            adaptations: Default::default(),
        };
        ContentAdapter::default()
            .adapt(&record, Platform::Instagram, OffsetDateTime::UNIX_EPOCH)
            .unwrap()
    }

    #[tokio::test]
    async fn scripted_outcomes_are_consumed_in_order() {
        let adapter = StubAdapter::new(Platform::Instagram).with_outcomes(vec![
            Err(AdapterError::Transient("down".to_string())),
            Ok(PublishResult::succeeded("p1", OffsetDateTime::UNIX_EPOCH)),
        ]);
        let tenant = TenantContext::new("t1");

        assert!(adapter.publish(&sample_content(), &tenant).await.is_err());
        let second = adapter.publish(&sample_content(), &tenant).await.unwrap();
        assert!(second.success);
        assert_eq!(adapter.publish_count(), 2);
    }

    #[tokio::test]
    async fn forced_rejection_short_circuits() {
        let adapter = StubAdapter::new(Platform::Instagram).rejecting_validation();
        let result = adapter
            .publish(&sample_content(), &TenantContext::new("t1"))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(adapter.publish_count(), 0);
    }
}
