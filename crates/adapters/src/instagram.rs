//! Instagram publishing adapter
//!
//! Publishing requires a linked business account, resolved through a
//! two-step account/page lookup, followed by a create-container then
//! publish-container sequence. A token without a linked business
//! account is a terminal failure.

use async_trait::async_trait;
use crosspost_domain::model::{
    AdaptedContent, HealthCheck, MediaKind, Platform, PlatformCredentials, PlatformFields,
    PublishResult, TenantContext, ValidationCode, ValidationResult,
};
use crosspost_domain::ports::{AdapterError, PlatformAdapter};
use crosspost_domain::requirements::ContentRequirements;
use crosspost_domain::validation;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Mutex;
use time::OffsetDateTime;

use crate::http;

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Instagram adapter over the Graph content publishing API
pub struct InstagramAdapter {
    client: Client,
    access_token: SecretString,
    app_id: Option<String>,
    app_secret: Option<String>,
    base_url: String,
    business_account_id: Mutex<Option<String>>,
}

impl InstagramAdapter {
    pub fn new(credentials: &PlatformCredentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(credentials: &PlatformCredentials, base_url: String) -> Self {
        Self {
            client: http::build_client(),
            access_token: SecretString::new(credentials.access_token.clone().into()),
            app_id: credentials.app_id.clone(),
            app_secret: credentials.app_secret.clone(),
            base_url,
            business_account_id: Mutex::new(None),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    /// Two-step lookup: pages reachable by the token, then the first
    /// page's linked business account. The resolved id is cached for
    /// the lifetime of the adapter instance.
    async fn resolve_business_account(&self) -> Result<Option<String>, AdapterError> {
        if let Some(id) = self.business_account_id.lock().unwrap().clone() {
            return Ok(Some(id));
        }

        let url = format!("{}/me/accounts", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(http::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        let pages: PageList = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;
        let Some(page) = pages.data.first() else {
            return Ok(None);
        };

        let url = format!("{}/{}", self.base_url, page.id);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", "instagram_business_account")])
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(http::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        let detail: PageDetail = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;

        let resolved = detail.instagram_business_account.map(|a| a.id);
        if let Some(id) = &resolved {
            *self.business_account_id.lock().unwrap() = Some(id.clone());
        }
        Ok(resolved)
    }
}

#[derive(Deserialize)]
struct PageList {
    #[serde(default)]
    data: Vec<PageSummary>,
}

#[derive(Deserialize)]
struct PageSummary {
    id: String,
}

#[derive(Deserialize)]
struct PageDetail {
    instagram_business_account: Option<LinkedAccount>,
}

#[derive(Deserialize)]
struct LinkedAccount {
    id: String,
}

#[derive(Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[async_trait]
impl PlatformAdapter for InstagramAdapter {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn authenticate(&self) -> Result<bool, AdapterError> {
        match self.resolve_business_account().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => {
                tracing::warn!("No linked instagram business account for token");
                Ok(false)
            }
            Err(AdapterError::Credential(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    fn validate_content(&self, content: &AdaptedContent) -> ValidationResult {
        let mut result = validation::validate_against_requirements(content, self.requirements());
        if !matches!(content.fields, PlatformFields::Instagram { .. }) {
            result.push(
                ValidationCode::InvalidFieldValue,
                "adapted content is not for instagram",
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

        let Some(account_id) = self.resolve_business_account().await? else {
            return Err(AdapterError::Credential(
                "no linked instagram business account".to_string(),
            ));
        };

        let PlatformFields::Instagram {
            caption,
            media_kind,
            ..
        } = &content.fields
        else {
            return Err(AdapterError::Validation(
                "adapted content is not for instagram".to_string(),
            ));
        };

        // validation guarantees at least one media URL
        let media_url = content.media_urls.first().cloned().unwrap_or_default();

        let mut params: Vec<(&str, String)> = vec![("caption", caption.clone())];
        match media_kind {
            MediaKind::Video => {
                params.push(("media_type", "REELS".to_string()));
                params.push(("video_url", media_url));
            }
            _ => params.push(("image_url", media_url)),
        }

        let url = format!("{}/{}/media", self.base_url, account_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .form(&params)
            .send()
            .await
            .map_err(http::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        let container: ObjectId = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;

        let url = format!("{}/{}/media_publish", self.base_url, account_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .form(&[("creation_id", container.id.clone())])
            .send()
            .await
            .map_err(http::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        let post: ObjectId = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;

        tracing::info!(
            tenant_id = %tenant.tenant_id,
            post_id = %post.id,
            "Published to instagram"
        );

        Ok(
            PublishResult::succeeded(post.id, OffsetDateTime::now_utc())
                .with_metadata("container_id", container.id),
        )
    }

    fn requirements(&self) -> &'static ContentRequirements {
        Platform::Instagram.requirements()
    }

    async fn check_health(&self) -> HealthCheck {
        let started = std::time::Instant::now();
        let url = format!("{}/me", self.base_url);
        let outcome = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await;
        let latency = started.elapsed();
        let checked_at = OffsetDateTime::now_utc();

        match outcome {
            Ok(response) => {
                let rate_limit_remaining = http::graph_rate_limit_remaining(response.headers());
                let healthy = response.status().is_success();
                HealthCheck {
                    healthy,
                    latency,
                    rate_limit_remaining,
                    error: (!healthy).then(|| format!("status {}", response.status())),
                    checked_at,
                }
            }
            Err(error) => HealthCheck {
                healthy: false,
                latency,
                rate_limit_remaining: None,
                error: Some(error.to_string()),
                checked_at,
            },
        }
    }

    async fn refresh_credentials(&self) -> Result<PlatformCredentials, AdapterError> {
        let (Some(app_id), Some(app_secret)) = (&self.app_id, &self.app_secret) else {
            return Err(AdapterError::Credential(
                "no refresh token: long-lived exchange needs app id and secret".to_string(),
            ));
        };

        let url = format!("{}/oauth/access_token", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("grant_type", "fb_exchange_token"),
                ("client_id", app_id.as_str()),
                ("client_secret", app_secret.as_str()),
                ("fb_exchange_token", self.access_token.expose_secret()),
            ])
            .send()
            .await
            .map_err(http::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;

        Ok(PlatformCredentials {
            access_token: token.access_token,
            refresh_token: None,
            app_id: Some(app_id.clone()),
            app_secret: Some(app_secret.clone()),
        })
    }
}
