//! TikTok publishing adapter
//!
//! All content must be video. Publishing initializes a pull-from-URL
//! upload, then confirms the publish status. Responses are wrapped in
//! the platform's data/error envelope.

use async_trait::async_trait;
use crosspost_domain::model::{
    AdaptedContent, HealthCheck, Platform, PlatformCredentials, PlatformFields, PublishResult,
    TenantContext, TikTokPrivacy, ValidationCode, ValidationResult,
};
use crosspost_domain::ports::{AdapterError, PlatformAdapter};
use crosspost_domain::requirements::ContentRequirements;
use crosspost_domain::{media, validation};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;

use crate::http;

const DEFAULT_BASE_URL: &str = "https://open.tiktokapis.com";

/// TikTok adapter over the content posting API
pub struct TikTokAdapter {
    client: Client,
    access_token: SecretString,
    client_key: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<SecretString>,
    base_url: String,
}

impl TikTokAdapter {
    pub fn new(credentials: &PlatformCredentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(credentials: &PlatformCredentials, base_url: String) -> Self {
        Self {
            client: http::build_client(),
            access_token: SecretString::new(credentials.access_token.clone().into()),
            client_key: credentials.app_id.clone(),
            client_secret: credentials.app_secret.clone(),
            refresh_token: credentials
                .refresh_token
                .clone()
                .map(|t| SecretString::new(t.into())),
            base_url,
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    /// Unwrap the platform's data/error envelope
    async fn unwrap_envelope<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AdapterError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;

        if let Some(error) = &envelope.error {
            if error.code != "ok" {
                return Err(match error.code.as_str() {
                    "access_token_invalid" => {
                        AdapterError::Credential(error.message.clone())
                    }
                    "rate_limit_exceeded" => AdapterError::RateLimited,
                    _ => AdapterError::Api(format!("{}: {}", error.code, error.message)),
                });
            }
        }

        envelope
            .data
            .ok_or_else(|| AdapterError::Api("response carried no data".to_string()))
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<EnvelopeError>,
}

#[derive(Deserialize)]
struct EnvelopeError {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct UserInfo {
    user: UserHandle,
}

#[derive(Deserialize)]
struct UserHandle {
    open_id: String,
}

#[derive(Deserialize)]
struct PublishInit {
    publish_id: String,
}

#[derive(Deserialize)]
struct PublishStatus {
    status: String,
    #[serde(default)]
    fail_reason: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[async_trait]
impl PlatformAdapter for TikTokAdapter {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn authenticate(&self) -> Result<bool, AdapterError> {
        let url = format!("{}/v2/user/info/", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("fields", "open_id")])
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(http::transport_error)?;
        if response.status() == 401 || response.status() == 403 {
            return Ok(false);
        }
        match self.unwrap_envelope::<UserInfo>(response).await {
            Ok(_) => Ok(true),
            Err(AdapterError::Credential(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    fn validate_content(&self, content: &AdaptedContent) -> ValidationResult {
        let mut result = validation::validate_against_requirements(content, self.requirements());
        if !matches!(content.fields, PlatformFields::TikTok { .. }) {
            result.push(
                ValidationCode::InvalidFieldValue,
                "adapted content is not for tiktok",
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

        let PlatformFields::TikTok { privacy, .. } = &content.fields else {
            return Err(AdapterError::Validation(
                "adapted content is not for tiktok".to_string(),
            ));
        };

        // validation guarantees a video URL in the media set
        let video_url = content
            .media_urls
            .iter()
            .find(|u| media::contains_video(std::slice::from_ref(u)))
            .cloned()
            .unwrap_or_default();

        let privacy_level = match privacy {
            TikTokPrivacy::PublicToEveryone => "PUBLIC_TO_EVERYONE",
            TikTokPrivacy::MutualFollowFriends => "MUTUAL_FOLLOW_FRIENDS",
            TikTokPrivacy::SelfOnly => "SELF_ONLY",
        };

        let url = format!("{}/v2/post/publish/video/init/", self.base_url);
        let body = serde_json::json!({
            "post_info": {
                "title": content.text,
                "privacy_level": privacy_level
            },
            "source_info": {
                "source": "PULL_FROM_URL",
                "video_url": video_url
            }
        });
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let init: PublishInit = self.unwrap_envelope(response).await?;

        let url = format!("{}/v2/post/publish/status/fetch/", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&serde_json::json!({ "publish_id": init.publish_id }))
            .send()
            .await
            .map_err(http::transport_error)?;
        let status: PublishStatus = self.unwrap_envelope(response).await?;

        if status.status == "FAILED" {
            let reason = status
                .fail_reason
                .unwrap_or_else(|| "publish failed".to_string());
            return Ok(PublishResult::failed(
                reason,
                false,
                OffsetDateTime::now_utc(),
            ));
        }

        tracing::info!(
            tenant_id = %tenant.tenant_id,
            publish_id = %init.publish_id,
            status = %status.status,
            "Published to tiktok"
        );

        Ok(
            PublishResult::succeeded(init.publish_id, OffsetDateTime::now_utc())
                .with_metadata("publish_status", status.status),
        )
    }

    fn requirements(&self) -> &'static ContentRequirements {
        Platform::TikTok.requirements()
    }

    async fn check_health(&self) -> HealthCheck {
        let started = std::time::Instant::now();
        let url = format!("{}/v2/user/info/", self.base_url);
        let outcome = self
            .client
            .get(&url)
            .query(&[("fields", "open_id")])
            .header("Authorization", self.bearer())
            .send()
            .await;
        let latency = started.elapsed();
        let checked_at = OffsetDateTime::now_utc();

        match outcome {
            Ok(response) => {
                let rate_limit_remaining = http::header_rate_limit_remaining(response.headers());
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
        let Some(refresh_token) = &self.refresh_token else {
            return Err(AdapterError::Credential(
                "no refresh token stored for tiktok".to_string(),
            ));
        };
        let (Some(client_key), Some(client_secret)) = (&self.client_key, &self.client_secret)
        else {
            return Err(AdapterError::Credential(
                "refresh requires client key and secret".to_string(),
            ));
        };

        let url = format!("{}/v2/oauth/token/", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
                ("client_key", client_key.as_str()),
                ("client_secret", client_secret.as_str()),
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
            refresh_token: token.refresh_token,
            app_id: Some(client_key.clone()),
            app_secret: Some(client_secret.clone()),
        })
    }
}
