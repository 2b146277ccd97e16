//! LinkedIn publishing adapter
//!
//! Media publishes run a three-step protocol: register an upload to
//! obtain a pre-signed URL and asset URN, fetch the source bytes and
//! PUT them to that URL, then create the UGC post referencing the
//! asset. Failures during the upload step are network-class and
//! therefore retryable.

use async_trait::async_trait;
use crosspost_domain::model::{
    AdaptedContent, HealthCheck, LinkedInMediaCategory, Platform, PlatformCredentials,
    PlatformFields, PublishResult, TenantContext, ValidationCode, ValidationResult,
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

const DEFAULT_BASE_URL: &str = "https://api.linkedin.com";

/// LinkedIn adapter over the UGC posts and assets APIs
pub struct LinkedInAdapter {
    client: Client,
    access_token: SecretString,
    app_id: Option<String>,
    app_secret: Option<String>,
    refresh_token: Option<SecretString>,
    base_url: String,
    author_urn: Mutex<Option<String>>,
}

impl LinkedInAdapter {
    pub fn new(credentials: &PlatformCredentials) -> Self {
        Self::with_base_url(credentials, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(credentials: &PlatformCredentials, base_url: String) -> Self {
        Self {
            client: http::build_client(),
            access_token: SecretString::new(credentials.access_token.clone().into()),
            app_id: credentials.app_id.clone(),
            app_secret: credentials.app_secret.clone(),
            refresh_token: credentials
                .refresh_token
                .clone()
                .map(|t| SecretString::new(t.into())),
            base_url,
            author_urn: Mutex::new(None),
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    /// Member URN for the token, cached for the adapter's lifetime
    async fn resolve_author(&self) -> Result<String, AdapterError> {
        if let Some(urn) = self.author_urn.lock().unwrap().clone() {
            return Ok(urn);
        }

        let url = format!("{}/v2/userinfo", self.base_url);
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
        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;

        let urn = format!("urn:li:person:{}", info.sub);
        *self.author_urn.lock().unwrap() = Some(urn.clone());
        Ok(urn)
    }

    /// Register an upload and push the source bytes to the returned
    /// pre-signed URL; yields the asset URN for the post
    async fn upload_media(&self, owner: &str, media_url: &str) -> Result<String, AdapterError> {
        let url = format!("{}/v2/assets?action=registerUpload", self.base_url);
        let body = serde_json::json!({
            "registerUploadRequest": {
                "recipes": ["urn:li:digitalmediaRecipe:feedshare-image"],
                "owner": owner,
                "serviceRelationships": [{
                    "relationshipType": "OWNER",
                    "identifier": "urn:li:userGeneratedContent"
                }]
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
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        let registered: RegisterUploadResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;
        let upload_url = registered
            .value
            .upload_mechanism
            .media_upload
            .upload_url;

        // fetching the source and pushing bytes are both network-class
        let source = self
            .client
            .get(media_url)
            .send()
            .await
            .map_err(http::transport_error)?;
        if !source.status().is_success() {
            return Err(AdapterError::Transient(format!(
                "media fetch failed with status {}",
                source.status()
            )));
        }
        let bytes = source.bytes().await.map_err(http::transport_error)?;

        let upload = self
            .client
            .put(&upload_url)
            .header("Authorization", self.bearer())
            .body(bytes)
            .send()
            .await
            .map_err(http::transport_error)?;
        if !upload.status().is_success() {
            return Err(AdapterError::Transient(format!(
                "media upload failed with status {}",
                upload.status()
            )));
        }

        Ok(registered.value.asset)
    }
}

#[derive(Deserialize)]
struct UserInfo {
    sub: String,
}

#[derive(Deserialize)]
struct RegisterUploadResponse {
    value: RegisterUploadValue,
}

#[derive(Deserialize)]
struct RegisterUploadValue {
    asset: String,
    #[serde(rename = "uploadMechanism")]
    upload_mechanism: UploadMechanism,
}

#[derive(Deserialize)]
struct UploadMechanism {
    #[serde(rename = "com.linkedin.digitalmedia.uploading.MediaUploadHttpRequest")]
    media_upload: MediaUpload,
}

#[derive(Deserialize)]
struct MediaUpload {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
}

#[derive(Deserialize)]
struct UgcPostResponse {
    id: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

#[async_trait]
impl PlatformAdapter for LinkedInAdapter {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn authenticate(&self) -> Result<bool, AdapterError> {
        match self.resolve_author().await {
            Ok(_) => Ok(true),
            Err(AdapterError::Credential(_)) => Ok(false),
            Err(other) => Err(other),
        }
    }

    fn validate_content(&self, content: &AdaptedContent) -> ValidationResult {
        let mut result = validation::validate_against_requirements(content, self.requirements());

        match &content.fields {
            PlatformFields::LinkedIn { media_category, .. } => {
                let needs_media = matches!(
                    media_category,
                    LinkedInMediaCategory::Image | LinkedInMediaCategory::Video
                );
                if needs_media && content.media_urls.is_empty() {
                    result.push(
                        ValidationCode::MissingMedia,
                        "media share requires a media URL",
                    );
                }
            }
            _ => {
                result.push(
                    ValidationCode::InvalidFieldValue,
                    "adapted content is not for linkedin",
                );
            }
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

        let PlatformFields::LinkedIn {
            media_category,
            visibility,
        } = &content.fields
        else {
            return Err(AdapterError::Validation(
                "adapted content is not for linkedin".to_string(),
            ));
        };

        let author = self.resolve_author().await?;

        let category = match media_category {
            LinkedInMediaCategory::None => "NONE",
            LinkedInMediaCategory::Article => "ARTICLE",
            LinkedInMediaCategory::Image => "IMAGE",
            LinkedInMediaCategory::Video => "VIDEO",
        };

        let media = match media_category {
            LinkedInMediaCategory::Image | LinkedInMediaCategory::Video => {
                // validation guarantees a media URL
                let media_url = content.media_urls.first().cloned().unwrap_or_default();
                let asset = self.upload_media(&author, &media_url).await?;
                serde_json::json!([{ "status": "READY", "media": asset }])
            }
            _ => serde_json::json!([]),
        };

        let body = serde_json::json!({
            "author": author,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": content.text },
                    "shareMediaCategory": category,
                    "media": media
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": visibility
            }
        });

        let url = format!("{}/v2/ugcPosts", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        let post: UgcPostResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))?;

        tracing::info!(
            tenant_id = %tenant.tenant_id,
            post_id = %post.id,
            category = category,
            "Published to linkedin"
        );

        Ok(PublishResult::succeeded(post.id, OffsetDateTime::now_utc())
            .with_metadata("share_media_category", category))
    }

    fn requirements(&self) -> &'static ContentRequirements {
        Platform::LinkedIn.requirements()
    }

    async fn check_health(&self) -> HealthCheck {
        let started = std::time::Instant::now();
        let url = format!("{}/v2/userinfo", self.base_url);
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
                "no refresh token stored for linkedin".to_string(),
            ));
        };
        let (Some(app_id), Some(app_secret)) = (&self.app_id, &self.app_secret) else {
            return Err(AdapterError::Credential(
                "refresh requires client id and secret".to_string(),
            ));
        };

        let url = format!("{}/oauth/v2/accessToken", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.expose_secret()),
                ("client_id", app_id.as_str()),
                ("client_secret", app_secret.as_str()),
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
            refresh_token: token
                .refresh_token
                .or_else(|| Some(refresh_token.expose_secret().to_string())),
            app_id: Some(app_id.clone()),
            app_secret: Some(app_secret.clone()),
        })
    }
}
