//! Facebook page publishing adapter
//!
//! Four post subtypes, each with its own endpoint and payload shape:
//! plain and article posts go to the feed, images to the photo
//! endpoint, video to the video endpoint. The page is addressed as
//! `me` through a page access token.

use async_trait::async_trait;
use crosspost_domain::media;
use crosspost_domain::model::{
    AdaptedContent, FacebookPostType, HealthCheck, Platform, PlatformCredentials, PlatformFields,
    PublishResult, TenantContext, ValidationCode, ValidationResult,
};
use crosspost_domain::ports::{AdapterError, PlatformAdapter};
use crosspost_domain::requirements::ContentRequirements;
use crosspost_domain::validation;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::http;

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Facebook adapter over the Graph page publishing API
pub struct FacebookAdapter {
    client: Client,
    access_token: SecretString,
    app_id: Option<String>,
    app_secret: Option<String>,
    base_url: String,
}

impl FacebookAdapter {
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
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }

    async fn post_json<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<PostResponse, AdapterError> {
        let url = format!("{}/me/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .json(body)
            .send()
            .await
            .map_err(http::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        response
            .json()
            .await
            .map_err(|e| AdapterError::Api(e.to_string()))
    }
}

#[derive(Serialize)]
struct FeedPost<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<&'a str>,
}

#[derive(Serialize)]
struct PhotoPost<'a> {
    url: &'a str,
    caption: &'a str,
}

#[derive(Serialize)]
struct VideoPost<'a> {
    file_url: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct PostResponse {
    id: String,
    /// Photo uploads return the feed story separately
    post_id: Option<String>,
}

impl PostResponse {
    fn into_post_id(self) -> String {
        self.post_id.unwrap_or(self.id)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[async_trait]
impl PlatformAdapter for FacebookAdapter {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn authenticate(&self) -> Result<bool, AdapterError> {
        let url = format!("{}/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(http::transport_error)?;
        let status = response.status();
        if status == 401 || status == 403 {
            return Ok(false);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::error_for_status(status, body));
        }
        Ok(true)
    }

    fn validate_content(&self, content: &AdaptedContent) -> ValidationResult {
        let mut result = validation::validate_against_requirements(content, self.requirements());

        match &content.fields {
            PlatformFields::Facebook {
                post_type, link, ..
            } => match post_type {
                FacebookPostType::Plain | FacebookPostType::Article
                    if content.text.trim().is_empty() =>
                {
                    result.push(ValidationCode::MissingField, "feed posts require text");
                }
                FacebookPostType::Article if link.is_none() => {
                    result.push(
                        ValidationCode::MissingField,
                        "article posts require a link",
                    );
                }
                FacebookPostType::Image if content.media_urls.is_empty() => {
                    result.push(ValidationCode::MissingMedia, "image posts require media");
                }
                FacebookPostType::Video if !media::contains_video(&content.media_urls) => {
                    result.push(
                        ValidationCode::MissingMedia,
                        "video posts require video media",
                    );
                }
                _ => {}
            },
            _ => {
                result.push(
                    ValidationCode::InvalidFieldValue,
                    "adapted content is not for facebook",
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

        let PlatformFields::Facebook {
            post_type, link, ..
        } = &content.fields
        else {
            return Err(AdapterError::Validation(
                "adapted content is not for facebook".to_string(),
            ));
        };

        let first_media = content.media_urls.first().map(String::as_str);
        let response = match post_type {
            FacebookPostType::Plain => {
                self.post_json(
                    "feed",
                    &FeedPost {
                        message: &content.text,
                        link: None,
                    },
                )
                .await?
            }
            FacebookPostType::Article => {
                self.post_json(
                    "feed",
                    &FeedPost {
                        message: &content.text,
                        link: link.as_deref(),
                    },
                )
                .await?
            }
            FacebookPostType::Image => {
                // validation guarantees a media URL
                self.post_json(
                    "photos",
                    &PhotoPost {
                        url: first_media.unwrap_or_default(),
                        caption: &content.text,
                    },
                )
                .await?
            }
            FacebookPostType::Video => {
                self.post_json(
                    "videos",
                    &VideoPost {
                        file_url: first_media.unwrap_or_default(),
                        description: &content.text,
                    },
                )
                .await?
            }
        };

        let post_id = response.into_post_id();
        tracing::info!(
            tenant_id = %tenant.tenant_id,
            post_id = %post_id,
            post_type = ?post_type,
            "Published to facebook"
        );

        Ok(PublishResult::succeeded(post_id, OffsetDateTime::now_utc())
            .with_metadata("post_type", format!("{:?}", post_type).to_lowercase()))
    }

    fn requirements(&self) -> &'static ContentRequirements {
        Platform::Facebook.requirements()
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
                "no refresh token: token exchange needs app id and secret".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crosspost_domain::model::ContentRecord;
    use crosspost_domain::usecases::adapt::ContentAdapter;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter_for(server: &MockServer) -> FacebookAdapter {
        FacebookAdapter::with_base_url(&PlatformCredentials::new("test-token"), server.uri())
    }

    fn sample_content(text: &str, media: Vec<&str>) -> AdaptedContent {
        let record = ContentRecord {
            id: "c1".to_string(),
            text: text.to_string(),
            media_urls: media.into_iter().map(String::from).collect(),
            adaptations: Default::default(),
        };
        ContentAdapter::default()
            .adapt(&record, Platform::Facebook, OffsetDateTime::UNIX_EPOCH)
            .unwrap()
    }

    #[tokio::test]
    async fn plain_post_goes_to_the_feed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/me/feed"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({"message": "plain words"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "page_post_1"
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let result = adapter
            .publish(&sample_content("plain words", vec![]), &TenantContext::new("t1"))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.post_id.as_deref(), Some("page_post_1"));
        assert_eq!(result.metadata.get("post_type").map(String::as_str), Some("plain"));
    }

    #[tokio::test]
    async fn article_post_carries_the_link() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/me/feed"))
            .and(body_json(serde_json::json!({
                "message": "read https://example.com/story",
                "link": "https://example.com/story"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "page_post_2"
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let result = adapter
            .publish(
                &sample_content("read https://example.com/story", vec![]),
                &TenantContext::new("t1"),
            )
            .await
            .unwrap();

        assert!(result.success);
    }

    #[tokio::test]
    async fn image_post_uses_the_photo_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/me/photos"))
            .and(body_json(serde_json::json!({
                "url": "https://cdn.example.com/a.jpg",
                "caption": "photo day"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "photo_1",
                "post_id": "page_post_3"
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let result = adapter
            .publish(
                &sample_content("photo day", vec!["https://cdn.example.com/a.jpg"]),
                &TenantContext::new("t1"),
            )
            .await
            .unwrap();

        assert_eq!(result.post_id.as_deref(), Some("page_post_3"));
    }

    #[tokio::test]
    async fn video_post_uses_the_video_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/me/videos"))
            .and(body_json(serde_json::json!({
                "file_url": "https://cdn.example.com/clip.mp4",
                "description": "video day"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "video_1"
            })))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let result = adapter
            .publish(
                &sample_content("video day", vec!["https://cdn.example.com/clip.mp4"]),
                &TenantContext::new("t1"),
            )
            .await
            .unwrap();

        assert_eq!(result.post_id.as_deref(), Some("video_1"));
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limit_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/me/feed"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let err = adapter
            .publish(&sample_content("hello", vec![]), &TenantContext::new("t1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AdapterError::RateLimited));
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/me/feed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        let err = adapter
            .publish(&sample_content("hello", vec![]), &TenantContext::new("t1"))
            .await
            .unwrap_err();

        assert_eq!(err.retryable_hint(), Some(true));
    }

    #[tokio::test]
    async fn wrong_platform_payload_is_rejected_offline() {
        let server = MockServer::start().await;

        let record = ContentRecord {
            id: "c1".to_string(),
            text: "for instagram".to_string(),
            media_urls: vec!["https://cdn.example.com/a.jpg".to_string()],
            adaptations: Default::default(),
        };
        let instagram_payload = ContentAdapter::default()
            .adapt(&record, Platform::Instagram, OffsetDateTime::UNIX_EPOCH)
            .unwrap();

        let adapter = adapter_for(&server);
        let result = adapter
            .publish(&instagram_payload, &TenantContext::new("t1"))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(!result.retryable);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn authenticate_reports_token_state() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let adapter = adapter_for(&server);
        assert!(!adapter.authenticate().await.unwrap());
    }
}
