//! Domain models and value objects

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Target platforms supported by the publishing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    Facebook,
    #[serde(rename = "linkedin")]
    LinkedIn,
    #[serde(rename = "tiktok")]
    TikTok,
}

impl Platform {
    /// All platforms the pipeline knows about
    pub const ALL: [Platform; 4] = [
        Platform::Instagram,
        Platform::Facebook,
        Platform::LinkedIn,
        Platform::TikTok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Facebook => "facebook",
            Platform::LinkedIn => "linkedin",
            Platform::TikTok => "tiktok",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = UnsupportedPlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            "linkedin" => Ok(Platform::LinkedIn),
            "tiktok" => Ok(Platform::TikTok),
            other => Err(UnsupportedPlatformError {
                name: other.to_string(),
            }),
        }
    }
}

/// Request names a platform with no registered adapter
#[derive(Debug, Clone, thiserror::Error)]
#[error("unsupported platform: {name}")]
pub struct UnsupportedPlatformError {
    pub name: String,
}

/// OAuth-style credentials for one (tenant, platform) pair.
///
/// Mutated only by credential refresh; never persisted by this core.
#[derive(Clone)]
pub struct PlatformCredentials {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub app_id: Option<String>,
    pub app_secret: Option<String>,
}

impl PlatformCredentials {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            app_id: None,
            app_secret: None,
        }
    }

    /// Cache key material: token prefix and app id only, never the full secret.
    pub fn fingerprint(&self, platform: Platform) -> String {
        let prefix: String = self.access_token.chars().take(8).collect();
        let mut hasher = Sha256::new();
        hasher.update(platform.as_str().as_bytes());
        hasher.update(prefix.as_bytes());
        if let Some(app_id) = &self.app_id {
            hasher.update(app_id.as_bytes());
        }
        let digest = format!("{:x}", hasher.finalize());
        digest[..16].to_string()
    }
}

impl std::fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformCredentials")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

/// Tenant identity attached to every publish call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: String,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
        }
    }
}

/// A generated content record as handed over by the content subsystem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Content ID assigned by the workflow subsystem
    pub id: String,
    /// Platform-agnostic base text
    pub text: String,
    /// Media URLs referenced by the content
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// Pre-computed per-platform adapted payloads
    #[serde(default)]
    pub adaptations: HashMap<Platform, AdaptedContent>,
}

/// Media classification derived from file extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Carousel,
}

/// Coarse aspect ratio classification for image-centric platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspectRatio {
    Square,
    Portrait,
    Landscape,
}

/// Facebook post subtypes, each with its own publish protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacebookPostType {
    Plain,
    Article,
    Image,
    Video,
}

/// LinkedIn share media category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkedInMediaCategory {
    None,
    Article,
    Image,
    Video,
}

/// TikTok privacy level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TikTokPrivacy {
    PublicToEveryone,
    MutualFollowFriends,
    SelfOnly,
}

/// Per-platform payload fields.
///
/// A closed union instead of a free-form map so the four variants are
/// checked exhaustively at compile time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlatformFields {
    #[serde(rename = "instagram")]
    Instagram {
        caption: String,
        hashtags: Vec<String>,
        aspect_ratio: AspectRatio,
        media_kind: MediaKind,
    },
    #[serde(rename = "facebook")]
    Facebook {
        post_type: FacebookPostType,
        target_audience: String,
        link: Option<String>,
    },
    #[serde(rename = "linkedin")]
    LinkedIn {
        media_category: LinkedInMediaCategory,
        visibility: String,
    },
    #[serde(rename = "tiktok")]
    TikTok {
        privacy: TikTokPrivacy,
        max_duration_secs: u32,
    },
}

impl PlatformFields {
    pub fn platform(&self) -> Platform {
        match self {
            PlatformFields::Instagram { .. } => Platform::Instagram,
            PlatformFields::Facebook { .. } => Platform::Facebook,
            PlatformFields::LinkedIn { .. } => Platform::LinkedIn,
            PlatformFields::TikTok { .. } => Platform::TikTok,
        }
    }
}

/// Adaptation provenance stamped onto every adapted payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptationMetadata {
    pub platform: Platform,
    pub source_content_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub adapted_at: OffsetDateTime,
}

/// A content record transformed for one platform.
///
/// Created fresh per (content, platform) pair and never shared across
/// platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptedContent {
    pub text: String,
    pub media_urls: Vec<String>,
    pub metadata: AdaptationMetadata,
    pub fields: PlatformFields,
}

impl AdaptedContent {
    pub fn platform(&self) -> Platform {
        self.metadata.platform
    }
}

/// Typed validation issue codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    TextTooLong,
    TooManyHashtags,
    MissingMedia,
    UnsupportedMediaFormat,
    MissingField,
    InvalidFieldValue,
}

/// One constraint violation found during validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: ValidationCode,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of validating adapted content against platform constraints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self { issues: vec![] }
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn push(&mut self, code: ValidationCode, message: impl Into<String>) {
        self.issues.push(ValidationIssue::new(code, message));
    }

    /// All issue messages joined for error reporting
    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|i| i.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Outcome of one publish attempt against a platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    /// Platform-assigned post ID, present on success
    pub post_id: Option<String>,
    /// Error message, present on failure
    pub error: Option<String>,
    /// Whether the failure is eligible for automatic retry
    pub retryable: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PublishResult {
    pub fn succeeded(post_id: impl Into<String>, at: OffsetDateTime) -> Self {
        Self {
            success: true,
            post_id: Some(post_id.into()),
            error: None,
            retryable: false,
            published_at: at,
            metadata: HashMap::new(),
        }
    }

    pub fn failed(error: impl Into<String>, retryable: bool, at: OffsetDateTime) -> Self {
        Self {
            success: false,
            post_id: None,
            error: Some(error.into()),
            retryable,
            published_at: at,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Lifecycle of one publish job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Success,
    Failed,
    Retrying,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Retrying => "retrying",
        };
        f.write_str(s)
    }
}

/// Audit record for one (content, platform) publish job.
///
/// Exactly one exists per (content id, platform) in a publish request;
/// terminal once status reaches Success or Failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishJobResult {
    pub job_id: Uuid,
    pub content_id: String,
    pub platform: Platform,
    pub tenant_id: String,
    pub status: JobStatus,
    pub result: Option<PublishResult>,
    pub retry_count: u32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

/// Retry policy for a publish attempt sequence
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    /// Case-insensitive substrings marking an unstructured error as transient
    pub retryable_patterns: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            retryable_patterns: [
                "timeout",
                "network",
                "rate limit",
                "server error",
                "connection",
                "unavailable",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `n + 1`, given failed attempt `n` (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * factor)
    }

    /// Classify unstructured error text by substring match
    pub fn matches_retryable_pattern(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.retryable_patterns
            .iter()
            .any(|p| lowered.contains(&p.to_lowercase()))
    }
}

/// Result of a lightweight authenticated health probe
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub healthy: bool,
    pub latency: Duration,
    pub rate_limit_remaining: Option<u32>,
    pub error: Option<String>,
    pub checked_at: OffsetDateTime,
}

/// A request to publish one content record to a set of platforms
#[derive(Debug, Clone)]
pub struct PublishRequest {
    pub content: ContentRecord,
    pub platforms: Vec<Platform>,
    pub scheduled_at: Option<OffsetDateTime>,
    pub retry_policy: Option<RetryPolicy>,
}

impl PublishRequest {
    pub fn new(content: ContentRecord, platforms: Vec<Platform>) -> Self {
        Self {
            content,
            platforms,
            scheduled_at: None,
            retry_policy: None,
        }
    }
}
