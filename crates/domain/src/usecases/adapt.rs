//! Content adaptation pipeline
//!
//! Transforms a platform-agnostic content record into the payload one
//! platform expects: truncation, hashtag extraction, media
//! classification, and the per-platform field bag. Deterministic given
//! identical inputs and free of side effects.

use regex::Regex;
use std::sync::OnceLock;
use time::OffsetDateTime;

use crate::media;
use crate::model::{
    AdaptationMetadata, AdaptedContent, AspectRatio, ContentRecord, FacebookPostType,
    LinkedInMediaCategory, MediaKind, Platform, PlatformFields, TikTokPrivacy,
};
use crate::validation::extract_hashtags;

/// Error type for content adaptation
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdaptError {
    #[error("content {content_id} has no text and no media")]
    Empty { content_id: String },
    #[error("content {content_id} has no video media, required by {platform}")]
    VideoRequired {
        content_id: String,
        platform: Platform,
    },
}

/// Configuration for the adaptation pipeline
#[derive(Debug, Clone)]
pub struct AdaptConfig {
    /// Marker appended when text is truncated
    pub truncation_marker: String,
    /// Fraction of the limit below which a whitespace boundary is not
    /// acceptable and a hard cut is used instead
    pub boundary_floor_ratio: f64,
}

impl Default for AdaptConfig {
    fn default() -> Self {
        Self {
            truncation_marker: "...".to_string(),
            boundary_floor_ratio: 0.8,
        }
    }
}

fn link_regex() -> &'static Regex {
    static LINK: OnceLock<Regex> = OnceLock::new();
    LINK.get_or_init(|| Regex::new(r"https?://\S+").expect("link regex"))
}

/// Adapts content records to per-platform payloads
#[derive(Debug, Clone, Default)]
pub struct ContentAdapter {
    config: AdaptConfig,
}

impl ContentAdapter {
    pub fn new(config: AdaptConfig) -> Self {
        Self { config }
    }

    /// Build the platform payload for one (content, platform) pair
    pub fn adapt(
        &self,
        content: &ContentRecord,
        platform: Platform,
        now: OffsetDateTime,
    ) -> Result<AdaptedContent, AdaptError> {
        if content.text.trim().is_empty() && content.media_urls.is_empty() {
            return Err(AdaptError::Empty {
                content_id: content.id.clone(),
            });
        }

        let requirements = platform.requirements();
        let text = self.truncate_text(&content.text, requirements.max_text_length);
        let hashtags = extract_hashtags(&text);
        let fields = self.build_fields(content, platform, &text, hashtags)?;

        Ok(AdaptedContent {
            text,
            media_urls: content.media_urls.clone(),
            metadata: AdaptationMetadata {
                platform,
                source_content_id: content.id.clone(),
                adapted_at: now,
            },
            fields,
        })
    }

    /// Truncate at the last whitespace boundary before the limit, never
    /// mid-word; hard-truncate when no boundary exists at or past 80%
    /// of the limit. Text within the limit is returned unchanged.
    fn truncate_text(&self, text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let marker = &self.config.truncation_marker;
        let budget = max_chars.saturating_sub(marker.chars().count());
        let floor = (max_chars as f64 * self.config.boundary_floor_ratio) as usize;

        let mut budget_byte = text.len();
        let mut last_boundary: Option<(usize, usize)> = None;
        for (char_idx, (byte_idx, ch)) in text.char_indices().enumerate() {
            if char_idx == budget {
                budget_byte = byte_idx;
                break;
            }
            if ch.is_whitespace() {
                last_boundary = Some((char_idx, byte_idx));
            }
        }

        let cut = match last_boundary {
            Some((char_idx, byte_idx)) if char_idx >= floor => byte_idx,
            _ => budget_byte,
        };

        format!("{}{}", text[..cut].trim_end(), marker)
    }

    fn build_fields(
        &self,
        content: &ContentRecord,
        platform: Platform,
        text: &str,
        hashtags: Vec<String>,
    ) -> Result<PlatformFields, AdaptError> {
        let media_kind = media::classify_media(&content.media_urls);

        let fields = match platform {
            Platform::Instagram => PlatformFields::Instagram {
                caption: text.to_string(),
                hashtags,
                // Dimensions are not derivable from a URL; classify
                // conservatively and let the platform normalize.
                aspect_ratio: AspectRatio::Square,
                media_kind: media_kind.unwrap_or(MediaKind::Image),
            },
            Platform::Facebook => {
                let link = link_regex()
                    .find(text)
                    .map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string());
                let post_type = match media_kind {
                    Some(MediaKind::Video) => FacebookPostType::Video,
                    Some(MediaKind::Image) | Some(MediaKind::Carousel) => FacebookPostType::Image,
                    None if link.is_some() => FacebookPostType::Article,
                    None => FacebookPostType::Plain,
                };
                PlatformFields::Facebook {
                    post_type,
                    target_audience: "general".to_string(),
                    link,
                }
            }
            Platform::LinkedIn => {
                let media_category = match media_kind {
                    Some(MediaKind::Video) => LinkedInMediaCategory::Video,
                    Some(MediaKind::Image) | Some(MediaKind::Carousel) => {
                        LinkedInMediaCategory::Image
                    }
                    None => LinkedInMediaCategory::None,
                };
                PlatformFields::LinkedIn {
                    media_category,
                    visibility: "PUBLIC".to_string(),
                }
            }
            Platform::TikTok => {
                if !media::contains_video(&content.media_urls) {
                    return Err(AdaptError::VideoRequired {
                        content_id: content.id.clone(),
                        platform,
                    });
                }
                PlatformFields::TikTok {
                    privacy: TikTokPrivacy::PublicToEveryone,
                    max_duration_secs: platform.requirements().max_video_duration_secs,
                }
            }
        };

        Ok(fields)
    }
}
