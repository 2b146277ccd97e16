//! Shared validation of adapted content against platform requirements
//!
//! Adapters layer platform-specific checks on top of these; everything
//! here is pure and callable without network access.

use regex::Regex;
use std::sync::OnceLock;

use crate::media;
use crate::model::{AdaptedContent, PlatformFields, ValidationCode, ValidationResult};
use crate::requirements::ContentRequirements;

fn hashtag_regex() -> &'static Regex {
    static HASHTAG: OnceLock<Regex> = OnceLock::new();
    HASHTAG.get_or_init(|| Regex::new(r"#[A-Za-z0-9_]+").expect("hashtag regex"))
}

/// Extract `#`-prefixed tokens from text, in order of appearance
pub fn extract_hashtags(text: &str) -> Vec<String> {
    hashtag_regex()
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Hashtag count of an adapted payload.
///
/// Platforms carrying an explicit hashtag list (Instagram) are counted
/// from that list; everything else is counted from the body text.
pub fn hashtag_count(content: &AdaptedContent) -> usize {
    match &content.fields {
        PlatformFields::Instagram { hashtags, .. } => hashtags.len(),
        _ => extract_hashtags(&content.text).len(),
    }
}

/// Check adapted content against a platform's requirements table entry
pub fn validate_against_requirements(
    content: &AdaptedContent,
    requirements: &ContentRequirements,
) -> ValidationResult {
    let mut result = ValidationResult::valid();

    let text_len = content.text.chars().count();
    if text_len > requirements.max_text_length {
        result.push(
            ValidationCode::TextTooLong,
            format!(
                "text is {} characters, limit is {}",
                text_len, requirements.max_text_length
            ),
        );
    }

    let hashtags = hashtag_count(content);
    if hashtags > requirements.hashtag_limit {
        result.push(
            ValidationCode::TooManyHashtags,
            format!(
                "{} hashtags, limit is {}",
                hashtags, requirements.hashtag_limit
            ),
        );
    }

    for url in &content.media_urls {
        if !media::is_valid_media_url(url) {
            result.push(
                ValidationCode::UnsupportedMediaFormat,
                format!("media URL is not fetchable: {}", url),
            );
            continue;
        }
        let accepted = match media::media_extension(url) {
            Some(ext) => {
                requirements.image_formats.contains(&ext.as_str())
                    || requirements.video_formats.contains(&ext.as_str())
            }
            None => false,
        };
        if !accepted {
            result.push(
                ValidationCode::UnsupportedMediaFormat,
                format!("media format not accepted: {}", url),
            );
        }
    }

    for field in requirements.required_fields {
        match *field {
            "text" => {
                if content.text.trim().is_empty() {
                    result.push(ValidationCode::MissingField, "text is required");
                }
            }
            "media" => {
                if content.media_urls.is_empty() {
                    result.push(ValidationCode::MissingMedia, "media is required");
                }
            }
            "video" => {
                if !media::contains_video(&content.media_urls) {
                    result.push(ValidationCode::MissingMedia, "video media is required");
                }
            }
            other => {
                result.push(
                    ValidationCode::MissingField,
                    format!("unknown required field: {}", other),
                );
            }
        }
    }

    result
}
