//! Static per-platform content requirements
//!
//! One immutable table entry per platform, consumed by the adaptation
//! pipeline and by validation. Values follow each platform's published
//! publishing limits.

use crate::model::Platform;

/// Constraint set for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequirements {
    /// Maximum text/caption length in characters
    pub max_text_length: usize,
    /// Maximum number of hashtags per post
    pub hashtag_limit: usize,
    /// Accepted image file extensions
    pub image_formats: &'static [&'static str],
    /// Accepted video file extensions
    pub video_formats: &'static [&'static str],
    /// Maximum video duration in seconds
    pub max_video_duration_secs: u32,
    /// Maximum media file size in bytes
    pub max_file_size_bytes: u64,
    /// Adapted-content fields that must be present ("text", "media", "video")
    pub required_fields: &'static [&'static str],
}

pub static INSTAGRAM_REQUIREMENTS: ContentRequirements = ContentRequirements {
    max_text_length: 2_200,
    hashtag_limit: 30,
    image_formats: &["jpg", "jpeg", "png"],
    video_formats: &["mp4", "mov"],
    max_video_duration_secs: 60,
    max_file_size_bytes: 100 * 1024 * 1024,
    required_fields: &["media"],
};

pub static FACEBOOK_REQUIREMENTS: ContentRequirements = ContentRequirements {
    max_text_length: 63_206,
    hashtag_limit: 30,
    image_formats: &["jpg", "jpeg", "png", "gif"],
    video_formats: &["mp4", "mov", "avi"],
    max_video_duration_secs: 14_400,
    max_file_size_bytes: 1024 * 1024 * 1024,
    required_fields: &[],
};

pub static LINKEDIN_REQUIREMENTS: ContentRequirements = ContentRequirements {
    max_text_length: 3_000,
    hashtag_limit: 10,
    image_formats: &["jpg", "jpeg", "png"],
    video_formats: &["mp4"],
    max_video_duration_secs: 600,
    max_file_size_bytes: 200 * 1024 * 1024,
    required_fields: &["text"],
};

pub static TIKTOK_REQUIREMENTS: ContentRequirements = ContentRequirements {
    max_text_length: 2_200,
    hashtag_limit: 20,
    image_formats: &[],
    video_formats: &["mp4", "mov", "webm"],
    max_video_duration_secs: 600,
    max_file_size_bytes: 4 * 1024 * 1024 * 1024,
    required_fields: &["video"],
};

impl Platform {
    /// The static requirements table entry for this platform
    pub fn requirements(&self) -> &'static ContentRequirements {
        match self {
            Platform::Instagram => &INSTAGRAM_REQUIREMENTS,
            Platform::Facebook => &FACEBOOK_REQUIREMENTS,
            Platform::LinkedIn => &LINKEDIN_REQUIREMENTS,
            Platform::TikTok => &TIKTOK_REQUIREMENTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_platform_has_requirements() {
        for platform in Platform::ALL {
            let req = platform.requirements();
            assert!(req.max_text_length > 0);
            assert!(req.hashtag_limit > 0);
        }
    }

    #[test]
    fn tiktok_is_video_only() {
        let req = Platform::TikTok.requirements();
        assert!(req.image_formats.is_empty());
        assert!(req.required_fields.contains(&"video"));
    }
}
