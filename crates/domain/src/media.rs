//! Shared media helpers: URL shape checks and extension-based media
//! classification, used by adaptation, validation, and the platform
//! adapters.

use crate::model::MediaKind;

/// Extensions recognized as images across all platforms
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Extensions recognized as video across all platforms
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "webm", "m4v"];

/// Minimal structural check for a fetchable media URL
pub fn is_valid_media_url(url: &str) -> bool {
    let rest = match url.split_once("://") {
        Some(("http", rest)) | Some(("https", rest)) => rest,
        _ => return false,
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty()
}

/// Lowercased file extension of a URL path, ignoring query and fragment
pub fn media_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify a single media URL by extension
pub fn classify_media_url(url: &str) -> Option<MediaKind> {
    let ext = media_extension(url)?;
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Classify a media set: multiple items become a carousel
pub fn classify_media(urls: &[String]) -> Option<MediaKind> {
    match urls {
        [] => None,
        [single] => classify_media_url(single),
        _ => Some(MediaKind::Carousel),
    }
}

/// Whether any URL in the set is a video
pub fn contains_video(urls: &[String]) -> bool {
    urls.iter()
        .any(|u| classify_media_url(u) == Some(MediaKind::Video))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validity() {
        assert!(is_valid_media_url("https://cdn.example.com/a.jpg"));
        assert!(is_valid_media_url("http://cdn.example.com/a.jpg?sig=abc"));
        assert!(!is_valid_media_url("ftp://cdn.example.com/a.jpg"));
        assert!(!is_valid_media_url("https:///a.jpg"));
        assert!(!is_valid_media_url("not a url"));
    }

    #[test]
    fn extension_ignores_query_and_case() {
        assert_eq!(
            media_extension("https://cdn.example.com/clip.MP4?token=x#t=10"),
            Some("mp4".to_string())
        );
        assert_eq!(media_extension("https://cdn.example.com/noext"), None);
    }

    #[test]
    fn classification_by_extension() {
        assert_eq!(
            classify_media_url("https://cdn.example.com/a.png"),
            Some(MediaKind::Image)
        );
        assert_eq!(
            classify_media_url("https://cdn.example.com/a.mov"),
            Some(MediaKind::Video)
        );
        assert_eq!(classify_media_url("https://cdn.example.com/a.pdf"), None);
    }

    #[test]
    fn multiple_media_is_carousel() {
        let urls = vec![
            "https://cdn.example.com/a.jpg".to_string(),
            "https://cdn.example.com/b.jpg".to_string(),
        ];
        assert_eq!(classify_media(&urls), Some(MediaKind::Carousel));
    }
}
